use std::net::SocketAddr;

use env_service::make_app;

/// Overrides the listen address.
const ADDR_ENV_VAR: &str = "ENV_SERVICE_ADDR";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let addr: SocketAddr = std::env::var(ADDR_ENV_VAR)
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;
    let app = make_app();

    log::info!("Sokoban service listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
