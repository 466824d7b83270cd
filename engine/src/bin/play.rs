//! Terminal driver: `play [LEVEL_FILE | preset:NAME]`.
//!
//! Reads lines from stdin. `w a s d` (or `k h j l`) move, `n` restarts the
//! level, `q` quits.

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::{Duration, Instant};

use sokoban_rs::{preset_level, Direction, GameConfig, Intent, Level, Session, SimpleLevel};

const FRAME: Duration = Duration::from_millis(16);

fn intent_for(key: char) -> Option<Intent> {
    match key {
        'w' | 'k' => Some(Intent::Move(Direction::Up)),
        'a' | 'h' => Some(Intent::Move(Direction::Left)),
        's' | 'j' => Some(Intent::Move(Direction::Down)),
        'd' | 'l' => Some(Intent::Move(Direction::Right)),
        'n' => Some(Intent::Reset),
        'q' => Some(Intent::Quit),
        _ => None,
    }
}

fn choose_level(arg: Option<String>) -> Result<Level, Box<dyn std::error::Error>> {
    match arg {
        None => Ok(SimpleLevel::build()),
        Some(a) => match a.strip_prefix("preset:") {
            Some(name) => preset_level(name).ok_or_else(|| format!("no preset named {name:?}").into()),
            None => Ok(Level::from_file(&a)?),
        },
    }
}

fn draw(session: &Session) {
    let view = session.view();
    println!("{}\n{}", view.room_text, view.status_line);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let config = GameConfig::from_env()?;
    let level = choose_level(std::env::args().nth(1))?.load()?;

    let origin = Instant::now();
    let mut session = Session::new(level, config, Duration::ZERO);
    draw(&session);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        for intent in line.chars().filter_map(intent_for) {
            let report = session.tick(origin.elapsed(), [intent]);
            // Let the walk animation finish so the next key is not dropped.
            while session.state().player().animation.is_animating() && session.fault().is_none() {
                thread::sleep(FRAME);
                session.tick(origin.elapsed(), []);
            }
            if report.quit || report.solved {
                break;
            }
        }
        draw(&session);
        io::stdout().flush()?;
        if let Some(fault) = session.fault() {
            return Err(fault.clone().into());
        }
        if session.has_quit() {
            break;
        }
        if session.is_solved() {
            println!("Solved!");
            break;
        }
    }
    Ok(())
}
