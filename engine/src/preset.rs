use crate::level::Level;
use once_cell::sync::OnceCell;

static PRESETS: OnceCell<Vec<Level>> = OnceCell::new();

fn load_presets() -> Vec<Level> {
    // Embedded at compile time, one `{"name": .., "text": ..}` object per line.
    let data = include_str!("../data/levels.jsonl");
    let mut out: Vec<Level> = Vec::new();
    for (lineno, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() { continue; }
        match serde_json::from_str::<Level>(line) {
            Ok(lvl) if out.iter().any(|l| l.name == lvl.name) => {
                log::warn!("preset line {}: duplicate name {:?}; skipping", lineno + 1, lvl.name);
            }
            Ok(lvl) => out.push(lvl),
            Err(e) => log::warn!("preset line {}: {e}; skipping", lineno + 1),
        }
    }
    out
}

/// Bundled level by name.
pub fn preset_level(name: &str) -> Option<Level> {
    PRESETS.get_or_init(load_presets).iter().find(|l| l.name == name).cloned()
}

/// Names of the bundled levels, in file order.
pub fn preset_names() -> Vec<String> {
    PRESETS.get_or_init(load_presets).iter().map(|l| l.name.clone()).collect()
}
