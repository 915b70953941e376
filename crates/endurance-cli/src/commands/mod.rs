pub mod mission_log;
pub mod monitor;
pub mod panels;
pub mod server;
pub mod snapshot;
pub mod watch;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use endurance_core::{
    ChannelReading, EngineConfig, Panel, PRESET_NAMES, SharedLogStore, SystemClock, Tier, preset,
};

/// Load the config file, or defaults when none was given. Exits on error.
pub fn load_config(path: Option<&str>) -> EngineConfig {
    match EngineConfig::load_or_default(path.map(Path::new)) {
        Ok(c) => {
            log::debug!("config ({}): {c:?}", path.unwrap_or("defaults"));
            c
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Open the file-backed mission log the config points at.
pub fn open_log(config: &EngineConfig) -> SharedLogStore {
    let mut store = config.open_log(Arc::new(SystemClock));
    for e in store.take_persistence_errors() {
        eprintln!("Warning: {e}");
    }
    store.into_shared()
}

/// Build a preset panel on the wall clock. Exits on an unknown name.
/// `seed` overrides the config's seed.
pub fn make_panel(
    config: &EngineConfig,
    name: &str,
    seed: Option<u64>,
    log: Option<SharedLogStore>,
) -> Panel {
    match preset(name, Arc::new(SystemClock), seed.or(config.seed), log) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Available panels: {}", PRESET_NAMES.join(", "));
            std::process::exit(1);
        }
    }
}

/// Parse a duration string like "500ms", "30s", "5m", "1h", or a bare
/// number of seconds (fractions allowed).
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let (numeric, multiplier) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, 1.0)
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, 1000.0)
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, 60_000.0)
    } else if let Some(rest) = s.strip_suffix('h') {
        (rest, 3_600_000.0)
    } else {
        (s, 1000.0)
    };

    let value: f64 = numeric
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {s}"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("duration must be positive: {s}"));
    }
    Ok(Duration::from_millis((value * multiplier).round().max(1.0) as u64))
}

/// `95.00 %`, `433.50 MHz`, `ON`/`OFF` for flags.
pub fn format_reading(ch: &ChannelReading) -> String {
    if ch.min == 0.0 && ch.max == 1.0 && ch.unit.is_empty() {
        return if ch.value > 0.5 { "ON" } else { "OFF" }.to_string();
    }
    if ch.unit.is_empty() {
        format!("{:.2}", ch.value)
    } else {
        format!("{:.2} {}", ch.value, ch.unit)
    }
}

/// Fixed-width status badge for plain-text output.
pub fn tier_badge(tier: Tier) -> &'static str {
    match tier {
        Tier::Operational => "[ OK ]",
        Tier::Warning => "[WARN]",
        Tier::Critical => "[CRIT]",
    }
}
