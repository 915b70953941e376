//! `endurance panels`: list the built-in panels.

use std::sync::Arc;

use endurance_core::{ControlKind, PRESET_NAMES, SystemClock, presets};

pub fn run() {
    println!("Endurance bridge panels");
    println!();

    for name in PRESET_NAMES {
        let panel = match presets::builder(name, Arc::new(SystemClock)).and_then(|b| b.build()) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error building {name}: {e}");
                continue;
            }
        };

        let drifting = panel
            .channels()
            .iter()
            .filter(|c| c.drift_amplitude() > 0.0)
            .count();
        println!(
            "  {:<16} {}  ({} channels, {} drifting)",
            name,
            panel.title(),
            panel.channels().len(),
            drifting
        );
        for b in panel.bindings() {
            let detail = match &b.kind {
                ControlKind::Momentary { duration, .. } => {
                    format!("momentary, resets after {}s", duration.as_secs_f64())
                }
                kind => kind.name().to_string(),
            };
            println!("      {:<20} {:<28} {detail}", b.id, b.label);
        }
        println!();
    }
}
