//! `endurance snapshot`: build a panel, drift it, print the readings.

use endurance_core::{EngineConfig, PanelSnapshot};

use super::{format_reading, make_panel, open_log, tier_badge};

pub fn run(config: &EngineConfig, panel: &str, ticks: usize, seed: Option<u64>, json: bool) {
    let log = open_log(config);
    let mut panel = make_panel(config, panel, seed, Some(log));
    for _ in 0..ticks {
        panel.tick();
    }
    let snap = panel.snapshot();
    panel.dispose();

    if json {
        match serde_json::to_string_pretty(&snap) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error serializing snapshot: {e}");
                std::process::exit(1);
            }
        }
        return;
    }
    print_table(&snap);
}

/// Human-readable snapshot: one line per channel, then composites.
pub fn print_table(snap: &PanelSnapshot) {
    println!("{} — {}", snap.title, snap.taken_at_iso);
    println!("  session {}", snap.session_id);
    println!();
    println!("  {:<26} {:>14} {:>7}  {:<6}", "Channel", "Value", "Fill", "Status");
    println!("  {}", "─".repeat(58));
    for (ch, d) in snap.channels.iter().zip(&snap.displays) {
        let lock = if ch.locked { " 🔒" } else { "" };
        println!(
            "  {:<26} {:>14} {:>6.1}%  {} {}{lock}",
            ch.label,
            format_reading(ch),
            d.percentage,
            tier_badge(d.tier),
            d.tier.label()
        );
    }
    if !snap.composites.is_empty() {
        println!();
        for c in &snap.composites {
            println!(
                "  {:<26} {:>14} {:>6.1}%  {} {}",
                c.label,
                "",
                c.percentage,
                tier_badge(c.tier),
                c.tier.label()
            );
        }
    }
}
