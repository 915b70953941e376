//! `endurance watch`: stream panel readings until Ctrl+C.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use endurance_core::{EngineConfig, format_time_of_day};

use super::{format_reading, make_panel, parse_duration};

pub fn run(config: &EngineConfig, panel: &str, interval: &str, seed: Option<u64>) {
    let interval = match parse_duration(interval) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let mut panel = make_panel(config, panel, seed, None);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Error setting Ctrl+C handler: {e}");
        std::process::exit(1);
    }

    println!("Watching {} ({})", panel.title(), panel.name());
    println!("  Interval:  {}ms", interval.as_millis());
    println!("  Session:   {}", panel.session_id());
    println!("  Stop with Ctrl+C");
    println!();

    let ids: Vec<String> = panel
        .channels()
        .iter()
        .filter(|c| c.drift_amplitude() > 0.0)
        .map(|c| c.id().to_string())
        .collect();

    let mut lines = 0u64;
    while running.load(Ordering::SeqCst) {
        let report = panel.pump();
        for id in &report.resets {
            println!("  ↺ {id} reset");
        }

        let snap = panel.snapshot();
        let cells: Vec<String> = ids
            .iter()
            .filter_map(|id| snap.channel(id))
            .map(|ch| format!("{}={}", ch.id, format_reading(ch)))
            .collect();
        println!("{}  {}", format_time_of_day(snap.taken_at), cells.join("  "));
        let _ = std::io::stdout().flush();
        lines += 1;

        let deadline = Instant::now() + interval;
        while Instant::now() < deadline && running.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    panel.dispose();
    println!();
    println!("Stopped after {lines} readings.");
}
