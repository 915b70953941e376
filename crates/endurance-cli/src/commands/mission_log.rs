//! `endurance log`: read and append to the mission log.

use endurance_core::{CREW, EngineConfig, is_crew};

use super::open_log;

pub fn list(config: &EngineConfig, limit: Option<usize>, json: bool) {
    let log = open_log(config);
    let store = log.lock().unwrap_or_else(|p| p.into_inner());
    let entries = match limit {
        Some(n) => store.recent(n),
        None => store.entries(),
    };

    if json {
        match serde_json::to_string_pretty(entries) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error serializing log: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!(
        "Mission log ({} of {} entries, {})",
        entries.len(),
        store.len(),
        config.data_dir.join(format!("{}.json", store.key())).display()
    );
    println!();
    for e in entries {
        println!("  {}  {}  [{}]", e.date, e.author, e.id);
        for line in e.content.lines() {
            println!("      {line}");
        }
        println!();
    }
}

pub fn append(config: &EngineConfig, author: Option<&str>, content: &str) {
    let author = author.unwrap_or(config.default_author.as_str());
    if !is_crew(author) {
        eprintln!("Error: unknown crew member '{author}'");
        eprintln!("Crew: {}", CREW.join(", "));
        std::process::exit(1);
    }

    let log = open_log(config);
    let mut store = log.lock().unwrap_or_else(|p| p.into_inner());
    match store.append(author, content) {
        Ok(receipt) => {
            println!("Logged {} by {}", receipt.entry.id, receipt.entry.author);
            if let Some(e) = receipt.persistence {
                eprintln!("Warning: entry not saved to disk: {e}");
                std::process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
