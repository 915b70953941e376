use endurance_core::{EngineConfig, PRESET_NAMES};

pub fn run(config: &EngineConfig, host: &str, port: u16) {
    let base = format!("http://{host}:{port}");

    println!("🛰  Endurance Server v{}", endurance_core::VERSION);
    println!("   {base}");
    println!("   Panels: {}", PRESET_NAMES.join(", "));
    println!("   Mission log: {}", config.data_dir.join(format!("{}.json", config.log_key)).display());
    println!();
    println!("   Endpoints:");
    println!("     GET  /                                      API index");
    println!("     GET  /panels                                Panel list");
    println!("     GET  /panels/{{panel}}                        Live snapshot");
    println!("     POST /panels/{{panel}}/controls/{{id}}/write    {{\"value\": 42.0}}");
    println!("     POST /panels/{{panel}}/controls/{{id}}/toggle   {{\"on\": true}}");
    println!("     POST /panels/{{panel}}/controls/{{id}}/activate");
    println!("     GET  /log                                   Mission log");
    println!("     POST /log                                   {{\"author\": \"TARS\", \"content\": \"...\"}}");
    println!();
    println!("   Examples:");
    println!("     curl {base}/panels/life_support");
    println!("     curl -X POST {base}/panels/navigation/controls/ignition/toggle -H 'content-type: application/json' -d '{{\"on\":true}}'");
    println!();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(endurance_server::run_server(config.clone(), host, port)) {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
