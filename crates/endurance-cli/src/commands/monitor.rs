use endurance_core::EngineConfig;

pub fn run(config: &EngineConfig, panel: &str, refresh: f64) {
    let log = super::open_log(config);
    let mut app = match crate::tui::app::App::new(config, panel, refresh, log) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = app.run() {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}
