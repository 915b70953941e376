//! Built-in bridge panels.
//!
//! Each preset returns a [`PanelBuilder`] so callers can still attach a seed,
//! a log store, or a different default cadence before building.

use std::sync::Arc;
use std::time::Duration;

use crate::channel::Channel;
use crate::clock::Clock;
use crate::control::ControlBinding;
use crate::display::Thresholds;
use crate::error::EngineError;
use crate::logbook::SharedLogStore;
use crate::panel::{Panel, PanelBuilder};

pub const LIFE_SUPPORT: &str = "life_support";
pub const NAVIGATION: &str = "navigation";
pub const COMMUNICATIONS: &str = "communications";
pub const SHIP_STATUS: &str = "ship_status";

/// Every preset name, in console tab order.
pub const PRESET_NAMES: [&str; 4] = [SHIP_STATUS, LIFE_SUPPORT, NAVIGATION, COMMUNICATIONS];

/// Build the named preset with an optional drift seed and shared log.
pub fn preset(
    name: &str,
    clock: Arc<dyn Clock>,
    seed: Option<u64>,
    log: Option<SharedLogStore>,
) -> Result<Panel, EngineError> {
    let mut builder = builder(name, clock)?.seed(seed);
    if let Some(log) = log {
        builder = builder.log(log);
    }
    builder.build()
}

/// Unbuilt preset, for callers that want to customize it further.
pub fn builder(name: &str, clock: Arc<dyn Clock>) -> Result<PanelBuilder, EngineError> {
    match name {
        LIFE_SUPPORT => life_support(clock),
        NAVIGATION => navigation(clock),
        COMMUNICATIONS => communications(clock),
        SHIP_STATUS => ship_status(clock),
        other => Err(EngineError::UnknownPanel {
            panel: other.to_string(),
        }),
    }
}

/// Atmosphere: oxygen, temperature, humidity, gas composition.
pub fn life_support(clock: Arc<dyn Clock>) -> Result<PanelBuilder, EngineError> {
    let every_5s = Duration::from_secs(5);
    let gas = |id: &str, label: &str, v: f64| -> Result<Channel, EngineError> {
        Ok(Channel::new(id, v, 0.0, 100.0, 0.0, "%")?.with_label(label))
    };

    Ok(PanelBuilder::new(LIFE_SUPPORT, clock)
        .title("ЖИЗНЕНА ПОДДРЪЖКА")
        .channel(Channel::new("oxygen", 95.0, 90.0, 100.0, 0.05, "%")?.with_label("НИВО НА КИСЛОРОД"))
        .channel(
            Channel::new("temperature", 21.0, 15.0, 30.0, 0.025, "°C")?
                .with_drift_band(18.0, 24.0)?
                .with_label("ТЕМПЕРАТУРА СЕКТОР"),
        )
        .channel(Channel::new("humidity", 45.0, 0.0, 100.0, 0.0, "%")?.with_label("ВЛАЖНОСТ"))
        .channel(Channel::flag("scrubber", true).with_label("CO2 СКРУБЕР"))
        .channel(Channel::flag("ventilation", true).with_label("ВЕНТИЛАЦИЯ"))
        .channel(Channel::flag("emergency_o2", false).with_label("АВАРИЕН РЕЖИМ"))
        .channel(Channel::flag("diagnostic", false).with_label("ПЪЛНА ДИАГНОСТИКА"))
        .channel(gas("gas_n2", "N2", 78.0)?)
        .channel(gas("gas_o2", "O2", 21.0)?)
        .channel(gas("gas_co2", "CO2", 15.0)?)
        .channel(gas("gas_other", "OTH", 8.0)?)
        .interval("oxygen", every_5s)
        .interval("temperature", every_5s)
        .thresholds("oxygen", Thresholds::warn_below(92.0))
        .thresholds(
            "temperature",
            Thresholds::warn_below(18.0).with_warning_above(24.0),
        )
        .control(ControlBinding::slider("oxygen", "КИСЛОРОД", "oxygen"))
        .control(ControlBinding::slider("temperature", "ТЕМПЕРАТУРА", "temperature"))
        .control(ControlBinding::slider("humidity", "ВЛАЖНОСТ", "humidity"))
        .control(ControlBinding::toggle("scrubber", "CO2 СКРУБЕР", "scrubber"))
        .control(ControlBinding::toggle("ventilation", "ВЕНТИЛАЦИЯ", "ventilation"))
        .control(
            ControlBinding::toggle("emergency_o2", "АВАРИЕН РЕЖИМ", "emergency_o2")
                .locks(&["oxygen"]),
        )
        .control(ControlBinding::momentary(
            "full_diagnostic",
            "ПЪЛНА ДИАГНОСТИКА",
            "diagnostic",
            Duration::from_secs(3),
        ))
        .composite(
            "atmosphere",
            "АТМОСФЕРА",
            &["oxygen", "temperature", "humidity"],
        ))
}

/// Position readout and propulsion.
pub fn navigation(clock: Arc<dyn Clock>) -> Result<PanelBuilder, EngineError> {
    const SPACE: f64 = 1_000_000.0;
    let coord = |id: &str, v: f64| -> Result<Channel, EngineError> {
        Ok(Channel::new(id, v, -SPACE, SPACE, 0.025, "")?.with_label(id.to_uppercase()))
    };

    Ok(PanelBuilder::new(NAVIGATION, clock)
        .title("НАВИГАЦИОННА СИСТЕМА")
        .default_interval(Duration::from_secs(1))
        .channel(coord("x", 1247.89)?)
        .channel(coord("y", -3456.12)?)
        .channel(coord("z", 8901.34)?)
        .channel(
            Channel::new("thrust", 45.0, 0.0, 100.0, 0.0, "%")?
                .with_label("МОЩНОСТ НА ДВИГАТЕЛИТЕ"),
        )
        .channel(Channel::flag("stabilization", true).with_label("АВТО-СТАБИЛИЗАЦИЯ"))
        .channel(Channel::flag("ignition", false).with_label("ДВИГАТЕЛИ"))
        .channel(Channel::flag("trajectory", false).with_label("ИЗЧИСЛИ ТРАЕКТОРИЯ"))
        .control(ControlBinding::slider("thrust", "МОЩНОСТ НА ДВИГАТЕЛИТЕ", "thrust"))
        .control(ControlBinding::toggle(
            "stabilization",
            "АВТО-СТАБИЛИЗАЦИЯ",
            "stabilization",
        ))
        .control(
            ControlBinding::toggle("ignition", "АКТИВИРАЙ ДВИГАТЕЛИ", "ignition")
                .locks(&["thrust"])
                .boosts(&["x", "y", "z"], 10.0),
        )
        .control(ControlBinding::momentary(
            "compute_trajectory",
            "ИЗЧИСЛИ ТРАЕКТОРИЯ",
            "trajectory",
            Duration::from_secs(2),
        )))
}

/// Deep-space link: signal, frequency, channel activity.
pub fn communications(clock: Arc<dyn Clock>) -> Result<PanelBuilder, EngineError> {
    let activity = |id: &str, v: f64, lo: f64, hi: f64, amp: f64| -> Result<Channel, EngineError> {
        Ok(Channel::new(id, v, lo, hi, amp, "%")?.with_label(id.to_uppercase()))
    };

    Ok(PanelBuilder::new(COMMUNICATIONS, clock)
        .title("КОМУНИКАЦИИ")
        .channel(
            Channel::new("signal", 78.0, 65.0, 85.0, 1.0, "%")?.with_label("СИЛА НА СИГНАЛА"),
        )
        .channel(
            Channel::new("frequency", 433.5, 400.0, 500.0, 0.0, "MHz")?
                .with_label("РЕДУНДАНТНА ЧЕСТОТА"),
        )
        .channel(Channel::flag("encryption", true).with_label("ШИФРОВАНЕ НА ВРЪЗКАТА"))
        .channel(Channel::flag("broadcasting", false).with_label("АКТИВНО ПРЕДАВАНЕ"))
        .channel(Channel::flag("transmit", false).with_label("ИЗПРАТИ СИГНАЛ"))
        .channel(activity("voice", 30.0, 10.0, 50.0, 5.0)?)
        .channel(activity("data", 70.0, 60.0, 80.0, 2.5)?)
        .channel(activity("ping", 20.0, 15.0, 25.0, 2.5)?)
        .interval("signal", Duration::from_secs(4))
        .thresholds("signal", Thresholds::warn_below(70.0))
        .control(ControlBinding::slider("frequency", "РЕДУНДАНТНА ЧЕСТОТА", "frequency"))
        .control(ControlBinding::slider("antenna_gain", "УСИЛВАНЕ НА АНТЕНАТА", "signal"))
        .control(ControlBinding::toggle(
            "encryption",
            "ШИФРОВАНЕ НА ВРЪЗКАТА",
            "encryption",
        ))
        .control(ControlBinding::toggle(
            "broadcasting",
            "АКТИВНО ПРЕДАВАНЕ",
            "broadcasting",
        ))
        .control(ControlBinding::momentary(
            "send_signal",
            "ИЗПРАТИ СИГНАЛ",
            "transmit",
            Duration::from_secs(3),
        )))
}

/// Ship-wide health overview.
pub fn ship_status(clock: Arc<dyn Clock>) -> Result<PanelBuilder, EngineError> {
    const SYSTEMS: [(&str, &str, f64); 6] = [
        ("propulsion", "Двигателна Система", 98.0),
        ("navigation", "Навигация", 100.0),
        ("life_support", "Жизнена Поддръжка", 95.0),
        ("communications", "Комуникации", 78.0),
        ("shields", "Защитни Щитове", 92.0),
        ("power", "Енергийна Система", 88.0),
    ];
    let health = Thresholds::warn_below(80.0).with_critical_below(50.0);

    let mut builder = PanelBuilder::new(SHIP_STATUS, clock).title("СТАТУС НА КОРАБА");
    for (id, label, value) in SYSTEMS {
        builder = builder
            .channel(Channel::new(id, value, 0.0, 100.0, 0.0, "%")?.with_label(label))
            .thresholds(id, health);
    }
    let members: Vec<&str> = SYSTEMS.iter().map(|(id, _, _)| *id).collect();
    Ok(builder.composite("overall", "ОБЩ СТАТУС", &members))
}
