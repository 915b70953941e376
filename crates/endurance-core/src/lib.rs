//! # endurance-core
//!
//! **The bridge console of the Endurance, minus the pixels.**
//!
//! `endurance-core` is the panel engine behind the console: bounded telemetry
//! channels that drift on their own, operator controls that override them,
//! status tiers derived from thresholds, and an append-only mission log that
//! survives restarts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use endurance_core::{SystemClock, preset};
//!
//! let mut panel = preset("life_support", Arc::new(SystemClock), None, None).unwrap();
//!
//! // Operator override: emergency oxygen freezes the O2 reading
//! panel.toggle("emergency_o2", true).unwrap();
//!
//! // Drive time forward from any loop
//! panel.pump();
//!
//! let snap = panel.snapshot();
//! println!("O2 tier: {}", snap.display("oxygen").unwrap().tier);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Drift Scheduler → Channel ← Control Surface
//!                      ↓
//!              Derived Display → Snapshot
//! ```
//!
//! Channels own all state. Controls write through the same clamped
//! [`Channel::write`] path the scheduler uses, and displays are recomputed
//! from channel values on every read. The [`LogStore`] is the only piece
//! shared across panels.

pub mod channel;
pub mod clock;
pub mod config;
pub mod control;
pub mod display;
pub mod drift;
pub mod error;
pub mod logbook;
pub mod panel;
pub mod presets;
pub mod storage;

pub use channel::Channel;
pub use clock::{Clock, ManualClock, SystemClock, format_iso8601, format_log_date, format_time_of_day};
pub use config::EngineConfig;
pub use control::{ControlBinding, ControlEffect, ControlKind, ControlReading, ControlSurface};
pub use display::{CompositeDisplay, DerivedDisplay, Thresholds, Tier};
pub use drift::DriftScheduler;
pub use error::EngineError;
pub use logbook::{AppendReceipt, CREW, LogEntry, LogStore, SharedLogStore, is_crew};
pub use panel::{ChannelReading, Panel, PanelBuilder, PanelSnapshot, PumpReport};
pub use presets::{PRESET_NAMES, preset};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
