//! Panel aggregator: one page's channels, controls, thresholds and log view
//! sharing a single lifecycle.
//!
//! A panel never runs its own timer. Callers drive it with [`Panel::tick`]
//! (one immediate drift pass) or [`Panel::pump`] (everything that became due
//! on the injected clock), so the TUI event loop, the HTTP server's interval
//! task and tests all share the same code path.
//!
//! After [`Panel::dispose`] every mutating entry point is a silent no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::channel::Channel;
use crate::clock::{Clock, format_iso8601};
use crate::control::{ControlBinding, ControlReading, ControlSurface};
use crate::display::{self, CompositeDisplay, DerivedDisplay, Thresholds};
use crate::drift::DriftScheduler;
use crate::error::EngineError;
use crate::logbook::{AppendReceipt, LogEntry, SharedLogStore};

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Channel state as exposed to presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelReading {
    pub id: String,
    pub label: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub unit: String,
    pub locked: bool,
    pub drift_scale: f64,
}

impl From<&Channel> for ChannelReading {
    fn from(ch: &Channel) -> Self {
        Self {
            id: ch.id().to_string(),
            label: ch.label().to_string(),
            value: ch.value(),
            min: ch.min(),
            max: ch.max(),
            unit: ch.unit().to_string(),
            locked: ch.is_locked(),
            drift_scale: ch.drift_scale(),
        }
    }
}

/// Immutable view of a panel at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelSnapshot {
    pub panel: String,
    pub title: String,
    pub session_id: String,
    /// Unix ms.
    pub taken_at: u64,
    pub taken_at_iso: String,
    pub disposed: bool,
    pub channels: Vec<ChannelReading>,
    pub displays: Vec<DerivedDisplay>,
    pub composites: Vec<CompositeDisplay>,
    pub controls: Vec<ControlReading>,
    pub log: Vec<LogEntry>,
}

impl PanelSnapshot {
    pub fn channel(&self, id: &str) -> Option<&ChannelReading> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn display(&self, id: &str) -> Option<&DerivedDisplay> {
        self.displays.iter().find(|d| d.channel == id)
    }

    pub fn control(&self, id: &str) -> Option<&ControlReading> {
        self.controls.iter().find(|c| c.id == id)
    }
}

/// What one [`Panel::pump`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// Momentary controls that reset.
    pub resets: Vec<String>,
    /// Drift steps applied across all channels.
    pub drift_steps: usize,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CompositeDef {
    id: String,
    label: String,
    members: Vec<String>,
}

/// Assembles a [`Panel`]; every cross-reference is checked in [`Self::build`].
pub struct PanelBuilder {
    name: String,
    title: String,
    clock: Arc<dyn Clock>,
    seed: Option<u64>,
    default_interval: Option<Duration>,
    channels: Vec<Channel>,
    intervals: Vec<(String, Duration)>,
    thresholds: Vec<(String, Thresholds)>,
    controls: Vec<ControlBinding>,
    composites: Vec<CompositeDef>,
    log: Option<SharedLogStore>,
}

impl PanelBuilder {
    pub fn new(name: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.to_string(),
            title: name.to_string(),
            clock,
            seed: None,
            default_interval: None,
            channels: Vec::new(),
            intervals: Vec::new(),
            thresholds: Vec::new(),
            controls: Vec::new(),
            composites: Vec::new(),
            log: None,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Deterministic drift. Without a seed the OS seeds the generator.
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Cadence for channels without their own interval.
    pub fn default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = Some(interval);
        self
    }

    pub fn channel(mut self, channel: Channel) -> Self {
        self.channels.push(channel);
        self
    }

    /// Give `channel` its own drift cadence.
    pub fn interval(mut self, channel: &str, interval: Duration) -> Self {
        self.intervals.push((channel.to_string(), interval));
        self
    }

    pub fn thresholds(mut self, channel: &str, thresholds: Thresholds) -> Self {
        self.thresholds.push((channel.to_string(), thresholds));
        self
    }

    pub fn control(mut self, binding: ControlBinding) -> Self {
        self.controls.push(binding);
        self
    }

    pub fn composite(mut self, id: &str, label: &str, members: &[&str]) -> Self {
        self.composites.push(CompositeDef {
            id: id.to_string(),
            label: label.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        });
        self
    }

    pub fn log(mut self, log: SharedLogStore) -> Self {
        self.log = Some(log);
        self
    }

    pub fn build(self) -> Result<Panel, EngineError> {
        let name = self.name;
        let unknown = |channel: &str| EngineError::UnknownChannel {
            panel: name.clone(),
            channel: channel.to_string(),
        };

        let mut seen = std::collections::HashSet::new();
        for ch in &self.channels {
            if !seen.insert(ch.id().to_string()) {
                return Err(EngineError::DuplicateId {
                    panel: name.clone(),
                    id: ch.id().to_string(),
                });
            }
        }
        let known = |id: &str| seen.contains(id);

        let referenced = self
            .intervals
            .iter()
            .map(|(id, _)| id)
            .chain(self.thresholds.iter().map(|(id, _)| id));
        for id in referenced {
            if !known(id.as_str()) {
                return Err(unknown(id.as_str()));
            }
        }
        for def in &self.composites {
            if let Some(missing) = def.members.iter().find(|m| !known(m.as_str())) {
                return Err(unknown(missing.as_str()));
            }
        }

        let mut controls = ControlSurface::new(&name);
        for binding in self.controls {
            if let Some(missing) = binding.referenced_channels().find(|c| !known(*c)) {
                return Err(unknown(missing));
            }
            controls.add(binding)?;
        }

        let mut drift = match self.seed {
            Some(seed) => DriftScheduler::seeded(seed),
            None => DriftScheduler::from_os(),
        };
        if let Some(d) = self.default_interval {
            drift.set_default_interval(d);
        }
        for (id, d) in &self.intervals {
            drift.set_interval(id, *d);
        }

        let mut channels = self.channels;
        controls.apply_initial_effects(&mut channels);
        drift.start(&channels, self.clock.now_ms());

        let session_id = Uuid::new_v4();
        log::debug!(
            "panel {name}: session {session_id} with {} channels, {} controls",
            channels.len(),
            controls.bindings().len()
        );

        Ok(Panel {
            title: self.title,
            session_id,
            clock: self.clock,
            channels,
            thresholds: self.thresholds.into_iter().collect(),
            composites: self.composites,
            controls,
            drift,
            log: self.log,
            disposed: false,
            name,
        })
    }
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// A live panel session.
pub struct Panel {
    name: String,
    title: String,
    session_id: Uuid,
    clock: Arc<dyn Clock>,
    channels: Vec<Channel>,
    thresholds: HashMap<String, Thresholds>,
    composites: Vec<CompositeDef>,
    controls: ControlSurface,
    drift: DriftScheduler,
    log: Option<SharedLogStore>,
    disposed: bool,
}

impl std::fmt::Debug for Panel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Panel")
            .field("name", &self.name)
            .field("session_id", &self.session_id)
            .field("channels", &self.channels.len())
            .field("controls", &self.controls.bindings().len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl Panel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, id: &str) -> Result<&Channel, EngineError> {
        self.channels
            .iter()
            .find(|c| c.id() == id)
            .ok_or_else(|| EngineError::UnknownChannel {
                panel: self.name.clone(),
                channel: id.to_string(),
            })
    }

    pub fn bindings(&self) -> &[ControlBinding] {
        self.controls.bindings()
    }

    pub fn log_store(&self) -> Option<&SharedLogStore> {
        self.log.as_ref()
    }

    /// Tier and fill of one channel, recomputed now.
    pub fn display(&self, channel: &str) -> Result<DerivedDisplay, EngineError> {
        let ch = self.channel(channel)?;
        Ok(display::resolve(ch, self.thresholds_for(channel)))
    }

    /// One immediate drift pass over every unlocked channel.
    pub fn tick(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        self.drift.tick(&mut self.channels)
    }

    /// Run everything due on the clock: momentary resets first, then drift.
    pub fn pump(&mut self) -> PumpReport {
        if self.disposed {
            return PumpReport::default();
        }
        let now = self.clock.now_ms();
        let resets = self.controls.expire(&mut self.channels, now);
        let drift_steps = self.drift.run_due(&mut self.channels, now);
        for id in &resets {
            log::debug!("panel {}: {id} reset", self.name);
        }
        PumpReport {
            resets,
            drift_steps,
        }
    }

    /// Earliest time (unix ms) at which [`Self::pump`] has work to do.
    pub fn next_wakeup(&self) -> Option<u64> {
        if self.disposed {
            return None;
        }
        match (self.drift.next_due(), self.controls.next_reset()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Slider write. Returns the stored (clamped) value.
    pub fn write(&mut self, control: &str, value: f64) -> Result<Option<f64>, EngineError> {
        if self.disposed {
            return Ok(None);
        }
        self.controls
            .on_change(&mut self.channels, control, value)
            .map(Some)
    }

    /// Operator grabbed a slider: its channel stops drifting.
    pub fn hold(&mut self, control: &str) -> Result<(), EngineError> {
        if self.disposed {
            return Ok(());
        }
        self.controls.hold(&mut self.channels, control)
    }

    pub fn release(&mut self, control: &str) -> Result<(), EngineError> {
        if self.disposed {
            return Ok(());
        }
        self.controls.release(&mut self.channels, control)
    }

    pub fn toggle(&mut self, control: &str, on: bool) -> Result<(), EngineError> {
        if self.disposed {
            return Ok(());
        }
        self.controls.on_toggle(&mut self.channels, control, on)?;
        log::debug!("panel {}: {control} -> {}", self.name, if on { "on" } else { "off" });
        Ok(())
    }

    /// Press a momentary control. `Ok(false)` if it was already active or
    /// the panel is disposed.
    pub fn activate(&mut self, control: &str) -> Result<bool, EngineError> {
        if self.disposed {
            return Ok(false);
        }
        let now = self.clock.now_ms();
        self.controls.on_activate(&mut self.channels, control, now)
    }

    /// Append to the shared mission log. `Ok(None)` when the panel is
    /// disposed or has no log attached.
    pub fn append(&mut self, author: &str, content: &str) -> Result<Option<AppendReceipt>, EngineError> {
        if self.disposed {
            return Ok(None);
        }
        let Some(log) = &self.log else {
            log::debug!("panel {}: no mission log attached", self.name);
            return Ok(None);
        };
        let mut store = log.lock().unwrap_or_else(|p| p.into_inner());
        store.append(author, content).map(Some)
    }

    /// Read-only view of the whole panel. Allowed after disposal.
    pub fn snapshot(&self) -> PanelSnapshot {
        let taken_at = self.clock.now_ms();
        let displays: Vec<DerivedDisplay> = self
            .channels
            .iter()
            .map(|ch| display::resolve(ch, self.thresholds_for(ch.id())))
            .collect();
        let composites = self
            .composites
            .iter()
            .map(|def| {
                let members: Vec<&DerivedDisplay> = def
                    .members
                    .iter()
                    .filter_map(|m| displays.iter().find(|d| &d.channel == m))
                    .collect();
                display::combine(&def.id, &def.label, &members)
            })
            .collect();
        let log = self
            .log
            .as_ref()
            .map(|l| l.lock().unwrap_or_else(|p| p.into_inner()).entries().to_vec())
            .unwrap_or_default();

        PanelSnapshot {
            panel: self.name.clone(),
            title: self.title.clone(),
            session_id: self.session_id.to_string(),
            taken_at,
            taken_at_iso: format_iso8601(taken_at),
            disposed: self.disposed,
            channels: self.channels.iter().map(ChannelReading::from).collect(),
            displays,
            composites,
            controls: self.controls.readings(&self.channels),
            log,
        }
    }

    /// Tear down: cancel drift and pending resets. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.drift.stop();
        self.controls.cancel_all();
        log::debug!("panel {}: disposed session {}", self.name, self.session_id);
    }

    fn thresholds_for(&self, channel: &str) -> &Thresholds {
        const NONE: Thresholds = Thresholds::none();
        self.thresholds.get(channel).unwrap_or(&NONE)
    }
}

impl Drop for Panel {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::display::Tier;
    use crate::logbook::LogStore;
    use crate::storage::MemoryStorage;

    fn clock() -> ManualClock {
        ManualClock::new(1_000_000)
    }

    fn oxygen_panel(clock: &ManualClock) -> Panel {
        PanelBuilder::new("life_support", Arc::new(clock.clone()))
            .seed(Some(11))
            .channel(Channel::new("oxygen", 95.0, 90.0, 100.0, 5.0, "%").unwrap())
            .channel(Channel::flag("diagnostic", false))
            .channel(Channel::flag("emergency_o2", false))
            .interval("oxygen", Duration::from_secs(5))
            .thresholds("oxygen", Thresholds::warn_below(92.0))
            .control(ControlBinding::slider("oxygen_level", "Oxygen", "oxygen"))
            .control(ControlBinding::toggle("emergency", "Emergency O2", "emergency_o2").locks(&["oxygen"]))
            .control(ControlBinding::momentary(
                "diag",
                "Diagnostic",
                "diagnostic",
                Duration::from_secs(3),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn build_rejects_duplicate_channels() {
        let err = PanelBuilder::new("p", Arc::new(clock()))
            .channel(Channel::flag("a", false))
            .channel(Channel::flag("a", true))
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateId { .. }));
    }

    #[test]
    fn build_rejects_dangling_references() {
        let err = PanelBuilder::new("p", Arc::new(clock()))
            .channel(Channel::flag("a", false))
            .control(ControlBinding::toggle("t", "T", "a").locks(&["ghost"]))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::UnknownChannel {
                panel: "p".into(),
                channel: "ghost".into()
            }
        );

        let err = PanelBuilder::new("p", Arc::new(clock()))
            .thresholds("ghost", Thresholds::none())
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownChannel { .. }));

        let err = PanelBuilder::new("p", Arc::new(clock()))
            .composite("all", "All", &["ghost"])
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownChannel { .. }));
    }

    #[test]
    fn pump_follows_cadence() {
        let c = clock();
        let mut p = oxygen_panel(&c);
        c.advance(Duration::from_millis(4_999));
        assert_eq!(p.pump().drift_steps, 0);
        c.advance(Duration::from_millis(1));
        assert_eq!(p.pump().drift_steps, 1);
        c.advance(Duration::from_secs(15));
        assert_eq!(p.pump().drift_steps, 3);
    }

    #[test]
    fn write_returns_stored_value() {
        let c = clock();
        let mut p = oxygen_panel(&c);
        assert_eq!(p.write("oxygen_level", 91.0).unwrap(), Some(91.0));
        assert_eq!(p.display("oxygen").unwrap().tier, Tier::Warning);
        assert_eq!(p.write("oxygen_level", 150.0).unwrap(), Some(100.0));
    }

    #[test]
    fn momentary_resets_on_pump() {
        let c = clock();
        let mut p = oxygen_panel(&c);
        assert!(p.activate("diag").unwrap());
        assert!(p.snapshot().control("diag").unwrap().active);
        c.advance(Duration::from_secs(3));
        let report = p.pump();
        assert_eq!(report.resets, vec!["diag".to_string()]);
        assert!(!p.channel("diagnostic").unwrap().is_on());
    }

    #[test]
    fn next_wakeup_sees_resets() {
        let c = clock();
        let mut p = oxygen_panel(&c);
        // flags never drift, so only oxygen is scheduled
        assert_eq!(p.next_wakeup(), Some(1_005_000));
        p.activate("diag").unwrap();
        assert_eq!(p.next_wakeup(), Some(1_003_000));
    }

    #[test]
    fn snapshot_contains_everything() {
        let c = clock();
        let log = LogStore::open(
            Box::new(MemoryStorage::new()),
            Arc::new(c.clone()),
            "mission_logs",
        )
        .into_shared();
        let p = PanelBuilder::new("ship", Arc::new(c.clone()))
            .title("Ship")
            .channel(Channel::new("a", 100.0, 0.0, 100.0, 0.0, "%").unwrap())
            .channel(Channel::new("b", 40.0, 0.0, 100.0, 0.0, "%").unwrap())
            .thresholds("b", Thresholds::warn_below(80.0).with_critical_below(50.0))
            .composite("overall", "Overall", &["a", "b"])
            .log(log)
            .build()
            .unwrap();
        let s = p.snapshot();
        assert_eq!(s.panel, "ship");
        assert_eq!(s.channels.len(), 2);
        assert_eq!(s.display("b").unwrap().tier, Tier::Critical);
        assert_eq!(s.composites[0].tier, Tier::Critical);
        assert_eq!(s.composites[0].percentage, 70.0);
        assert_eq!(s.log.len(), 1);
        assert_eq!(s.taken_at, 1_000_000);
        assert!(Uuid::parse_str(&s.session_id).is_ok());
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let c = clock();
        assert_ne!(oxygen_panel(&c).session_id(), oxygen_panel(&c).session_id());
    }

    #[test]
    fn disposed_panel_ignores_everything() {
        let c = clock();
        let mut p = oxygen_panel(&c);
        p.activate("diag").unwrap();
        p.dispose();
        let before = p.snapshot();

        c.advance(Duration::from_secs(600));
        assert_eq!(p.pump(), PumpReport::default());
        assert_eq!(p.tick(), 0);
        assert_eq!(p.write("oxygen_level", 90.0).unwrap(), None);
        assert!(!p.activate("diag").unwrap());
        p.toggle("emergency", true).unwrap();
        assert_eq!(p.append("Купър", "late").unwrap(), None);
        assert_eq!(p.next_wakeup(), None);

        let after = p.snapshot();
        assert!(after.disposed);
        assert_eq!(before.channels, after.channels);
    }

    #[test]
    fn append_without_log_is_a_noop() {
        let c = clock();
        let mut p = oxygen_panel(&c);
        assert_eq!(p.append("Купър", "hello").unwrap(), None);
    }
}
