//! Control surface: sliders, toggles and momentary buttons bound to channels.
//!
//! The channel is the single source of truth. A slider never stores a value
//! of its own; it writes through [`Channel::write`] and reads the channel
//! back. Toggle and momentary state lives in 0/1 flag channels.
//!
//! Controls may carry side effects while active:
//! - [`ControlEffect::Lock`] suppresses drift on related channels
//!   ("operator override", e.g. manual ignition holds thrust steady).
//! - [`ControlEffect::Boost`] multiplies drift on related channels
//!   (ignition makes the coordinate readout jitter ten times harder).
//!
//! Locks are tracked per holder, so a channel held by two controls stays
//! locked until both let go.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use serde::Serialize;

use crate::channel::Channel;
use crate::clock::millis;
use crate::error::EngineError;

/// What kind of input a control represents.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    /// Slider writing a continuous value.
    Continuous { channel: String },
    /// Latching on/off switch backed by a flag channel.
    Toggle { channel: String },
    /// Button that raises a flag and clears it after `duration`.
    Momentary { channel: String, duration: Duration },
}

impl ControlKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Continuous { .. } => "continuous",
            Self::Toggle { .. } => "toggle",
            Self::Momentary { .. } => "momentary",
        }
    }

    pub fn channel(&self) -> &str {
        match self {
            Self::Continuous { channel }
            | Self::Toggle { channel }
            | Self::Momentary { channel, .. } => channel,
        }
    }
}

/// Side effect applied while a toggle is on or a momentary is active.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEffect {
    Lock(Vec<String>),
    Boost { channels: Vec<String>, factor: f64 },
}

impl ControlEffect {
    fn channels(&self) -> &[String] {
        match self {
            Self::Lock(channels) | Self::Boost { channels, .. } => channels,
        }
    }
}

/// A typed connector between an input affordance and a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlBinding {
    pub id: String,
    pub label: String,
    pub kind: ControlKind,
    pub effects: Vec<ControlEffect>,
}

impl ControlBinding {
    pub fn slider(id: &str, label: &str, channel: &str) -> Self {
        Self::new(
            id,
            label,
            ControlKind::Continuous {
                channel: channel.to_string(),
            },
        )
    }

    pub fn toggle(id: &str, label: &str, flag_channel: &str) -> Self {
        Self::new(
            id,
            label,
            ControlKind::Toggle {
                channel: flag_channel.to_string(),
            },
        )
    }

    pub fn momentary(id: &str, label: &str, flag_channel: &str, duration: Duration) -> Self {
        Self::new(
            id,
            label,
            ControlKind::Momentary {
                channel: flag_channel.to_string(),
                duration,
            },
        )
    }

    fn new(id: &str, label: &str, kind: ControlKind) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind,
            effects: Vec::new(),
        }
    }

    /// Lock `channels` against drift while this control is active.
    pub fn locks(mut self, channels: &[&str]) -> Self {
        self.effects.push(ControlEffect::Lock(
            channels.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    /// Scale drift on `channels` by `factor` while this control is active.
    pub fn boosts(mut self, channels: &[&str], factor: f64) -> Self {
        self.effects.push(ControlEffect::Boost {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            factor,
        });
        self
    }

    /// Every channel this binding touches.
    pub fn referenced_channels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.kind.channel())
            .chain(self.effects.iter().flat_map(|e| e.channels().iter().map(String::as_str)))
    }
}

/// Control state as exposed in a panel snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlReading {
    pub id: String,
    pub label: String,
    pub kind: &'static str,
    pub channel: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub active: bool,
    pub held: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resets_at_ms: Option<u64>,
}

/// All bindings of one panel plus their runtime bookkeeping.
#[derive(Debug, Default)]
pub struct ControlSurface {
    panel: String,
    bindings: Vec<ControlBinding>,
    /// channel id -> controls currently locking it
    lock_holders: HashMap<String, BTreeSet<String>>,
    /// channel id -> control id -> drift factor
    boosts: HashMap<String, BTreeMap<String, f64>>,
    /// momentary control id -> reset deadline (unix ms)
    pending_resets: BTreeMap<String, u64>,
    cancelled: bool,
}

impl ControlSurface {
    pub fn new(panel: &str) -> Self {
        Self {
            panel: panel.to_string(),
            ..Default::default()
        }
    }

    /// Register a binding. Ids must be unique within the panel.
    pub fn add(&mut self, binding: ControlBinding) -> Result<(), EngineError> {
        if self.bindings.iter().any(|b| b.id == binding.id) {
            return Err(EngineError::DuplicateId {
                panel: self.panel.clone(),
                id: binding.id,
            });
        }
        self.bindings.push(binding);
        Ok(())
    }

    pub fn bindings(&self) -> &[ControlBinding] {
        &self.bindings
    }

    pub fn binding(&self, control: &str) -> Result<&ControlBinding, EngineError> {
        self.bindings
            .iter()
            .find(|b| b.id == control)
            .ok_or_else(|| EngineError::UnknownControl {
                panel: self.panel.clone(),
                control: control.to_string(),
            })
    }

    /// Re-apply the effects of every toggle that starts in the on position.
    pub fn apply_initial_effects(&mut self, channels: &mut [Channel]) {
        let active: Vec<ControlBinding> = self
            .bindings
            .iter()
            .filter(|b| {
                matches!(b.kind, ControlKind::Toggle { .. })
                    && find(channels, b.kind.channel()).is_some_and(Channel::is_on)
            })
            .cloned()
            .collect();
        for binding in &active {
            self.engage(channels, binding);
        }
    }

    /// Slider moved. Clamps defensively and overwrites the target channel;
    /// returns the value actually stored.
    pub fn on_change(
        &mut self,
        channels: &mut [Channel],
        control: &str,
        value: f64,
    ) -> Result<f64, EngineError> {
        let binding = self.expect_kind(control, "continuous")?;
        let target = binding.kind.channel().to_string();
        let ch = self.channel_mut(channels, &target)?;
        ch.write(value.clamp(ch.min(), ch.max()));
        Ok(ch.value())
    }

    /// Operator grabbed the slider: lock its channel until [`Self::release`].
    pub fn hold(&mut self, channels: &mut [Channel], control: &str) -> Result<(), EngineError> {
        let binding = self.expect_kind(control, "continuous")?;
        let target = binding.kind.channel().to_string();
        self.channel_mut(channels, &target)?;
        self.add_lock(channels, &target, control);
        Ok(())
    }

    /// Operator let go of the slider.
    pub fn release(&mut self, channels: &mut [Channel], control: &str) -> Result<(), EngineError> {
        let binding = self.expect_kind(control, "continuous")?;
        let target = binding.kind.channel().to_string();
        self.channel_mut(channels, &target)?;
        self.remove_lock(channels, &target, control);
        Ok(())
    }

    /// Flip a toggle to `on`, applying or reverting its effects.
    /// Returns the new state.
    pub fn on_toggle(
        &mut self,
        channels: &mut [Channel],
        control: &str,
        on: bool,
    ) -> Result<bool, EngineError> {
        let binding = self.expect_kind(control, "toggle")?.clone();
        let ch = self.channel_mut(channels, binding.kind.channel())?;
        let was_on = ch.is_on();
        ch.write(if on { ch.max() } else { ch.min() });

        if on && !was_on {
            self.engage(channels, &binding);
        } else if !on && was_on {
            self.disengage(channels, &binding);
        }
        Ok(on)
    }

    /// Press a momentary button. Returns `false` if it was already active,
    /// in which case nothing changes and no second reset is scheduled.
    pub fn on_activate(
        &mut self,
        channels: &mut [Channel],
        control: &str,
        now_ms: u64,
    ) -> Result<bool, EngineError> {
        let binding = self.expect_kind(control, "momentary")?.clone();
        let ControlKind::Momentary { channel, duration } = &binding.kind else {
            unreachable!("expect_kind checked the variant");
        };
        if self.cancelled || self.pending_resets.contains_key(control) {
            return Ok(false);
        }
        let ch = self.channel_mut(channels, channel)?;
        ch.write(ch.max());
        self.engage(channels, &binding);
        self.pending_resets
            .insert(control.to_string(), now_ms.saturating_add(millis(*duration)));
        Ok(true)
    }

    /// Clear every momentary whose deadline is `<= now_ms`.
    /// Returns the ids that were reset.
    pub fn expire(&mut self, channels: &mut [Channel], now_ms: u64) -> Vec<String> {
        let due: Vec<String> = self
            .pending_resets
            .iter()
            .filter(|&(_, &deadline)| deadline <= now_ms)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &due {
            self.pending_resets.remove(id);
            let Some(binding) = self.bindings.iter().find(|b| &b.id == id).cloned() else {
                continue;
            };
            if let Some(ch) = find_mut(channels, binding.kind.channel()) {
                ch.write(ch.min());
            }
            self.disengage(channels, &binding);
        }
        due
    }

    /// Earliest pending momentary reset.
    pub fn next_reset(&self) -> Option<u64> {
        self.pending_resets.values().copied().min()
    }

    pub fn pending_resets(&self) -> usize {
        self.pending_resets.len()
    }

    /// Drop every pending reset and refuse new activations.
    pub fn cancel_all(&mut self) {
        self.cancelled = true;
        self.pending_resets.clear();
    }

    /// Snapshot of every control against the current channel values.
    pub fn readings(&self, channels: &[Channel]) -> Vec<ControlReading> {
        self.bindings
            .iter()
            .filter_map(|b| {
                let ch = find(channels, b.kind.channel())?;
                let held = self
                    .lock_holders
                    .get(ch.id())
                    .is_some_and(|h| h.contains(&b.id));
                Some(ControlReading {
                    id: b.id.clone(),
                    label: b.label.clone(),
                    kind: b.kind.name(),
                    channel: ch.id().to_string(),
                    value: ch.value(),
                    min: ch.min(),
                    max: ch.max(),
                    active: match b.kind {
                        ControlKind::Continuous { .. } => held,
                        ControlKind::Toggle { .. } => ch.is_on(),
                        ControlKind::Momentary { .. } => self.pending_resets.contains_key(&b.id),
                    },
                    held,
                    resets_at_ms: self.pending_resets.get(&b.id).copied(),
                })
            })
            .collect()
    }

    // --- internals ---

    fn expect_kind(&self, control: &str, expected: &'static str) -> Result<&ControlBinding, EngineError> {
        let binding = self.binding(control)?;
        if binding.kind.name() != expected {
            return Err(EngineError::ControlKindMismatch {
                control: control.to_string(),
                expected,
                actual: binding.kind.name(),
            });
        }
        Ok(binding)
    }

    fn channel_mut<'a>(
        &self,
        channels: &'a mut [Channel],
        id: &str,
    ) -> Result<&'a mut Channel, EngineError> {
        find_mut(channels, id).ok_or_else(|| EngineError::UnknownChannel {
            panel: self.panel.clone(),
            channel: id.to_string(),
        })
    }

    fn engage(&mut self, channels: &mut [Channel], binding: &ControlBinding) {
        for effect in &binding.effects {
            match effect {
                ControlEffect::Lock(targets) => {
                    for t in targets {
                        self.add_lock(channels, t, &binding.id);
                    }
                }
                ControlEffect::Boost { channels: targets, factor } => {
                    for t in targets {
                        self.boosts
                            .entry(t.clone())
                            .or_default()
                            .insert(binding.id.clone(), *factor);
                        self.sync_scale(channels, t);
                    }
                }
            }
        }
    }

    fn disengage(&mut self, channels: &mut [Channel], binding: &ControlBinding) {
        for effect in &binding.effects {
            match effect {
                ControlEffect::Lock(targets) => {
                    for t in targets {
                        self.remove_lock(channels, t, &binding.id);
                    }
                }
                ControlEffect::Boost { channels: targets, .. } => {
                    for t in targets {
                        if let Some(b) = self.boosts.get_mut(t) {
                            b.remove(&binding.id);
                        }
                        self.sync_scale(channels, t);
                    }
                }
            }
        }
    }

    fn add_lock(&mut self, channels: &mut [Channel], channel: &str, holder: &str) {
        self.lock_holders
            .entry(channel.to_string())
            .or_default()
            .insert(holder.to_string());
        self.sync_lock(channels, channel);
    }

    fn remove_lock(&mut self, channels: &mut [Channel], channel: &str, holder: &str) {
        if let Some(h) = self.lock_holders.get_mut(channel) {
            h.remove(holder);
        }
        self.sync_lock(channels, channel);
    }

    fn sync_lock(&self, channels: &mut [Channel], channel: &str) {
        let locked = self
            .lock_holders
            .get(channel)
            .is_some_and(|h| !h.is_empty());
        if let Some(ch) = find_mut(channels, channel) {
            ch.set_locked(locked);
        }
    }

    fn sync_scale(&self, channels: &mut [Channel], channel: &str) {
        let scale = self
            .boosts
            .get(channel)
            .and_then(|b| b.values().copied().reduce(f64::max))
            .unwrap_or(1.0);
        if let Some(ch) = find_mut(channels, channel) {
            ch.set_drift_scale(scale);
        }
    }
}

fn find<'a>(channels: &'a [Channel], id: &str) -> Option<&'a Channel> {
    channels.iter().find(|c| c.id() == id)
}

fn find_mut<'a>(channels: &'a mut [Channel], id: &str) -> Option<&'a mut Channel> {
    channels.iter_mut().find(|c| c.id() == id)
}
