//! Bounded scalar telemetry channel.
//!
//! A [`Channel`] owns one instrument reading and the policy for how it
//! drifts on its own. Every write, manual or autonomous, is clamped to the
//! channel's inclusive `[min, max]` range, so the value can never be observed
//! out of bounds.

use rand::Rng;

use crate::error::EngineError;

/// A single scalar telemetry value with bounds and a drift policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    id: String,
    label: String,
    value: f64,
    min: f64,
    max: f64,
    drift_amplitude: f64,
    drift_scale: f64,
    /// Narrower range autonomous drift is confined to, if any.
    drift_band: Option<(f64, f64)>,
    unit: String,
    locked: bool,
}

impl Channel {
    /// Create a channel seeded with `initial`.
    ///
    /// Fails with [`EngineError::InvalidRange`] if `min > max`, `initial`
    /// falls outside `[min, max]`, any number is non-finite, or the drift
    /// amplitude is negative.
    pub fn new(
        id: impl Into<String>,
        initial: f64,
        min: f64,
        max: f64,
        drift_amplitude: f64,
        unit: impl Into<String>,
    ) -> Result<Self, EngineError> {
        let id = id.into();
        let invalid = |detail: String| EngineError::InvalidRange {
            channel: id.clone(),
            detail,
        };

        if !min.is_finite() || !max.is_finite() || !initial.is_finite() {
            return Err(invalid(format!(
                "non-finite bounds or seed (min={min}, max={max}, initial={initial})"
            )));
        }
        if min > max {
            return Err(invalid(format!("min {min} exceeds max {max}")));
        }
        if initial < min || initial > max {
            return Err(invalid(format!(
                "initial {initial} outside [{min}, {max}]"
            )));
        }
        if !drift_amplitude.is_finite() || drift_amplitude < 0.0 {
            return Err(invalid(format!(
                "drift amplitude must be a non-negative number, got {drift_amplitude}"
            )));
        }

        Ok(Self {
            label: id.clone(),
            id,
            value: initial,
            min,
            max,
            drift_amplitude,
            drift_scale: 1.0,
            drift_band: None,
            unit: unit.into(),
            locked: false,
        })
    }

    /// A 0/1 flag channel backing a toggle or momentary control. Flags never drift.
    pub fn flag(id: impl Into<String>, on: bool) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            value: if on { 1.0 } else { 0.0 },
            min: 0.0,
            max: 1.0,
            drift_amplitude: 0.0,
            drift_scale: 1.0,
            drift_band: None,
            unit: String::new(),
            locked: false,
        }
    }

    /// Human-readable name for displays.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Confine autonomous drift to `[low, high]`, a sub-range of the bounds.
    ///
    /// Manual writes may still reach the full `[min, max]`; the next drift
    /// step pulls such a value back into the band.
    pub fn with_drift_band(mut self, low: f64, high: f64) -> Result<Self, EngineError> {
        let inside = low.is_finite()
            && high.is_finite()
            && self.min <= low
            && low <= high
            && high <= self.max;
        if !inside {
            return Err(EngineError::InvalidRange {
                channel: self.id.clone(),
                detail: format!(
                    "drift band [{low}, {high}] not within [{}, {}]",
                    self.min, self.max
                ),
            });
        }
        self.drift_band = Some((low, high));
        Ok(self)
    }

    /// Store `value`, clamped to `[min, max]`. Always succeeds.
    ///
    /// Infinities clamp to the nearest bound; NaN is absorbed and leaves the
    /// stored value untouched.
    pub fn write(&mut self, value: f64) {
        if value.is_nan() {
            log::debug!("channel {}: ignoring NaN write", self.id);
            return;
        }
        self.value = value.clamp(self.min, self.max);
    }

    /// Apply one autonomous perturbation of at most `drift_amplitude * drift_scale`.
    ///
    /// Returns `false` (and leaves the value alone) when the channel is locked
    /// or has no drift amplitude.
    ///
    /// # Panics
    ///
    /// If the channel already violates its own bounds. That can only happen
    /// through a bug in this module and must not be silently repaired.
    pub fn drift<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        assert!(
            self.min <= self.value && self.value <= self.max,
            "channel `{}` out of bounds before drift: {} not in [{}, {}]",
            self.id,
            self.value,
            self.min,
            self.max
        );
        let amplitude = self.drift_amplitude * self.drift_scale;
        if self.locked || amplitude <= 0.0 {
            return false;
        }
        let delta = rng.random_range(-1.0..=1.0) * amplitude;
        let next = match self.drift_band {
            Some((low, high)) => (self.value + delta).clamp(low, high),
            None => self.value + delta,
        };
        self.write(next);
        true
    }

    /// Set or clear the manual-control flag. Locked channels ignore drift.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Multiply the drift amplitude (1.0 restores the base policy).
    pub fn set_drift_scale(&mut self, scale: f64) {
        if scale.is_finite() && scale >= 0.0 {
            self.drift_scale = scale;
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn label(&self) -> &str {
        &self.label
    }
    pub fn value(&self) -> f64 {
        self.value
    }
    pub fn min(&self) -> f64 {
        self.min
    }
    pub fn max(&self) -> f64 {
        self.max
    }
    pub fn drift_amplitude(&self) -> f64 {
        self.drift_amplitude
    }
    pub fn drift_scale(&self) -> f64 {
        self.drift_scale
    }
    pub fn drift_band(&self) -> Option<(f64, f64)> {
        self.drift_band
    }
    pub fn unit(&self) -> &str {
        &self.unit
    }
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Flag reading: anything above the midpoint counts as on.
    pub fn is_on(&self) -> bool {
        self.value > (self.min + self.max) / 2.0
    }
}
