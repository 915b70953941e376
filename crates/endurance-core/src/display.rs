//! Derived display resolver: channel value → status tier + fill percentage.
//!
//! Everything here is a pure function of the channel's current value and
//! bounds, so it is recomputed on every read and never cached.

use serde::{Deserialize, Serialize};

use crate::channel::Channel;

/// Presentation tier of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Operational,
    Warning,
    Critical,
}

impl Tier {
    /// Status text shown on the bridge.
    pub fn label(self) -> &'static str {
        match self {
            Self::Operational => "ОПЕРАТИВЕН",
            Self::Warning => "ВНИМАНИЕ",
            Self::Critical => "КРИТИЧНО",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operational => write!(f, "operational"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Channel-specific tier thresholds.
///
/// Each bound is exclusive on the unhealthy side: a value exactly at
/// `warning_below` is still operational.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning_below: Option<f64>,
    pub critical_below: Option<f64>,
    pub warning_above: Option<f64>,
    pub critical_above: Option<f64>,
}

impl Thresholds {
    /// Never leaves `operational`.
    pub const fn none() -> Self {
        Self {
            warning_below: None,
            critical_below: None,
            warning_above: None,
            critical_above: None,
        }
    }

    pub const fn warn_below(limit: f64) -> Self {
        Self {
            warning_below: Some(limit),
            ..Self::none()
        }
    }

    pub const fn with_critical_below(mut self, limit: f64) -> Self {
        self.critical_below = Some(limit);
        self
    }

    pub const fn with_warning_above(mut self, limit: f64) -> Self {
        self.warning_above = Some(limit);
        self
    }

    pub const fn with_critical_above(mut self, limit: f64) -> Self {
        self.critical_above = Some(limit);
        self
    }

    /// Tier for a raw value. Critical bounds win over warning bounds.
    pub fn tier(&self, value: f64) -> Tier {
        let below = |limit: Option<f64>| limit.is_some_and(|l| value < l);
        let above = |limit: Option<f64>| limit.is_some_and(|l| value > l);

        if below(self.critical_below) || above(self.critical_above) {
            Tier::Critical
        } else if below(self.warning_below) || above(self.warning_above) {
            Tier::Warning
        } else {
            Tier::Operational
        }
    }
}

/// Resolved presentation state of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedDisplay {
    pub channel: String,
    pub tier: Tier,
    /// Gauge fill / equalizer height in `[0, 100]`.
    pub percentage: f64,
}

/// Position of `value` inside `[min, max]` as a percentage.
///
/// A degenerate range (`min == max`) reads as full.
pub fn percentage(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span <= 0.0 {
        return 100.0;
    }
    (100.0 * (value - min) / span).clamp(0.0, 100.0)
}

/// Map a channel to its tier and fill percentage.
pub fn resolve(channel: &Channel, thresholds: &Thresholds) -> DerivedDisplay {
    DerivedDisplay {
        channel: channel.id().to_string(),
        tier: thresholds.tier(channel.value()),
        percentage: percentage(channel.value(), channel.min(), channel.max()),
    }
}

/// Aggregate over several channels: the worst member tier and the mean fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeDisplay {
    pub id: String,
    pub label: String,
    pub members: Vec<String>,
    pub tier: Tier,
    pub percentage: f64,
}

/// Combine already-resolved member displays.
pub fn combine(id: &str, label: &str, members: &[&DerivedDisplay]) -> CompositeDisplay {
    let tier = members
        .iter()
        .map(|d| d.tier)
        .max()
        .unwrap_or(Tier::Operational);
    let percentage = if members.is_empty() {
        0.0
    } else {
        members.iter().map(|d| d.percentage).sum::<f64>() / members.len() as f64
    };
    CompositeDisplay {
        id: id.to_string(),
        label: label.to_string(),
        members: members.iter().map(|d| d.channel.clone()).collect(),
        tier,
        percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oxygen_boundary_is_inclusive_on_healthy_side() {
        let t = Thresholds::warn_below(92.0);
        assert_eq!(t.tier(91.999), Tier::Warning);
        assert_eq!(t.tier(92.0), Tier::Operational);
    }

    #[test]
    fn critical_beats_warning() {
        let t = Thresholds::warn_below(80.0).with_critical_below(50.0);
        assert_eq!(t.tier(49.0), Tier::Critical);
        assert_eq!(t.tier(50.0), Tier::Warning);
        assert_eq!(t.tier(80.0), Tier::Operational);
    }

    #[test]
    fn upper_bounds() {
        let t = Thresholds::none()
            .with_warning_above(24.0)
            .with_critical_above(28.0);
        assert_eq!(t.tier(24.0), Tier::Operational);
        assert_eq!(t.tier(24.1), Tier::Warning);
        assert_eq!(t.tier(28.5), Tier::Critical);
    }

    #[test]
    fn no_thresholds_is_always_operational() {
        assert_eq!(Thresholds::none().tier(-1e9), Tier::Operational);
    }

    #[test]
    fn percentage_maps_range() {
        assert_eq!(percentage(433.5, 400.0, 500.0), 33.5);
        assert_eq!(percentage(400.0, 400.0, 500.0), 0.0);
        assert_eq!(percentage(500.0, 400.0, 500.0), 100.0);
    }

    #[test]
    fn percentage_clamps_and_handles_degenerate_range() {
        assert_eq!(percentage(600.0, 400.0, 500.0), 100.0);
        assert_eq!(percentage(7.0, 7.0, 7.0), 100.0);
    }

    #[test]
    fn resolve_is_repeatable() {
        let ch = Channel::new("oxygen", 91.5, 90.0, 100.0, 0.05, "%").unwrap();
        let t = Thresholds::warn_below(92.0);
        let a = resolve(&ch, &t);
        let b = resolve(&ch, &t);
        assert_eq!(a, b);
        assert_eq!(a.tier, Tier::Warning);
        assert!((a.percentage - 15.0).abs() < 1e-9);
    }

    #[test]
    fn composite_takes_worst_tier_and_mean() {
        let a = DerivedDisplay {
            channel: "a".into(),
            tier: Tier::Operational,
            percentage: 100.0,
        };
        let b = DerivedDisplay {
            channel: "b".into(),
            tier: Tier::Warning,
            percentage: 50.0,
        };
        let c = combine("overall", "Overall", &[&a, &b]);
        assert_eq!(c.tier, Tier::Warning);
        assert_eq!(c.percentage, 75.0);
        assert_eq!(c.members, vec!["a", "b"]);
    }

    #[test]
    fn tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Tier::Critical).unwrap(), "\"critical\"");
        assert_eq!(Tier::Warning.to_string(), "warning");
    }
}
