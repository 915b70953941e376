//! Drift scheduler: periodic autonomous perturbation of unlocked channels.
//!
//! The scheduler separates *what* a tick does ([`DriftScheduler::tick`])
//! from *when* ticks happen ([`DriftScheduler::run_due`]). Each channel has
//! its own cadence; `run_due` applies every cadence step that elapsed since
//! the last call, so a clock jumping forward by N intervals produces N drift
//! steps (bounded by [`MAX_CATCH_UP`]).

use std::collections::HashMap;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::channel::Channel;
use crate::clock::millis;

/// Cadence used when a channel has no explicit interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Most drift steps a single channel may catch up on in one `run_due` call.
pub const MAX_CATCH_UP: u32 = 256;

/// Periodic drift driver for one panel.
pub struct DriftScheduler {
    rng: StdRng,
    default_interval: Duration,
    intervals: HashMap<String, Duration>,
    next_due: HashMap<String, u64>,
    ticks: u64,
    stopped: bool,
}

impl DriftScheduler {
    /// Scheduler with a deterministic random source.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Scheduler seeded from the operating system.
    pub fn from_os() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            default_interval: DEFAULT_INTERVAL,
            intervals: HashMap::new(),
            next_due: HashMap::new(),
            ticks: 0,
            stopped: false,
        }
    }

    /// Change the cadence for channels without an explicit interval.
    pub fn set_default_interval(&mut self, interval: Duration) {
        self.default_interval = interval.max(Duration::from_millis(1));
    }

    /// Give one channel its own cadence.
    pub fn set_interval(&mut self, channel: &str, interval: Duration) {
        self.intervals
            .insert(channel.to_string(), interval.max(Duration::from_millis(1)));
    }

    /// Cadence that applies to `channel`.
    pub fn interval_for(&self, channel: &str) -> Duration {
        self.intervals
            .get(channel)
            .copied()
            .unwrap_or(self.default_interval)
    }

    /// Drift every unlocked channel once. Returns how many channels moved.
    pub fn tick(&mut self, channels: &mut [Channel]) -> usize {
        if self.stopped {
            return 0;
        }
        self.ticks += 1;
        let mut moved = 0;
        for ch in channels.iter_mut() {
            if ch.drift(&mut self.rng) {
                moved += 1;
            }
        }
        moved
    }

    /// Anchor every drifting channel's schedule at `now_ms`; the first step
    /// lands one interval later. Channels with no amplitude are never scheduled.
    pub fn start(&mut self, channels: &[Channel], now_ms: u64) {
        for ch in channels.iter().filter(|c| c.drift_amplitude() > 0.0) {
            let due = now_ms.saturating_add(millis(self.interval_for(ch.id())));
            self.next_due.insert(ch.id().to_string(), due);
        }
    }

    /// Apply every drift step whose due time is `<= now_ms`.
    ///
    /// Locked channels still advance their schedule; they just do not move.
    /// Returns the number of drift steps applied.
    pub fn run_due(&mut self, channels: &mut [Channel], now_ms: u64) -> usize {
        if self.stopped {
            return 0;
        }
        let mut applied = 0;
        for ch in channels.iter_mut().filter(|c| c.drift_amplitude() > 0.0) {
            let step = millis(self.interval_for(ch.id()));
            let due = self
                .next_due
                .entry(ch.id().to_string())
                .or_insert(now_ms.saturating_add(step));

            let mut caught_up = 0;
            while *due <= now_ms && caught_up < MAX_CATCH_UP {
                if ch.drift(&mut self.rng) {
                    applied += 1;
                }
                *due = due.saturating_add(step);
                caught_up += 1;
            }
            if *due <= now_ms {
                // Too far behind; resync instead of replaying the whole gap.
                *due = now_ms.saturating_add(step);
            }
        }
        if applied > 0 {
            self.ticks += 1;
        }
        applied
    }

    /// Earliest pending drift step, if any.
    pub fn next_due(&self) -> Option<u64> {
        if self.stopped {
            return None;
        }
        self.next_due.values().copied().min()
    }

    /// Cancel the schedule permanently. Later calls are no-ops.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.next_due.clear();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Number of scheduler passes that moved at least one channel.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> Vec<Channel> {
        vec![
            Channel::new("fast", 50.0, 0.0, 100.0, 1.0, "").unwrap(),
            Channel::new("slow", 50.0, 0.0, 100.0, 1.0, "").unwrap(),
        ]
    }

    #[test]
    fn tick_skips_locked_channels() {
        let mut chs = channels();
        chs[1].set_locked(true);
        let mut s = DriftScheduler::seeded(3);
        assert_eq!(s.tick(&mut chs), 1);
        assert_eq!(chs[1].value(), 50.0);
    }

    #[test]
    fn same_seed_same_trajectory() {
        let mut a = channels();
        let mut b = channels();
        let mut sa = DriftScheduler::seeded(42);
        let mut sb = DriftScheduler::seeded(42);
        for _ in 0..20 {
            sa.tick(&mut a);
            sb.tick(&mut b);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn per_channel_cadence() {
        let mut chs = channels();
        let mut s = DriftScheduler::seeded(5);
        s.set_interval("fast", Duration::from_secs(1));
        s.set_interval("slow", Duration::from_secs(5));
        s.start(&chs, 0);

        // 0..=4s: fast fires at 1,2,3,4; slow not yet.
        assert_eq!(s.run_due(&mut chs, 4_000), 4);
        // 5s: both fire once.
        assert_eq!(s.run_due(&mut chs, 5_000), 2);
        assert_eq!(s.next_due(), Some(6_000));
    }

    #[test]
    fn nothing_due_before_first_interval() {
        let mut chs = channels();
        let mut s = DriftScheduler::seeded(5);
        s.start(&chs, 10_000);
        assert_eq!(s.run_due(&mut chs, 10_999), 0);
        assert_eq!(chs[0].value(), 50.0);
    }

    #[test]
    fn catch_up_is_bounded_and_resyncs() {
        let mut chs = vec![Channel::new("x", 0.0, -1e9, 1e9, 1.0, "").unwrap()];
        let mut s = DriftScheduler::seeded(5);
        s.set_default_interval(Duration::from_millis(1));
        s.start(&chs, 0);
        let applied = s.run_due(&mut chs, 1_000_000);
        assert_eq!(applied, MAX_CATCH_UP as usize);
        assert_eq!(s.next_due(), Some(1_000_001));
    }

    #[test]
    fn huge_interval_saturates_instead_of_wrapping() {
        let mut chs = channels();
        let mut s = DriftScheduler::seeded(5);
        s.set_interval("slow", Duration::MAX);
        s.start(&chs, 1_000);
        assert_eq!(s.next_due(), Some(2_000));

        assert_eq!(s.run_due(&mut chs, u64::MAX - 1), MAX_CATCH_UP as usize);
        assert_eq!(chs[1].value(), 50.0);
        assert_eq!(s.run_due(&mut chs, u64::MAX - 1), 0);
    }

    #[test]
    fn flags_are_never_scheduled() {
        let mut chs = vec![Channel::flag("scrubber", true)];
        let mut s = DriftScheduler::seeded(5);
        s.start(&chs, 0);
        assert_eq!(s.next_due(), None);
        assert_eq!(s.run_due(&mut chs, 10_000), 0);
    }

    #[test]
    fn stopped_scheduler_is_inert() {
        let mut chs = channels();
        let mut s = DriftScheduler::seeded(5);
        s.start(&chs, 0);
        s.stop();
        assert_eq!(s.tick(&mut chs), 0);
        assert_eq!(s.run_due(&mut chs, 60_000), 0);
        assert_eq!(s.next_due(), None);
        assert_eq!(chs[0].value(), 50.0);
    }
}
