//! Integration tests for endurance-core.
//!
//! These tests drive whole panels through the public API:
//! preset construction → controls → clock-driven pump → snapshot → log persistence.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use endurance_core::{
    Channel, Clock, ControlBinding, DriftScheduler, EngineError, FileStorage, LogStore,
    ManualClock, MemoryStorage, PanelBuilder, SharedLogStore, Thresholds, Tier, preset,
};

const T0: u64 = 1_760_000_000_000;

fn memory_log(storage: &MemoryStorage, clock: &ManualClock) -> SharedLogStore {
    LogStore::open(
        Box::new(storage.clone()),
        Arc::new(clock.clone()),
        "mission_logs",
    )
    .into_shared()
}

#[test]
fn clamping_holds_under_heavy_drift() {
    let mut ch = Channel::new("oxygen", 95.0, 90.0, 100.0, 5.0, "%").unwrap();
    let mut rng = StdRng::seed_from_u64(2026);
    for _ in 0..10_000 {
        ch.drift(&mut rng);
        assert!(
            (90.0..=100.0).contains(&ch.value()),
            "oxygen escaped its bounds: {}",
            ch.value()
        );
    }
}

#[test]
fn lock_suppresses_drift_and_unlock_resumes() {
    let mut chs = vec![Channel::new("thrust", 45.0, 0.0, 100.0, 2.0, "%").unwrap()];
    let mut sched = DriftScheduler::seeded(8);

    chs[0].set_locked(true);
    for _ in 0..10 {
        sched.tick(&mut chs);
    }
    assert_eq!(chs[0].value(), 45.0);

    chs[0].set_locked(false);
    assert_eq!(sched.tick(&mut chs), 1);
    assert_ne!(chs[0].value(), 45.0);
}

#[test]
fn momentary_activation_is_idempotent() {
    let clock = ManualClock::new(T0);
    let mut panel = preset("life_support", Arc::new(clock.clone()), Some(4), None).unwrap();

    assert!(panel.activate("full_diagnostic").unwrap());
    clock.advance(Duration::from_millis(500));
    assert!(!panel.activate("full_diagnostic").unwrap());
    assert!(panel.channel("diagnostic").unwrap().is_on());

    clock.advance(Duration::from_millis(2_500));
    let report = panel.pump();
    assert_eq!(report.resets, vec!["full_diagnostic".to_string()]);
    assert!(!panel.channel("diagnostic").unwrap().is_on());

    clock.advance(Duration::from_secs(10));
    assert!(panel.pump().resets.is_empty());
    assert!(!panel.channel("diagnostic").unwrap().is_on());
}

#[test]
fn log_appends_read_most_recent_first_with_unique_ids() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(T0);
    let log = memory_log(&storage, &clock);
    let mut panel = preset("ship_status", Arc::new(clock.clone()), None, Some(log.clone())).unwrap();

    for author in ["Купър", "Бранд", "Ромили"] {
        panel.append(author, "доклад").unwrap().unwrap();
    }

    let store = log.lock().unwrap();
    let authors: Vec<&str> = store.entries().iter().map(|e| e.author.as_str()).collect();
    assert_eq!(authors, vec!["Ромили", "Бранд", "Купър", "Купър"]);
    assert_eq!(store.entries()[3].id, "init-1");

    let mut ids: Vec<&str> = store.entries().iter().map(|e| e.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4, "ids collided within one millisecond");
}

#[test]
fn blank_content_is_rejected() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(T0);
    let log = memory_log(&storage, &clock);
    let mut panel = preset("navigation", Arc::new(clock), None, Some(log.clone())).unwrap();

    let err = panel.append("Купър", "   ").unwrap_err();
    assert_eq!(err, EngineError::EmptyContent);
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn oxygen_tier_boundary() {
    let clock = ManualClock::new(T0);
    let mut panel = preset("life_support", Arc::new(clock), Some(1), None).unwrap();

    panel.write("oxygen", 91.999).unwrap();
    assert_eq!(panel.display("oxygen").unwrap().tier, Tier::Warning);
    panel.write("oxygen", 92.0).unwrap();
    assert_eq!(panel.display("oxygen").unwrap().tier, Tier::Operational);
}

#[test]
fn disposal_halts_all_scheduled_work() {
    let clock = ManualClock::new(T0);
    let mut panel = preset("navigation", Arc::new(clock.clone()), Some(9), None).unwrap();
    panel.toggle("ignition", true).unwrap();
    panel.activate("compute_trajectory").unwrap();
    let before = panel.snapshot();

    panel.dispose();
    clock.advance(Duration::from_secs(3_600));
    let report = panel.pump();
    assert_eq!(report.drift_steps, 0);
    assert!(report.resets.is_empty());

    let after = panel.snapshot();
    assert_eq!(before.channels, after.channels);
    assert!(after.disposed);
    // the pending reset was cancelled, not fired
    assert!(panel.channel("trajectory").unwrap().is_on());
}

#[test]
fn persisted_log_round_trips_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(T0);
    let open = || {
        LogStore::open(
            Box::new(FileStorage::new(dir.path())),
            Arc::new(clock.clone()),
            "mission_logs",
        )
    };

    let mut first = open();
    first.append("TARS", "Honesty setting: 90%.").unwrap();
    clock.advance(Duration::from_millis(1));
    first.append("CASE", "Docking sequence ready.").unwrap();

    let second = open();
    assert_eq!(first.entries(), second.entries());
    assert_eq!(second.entries()[0].author, "CASE");
}

#[test]
fn undecodable_log_file_is_reseeded_once() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path());
    std::fs::write(storage.path_for("mission_logs"), [0xff, 0xfe, 0x00, 0x5b]).unwrap();

    let clock = ManualClock::new(1_000);
    let open = || {
        LogStore::open(
            Box::new(storage.clone()),
            Arc::new(clock.clone()),
            "mission_logs",
        )
    };

    let mut first = open();
    assert!(first.take_persistence_errors().is_empty());
    assert_eq!(first.entries().len(), 1);
    assert_eq!(first.entries()[0].timestamp, 1_000);

    clock.advance(Duration::from_secs(5));
    let second = open();
    assert_eq!(first.entries(), second.entries());
}

#[test]
fn persistence_failure_keeps_the_entry() {
    let storage = MemoryStorage::new();
    let clock = ManualClock::new(T0);
    storage.insert_raw("mission_logs", "[]");
    let log = LogStore::open(
        Box::new(storage.clone().with_fail_writes(true)),
        Arc::new(clock.clone()),
        "mission_logs",
    )
    .into_shared();
    let mut panel = preset("communications", Arc::new(clock), None, Some(log.clone())).unwrap();

    let receipt = panel.append("Доил", "Signal lost").unwrap().unwrap();
    assert!(receipt.persistence.is_some_and(|e| e.is_recoverable()));
    assert_eq!(panel.snapshot().log.len(), 1);
    assert_eq!(storage.raw("mission_logs").as_deref(), Some("[]"));
}

#[test]
fn emergency_and_slider_hold_share_a_lock() {
    let clock = ManualClock::new(T0);
    let mut panel = preset("life_support", Arc::new(clock.clone()), Some(5), None).unwrap();

    panel.hold("oxygen").unwrap();
    panel.toggle("emergency_o2", true).unwrap();
    panel.release("oxygen").unwrap();
    let frozen = panel.channel("oxygen").unwrap().value();

    clock.advance(Duration::from_secs(60));
    panel.pump();
    assert_eq!(panel.channel("oxygen").unwrap().value(), frozen);

    panel.toggle("emergency_o2", false).unwrap();
    clock.advance(Duration::from_secs(60));
    assert!(panel.pump().drift_steps > 0);
}

#[test]
fn ignition_boosts_coordinate_jitter() {
    let clock = ManualClock::new(T0);
    let mut calm = preset("navigation", Arc::new(clock.clone()), Some(77), None).unwrap();
    let mut burning = preset("navigation", Arc::new(clock.clone()), Some(77), None).unwrap();
    burning.toggle("ignition", true).unwrap();

    clock.advance(Duration::from_secs(1));
    calm.pump();
    burning.pump();

    let dx_calm = calm.channel("x").unwrap().value() - 1247.89;
    let dx_burn = burning.channel("x").unwrap().value() - 1247.89;
    assert!((dx_burn - 10.0 * dx_calm).abs() < 1e-6);
}

#[test]
fn custom_panel_with_clock_trait_object() {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(T0));
    let panel = PanelBuilder::new("airlock", clock)
        .channel(Channel::new("pressure", 101.0, 0.0, 120.0, 0.0, "kPa").unwrap())
        .channel(Channel::flag("cycling", false))
        .thresholds(
            "pressure",
            Thresholds::warn_below(90.0).with_critical_below(60.0),
        )
        .control(ControlBinding::momentary(
            "cycle",
            "Cycle",
            "cycling",
            Duration::from_secs(30),
        ))
        .build()
        .unwrap();
    let snap = panel.snapshot();
    assert_eq!(snap.display("pressure").unwrap().tier, Tier::Operational);
    assert_eq!(snap.control("cycle").unwrap().kind, "momentary");

    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["panel"], "airlock");
    assert_eq!(json["displays"][0]["tier"], "operational");
}
