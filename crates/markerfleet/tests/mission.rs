use std::collections::HashSet;
use std::sync::Arc;

use markerfleet::agents::{
    CarrierKind, DestinationTable, FlightTiming, GroupPolicy, MemoryNotifier, NotifyEvent,
    RetryPolicy,
};
use markerfleet::core::{MissionPhase, Pose};
use markerfleet::sim::{SimBackend, SimFault, SimWorld};
use markerfleet::tasks::{read_records, JsonLinesRecorder, NullRecorder};
use markerfleet::vision::{MarkerPayload, Vocabulary};
use markerfleet::{CarrierConfig, Mission, MissionConfig, ScanRoute, ScannerConfig};
use nalgebra::Point2;

const D1: [f32; 2] = [-0.88, -3.1];
const D2: [f32; 2] = [-3.82, 0.84];
const D3: [f32; 2] = [5.0, 5.0];

fn pt(p: [f32; 2]) -> Point2<f32> {
    Point2::new(p[0], p[1])
}

fn fast_timing() -> FlightTiming {
    FlightTiming {
        arm_settle_ms: 0,
        takeoff_settle_ms: 0,
        min_takeoff_altitude: 0.1,
        poll_ms: 1,
        arrival_timeout_ms: 500,
        return_timeout_ms: 500,
        settle_ms: 0,
    }
}

fn destinations() -> DestinationTable {
    DestinationTable::new(pt(D1))
        .with_group(
            GroupPolicy::new("1", pt(D1))
                .rule("Box 1 1", pt(D1))
                .rule("Box 1 2", pt(D3)),
        )
        .with_group(
            GroupPolicy::new("2", pt(D2))
                .rule("Box 2 1", pt(D2))
                .rule("Box 2 2", pt(D3)),
        )
}

fn scanner(id: &str, home: (f32, f32), waypoints: &[(f32, f32)]) -> ScannerConfig {
    ScannerConfig {
        id: id.into(),
        home: Pose::new(home.0, home.1, 0.0, 0.0),
        route: ScanRoute {
            waypoints: waypoints
                .iter()
                .map(|&(x, y)| Pose::new(x, y, 1.5, 0.0))
                .collect(),
            ..ScanRoute::default()
        },
        return_altitude: 1.5,
    }
}

fn carrier(
    id: &str,
    home: (f32, f32),
    kind: CarrierKind,
    group: &str,
    max_tasks: usize,
) -> CarrierConfig {
    CarrierConfig {
        id: id.into(),
        home: Pose::new(home.0, home.1, 0.0, 0.0),
        kind,
        group: group.into(),
        cruise_altitude: 1.5,
        max_tasks,
    }
}

fn mission_config(scanners: Vec<ScannerConfig>, carriers: Vec<CarrierConfig>) -> MissionConfig {
    MissionConfig {
        calibration: 700.0,
        vocabulary: Vocabulary::closed([
            "Box 1 1", "Box 1 2", "Box 2 1", "Box 2 2", "Stone_1", "Wood_1", "Stone_2", "Wood_2",
            "ArUco_0",
        ]),
        found_enough: 4,
        timing: fast_timing(),
        retry: RetryPolicy {
            max_attempts: 3,
            backoff_ms: 0,
            camera_attempts: 3,
            camera_backoff_ms: 0,
        },
        liveness_ms: 20,
        scanners,
        carriers,
        destinations: destinations(),
        world: None,
    }
}

fn four_boxes() -> SimWorld {
    SimWorld {
        arrive_after_polls: 2,
        ..SimWorld::default()
    }
    .with_marker(MarkerPayload::Text("Box 1 1".into()), Point2::new(-2.0, 2.0))
    .with_marker(MarkerPayload::Text("Box 1 2".into()), Point2::new(-1.0, 3.5))
    .with_marker(MarkerPayload::Text("Box 2 1".into()), Point2::new(2.0, 2.0))
    .with_marker(MarkerPayload::Text("Box 2 2".into()), Point2::new(3.5, 0.5))
}

fn two_scouts() -> Vec<ScannerConfig> {
    vec![
        scanner("scout-1", (-3.92, -2.14), &[(-2.0, 2.0), (-1.0, 3.5)]),
        scanner("scout-2", (3.5, 3.15), &[(2.0, 2.0), (3.5, 0.5)]),
    ]
}

fn keys(list: &[String]) -> HashSet<&str> {
    list.iter().map(String::as_str).collect()
}

#[test]
fn repeated_sightings_yield_one_task() {
    // Hovering twice over the same marker, and a second scout passing it too.
    let world = SimWorld::default()
        .with_marker(MarkerPayload::Text("Stone_1".into()), Point2::new(1.0, 1.0));
    let config = mission_config(
        vec![
            scanner("scout-1", (0.0, 0.0), &[(1.0, 1.0), (1.0, 1.0)]),
            scanner("scout-2", (3.0, 0.0), &[(1.0, 1.0)]),
        ],
        Vec::new(),
    );
    let backend = SimBackend::new(world, config.localizer());
    let mission = Mission::new(config, Arc::new(NullRecorder), Arc::new(MemoryNotifier::new()))
        .expect("valid mission");

    let outcomes = mission.scanner_wave(&backend);
    assert!(outcomes.iter().all(|o| o.phase == MissionPhase::Done));
    assert_eq!(mission.queue().len(), 1);
    assert_eq!(mission.queue().published_count(), 1);
    let published: Vec<&str> = outcomes
        .iter()
        .flat_map(|o| o.published.iter().map(String::as_str))
        .collect();
    assert_eq!(published, ["Stone_1"]);

    let task = mission.queue().try_take().expect("task");
    assert_eq!(task.key(), "Stone_1");
    assert!((task.world_position().x - 1.0).abs() < 1e-4);
    assert!((task.world_position().y - 1.0).abs() < 1e-4);
}

#[test]
fn two_groups_consume_every_key_exactly_once() {
    let config = mission_config(
        two_scouts(),
        vec![
            carrier("carrier-1", (4.0, 0.0), CarrierKind::Aerial, "1", 2),
            carrier("rover-2", (2.0, 4.0), CarrierKind::Ground, "2", 2),
        ],
    );
    let backend = SimBackend::new(four_boxes(), config.localizer());
    let notifier = Arc::new(MemoryNotifier::new());
    let mission = Mission::new(config, Arc::new(NullRecorder), notifier.clone()).expect("valid mission");

    let scanners = mission.scanner_wave(&backend);
    assert_eq!(keys(&scanners[0].published), HashSet::from(["Box 1 1", "Box 1 2"]));
    assert_eq!(keys(&scanners[1].published), HashSet::from(["Box 2 1", "Box 2 2"]));
    assert_eq!(mission.queue().len(), 4);

    let carriers = mission.carrier_wave(&backend);
    assert!(carriers.iter().all(|c| c.phase == MissionPhase::Done));
    assert!(carriers.iter().all(|c| c.delivered.len() == 2));

    let mut all: Vec<&str> = carriers
        .iter()
        .flat_map(|c| c.delivered.iter().map(String::as_str))
        .collect();
    all.sort_unstable();
    assert_eq!(all, ["Box 1 1", "Box 1 2", "Box 2 1", "Box 2 2"]);
    assert!(mission.queue().is_empty());

    let events = notifier.events();
    let count = |kind: &str| events.iter().filter(|e| e.kind() == kind).count();
    assert_eq!(count("object_detected"), 4);
    assert_eq!(count("pickup"), 4);
    assert_eq!(count("drop"), 4);
}

#[test]
fn failing_arm_link_gives_up_after_three_attempts() {
    let world = four_boxes().with_fault(SimFault {
        agent: "scout-1".into(),
        arm_always_fails: true,
        ..SimFault::default()
    });
    let config = mission_config(
        two_scouts(),
        vec![carrier("rover-2", (2.0, 4.0), CarrierKind::Ground, "2", 2)],
    );
    let backend = SimBackend::new(world, config.localizer());
    let mission = Mission::new(config, Arc::new(NullRecorder), Arc::new(MemoryNotifier::new()))
        .expect("valid mission");

    let report = mission.run(&backend);

    let scout1 = &report.scanners[0];
    assert_eq!(scout1.id.as_str(), "scout-1");
    assert_eq!(scout1.phase, MissionPhase::Failed);
    assert!(scout1.published.is_empty());
    assert!(scout1.failure.is_some());

    let telemetry = backend.telemetry(&"scout-1".into()).expect("telemetry");
    assert_eq!(telemetry.arm_calls, 3);
    assert_eq!(telemetry.takeoffs, 0);
    assert!(telemetry.goto_targets.is_empty());

    // The rest of the fleet carried on.
    assert_eq!(report.scanners[1].phase, MissionPhase::Done);
    assert_eq!(report.scanners[1].published.len(), 2);
    assert!(report.carrier_wave_launched);
    assert_eq!(report.delivered().count(), 2);
    assert_eq!(report.failed().count(), 1);
}

#[test]
fn unmatched_key_is_delivered_to_group_default() {
    let world = SimWorld::default()
        .with_marker(MarkerPayload::Text("Stone_1".into()), Point2::new(1.0, 1.0));
    let config = mission_config(
        vec![scanner("scout-1", (0.0, 0.0), &[(1.0, 1.0)])],
        vec![carrier("rover-2", (2.0, 4.0), CarrierKind::Ground, "2", 1)],
    );
    let backend = SimBackend::new(world, config.localizer());
    let mission = Mission::new(config, Arc::new(NullRecorder), Arc::new(MemoryNotifier::new()))
        .expect("valid mission");

    let report = mission.run(&backend);
    assert_eq!(report.carriers[0].phase, MissionPhase::Done);
    assert_eq!(report.carriers[0].delivered, ["Stone_1"]);

    let legs = backend.telemetry(&"rover-2".into()).expect("telemetry").goto_targets;
    assert_eq!(legs.len(), 3);
    assert_eq!((legs[1].x, legs[1].y), (D2[0], D2[1]));
    assert_eq!((legs[2].x, legs[2].y), (2.0, 4.0));
}

#[test]
fn carriers_stay_home_when_nothing_was_found() {
    let config = mission_config(
        vec![scanner("scout-1", (0.0, 0.0), &[(1.0, 1.0)])],
        vec![carrier("carrier-1", (4.0, 0.0), CarrierKind::Aerial, "1", 1)],
    );
    let backend = SimBackend::new(SimWorld::default(), config.localizer());
    let mission = Mission::new(config, Arc::new(NullRecorder), Arc::new(MemoryNotifier::new()))
        .expect("valid mission");

    let report = mission.run(&backend);
    assert!(!report.carrier_wave_launched);
    assert!(report.carriers.is_empty());
    assert_eq!(report.tasks_published, 0);
    assert!(backend.telemetry(&"carrier-1".into()).is_none());
}

#[test]
fn carrier_only_mission_stands_down_on_empty_queue() {
    let config = mission_config(
        Vec::new(),
        vec![carrier("carrier-1", (4.0, 0.0), CarrierKind::Aerial, "1", 1)],
    );
    let backend = SimBackend::new(SimWorld::default(), config.localizer());
    let mission = Mission::new(config, Arc::new(NullRecorder), Arc::new(MemoryNotifier::new()))
        .expect("valid mission");

    let report = mission.run(&backend);
    assert!(report.carrier_wave_launched);
    assert_eq!(report.carriers[0].phase, MissionPhase::Done);
    assert!(report.carriers[0].delivered.is_empty());
}

#[test]
fn cancelled_mission_lands_every_scanner() {
    let config = mission_config(two_scouts(), Vec::new());
    let backend = SimBackend::new(four_boxes(), config.localizer());
    let mission = Mission::new(config, Arc::new(NullRecorder), Arc::new(MemoryNotifier::new()))
        .expect("valid mission");
    mission.cancel_token().cancel();

    let report = mission.run(&backend);
    assert!(report.scanners.iter().all(|s| s.phase == MissionPhase::Failed));
    assert!(report
        .scanners
        .iter()
        .all(|s| s.failure.as_deref() == Some("mission cancelled")));
    assert_eq!(report.tasks_published, 0);
}

#[test]
fn discovered_tasks_are_exported_as_json_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log_path = dir.path().join("tasks.jsonl");
    let config = mission_config(two_scouts(), Vec::new());
    let backend = SimBackend::new(four_boxes(), config.localizer());
    let recorder = Arc::new(JsonLinesRecorder::open(&log_path).expect("open"));
    let mission = Mission::new(config, recorder, Arc::new(MemoryNotifier::new())).expect("valid mission");

    mission.run(&backend);

    let records = read_records(&log_path).expect("records");
    let mut keys: Vec<_> = records.iter().map(|r| r.key.as_str()).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["Box 1 1", "Box 1 2", "Box 2 1", "Box 2 2"]);
    let by_scout1 = records.iter().filter(|r| r.agent.as_str() == "scout-1").count();
    assert_eq!(by_scout1, 2);
}

#[test]
fn notifications_identify_the_acting_agent() {
    let world = SimWorld::default().with_marker(MarkerPayload::Fiducial(0), Point2::new(1.0, 1.0));
    let config = mission_config(
        vec![scanner("scout-1", (0.0, 0.0), &[(1.0, 1.0)])],
        vec![carrier("carrier-1", (4.0, 0.0), CarrierKind::Aerial, "1", 1)],
    );
    let backend = SimBackend::new(world, config.localizer());
    let notifier = Arc::new(MemoryNotifier::new());
    let mission = Mission::new(config, Arc::new(NullRecorder), notifier.clone()).expect("valid mission");

    mission.run(&backend);

    let events = notifier.events();
    assert_eq!(
        events,
        [
            NotifyEvent::ObjectDetected {
                agent: "scout-1".into(),
                key: "ArUco_0".into()
            },
            NotifyEvent::Pickup {
                agent: "carrier-1".into(),
                key: "ArUco_0".into()
            },
            NotifyEvent::Drop {
                agent: "carrier-1".into(),
                key: "ArUco_0".into()
            },
        ]
    );
}

#[test]
fn each_run_starts_from_a_fresh_queue() {
    let config = mission_config(
        two_scouts(),
        vec![
            carrier("carrier-1", (4.0, 0.0), CarrierKind::Aerial, "1", 2),
            carrier("rover-2", (2.0, 4.0), CarrierKind::Ground, "2", 2),
        ],
    );
    let backend = SimBackend::new(four_boxes(), config.localizer());

    for _ in 0..2 {
        let mission = Mission::new(
            config.clone(),
            Arc::new(NullRecorder),
            Arc::new(MemoryNotifier::new()),
        )
        .expect("valid mission");
        let report = mission.run(&backend);
        assert!(report.carrier_wave_launched);
        assert_eq!(report.tasks_published, 4);
        assert_eq!(report.delivered().count(), 4);
        assert_eq!(report.failed().count(), 0);
    }
}

#[test]
fn camera_dropouts_do_not_cost_any_task() {
    let world = SimWorld {
        camera_dropout_every: 2,
        ..four_boxes()
    };
    let config = mission_config(two_scouts(), Vec::new());
    let backend = SimBackend::new(world, config.localizer());
    let mission = Mission::new(config, Arc::new(NullRecorder), Arc::new(MemoryNotifier::new()))
        .expect("valid mission");

    let outcomes = mission.scanner_wave(&backend);
    assert!(outcomes.iter().all(|o| o.phase == MissionPhase::Done));
    assert!(outcomes.iter().all(|o| o.failure.is_none()));
    assert_eq!(keys(&outcomes[0].published), HashSet::from(["Box 1 1", "Box 1 2"]));
    assert_eq!(keys(&outcomes[1].published), HashSet::from(["Box 2 1", "Box 2 2"]));
    assert_eq!(mission.queue().len(), 4);
}
