//! End-to-end lifecycle scenarios for the synchronizer and frame cycle.
//!
//! Every test drives the public API only: a [`LifecycleSynchronizer`], a
//! [`TrackingState`], and a [`RecordingScene`] standing in for the renderer.

// Integration tests use unwrap extensively for clarity -- panicking on
// failure is the correct behavior in test code.
#![allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracksync_core::prototype::PrototypeRegistry;
use tracksync_core::scene::RecordingScene;
use tracksync_core::smoother::{self, SmoothingStrength};
use tracksync_core::{LifecycleSynchronizer, TrackingState, run_frame};
use tracksync_types::{
    FollowPolicy, Observation, ObservationBatch, Pose, Quat, TargetId, TrackingQuality, Vec3,
};

const FRAME: f32 = 1.0 / 60.0;

fn p1() -> Pose {
    Pose::new(Vec3::new(0.0, 0.0, -0.5), Quat::IDENTITY)
}

fn p2() -> Pose {
    Pose::new(Vec3::new(0.2, 0.1, -0.5), Quat::from_rotation_z(0.3))
}

fn p3() -> Pose {
    Pose::from_position(Vec3::new(-0.3, 0.0, -0.4))
}

fn synchronizer(policy: FollowPolicy) -> LifecycleSynchronizer {
    let mut registry = PrototypeRegistry::new();
    registry.register(TargetId::new("A"), "dragon", 0.2).unwrap();
    registry.register(TargetId::new("B"), "knight", 1.0).unwrap();
    registry.register(TargetId::new("C"), "castle", 1.0).unwrap();
    LifecycleSynchronizer::new(registry, policy)
}

fn a() -> TargetId {
    TargetId::new("A")
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn scenario_1_gain_creates_one_record_at_observed_pose() {
    let sync = synchronizer(FollowPolicy::AnchoredSmoothed);
    let mut state = TrackingState::new(SmoothingStrength::default());
    let mut scene = RecordingScene::new();

    let batch = ObservationBatch::empty().with_gained(Observation::tracking("A", p1()));
    run_frame(&mut state, &sync, &batch, FRAME, &mut scene);

    assert_eq!(state.store.len(), 1);
    let record = state.store.find(&a()).unwrap();
    assert_eq!(record.displayed_pose, p1());
    assert_eq!(scene.instances_for(&a()).len(), 1);
    assert_eq!(scene.instances_for(&a())[0].pose, p1());
}

#[test]
fn scenario_2_update_moves_partway_and_anchor_stays() {
    let sync = synchronizer(FollowPolicy::AnchoredSmoothed);
    let strength = SmoothingStrength::default();
    let mut state = TrackingState::new(strength);
    let mut scene = RecordingScene::new();

    let gain = ObservationBatch::empty().with_gained(Observation::tracking("A", p1()));
    run_frame(&mut state, &sync, &gain, FRAME, &mut scene);

    let update = ObservationBatch::empty().with_updated(Observation::tracking("A", p2()));
    run_frame(&mut state, &sync, &update, FRAME, &mut scene);

    let record = state.store.find(&a()).unwrap();
    let expected = smoother::step(&p1(), &p2(), strength, FRAME);
    let alpha = smoother::blend_factor(strength.position, FRAME);

    assert!((record.displayed_pose.position - expected.position).length() < 1e-6);
    assert!(record.displayed_pose.angle_to(&expected) < 1e-4);
    assert!(alpha > 0.0 && alpha < 1.0);
    assert!(record.displayed_pose.distance_to(&p2()) < p1().distance_to(&p2()));
    assert!(record.displayed_pose.distance_to(&p2()) > 0.0);

    // Anchor pinned at first detection, in the record and in the scene.
    assert_eq!(record.anchor.map(|anchor| anchor.pose), Some(p1()));
    let anchors = scene.anchors_for(&a());
    assert_eq!(anchors.len(), 1);
    assert_eq!(anchors[0].pose, p1());

    // The instance shows the smoothed pose, not the raw observation.
    assert_eq!(
        scene.instances().get(&record.instance).map(|i| i.pose),
        Some(record.displayed_pose)
    );
}

#[test]
fn scenario_3_loss_destroys_everything_and_repeat_is_a_no_op() {
    let sync = synchronizer(FollowPolicy::AnchoredSmoothed);
    let mut state = TrackingState::new(SmoothingStrength::default());
    let mut scene = RecordingScene::new();

    let gain = ObservationBatch::empty().with_gained(Observation::tracking("A", p1()));
    run_frame(&mut state, &sync, &gain, FRAME, &mut scene);

    let lost = ObservationBatch::empty().with_lost("A");
    let first = run_frame(&mut state, &sync, &lost, FRAME, &mut scene);
    assert_eq!(first.apply.destroyed, vec![a()]);
    assert!(state.store.is_empty());
    assert!(scene.instances().is_empty());
    assert!(scene.anchors().is_empty());
    assert!(state.follower.is_empty());

    let second = run_frame(&mut state, &sync, &lost, FRAME, &mut scene);
    assert!(second.apply.destroyed.is_empty());
    assert!(second.apply.failures.is_empty());
    assert!(state.store.is_empty());
    assert_eq!(scene.destroyed_total(), 1);
    assert_eq!(scene.stale_requests(), 0);
}

#[test]
fn scenario_4_limited_gain_creates_nothing() {
    let sync = synchronizer(FollowPolicy::AnchoredSmoothed);
    let mut state = TrackingState::new(SmoothingStrength::default());
    let mut scene = RecordingScene::new();

    let batch = ObservationBatch::empty().with_gained(Observation::new(
        "B",
        p3(),
        TrackingQuality::Limited,
    ));
    let summary = run_frame(&mut state, &sync, &batch, FRAME, &mut scene);

    assert_eq!(summary.apply.ignored, vec![TargetId::new("B")]);
    assert!(state.store.is_empty());
    assert_eq!(scene.spawned_total(), 0);
    assert!(scene.anchors().is_empty());
}

#[test]
fn scenario_5_duplicate_gain_reactivates_instead_of_duplicating() {
    let sync = synchronizer(FollowPolicy::AnchoredSmoothed);
    let mut state = TrackingState::new(SmoothingStrength::default());
    let mut scene = RecordingScene::new();

    let gain = ObservationBatch::empty().with_gained(Observation::tracking("A", p1()));
    run_frame(&mut state, &sync, &gain, FRAME, &mut scene);
    let instance = state.store.find(&a()).unwrap().instance;

    let again = ObservationBatch::empty().with_gained(Observation::tracking("A", p2()));
    let summary = run_frame(&mut state, &sync, &again, FRAME, &mut scene);

    assert_eq!(summary.apply.reactivated, vec![a()]);
    assert!(summary.apply.spawned.is_empty());
    assert_eq!(state.store.len(), 1);
    assert_eq!(state.store.find(&a()).unwrap().instance, instance);
    assert_eq!(scene.spawned_total(), 1);
    assert_eq!(scene.instances_for(&a()).len(), 1);
    assert_eq!(scene.anchors_for(&a()).len(), 1);
    assert!(scene.instances_for(&a())[0].visible);
}

// =============================================================================
// Policy and failure behavior
// =============================================================================

#[test]
fn direct_follow_snaps_on_every_update() {
    let sync = synchronizer(FollowPolicy::DirectFollow);
    let mut state = TrackingState::new(SmoothingStrength::default());
    let mut scene = RecordingScene::new();

    let gain = ObservationBatch::empty().with_gained(Observation::tracking("A", p1()));
    run_frame(&mut state, &sync, &gain, FRAME, &mut scene);
    let update = ObservationBatch::empty().with_updated(Observation::tracking("A", p2()));
    run_frame(&mut state, &sync, &update, FRAME, &mut scene);

    let record = state.store.find(&a()).unwrap();
    assert_eq!(record.displayed_pose, p2());
    assert!(record.anchor.is_none());
    assert!(scene.anchors().is_empty());
}

#[test]
fn follower_never_writes_after_teardown() {
    let sync = synchronizer(FollowPolicy::AnchoredSmoothed);
    let mut state = TrackingState::new(SmoothingStrength::default());
    let mut scene = RecordingScene::new();

    let gain = ObservationBatch::empty()
        .with_gained(Observation::tracking("A", p1()))
        .with_updated(Observation::tracking("A", p2()));
    run_frame(&mut state, &sync, &gain, FRAME, &mut scene);

    let lost = ObservationBatch::empty().with_updated(Observation::new(
        "A",
        p2(),
        TrackingQuality::Lost,
    ));
    run_frame(&mut state, &sync, &lost, FRAME, &mut scene);
    for _ in 0..10 {
        run_frame(&mut state, &sync, &ObservationBatch::empty(), FRAME, &mut scene);
    }

    assert_eq!(scene.stale_requests(), 0);
    assert!(state.follower.is_empty());
}

#[test]
fn regain_after_loss_builds_a_fresh_instance() {
    let sync = synchronizer(FollowPolicy::AnchoredSmoothed);
    let mut state = TrackingState::new(SmoothingStrength::default());
    let mut scene = RecordingScene::new();

    let gain = ObservationBatch::empty().with_gained(Observation::tracking("A", p1()));
    run_frame(&mut state, &sync, &gain, FRAME, &mut scene);
    let first_instance = state.store.find(&a()).unwrap().instance;

    run_frame(&mut state, &sync, &ObservationBatch::empty().with_lost("A"), FRAME, &mut scene);

    let regain = ObservationBatch::empty().with_gained(Observation::tracking("A", p2()));
    run_frame(&mut state, &sync, &regain, FRAME, &mut scene);

    let record = state.store.find(&a()).unwrap();
    assert_ne!(record.instance, first_instance);
    assert_eq!(record.anchor.map(|anchor| anchor.pose), Some(p2()));
    assert_eq!(scene.instances().len(), 1);
    assert_eq!(scene.anchors().len(), 1);
}

#[test]
fn unmapped_target_stays_unrepresented_without_side_effects() {
    let sync = synchronizer(FollowPolicy::AnchoredSmoothed);
    let mut state = TrackingState::new(SmoothingStrength::default());
    let mut scene = RecordingScene::new();

    for _ in 0..3 {
        let batch = ObservationBatch::empty()
            .with_updated(Observation::tracking("unknown_card", p1()));
        let summary = run_frame(&mut state, &sync, &batch, FRAME, &mut scene);
        assert_eq!(summary.apply.failures.len(), 1);
    }

    assert!(state.store.is_empty());
    assert!(scene.instances().is_empty());
    assert!(scene.anchors().is_empty());
}

// =============================================================================
// Invariants over random event streams
// =============================================================================

fn random_quality(rng: &mut StdRng) -> TrackingQuality {
    match rng.random_range(0..4) {
        0 => TrackingQuality::Limited,
        1 => TrackingQuality::Lost,
        _ => TrackingQuality::Tracking,
    }
}

fn random_pose(rng: &mut StdRng) -> Pose {
    Pose::new(
        Vec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        ),
        Quat::from_rotation_y(rng.random_range(-3.0..3.0)),
    )
}

fn check_invariants_under(policy: FollowPolicy, seed: u64) {
    let sync = synchronizer(policy);
    let mut state = TrackingState::new(SmoothingStrength::default());
    let mut scene = RecordingScene::new();
    let mut rng = StdRng::seed_from_u64(seed);
    let names = ["A", "B", "C", "unmapped"];

    // Most recent quality each target was reported with.
    let mut last_reported: BTreeMap<TargetId, TrackingQuality> = BTreeMap::new();

    for _ in 0..500 {
        let mut batch = ObservationBatch::empty();
        for name in names {
            if rng.random_bool(0.25) {
                batch.gained.push(Observation::new(name, random_pose(&mut rng), random_quality(&mut rng)));
            }
        }
        for name in names {
            if rng.random_bool(0.5) {
                batch.updated.push(Observation::new(name, random_pose(&mut rng), random_quality(&mut rng)));
            }
        }
        for name in names {
            if rng.random_bool(0.1) {
                batch.lost.push(TargetId::new(name));
            }
        }

        for observation in batch.gained.iter().chain(batch.updated.iter()) {
            last_reported.insert(observation.target.clone(), observation.quality);
        }
        for target in &batch.lost {
            last_reported.insert(target.clone(), TrackingQuality::Lost);
        }

        let dt = rng.random_range(0.0..0.05);
        run_frame(&mut state, &sync, &batch, dt, &mut scene);

        // Live records only for targets whose latest report was Tracking.
        for target in state.store.targets() {
            assert_eq!(
                last_reported.get(target),
                Some(&TrackingQuality::Tracking),
                "{target} is live without a tracking report"
            );
        }

        // One record per target, one instance per record, nothing orphaned.
        assert_eq!(scene.instances().len(), state.store.len());
        for (_, record) in state.store.iter() {
            assert_eq!(scene.instances_for(&record.target).len(), 1);
            assert!(scene.instances().contains_key(&record.instance));
        }
        let expected_anchors = if policy.uses_anchor() { state.store.len() } else { 0 };
        assert_eq!(scene.anchors().len(), expected_anchors);
        assert_eq!(scene.stale_requests(), 0);
    }
}

#[test]
fn invariants_hold_for_anchored_policy() {
    for seed in 0..8 {
        check_invariants_under(FollowPolicy::AnchoredSmoothed, seed);
    }
}

#[test]
fn invariants_hold_for_direct_policy() {
    for seed in 0..8 {
        check_invariants_under(FollowPolicy::DirectFollow, seed);
    }
}
