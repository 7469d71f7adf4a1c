//! Frame cycle: the two-phase step that runs once per rendered frame.
//!
//! 1. **Synchronize** -- apply the frame's observation batch through the
//!    [`LifecycleSynchronizer`]. This is the only phase that inserts or
//!    removes records.
//! 2. **Follow** -- advance every follow task by `dt`, writing displayed
//!    poses to the scene.
//!
//! The phases never interleave, so the store needs no locking.

use tracing::trace;

use tracksync_types::ObservationBatch;

use crate::follower::{ContinuousFollower, FollowSummary};
use crate::scene::SceneBackend;
use crate::smoother::SmoothingStrength;
use crate::store::EntityRecordStore;
use crate::synchronizer::{ApplyReport, LifecycleSynchronizer};

/// Mutable tracking state carried from frame to frame.
#[derive(Debug, Clone)]
pub struct TrackingState {
    /// Live entity records.
    pub store: EntityRecordStore,
    /// Per-entity follow tasks.
    pub follower: ContinuousFollower,
    /// Number of the last frame run (0 before the first frame).
    pub frame: u64,
}

impl TrackingState {
    /// Empty state with the given follower smoothing.
    pub const fn new(strength: SmoothingStrength) -> Self {
        Self {
            store: EntityRecordStore::new(),
            follower: ContinuousFollower::new(strength),
            frame: 0,
        }
    }
}

/// Summary of one frame.
#[derive(Debug)]
pub struct FrameSummary {
    /// Frame number (1-based).
    pub frame: u64,
    /// Seconds since the previous frame.
    pub dt: f32,
    /// Synchronize phase outcome.
    pub apply: ApplyReport,
    /// Follow phase outcome.
    pub follow: FollowSummary,
    /// Live records at end of frame.
    pub live_entities: usize,
}

/// Run one frame: synchronize, then follow.
pub fn run_frame(
    state: &mut TrackingState,
    synchronizer: &LifecycleSynchronizer,
    batch: &ObservationBatch,
    dt: f32,
    scene: &mut dyn SceneBackend,
) -> FrameSummary {
    state.frame = state.frame.saturating_add(1);

    // --- Phase 1: Synchronize ---
    let apply = synchronizer.apply(state, batch, scene);

    // --- Phase 2: Follow ---
    let follow = state.follower.advance(&mut state.store, scene, dt);

    trace!(
        frame = state.frame,
        dt,
        followed = follow.advanced,
        live = state.store.len(),
        "Frame complete"
    );

    FrameSummary {
        frame: state.frame,
        dt,
        apply,
        follow,
        live_entities: state.store.len(),
    }
}
