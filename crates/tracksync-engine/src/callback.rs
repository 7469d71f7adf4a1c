//! Frame callback that logs lifecycle changes and keeps running totals.

use tracing::{debug, info, warn};
use tracksync_core::runner::FrameCallback;
use tracksync_core::{FrameSummary, TrackingState};

/// Totals accumulated over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTotals {
    /// Records created.
    pub spawned: usize,
    /// Existing records reactivated by a repeated gain.
    pub reactivated: usize,
    /// Records torn down.
    pub destroyed: usize,
    /// Observations that failed to produce a record.
    pub failures: usize,
    /// Repeated targets within one batch category.
    pub collisions: usize,
    /// Most records live at once.
    pub peak_live: usize,
}

/// Callback that logs every frame with lifecycle changes.
#[derive(Debug, Default)]
pub struct LoggingCallback {
    totals: SessionTotals,
}

impl LoggingCallback {
    /// Create a callback with zeroed totals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals so far.
    pub const fn totals(&self) -> SessionTotals {
        self.totals
    }
}

impl FrameCallback for LoggingCallback {
    fn on_frame(&mut self, summary: &FrameSummary, _state: &TrackingState) {
        let apply = &summary.apply;
        let totals = &mut self.totals;
        totals.spawned = totals.spawned.saturating_add(apply.spawned.len());
        totals.reactivated = totals.reactivated.saturating_add(apply.reactivated.len());
        totals.destroyed = totals.destroyed.saturating_add(apply.destroyed.len());
        totals.failures = totals.failures.saturating_add(apply.failures.len());
        totals.collisions = totals.collisions.saturating_add(apply.collisions.len());
        totals.peak_live = totals.peak_live.max(summary.live_entities);

        for failure in &apply.failures {
            warn!(
                frame = summary.frame,
                target_id = %failure.target,
                error = %failure.error,
                "Observation not represented"
            );
        }

        if apply.has_lifecycle_changes() {
            info!(
                frame = summary.frame,
                spawned = apply.spawned.len(),
                reactivated = apply.reactivated.len(),
                destroyed = apply.destroyed.len(),
                live = summary.live_entities,
                "Lifecycle changes applied"
            );
        } else {
            debug!(
                frame = summary.frame,
                dt = summary.dt,
                updated = apply.updated.len(),
                smoothed = summary.follow.advanced,
                "Frame complete"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tracksync_core::LifecycleSynchronizer;
    use tracksync_core::prototype::PrototypeRegistry;
    use tracksync_core::run_frame;
    use tracksync_core::scene::RecordingScene;
    use tracksync_core::smoother::SmoothingStrength;
    use tracksync_types::{FollowPolicy, Observation, ObservationBatch, Pose, TargetId};

    use super::*;

    #[test]
    fn totals_accumulate_across_frames() {
        let mut registry = PrototypeRegistry::new();
        registry.register(TargetId::new("a"), "dragon", 1.0).unwrap();
        let sync = LifecycleSynchronizer::new(registry, FollowPolicy::AnchoredSmoothed);
        let mut state = TrackingState::new(SmoothingStrength::default());
        let mut scene = RecordingScene::new();
        let mut callback = LoggingCallback::new();

        let batches = [
            ObservationBatch::empty()
                .with_gained(Observation::tracking("a", Pose::IDENTITY))
                .with_gained(Observation::tracking("unmapped", Pose::IDENTITY)),
            ObservationBatch::empty().with_gained(Observation::tracking("a", Pose::IDENTITY)),
            ObservationBatch::empty().with_lost("a"),
        ];
        for batch in &batches {
            let summary = run_frame(&mut state, &sync, batch, 1.0 / 60.0, &mut scene);
            callback.on_frame(&summary, &state);
        }

        let totals = callback.totals();
        assert_eq!(totals.spawned, 1);
        assert_eq!(totals.reactivated, 1);
        assert_eq!(totals.destroyed, 1);
        assert_eq!(totals.failures, 1);
        assert_eq!(totals.peak_live, 1);
    }
}
