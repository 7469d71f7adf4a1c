//! Session runner: the frame loop.
//!
//! [`run_session`] paces frames with a tokio interval, measures the real
//! time between frames, pulls a batch from the [`ObservationSource`], and
//! runs [`run_frame`]. The frame body is synchronous; the loop only yields
//! while waiting for the next frame. The session ends when the frame limit
//! is reached or the source is exhausted.
//!
//! [`run_frame`]: crate::frame::run_frame

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use crate::config::SessionConfig;
use crate::frame::{self, FrameSummary, TrackingState};
use crate::scene::SceneBackend;
use crate::source::{ObservationSource, SourceError};
use crate::synchronizer::LifecycleSynchronizer;

/// Errors that can occur during a session.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The observation source failed.
    #[error("source error: {source}")]
    Source {
        /// The underlying source error.
        #[from]
        source: SourceError,
    },
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    /// The configured frame limit was reached.
    MaxFrames,
    /// The observation source has nothing more to report.
    SourceExhausted,
}

/// Frame pacing and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Target time between frames.
    pub frame_interval: Duration,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
}

impl SessionLimits {
    /// Derive limits from session configuration.
    pub const fn from_config(config: &SessionConfig) -> Self {
        Self {
            frame_interval: Duration::from_millis(config.frame_interval_ms),
            max_frames: config.max_frames,
        }
    }
}

/// Result of a session.
#[derive(Debug)]
pub struct SessionResult {
    /// The reason the session ended.
    pub end_reason: SessionEndReason,
    /// The last frame summary, if any frame ran.
    pub final_summary: Option<FrameSummary>,
    /// Total number of frames run.
    pub total_frames: u64,
}

/// Callback invoked after each frame completes.
pub trait FrameCallback {
    /// Called after a frame completes.
    fn on_frame(&mut self, summary: &FrameSummary, state: &TrackingState);
}

/// A no-op frame callback.
pub struct NoOpCallback;

impl FrameCallback for NoOpCallback {
    fn on_frame(&mut self, _summary: &FrameSummary, _state: &TrackingState) {}
}

/// Run frames until a termination condition is met.
///
/// Live records are left in place when the session ends; the caller
/// decides whether to tear them down.
///
/// # Errors
///
/// Returns [`RunnerError`] if the observation source fails.
pub async fn run_session(
    state: &mut TrackingState,
    synchronizer: &LifecycleSynchronizer,
    source: &mut dyn ObservationSource,
    scene: &mut dyn SceneBackend,
    limits: &SessionLimits,
    callback: &mut dyn FrameCallback,
) -> Result<SessionResult, RunnerError> {
    let period = limits.frame_interval.max(Duration::from_millis(1));
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_summary: Option<FrameSummary> = None;
    let mut total_frames: u64 = 0;
    let mut last_instant = interval.tick().await;

    info!(
        frame_interval_ms = period.as_millis(),
        max_frames = limits.max_frames,
        policy = ?synchronizer.policy(),
        "Session starting"
    );

    let end_reason = loop {
        if limits.max_frames.is_some_and(|max| total_frames >= max) {
            break SessionEndReason::MaxFrames;
        }
        if source.is_exhausted() {
            break SessionEndReason::SourceExhausted;
        }

        let now = interval.tick().await;
        let dt = now.duration_since(last_instant).as_secs_f32();
        last_instant = now;

        let batch = source.next_batch(state.frame.saturating_add(1))?;
        let summary = frame::run_frame(state, synchronizer, &batch, dt, scene);
        total_frames = total_frames.saturating_add(1);

        callback.on_frame(&summary, state);
        last_summary = Some(summary);
    };

    info!(
        end_reason = ?end_reason,
        total_frames,
        live_entities = state.store.len(),
        "Session ended"
    );

    Ok(SessionResult {
        end_reason,
        final_summary: last_summary,
        total_frames,
    })
}
