//! Observation source trait and scripted implementation.
//!
//! Each frame the runner asks an [`ObservationSource`] for the changes the
//! recognizer reported since the previous frame. The trait abstracts the
//! recognizer itself -- it could be a live camera pipeline, a recorded
//! replay, or a test script.

use std::collections::BTreeMap;

use tracing::debug;
use tracksync_types::ObservationBatch;

/// Errors an observation source may report.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The recognizer produced data that cannot be turned into a batch.
    #[error("malformed batch for frame {frame}: {reason}")]
    Malformed {
        /// Frame the batch was for.
        frame: u64,
        /// What was wrong with it.
        reason: String,
    },

    /// An internal failure in the source.
    #[error("observation source error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

/// Input side of the synchronizer: the recognition subsystem.
pub trait ObservationSource {
    /// Changes to apply on `frame`. An empty batch means nothing changed.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the source failed entirely.
    fn next_batch(&mut self, frame: u64) -> Result<ObservationBatch, SourceError>;

    /// Whether the source will never produce another non-empty batch.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// A source that replays batches keyed by frame number.
///
/// Frames without a scripted batch yield an empty batch. Once every
/// scripted frame has been handed out the source reports exhaustion.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    frames: BTreeMap<u64, ObservationBatch>,
}

impl ScriptedSource {
    /// Create an empty script.
    pub const fn new() -> Self {
        Self {
            frames: BTreeMap::new(),
        }
    }

    /// Schedule `batch` for `frame`, merging with anything already there.
    pub fn push(&mut self, frame: u64, batch: ObservationBatch) {
        let slot = self.frames.entry(frame).or_default();
        slot.gained.extend(batch.gained);
        slot.updated.extend(batch.updated);
        slot.lost.extend(batch.lost);
    }

    /// Number of frames still scripted.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    /// Last scripted frame number, if any.
    pub fn last_frame(&self) -> Option<u64> {
        self.frames.keys().next_back().copied()
    }
}

impl FromIterator<(u64, ObservationBatch)> for ScriptedSource {
    fn from_iter<I: IntoIterator<Item = (u64, ObservationBatch)>>(iter: I) -> Self {
        let mut source = Self::new();
        for (frame, batch) in iter {
            source.push(frame, batch);
        }
        source
    }
}

impl ObservationSource for ScriptedSource {
    fn next_batch(&mut self, frame: u64) -> Result<ObservationBatch, SourceError> {
        let later = self.frames.split_off(&frame.saturating_add(1));
        let mut due = std::mem::replace(&mut self.frames, later);
        let batch = due.remove(&frame).unwrap_or_default();
        // Frames the caller skipped are dropped rather than replayed late.
        if !due.is_empty() {
            debug!(frame, skipped = due.len(), "Dropping scripted batches for skipped frames");
        }
        Ok(batch)
    }

    fn is_exhausted(&self) -> bool {
        self.frames.is_empty()
    }
}
