//! Observations and the per-frame change batch delivered by the recognizer.

use serde::{Deserialize, Serialize};

use crate::enums::TrackingQuality;
use crate::ids::TargetId;
use crate::pose::Pose;

/// One reported `(target, pose, quality)` triple.
///
/// Observations live only as long as the batch that carries them; the
/// entity record store keeps the durable copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Which target was observed.
    pub target: TargetId,
    /// The estimated pose of the target.
    pub pose: Pose,
    /// Tracking quality of the estimate.
    pub quality: TrackingQuality,
}

impl Observation {
    /// Build an observation.
    pub fn new(target: impl Into<TargetId>, pose: Pose, quality: TrackingQuality) -> Self {
        Self {
            target: target.into(),
            pose,
            quality,
        }
    }

    /// Shorthand for a full-confidence observation.
    pub fn tracking(target: impl Into<TargetId>, pose: Pose) -> Self {
        Self::new(target, pose, TrackingQuality::Tracking)
    }
}

/// Changes reported by the recognizer for one frame.
///
/// Categories are applied in the order `gained`, `updated`, `lost`. Any of
/// them may be empty, and a batch may be entirely empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationBatch {
    /// Targets seen for the first time (or again after removal).
    #[serde(default)]
    pub gained: Vec<Observation>,
    /// Pose or quality changes for targets already known to the recognizer.
    #[serde(default)]
    pub updated: Vec<Observation>,
    /// Targets the recognizer has removed entirely.
    #[serde(default)]
    pub lost: Vec<TargetId>,
}

impl ObservationBatch {
    /// An empty batch.
    pub const fn empty() -> Self {
        Self {
            gained: Vec::new(),
            updated: Vec::new(),
            lost: Vec::new(),
        }
    }

    /// Builder: append a gained observation.
    #[must_use]
    pub fn with_gained(mut self, observation: Observation) -> Self {
        self.gained.push(observation);
        self
    }

    /// Builder: append an updated observation.
    #[must_use]
    pub fn with_updated(mut self, observation: Observation) -> Self {
        self.updated.push(observation);
        self
    }

    /// Builder: append a lost target.
    #[must_use]
    pub fn with_lost(mut self, target: impl Into<TargetId>) -> Self {
        self.lost.push(target.into());
        self
    }

    /// Whether the batch carries no changes.
    pub fn is_empty(&self) -> bool {
        self.gained.is_empty() && self.updated.is_empty() && self.lost.is_empty()
    }

    /// Total number of entries across all categories.
    pub fn len(&self) -> usize {
        self.gained
            .len()
            .saturating_add(self.updated.len())
            .saturating_add(self.lost.len())
    }
}
