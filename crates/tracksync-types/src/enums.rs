//! Enumeration types shared between the recognizer seam, the synchronizer,
//! and configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tracking quality
// ---------------------------------------------------------------------------

/// Tracking quality reported by the recognizer for one target.
///
/// Only [`TrackingQuality::Tracking`] allows an entity to exist. `Limited`
/// and `Lost` both mean loss of confidence and are handled identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingQuality {
    /// Target pose is being tracked with full confidence.
    Tracking,
    /// Target is visible but the pose estimate is degraded.
    Limited,
    /// Target is not being tracked at all.
    #[serde(alias = "none")]
    Lost,
}

impl TrackingQuality {
    /// Whether this quality permits a live entity.
    pub const fn is_tracking(self) -> bool {
        matches!(self, Self::Tracking)
    }
}

// ---------------------------------------------------------------------------
// Pose update policy
// ---------------------------------------------------------------------------

/// How a live entity's displayed pose follows its target.
///
/// A deployment picks exactly one policy; it is fixed for the lifetime of
/// the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowPolicy {
    /// Displayed pose copies every tracking observation. No anchor frame,
    /// no smoothing.
    DirectFollow,
    /// An anchor frame is pinned at first detection and never moved; the
    /// displayed pose is smoothed toward the latest observation every frame.
    #[default]
    AnchoredSmoothed,
}

impl FollowPolicy {
    /// Whether this policy keeps an anchor frame per entity.
    pub const fn uses_anchor(self) -> bool {
        matches!(self, Self::AnchoredSmoothed)
    }

    /// Whether this policy runs a per-frame follower per entity.
    pub const fn uses_follower(self) -> bool {
        matches!(self, Self::AnchoredSmoothed)
    }
}
