//! Continuous follower: per-frame smoothing of displayed poses.
//!
//! Under [`FollowPolicy::AnchoredSmoothed`] every live record has one
//! follow task. A task holds only the record's generation-checked
//! [`EntityKey`], never the scene instance handle. Each frame the task
//! re-resolves its key; if the record is gone (stale generation) or its
//! quality has left `Tracking`, the task retires itself without touching
//! the scene. The synchronizer also cancels tasks synchronously on
//! teardown, so a follower can never write to a destroyed instance.
//!
//! [`FollowPolicy::AnchoredSmoothed`]: tracksync_types::FollowPolicy::AnchoredSmoothed

use std::collections::BTreeMap;

use tracing::debug;
use tracksync_types::TargetId;

use crate::scene::SceneBackend;
use crate::smoother::{self, SmoothingStrength};
use crate::store::{EntityKey, EntityRecordStore};

/// Outcome of one follower phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowSummary {
    /// Tasks that advanced their record this frame.
    pub advanced: usize,
    /// Tasks that found their record gone or not tracking and retired.
    pub retired: Vec<TargetId>,
}

/// Scheduler of per-entity follow tasks.
#[derive(Debug, Clone)]
pub struct ContinuousFollower {
    strength: SmoothingStrength,
    tasks: BTreeMap<TargetId, EntityKey>,
}

impl ContinuousFollower {
    /// Create a follower with no tasks.
    pub const fn new(strength: SmoothingStrength) -> Self {
        Self {
            strength,
            tasks: BTreeMap::new(),
        }
    }

    /// Smoothing strength applied each frame.
    pub const fn strength(&self) -> SmoothingStrength {
        self.strength
    }

    /// Schedule (or re-point) the task for `target`.
    pub fn schedule(&mut self, target: TargetId, key: EntityKey) {
        self.tasks.insert(target, key);
    }

    /// Cancel the task for `target`. Returns whether one was scheduled.
    pub fn cancel(&mut self, target: &TargetId) -> bool {
        self.tasks.remove(target).is_some()
    }

    /// Whether a task is scheduled for `target`.
    pub fn is_scheduled(&self, target: &TargetId) -> bool {
        self.tasks.contains_key(target)
    }

    /// Number of scheduled tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks are scheduled.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every scheduled task once.
    ///
    /// Reads each record's observed pose and writes only its displayed pose;
    /// never inserts or removes records.
    pub fn advance(
        &mut self,
        store: &mut EntityRecordStore,
        scene: &mut dyn SceneBackend,
        dt: f32,
    ) -> FollowSummary {
        let strength = self.strength;
        let mut summary = FollowSummary::default();

        self.tasks.retain(|target, key| {
            let Some(record) = store.get_mut(*key) else {
                debug!(target_id = %target, "Follow task retired: record gone");
                summary.retired.push(target.clone());
                return false;
            };
            if !record.quality.is_tracking() {
                debug!(target_id = %target, "Follow task retired: not tracking");
                summary.retired.push(target.clone());
                return false;
            }

            let next = smoother::step(&record.displayed_pose, &record.observed_pose, strength, dt);
            if next != record.displayed_pose {
                record.displayed_pose = next;
                scene.set_instance_pose(record.instance, &next);
            }
            summary.advanced = summary.advanced.saturating_add(1);
            true
        });

        summary
    }
}
