//! Scene collaborator trait and an in-memory recording implementation.
//!
//! The synchronizer never renders anything. It issues construct, pose,
//! visibility, and destroy requests through [`SceneBackend`]; the rendering
//! system on the other side owns the actual objects. [`RecordingScene`]
//! keeps every request in memory so tests can assert on what the
//! synchronizer asked for.

use std::collections::{BTreeMap, BTreeSet};

use tracksync_types::{AnchorId, InstanceId, Pose, TargetId};

/// Errors a scene backend may return when constructing objects.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The backend refused to construct the prototype.
    #[error("prototype {prototype} could not be instantiated: {reason}")]
    InstantiationFailed {
        /// Prototype name.
        prototype: String,
        /// Backend-supplied reason.
        reason: String,
    },

    /// The backend refused to construct an anchor frame.
    #[error("anchor for {target} could not be created: {reason}")]
    AnchorFailed {
        /// Target the anchor was for.
        target: TargetId,
        /// Backend-supplied reason.
        reason: String,
    },

    /// The backend has no room for more objects.
    #[error("scene capacity exceeded ({capacity} instances)")]
    CapacityExceeded {
        /// Configured limit.
        capacity: usize,
    },
}

/// Request to construct one visual instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    /// Target the instance represents.
    pub target: TargetId,
    /// Prototype to instantiate.
    pub prototype: String,
    /// Initial world pose.
    pub pose: Pose,
    /// Uniform scale.
    pub scale: f32,
}

/// Output side of the synchronizer: the rendering/scene system.
///
/// Construction may fail; every other request is fire-and-forget. Requests
/// naming a handle the backend no longer knows must be ignored.
pub trait SceneBackend {
    /// Construct a visual instance.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError`] if the instance cannot be constructed.
    fn spawn_instance(&mut self, request: &SpawnRequest) -> Result<InstanceId, SceneError>;

    /// Write the displayed pose of an instance.
    fn set_instance_pose(&mut self, instance: InstanceId, pose: &Pose);

    /// Show or hide an instance.
    fn set_instance_visible(&mut self, instance: InstanceId, visible: bool);

    /// Destroy an instance.
    fn destroy_instance(&mut self, instance: InstanceId);

    /// Construct an anchor frame pinned at `pose`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError`] if the anchor cannot be constructed.
    fn spawn_anchor(&mut self, target: &TargetId, pose: &Pose) -> Result<AnchorId, SceneError>;

    /// Destroy an anchor frame.
    fn destroy_anchor(&mut self, anchor: AnchorId);
}

/// An instance as seen by [`RecordingScene`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedInstance {
    /// Target the instance was spawned for.
    pub target: TargetId,
    /// Prototype name.
    pub prototype: String,
    /// Last pose written.
    pub pose: Pose,
    /// Current visibility.
    pub visible: bool,
    /// Spawn scale.
    pub scale: f32,
    /// Number of pose writes received.
    pub pose_writes: u64,
}

/// Anchor as seen by [`RecordingScene`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAnchor {
    /// Target the anchor was created for.
    pub target: TargetId,
    /// Pinned pose.
    pub pose: Pose,
}

/// Scene backend that records every request in memory.
#[derive(Debug, Default)]
pub struct RecordingScene {
    instances: BTreeMap<InstanceId, RecordedInstance>,
    anchors: BTreeMap<AnchorId, RecordedAnchor>,
    rejected_prototypes: BTreeSet<String>,
    reject_anchors: bool,
    spawned_total: u64,
    destroyed_total: u64,
    stale_requests: u64,
}

impl RecordingScene {
    /// Create an empty scene that accepts every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future spawn of `prototype` fail.
    pub fn reject_prototype(&mut self, prototype: &str) {
        self.rejected_prototypes.insert(prototype.to_owned());
    }

    /// Allow `prototype` to spawn again.
    pub fn accept_prototype(&mut self, prototype: &str) {
        self.rejected_prototypes.remove(prototype);
    }

    /// Make anchor construction fail (or succeed again).
    pub const fn set_reject_anchors(&mut self, reject: bool) {
        self.reject_anchors = reject;
    }

    /// Live instances.
    pub const fn instances(&self) -> &BTreeMap<InstanceId, RecordedInstance> {
        &self.instances
    }

    /// Live anchors.
    pub const fn anchors(&self) -> &BTreeMap<AnchorId, RecordedAnchor> {
        &self.anchors
    }

    /// Live instances spawned for `target`.
    pub fn instances_for(&self, target: &TargetId) -> Vec<&RecordedInstance> {
        self.instances
            .values()
            .filter(|instance| &instance.target == target)
            .collect()
    }

    /// Live anchors created for `target`.
    pub fn anchors_for(&self, target: &TargetId) -> Vec<&RecordedAnchor> {
        self.anchors
            .values()
            .filter(|anchor| &anchor.target == target)
            .collect()
    }

    /// Instances ever spawned.
    pub const fn spawned_total(&self) -> u64 {
        self.spawned_total
    }

    /// Instances ever destroyed.
    pub const fn destroyed_total(&self) -> u64 {
        self.destroyed_total
    }

    /// Requests that named a handle which was not alive.
    pub const fn stale_requests(&self) -> u64 {
        self.stale_requests
    }

    fn note_stale(&mut self) {
        self.stale_requests = self.stale_requests.saturating_add(1);
    }
}

impl SceneBackend for RecordingScene {
    fn spawn_instance(&mut self, request: &SpawnRequest) -> Result<InstanceId, SceneError> {
        if self.rejected_prototypes.contains(&request.prototype) {
            return Err(SceneError::InstantiationFailed {
                prototype: request.prototype.clone(),
                reason: String::from("rejected by recording scene"),
            });
        }
        let id = InstanceId::new();
        self.instances.insert(
            id,
            RecordedInstance {
                target: request.target.clone(),
                prototype: request.prototype.clone(),
                pose: request.pose,
                visible: true,
                scale: request.scale,
                pose_writes: 0,
            },
        );
        self.spawned_total = self.spawned_total.saturating_add(1);
        Ok(id)
    }

    fn set_instance_pose(&mut self, instance: InstanceId, pose: &Pose) {
        if let Some(recorded) = self.instances.get_mut(&instance) {
            recorded.pose = *pose;
            recorded.pose_writes = recorded.pose_writes.saturating_add(1);
        } else {
            self.note_stale();
        }
    }

    fn set_instance_visible(&mut self, instance: InstanceId, visible: bool) {
        if let Some(recorded) = self.instances.get_mut(&instance) {
            recorded.visible = visible;
        } else {
            self.note_stale();
        }
    }

    fn destroy_instance(&mut self, instance: InstanceId) {
        if self.instances.remove(&instance).is_some() {
            self.destroyed_total = self.destroyed_total.saturating_add(1);
        } else {
            self.note_stale();
        }
    }

    fn spawn_anchor(&mut self, target: &TargetId, pose: &Pose) -> Result<AnchorId, SceneError> {
        if self.reject_anchors {
            return Err(SceneError::AnchorFailed {
                target: target.clone(),
                reason: String::from("rejected by recording scene"),
            });
        }
        let id = AnchorId::new();
        self.anchors.insert(
            id,
            RecordedAnchor {
                target: target.clone(),
                pose: *pose,
            },
        );
        Ok(id)
    }

    fn destroy_anchor(&mut self, anchor: AnchorId) {
        if self.anchors.remove(&anchor).is_none() {
            self.note_stale();
        }
    }
}
