//! Scene backend that logs requests instead of rendering.
//!
//! [`LoggingScene`] stands in for a renderer when replaying a script from
//! the command line. It keeps just enough bookkeeping to enforce the
//! configured instance limit and to report what is still live when the
//! session ends.

use std::collections::BTreeMap;

use tracing::{debug, info, trace, warn};
use tracksync_core::scene::{SceneBackend, SceneError, SpawnRequest};
use tracksync_types::{AnchorId, InstanceId, Pose, TargetId};

/// A live instance as the logging scene sees it.
#[derive(Debug, Clone)]
struct LiveInstance {
    target: TargetId,
    prototype: String,
    visible: bool,
}

/// Scene backend that writes every request to the log.
#[derive(Debug)]
pub struct LoggingScene {
    max_instances: usize,
    instances: BTreeMap<InstanceId, LiveInstance>,
    anchors: BTreeMap<AnchorId, TargetId>,
    pose_writes: u64,
}

impl LoggingScene {
    /// Create a scene that refuses to hold more than `max_instances`.
    pub const fn new(max_instances: usize) -> Self {
        Self {
            max_instances,
            instances: BTreeMap::new(),
            anchors: BTreeMap::new(),
            pose_writes: 0,
        }
    }

    /// Number of live instances.
    pub fn live_instances(&self) -> usize {
        self.instances.len()
    }

    /// Number of live anchors.
    pub fn live_anchors(&self) -> usize {
        self.anchors.len()
    }

    /// Pose writes received so far.
    pub const fn pose_writes(&self) -> u64 {
        self.pose_writes
    }
}

impl SceneBackend for LoggingScene {
    fn spawn_instance(&mut self, request: &SpawnRequest) -> Result<InstanceId, SceneError> {
        if self.instances.len() >= self.max_instances {
            warn!(
                target_id = %request.target,
                prototype = %request.prototype,
                capacity = self.max_instances,
                "Scene full, refusing instance"
            );
            return Err(SceneError::CapacityExceeded {
                capacity: self.max_instances,
            });
        }

        let id = InstanceId::new();
        info!(
            target_id = %request.target,
            prototype = %request.prototype,
            instance = %id,
            x = request.pose.position.x,
            y = request.pose.position.y,
            z = request.pose.position.z,
            scale = request.scale,
            "Instance spawned"
        );
        self.instances.insert(
            id,
            LiveInstance {
                target: request.target.clone(),
                prototype: request.prototype.clone(),
                visible: true,
            },
        );
        Ok(id)
    }

    fn set_instance_pose(&mut self, instance: InstanceId, pose: &Pose) {
        if let Some(live) = self.instances.get(&instance) {
            self.pose_writes = self.pose_writes.saturating_add(1);
            trace!(
                target_id = %live.target,
                x = pose.position.x,
                y = pose.position.y,
                z = pose.position.z,
                "Instance moved"
            );
        } else {
            debug!(%instance, "Pose write for unknown instance ignored");
        }
    }

    fn set_instance_visible(&mut self, instance: InstanceId, visible: bool) {
        if let Some(live) = self.instances.get_mut(&instance) {
            if live.visible != visible {
                debug!(target_id = %live.target, visible, "Instance visibility changed");
            }
            live.visible = visible;
        }
    }

    fn destroy_instance(&mut self, instance: InstanceId) {
        match self.instances.remove(&instance) {
            Some(live) => info!(
                target_id = %live.target,
                prototype = %live.prototype,
                %instance,
                "Instance destroyed"
            ),
            None => debug!(%instance, "Destroy for unknown instance ignored"),
        }
    }

    fn spawn_anchor(&mut self, target: &TargetId, pose: &Pose) -> Result<AnchorId, SceneError> {
        let id = AnchorId::new();
        debug!(
            target_id = %target,
            anchor = %id,
            x = pose.position.x,
            y = pose.position.y,
            z = pose.position.z,
            "Anchor placed"
        );
        self.anchors.insert(id, target.clone());
        Ok(id)
    }

    fn destroy_anchor(&mut self, anchor: AnchorId) {
        if let Some(target) = self.anchors.remove(&anchor) {
            debug!(target_id = %target, %anchor, "Anchor removed");
        }
    }
}
