//! Lifecycle synchronizer: drives entity records from observation batches.
//!
//! A batch is applied category by category, in a fixed order:
//!
//! 1. **gained** -- create a record for a tracking target with none, or
//!    reactivate the existing one. Non-tracking sightings create nothing.
//! 2. **updated** -- refresh a live record (creating it if the recognizer
//!    never sent a distinct gain), or tear it down when quality drops.
//! 3. **lost** -- tear down. Unknown targets are a no-op.
//!
//! Later categories can undo earlier ones for the same target within the
//! same frame. Record construction is atomic: the anchor (if any) and the
//! visual instance are both built before the record is inserted, and a
//! failure at any step rolls back what was built. Every failure is
//! recoverable and retried on the target's next event.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};
use tracksync_types::{FollowPolicy, Observation, ObservationBatch, TargetId};

use crate::config::{ConfigError, TrackingConfig};
use crate::frame::TrackingState;
use crate::prototype::PrototypeRegistry;
use crate::scene::{SceneBackend, SceneError, SpawnRequest};
use crate::store::{AnchorFrame, EntityRecord, StoreError};

/// Why an entity could not be created.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    /// No prototype is configured for the target.
    #[error("no prototype configured for target {target}")]
    NoPrototype {
        /// The unmapped target.
        target: TargetId,
    },

    /// The scene refused to build the anchor frame.
    #[error("anchor construction failed: {source}")]
    Anchor {
        /// The underlying scene error.
        source: SceneError,
    },

    /// The scene refused to build the visual instance.
    #[error("instance construction failed: {source}")]
    Instance {
        /// The underlying scene error.
        source: SceneError,
    },

    /// The store rejected the new record.
    #[error("store rejected record: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}

/// A failed creation attempt.
#[derive(Debug)]
pub struct SpawnFailure {
    /// Target that stays unrepresented until its next event.
    pub target: TargetId,
    /// What went wrong.
    pub error: SpawnError,
}

/// What one [`LifecycleSynchronizer::apply`] call did.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Targets that got a new record.
    pub spawned: Vec<TargetId>,
    /// Targets whose existing record was re-shown by a duplicate gain.
    pub reactivated: Vec<TargetId>,
    /// Targets whose record was refreshed by an update.
    pub updated: Vec<TargetId>,
    /// Targets whose record was torn down.
    pub destroyed: Vec<TargetId>,
    /// Non-tracking gains with nothing to tear down.
    pub ignored: Vec<TargetId>,
    /// Repeated targets within one category of the batch, skipped.
    pub collisions: Vec<TargetId>,
    /// Creation attempts that failed.
    pub failures: Vec<SpawnFailure>,
}

impl ApplyReport {
    /// Whether any record was created or destroyed.
    pub fn has_lifecycle_changes(&self) -> bool {
        !self.spawned.is_empty() || !self.destroyed.is_empty()
    }
}

/// Applies observation batches to the entity record store.
#[derive(Debug, Clone)]
pub struct LifecycleSynchronizer {
    registry: PrototypeRegistry,
    policy: FollowPolicy,
}

impl LifecycleSynchronizer {
    /// Create a synchronizer with a fixed prototype registry and policy.
    pub const fn new(registry: PrototypeRegistry, policy: FollowPolicy) -> Self {
        Self { registry, policy }
    }

    /// Build a synchronizer from tracking configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Prototype`] if the prototype mappings are
    /// inconsistent.
    pub fn from_config(config: &TrackingConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.registry()?, config.policy))
    }

    /// The active pose policy.
    pub const fn policy(&self) -> FollowPolicy {
        self.policy
    }

    /// The prototype registry.
    pub const fn registry(&self) -> &PrototypeRegistry {
        &self.registry
    }

    /// Apply one batch: gained, then updated, then lost.
    pub fn apply(
        &self,
        state: &mut TrackingState,
        batch: &ObservationBatch,
        scene: &mut dyn SceneBackend,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();
        let mut seen: BTreeSet<&TargetId> = BTreeSet::new();

        for observation in &batch.gained {
            if !seen.insert(&observation.target) {
                note_collision(&mut report, &observation.target, "gained");
                continue;
            }
            self.on_gained(state, observation, scene, &mut report);
        }

        seen.clear();
        for observation in &batch.updated {
            if !seen.insert(&observation.target) {
                note_collision(&mut report, &observation.target, "updated");
                continue;
            }
            self.on_updated(state, observation, scene, &mut report);
        }

        for target in &batch.lost {
            teardown(state, target, scene, &mut report);
        }

        if !batch.is_empty() {
            debug!(
                frame = state.frame,
                spawned = report.spawned.len(),
                reactivated = report.reactivated.len(),
                updated = report.updated.len(),
                destroyed = report.destroyed.len(),
                failures = report.failures.len(),
                live = state.store.len(),
                "Batch applied"
            );
        }
        report
    }

    /// Tear down every live record, e.g. at session end.
    pub fn teardown_all(
        &self,
        state: &mut TrackingState,
        scene: &mut dyn SceneBackend,
    ) -> Vec<TargetId> {
        let targets: Vec<TargetId> = state.store.targets().cloned().collect();
        let mut report = ApplyReport::default();
        for target in &targets {
            teardown(state, target, scene, &mut report);
        }
        report.destroyed
    }

    fn on_gained(
        &self,
        state: &mut TrackingState,
        observation: &Observation,
        scene: &mut dyn SceneBackend,
        report: &mut ApplyReport,
    ) {
        if !observation.quality.is_tracking() {
            // A gain while already degraded never creates anything; if a
            // record somehow exists it must not outlive a non-tracking report.
            if !teardown(state, &observation.target, scene, report) {
                report.ignored.push(observation.target.clone());
            }
            return;
        }

        let Some(key) = state.store.key_of(&observation.target) else {
            self.spawn(state, observation, scene, report);
            return;
        };
        if let Some(record) = state.store.get_mut(key) {
            record.visible = true;
            scene.set_instance_visible(record.instance, true);
            self.refresh(record, observation, scene);
        }
        if self.policy.uses_follower() {
            state.follower.schedule(observation.target.clone(), key);
        }
        info!(target_id = %observation.target, "Entity reactivated");
        report.reactivated.push(observation.target.clone());
    }

    fn on_updated(
        &self,
        state: &mut TrackingState,
        observation: &Observation,
        scene: &mut dyn SceneBackend,
        report: &mut ApplyReport,
    ) {
        if !observation.quality.is_tracking() {
            teardown(state, &observation.target, scene, report);
            return;
        }

        if let Some(record) = state.store.find_mut(&observation.target) {
            self.refresh(record, observation, scene);
            report.updated.push(observation.target.clone());
        } else {
            debug!(target_id = %observation.target, "Update for unknown target, creating");
            self.spawn(state, observation, scene, report);
        }
    }

    /// Record the latest observation and apply the pose policy.
    fn refresh(
        &self,
        record: &mut EntityRecord,
        observation: &Observation,
        scene: &mut dyn SceneBackend,
    ) {
        record.observed_pose = observation.pose;
        record.quality = observation.quality;
        record.observation_count = record.observation_count.saturating_add(1);

        match self.policy {
            FollowPolicy::DirectFollow => {
                record.displayed_pose = observation.pose;
                scene.set_instance_pose(record.instance, &observation.pose);
            }
            // Displayed pose is advanced by the follower phase.
            FollowPolicy::AnchoredSmoothed => {}
        }
    }

    fn spawn(
        &self,
        state: &mut TrackingState,
        observation: &Observation,
        scene: &mut dyn SceneBackend,
        report: &mut ApplyReport,
    ) {
        let target = &observation.target;
        let Some(prototype) = self.registry.lookup(target) else {
            fail(report, target, SpawnError::NoPrototype {
                target: target.clone(),
            });
            return;
        };

        let anchor = if self.policy.uses_anchor() {
            match scene.spawn_anchor(target, &observation.pose) {
                Ok(id) => Some(AnchorFrame {
                    id,
                    pose: observation.pose,
                }),
                Err(source) => {
                    fail(report, target, SpawnError::Anchor { source });
                    return;
                }
            }
        } else {
            None
        };

        let request = SpawnRequest {
            target: target.clone(),
            prototype: prototype.name.clone(),
            pose: observation.pose,
            scale: prototype.scale,
        };
        let instance = match scene.spawn_instance(&request) {
            Ok(id) => id,
            Err(source) => {
                if let Some(anchor) = anchor {
                    scene.destroy_anchor(anchor.id);
                }
                fail(report, target, SpawnError::Instance { source });
                return;
            }
        };

        let record = EntityRecord {
            target: target.clone(),
            prototype: request.prototype,
            instance,
            anchor,
            displayed_pose: observation.pose,
            observed_pose: observation.pose,
            quality: observation.quality,
            visible: true,
            spawned_frame: state.frame,
            observation_count: 1,
        };

        match state.store.insert(record) {
            Ok(key) => {
                if self.policy.uses_follower() {
                    state.follower.schedule(target.clone(), key);
                }
                info!(
                    target_id = %target,
                    instance = %instance,
                    anchored = anchor.is_some(),
                    frame = state.frame,
                    "Entity spawned"
                );
                report.spawned.push(target.clone());
            }
            Err(source) => {
                scene.destroy_instance(instance);
                if let Some(anchor) = anchor {
                    scene.destroy_anchor(anchor.id);
                }
                fail(report, target, SpawnError::from(source));
            }
        }
    }
}

/// Destroy the record for `target`, if any. Returns whether one existed.
fn teardown(
    state: &mut TrackingState,
    target: &TargetId,
    scene: &mut dyn SceneBackend,
    report: &mut ApplyReport,
) -> bool {
    // Cancel first so no follower can observe a half-destroyed record.
    state.follower.cancel(target);
    let Some(record) = state.store.remove(target) else {
        return false;
    };

    scene.destroy_instance(record.instance);
    if let Some(anchor) = record.anchor {
        scene.destroy_anchor(anchor.id);
    }
    info!(
        target_id = %target,
        lived_frames = state.frame.saturating_sub(record.spawned_frame),
        "Entity destroyed"
    );
    report.destroyed.push(target.clone());
    true
}

fn fail(report: &mut ApplyReport, target: &TargetId, error: SpawnError) {
    warn!(target_id = %target, error = %error, "Entity not created, will retry on next event");
    report.failures.push(SpawnFailure {
        target: target.clone(),
        error,
    });
}

fn note_collision(report: &mut ApplyReport, target: &TargetId, category: &'static str) {
    warn!(
        target_id = %target,
        category,
        "Target reported twice in one batch, ignoring repeat"
    );
    report.collisions.push(target.clone());
}
