//! Replay scripts: recorded recognizer output fed back frame by frame.
//!
//! A replay is a YAML file listing the observation batch for each frame
//! that had changes:
//!
//! ```yaml
//! frames:
//!   - frame: 1
//!     gained:
//!       - target: dragon_card
//!         pose: { position: [0.0, 0.0, -0.5] }
//!         quality: tracking
//!   - frame: 40
//!     lost: [dragon_card]
//! ```
//!
//! Frames are numbered from 1. Entries for the same frame are merged.
//! Optional jitter perturbs every tracking pose with seeded noise so the
//! smoothing path can be observed against a noisy recognizer.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::debug;
use tracksync_core::config::JitterConfig;
use tracksync_core::source::ScriptedSource;
use tracksync_types::{EulerRot, Observation, ObservationBatch, Pose, Quat, Vec3};

use crate::error::EngineError;

/// One scripted frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayFrame {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Changes reported on that frame.
    #[serde(flatten)]
    pub batch: ObservationBatch,
}

/// A parsed replay script.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayScript {
    /// Scripted frames, in any order.
    #[serde(default)]
    pub frames: Vec<ReplayFrame>,
}

impl ReplayScript {
    /// Load a replay script from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ReplayIo`] if the file cannot be read, or
    /// [`EngineError::Replay`] if it is not a valid script.
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path).map_err(|source| EngineError::ReplayIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse and validate a replay script from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Replay`] if the YAML is malformed or a frame
    /// number is 0.
    pub fn parse(yaml: &str) -> Result<Self, EngineError> {
        let script: Self = serde_yml::from_str(yaml).map_err(|e| EngineError::Replay {
            message: e.to_string(),
        })?;
        if script.frames.iter().any(|entry| entry.frame == 0) {
            return Err(EngineError::Replay {
                message: "frame numbers start at 1".to_owned(),
            });
        }
        Ok(script)
    }

    /// Total observations and losses across all frames.
    pub fn event_count(&self) -> usize {
        self.frames.iter().map(|entry| entry.batch.len()).sum()
    }

    /// Turn the script into an observation source, applying jitter.
    pub fn into_source(self, jitter: &JitterConfig) -> ScriptedSource {
        let mut noise = jitter.is_enabled().then(|| Jitter::new(jitter));
        self.frames
            .into_iter()
            .map(|entry| {
                let batch = match noise.as_mut() {
                    Some(noise) => noise.perturb_batch(entry.batch),
                    None => entry.batch,
                };
                (entry.frame, batch)
            })
            .collect()
    }
}

/// Seeded pose noise.
struct Jitter {
    rng: StdRng,
    position: f32,
    rotation_radians: f32,
}

impl Jitter {
    fn new(config: &JitterConfig) -> Self {
        debug!(
            position = config.position,
            rotation_degrees = config.rotation_degrees,
            seed = config.seed,
            "Replay jitter enabled"
        );
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            position: config.position,
            rotation_radians: config.rotation_degrees.to_radians(),
        }
    }

    fn perturb_batch(&mut self, mut batch: ObservationBatch) -> ObservationBatch {
        for observation in batch.gained.iter_mut().chain(batch.updated.iter_mut()) {
            self.perturb(observation);
        }
        batch
    }

    /// Only tracking observations carry a pose worth displaying.
    fn perturb(&mut self, observation: &mut Observation) {
        if !observation.quality.is_tracking() {
            return;
        }
        let position = observation.pose.position;
        let offset = self.sample_vec(self.position);
        let turn = self.sample_vec(self.rotation_radians);
        let noise = Quat::from_euler(EulerRot::XYZ, turn.x, turn.y, turn.z);
        observation.pose = Pose::new(
            Vec3::new(
                position.x + offset.x,
                position.y + offset.y,
                position.z + offset.z,
            ),
            noise.mul_quat(observation.pose.rotation),
        );
    }

    fn sample_vec(&mut self, max: f32) -> Vec3 {
        if max <= 0.0 {
            return Vec3::ZERO;
        }
        Vec3::new(
            self.rng.random_range(-max..=max),
            self.rng.random_range(-max..=max),
            self.rng.random_range(-max..=max),
        )
    }
}
