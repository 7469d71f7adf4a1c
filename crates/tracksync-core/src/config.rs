//! Configuration loading and typed config structures for Tracksync.
//!
//! The canonical configuration lives in `tracksync-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads and validates the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracksync_types::FollowPolicy;

use crate::prototype::{PrototypeError, PrototypeMapping, PrototypeRegistry};
use crate::smoother::SmoothingStrength;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The prototype mappings are inconsistent.
    #[error("invalid prototype mapping: {source}")]
    Prototype {
        /// The underlying registry error.
        #[from]
        source: PrototypeError,
    },

    /// A value is outside its allowed range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `tracksync-config.yaml`. Every section is
/// optional and falls back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TracksyncConfig {
    /// Synchronizer settings (policy, smoothing, prototypes).
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Frame loop and replay settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Scene backend limits.
    #[serde(default)]
    pub scene: SceneConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TracksyncConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// The `TRACKSYNC_REPLAY` environment variable overrides
    /// `session.replay`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or a
    /// validation error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.session.apply_env_overrides();
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or a
    /// validation error.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges across all sections.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tracking.validate()?;
        if self.session.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: "session.frame_interval_ms must be at least 1".to_owned(),
            });
        }
        self.session.jitter.validate()?;
        Ok(())
    }
}

/// Synchronizer configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrackingConfig {
    /// Pose follow policy for the whole deployment.
    #[serde(default)]
    pub policy: FollowPolicy,

    /// Smoothing strengths used by the follower.
    #[serde(default)]
    pub smoothing: SmoothingStrength,

    /// Which prototype to spawn for each target.
    #[serde(default)]
    pub prototypes: Vec<PrototypeMapping>,
}

impl TrackingConfig {
    /// Check strengths and prototype mappings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a strength outside `[0, 1]`, or
    /// [`ConfigError::Prototype`] for inconsistent mappings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_strength("tracking.smoothing.position", self.smoothing.position)?;
        check_strength("tracking.smoothing.rotation", self.smoothing.rotation)?;
        self.registry()?;
        Ok(())
    }

    /// Build the prototype registry from the configured mappings.
    ///
    /// # Errors
    ///
    /// Returns [`PrototypeError`] on duplicate targets or bad scales.
    pub fn registry(&self) -> Result<PrototypeRegistry, PrototypeError> {
        PrototypeRegistry::from_mappings(&self.prototypes)
    }
}

fn check_strength(name: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            reason: format!("{name} must be within [0, 1], got {value}"),
        })
    }
}

/// Frame loop and replay configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionConfig {
    /// Target milliseconds between frames.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Stop after this many frames. `None` runs until the source is exhausted.
    #[serde(default)]
    pub max_frames: Option<u64>,

    /// Path of the replay script to feed the synchronizer.
    #[serde(default = "default_replay_path")]
    pub replay: PathBuf,

    /// Synthetic recognizer noise added to replayed poses.
    #[serde(default)]
    pub jitter: JitterConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
            max_frames: None,
            replay: default_replay_path(),
            jitter: JitterConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Override fields from environment variables where set.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TRACKSYNC_REPLAY") {
            self.replay = PathBuf::from(path);
        }
    }
}

/// Synthetic pose noise for replays.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JitterConfig {
    /// Maximum per-axis position offset, in meters.
    #[serde(default)]
    pub position: f32,

    /// Maximum per-axis rotation offset, in degrees.
    #[serde(default)]
    pub rotation_degrees: f32,

    /// Seed for reproducible noise.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl JitterConfig {
    /// Whether any noise is configured.
    pub fn is_enabled(&self) -> bool {
        self.position > 0.0 || self.rotation_degrees > 0.0
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("session.jitter.position", self.position),
            ("session.jitter.rotation_degrees", self.rotation_degrees),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    reason: format!("{name} must be a non-negative number, got {value}"),
                });
            }
        }
        Ok(())
    }
}

/// Scene backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SceneConfig {
    /// Maximum number of simultaneously live visual instances.
    #[serde(default = "default_max_instances")]
    pub max_instances: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            max_instances: default_max_instances(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

const fn default_frame_interval_ms() -> u64 {
    16
}

fn default_replay_path() -> PathBuf {
    PathBuf::from("replays/demo.yaml")
}

const fn default_seed() -> u64 {
    42
}

const fn default_max_instances() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TracksyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tracking.policy, FollowPolicy::AnchoredSmoothed);
        assert_eq!(config.tracking.smoothing.position, 0.15);
        assert_eq!(config.session.frame_interval_ms, 16);
        assert_eq!(config.scene.max_instances, 32);
        assert!(!config.session.jitter.is_enabled());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
tracking:
  policy: direct_follow
  smoothing:
    position: 0.3
    rotation: 0.1
  prototypes:
    - target: dragon_card
      prototype: dragon
      scale: 0.2
    - target: knight_card
      prototype: knight

session:
  frame_interval_ms: 33
  max_frames: 120
  replay: "replays/two_cards.yaml"
  jitter:
    position: 0.002
    rotation_degrees: 0.5
    seed: 7

scene:
  max_instances: 4

logging:
  level: "debug"
  format: json
"#;

        let config = TracksyncConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.tracking.policy, FollowPolicy::DirectFollow);
        assert_eq!(config.tracking.smoothing.rotation, 0.1);
        assert_eq!(config.tracking.prototypes.len(), 2);
        assert_eq!(
            config.tracking.prototypes.get(1).map(|m| m.scale),
            Some(1.0)
        );
        assert_eq!(config.session.max_frames, Some(120));
        assert!(config.session.jitter.is_enabled());
        assert_eq!(config.scene.max_instances, 4);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = TracksyncConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn strength_out_of_range_is_rejected() {
        let yaml = "tracking:\n  smoothing:\n    position: 1.5\n";
        let config = TracksyncConfig::parse(yaml);
        assert!(matches!(config, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn duplicate_prototype_target_is_rejected() {
        let yaml = r"
tracking:
  prototypes:
    - target: card
      prototype: a
    - target: card
      prototype: b
";
        let config = TracksyncConfig::parse(yaml);
        assert!(matches!(config, Err(ConfigError::Prototype { .. })));
    }

    #[test]
    fn zero_frame_interval_is_rejected() {
        let config = TracksyncConfig::parse("session:\n  frame_interval_ms: 0\n");
        assert!(matches!(config, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("tracksync-config.yaml");
        if path.exists() {
            let config = TracksyncConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
