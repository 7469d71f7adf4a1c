//! Replay driver for the Tracksync lifecycle synchronizer.
//!
//! This is the main entry point that wires together the synchronizer, a
//! scripted recognizer, and a logging scene backend. It loads
//! configuration, initializes all subsystems, and runs the frame loop
//! until the replay is exhausted, the frame limit is hit, or the process
//! is interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `tracksync-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the prototype registry and synchronizer
//! 4. Load the replay script as the observation source
//! 5. Run the session
//! 6. Tear down every live entity and log the result

mod callback;
mod error;
mod log_scene;
mod replay;

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracksync_core::config::{LogFormat, LoggingConfig, TracksyncConfig};
use tracksync_core::runner::{self, SessionLimits};
use tracksync_core::{LifecycleSynchronizer, TrackingState};

use crate::callback::LoggingCallback;
use crate::error::EngineError;
use crate::log_scene::LoggingScene;
use crate::replay::ReplayScript;

/// Default config file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "tracksync-config.yaml";

/// Application entry point for the replay driver.
///
/// # Errors
///
/// Returns an error if any initialization step or the session fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = config_path();
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(config = %config_path.display(), "tracksync-engine starting");

    // 3. Build the synchronizer.
    let synchronizer = LifecycleSynchronizer::from_config(&config.tracking)?;
    info!(
        policy = ?synchronizer.policy(),
        prototypes = synchronizer.registry().len(),
        smoothing_position = config.tracking.smoothing.position,
        smoothing_rotation = config.tracking.smoothing.rotation,
        "Synchronizer configured"
    );

    // 4. Load the replay.
    let script = ReplayScript::from_file(&config.session.replay)?;
    info!(
        replay = %config.session.replay.display(),
        frames = script.frames.len(),
        events = script.event_count(),
        jitter = config.session.jitter.is_enabled(),
        "Replay loaded"
    );
    let mut source = script.into_source(&config.session.jitter);

    // 5. Run the session.
    let mut state = TrackingState::new(config.tracking.smoothing);
    let mut scene = LoggingScene::new(config.scene.max_instances);
    let mut callback = LoggingCallback::new();
    let limits = SessionLimits::from_config(&config.session);
    let started_at = Utc::now();

    let outcome = tokio::select! {
        result = runner::run_session(
            &mut state,
            &synchronizer,
            &mut source,
            &mut scene,
            &limits,
            &mut callback,
        ) => Some(result.map_err(EngineError::from)?),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, ending session");
            None
        }
    };

    // 6. Tear down and report.
    let destroyed = synchronizer.teardown_all(&mut state, &mut scene);
    let finished_at = Utc::now();
    let totals = callback.totals();

    info!(
        end_reason = ?outcome.as_ref().map(|result| result.end_reason),
        frames = state.frame,
        started_at = %started_at.to_rfc3339(),
        finished_at = %finished_at.to_rfc3339(),
        elapsed_ms = finished_at.signed_duration_since(started_at).num_milliseconds(),
        spawned = totals.spawned,
        reactivated = totals.reactivated,
        destroyed = totals.destroyed,
        failures = totals.failures,
        collisions = totals.collisions,
        peak_live = totals.peak_live,
        torn_down_at_exit = destroyed.len(),
        pose_writes = scene.pose_writes(),
        "Session summary"
    );

    if scene.live_instances() > 0 || scene.live_anchors() > 0 {
        warn!(
            instances = scene.live_instances(),
            anchors = scene.live_anchors(),
            "Scene objects left behind after teardown"
        );
    }

    info!("tracksync-engine shutdown complete");
    Ok(())
}

/// Resolve the config path from `TRACKSYNC_CONFIG`, falling back to the
/// default file name.
fn config_path() -> PathBuf {
    std::env::var("TRACKSYNC_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load configuration, using defaults when the file does not exist.
fn load_config(path: &Path) -> Result<TracksyncConfig, EngineError> {
    if path.exists() {
        Ok(TracksyncConfig::from_file(path)?)
    } else {
        // Logging is not up yet.
        eprintln!("config file {} not found, using defaults", path.display());
        Ok(TracksyncConfig::default())
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
