//! Lifecycle synchronizer, pose smoothing, and frame cycle for Tracksync.
//!
//! This crate keeps one spawned visual entity per tracked target, created
//! and destroyed exactly once per tracking session, with a displayed pose
//! that follows the target under a configurable policy.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `tracksync-config.yaml` into
//!   strongly-typed structs.
//! - [`follower`] -- Per-frame smoothing tasks holding generation-checked
//!   keys into the store.
//! - [`frame`] -- The two-phase frame step (synchronize, then follow).
//! - [`prototype`] -- Target to prototype mapping.
//! - [`runner`] -- The paced frame loop.
//! - [`scene`] -- [`SceneBackend`] trait and [`RecordingScene`].
//! - [`smoother`] -- Frame-rate-independent exponential pose smoothing.
//! - [`source`] -- [`ObservationSource`] trait and [`ScriptedSource`].
//! - [`store`] -- The entity record store.
//! - [`synchronizer`] -- Applies observation batches to the store.
//!
//! [`SceneBackend`]: scene::SceneBackend
//! [`RecordingScene`]: scene::RecordingScene
//! [`ObservationSource`]: source::ObservationSource
//! [`ScriptedSource`]: source::ScriptedSource

pub mod config;
pub mod follower;
pub mod frame;
pub mod prototype;
pub mod runner;
pub mod scene;
pub mod smoother;
pub mod source;
pub mod store;
pub mod synchronizer;

pub use frame::{FrameSummary, TrackingState, run_frame};
pub use synchronizer::{ApplyReport, LifecycleSynchronizer, SpawnError};
