//! Shared type definitions for the Tracksync tracked-entity synchronizer.
//!
//! This crate is the single source of truth for the data that crosses the
//! seams of the system: what the recognizer reports, and the handles the
//! scene hands back.
//!
//! # Modules
//!
//! - [`ids`] -- Target identifiers and typed scene handles
//! - [`enums`] -- Tracking quality and pose follow policy
//! - [`pose`] -- Position plus unit orientation
//! - [`observation`] -- Observations and per-frame change batches

pub mod enums;
pub mod ids;
pub mod observation;
pub mod pose;

// Re-export all public types at crate root for convenience.
pub use enums::{FollowPolicy, TrackingQuality};
pub use ids::{AnchorId, InstanceId, TargetId};
pub use observation::{Observation, ObservationBatch};
pub use pose::Pose;

// Pose math types, re-exported so downstream crates agree on one version.
pub use glam::{EulerRot, Quat, Vec3};
