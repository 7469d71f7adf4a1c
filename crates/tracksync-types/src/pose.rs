//! Rigid poses in the shared world frame.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position plus unit orientation in the shared world/reference frame.
///
/// The rotation is normalized on construction and on deserialization, so a
/// `Pose` always carries a unit quaternion. A degenerate (zero-length or
/// non-finite) rotation becomes [`Quat::IDENTITY`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "PoseRepr", into = "PoseRepr")]
pub struct Pose {
    /// Position in world units (meters).
    pub position: Vec3,
    /// Orientation as a unit quaternion.
    pub rotation: Quat,
}

impl Pose {
    /// The pose at the origin with no rotation.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Build a pose, normalizing the rotation.
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation: unit_or_identity(rotation),
        }
    }

    /// Build a pose at `position` with no rotation.
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Euclidean distance between the two positions.
    pub fn distance_to(&self, other: &Self) -> f32 {
        self.position.distance(other.position)
    }

    /// Smallest angle (radians) between the two orientations.
    pub fn angle_to(&self, other: &Self) -> f32 {
        self.rotation.angle_between(other.rotation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn unit_or_identity(rotation: Quat) -> Quat {
    let len = rotation.length();
    if len.is_finite() && len > f32::EPSILON {
        rotation.normalize()
    } else {
        Quat::IDENTITY
    }
}

/// Wire form of a [`Pose`]: `position: [x, y, z]`, `rotation: [x, y, z, w]`.
#[derive(Serialize, Deserialize)]
struct PoseRepr {
    position: Vec3,
    #[serde(default = "identity_rotation")]
    rotation: Quat,
}

const fn identity_rotation() -> Quat {
    Quat::IDENTITY
}

impl From<PoseRepr> for Pose {
    fn from(repr: PoseRepr) -> Self {
        Self::new(repr.position, repr.rotation)
    }
}

impl From<Pose> for PoseRepr {
    fn from(pose: Pose) -> Self {
        Self {
            position: pose.position,
            rotation: pose.rotation,
        }
    }
}
