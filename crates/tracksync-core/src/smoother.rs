//! Frame-rate-independent exponential pose smoothing.
//!
//! The strength constants were tuned against a 60 fps render loop, so the
//! per-call blend factor is rescaled by the actual frame time:
//!
//! ```text
//! alpha = 1 - (1 - strength) ^ (dt * 60)
//! ```
//!
//! Position is linearly interpolated and orientation is spherically
//! interpolated along the shortest arc, each with its own strength. An
//! `alpha` of 1 snaps exactly to the target and an `alpha` of 0 leaves the
//! current pose untouched.

use serde::{Deserialize, Serialize};
use tracksync_types::{Pose, Quat, Vec3};

/// Frame rate the smoothing strengths are calibrated against.
pub const REFERENCE_FRAME_RATE: f32 = 60.0;

/// Per-frame smoothing strengths, each in `[0, 1]`.
///
/// A strength of 0 never moves; a strength of 1 snaps on the first frame.
/// Out-of-range values are clamped when used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingStrength {
    /// Strength applied to position.
    #[serde(default = "default_strength")]
    pub position: f32,
    /// Strength applied to orientation.
    #[serde(default = "default_strength")]
    pub rotation: f32,
}

impl SmoothingStrength {
    /// Use the same strength for position and orientation.
    pub const fn uniform(strength: f32) -> Self {
        Self {
            position: strength,
            rotation: strength,
        }
    }

    /// Strength that snaps to the target every frame.
    pub const SNAP: Self = Self::uniform(1.0);
}

impl Default for SmoothingStrength {
    fn default() -> Self {
        Self::uniform(default_strength())
    }
}

const fn default_strength() -> f32 {
    0.15
}

/// Compute the blend factor for one step of `dt` seconds.
///
/// Returns a value in `[0, 1]`. NaN strength counts as 0; NaN or
/// non-positive `dt` yields 0.
pub fn blend_factor(strength: f32, dt: f32) -> f32 {
    let strength = if strength.is_nan() {
        0.0
    } else {
        strength.clamp(0.0, 1.0)
    };
    if dt.is_nan() || dt <= 0.0 {
        return 0.0;
    }
    let remaining = (1.0 - strength).powf(dt * REFERENCE_FRAME_RATE);
    (1.0 - remaining).clamp(0.0, 1.0)
}

/// Advance `current` toward `target` by one step of `dt` seconds.
pub fn step(current: &Pose, target: &Pose, strength: SmoothingStrength, dt: f32) -> Pose {
    let position_alpha = blend_factor(strength.position, dt);
    let rotation_alpha = blend_factor(strength.rotation, dt);
    Pose {
        position: lerp_position(current.position, target.position, position_alpha),
        rotation: slerp_rotation(current.rotation, target.rotation, rotation_alpha),
    }
}

fn lerp_position(from: Vec3, to: Vec3, alpha: f32) -> Vec3 {
    if alpha >= 1.0 {
        to
    } else if alpha <= 0.0 {
        from
    } else {
        from.lerp(to, alpha)
    }
}

fn slerp_rotation(from: Quat, to: Quat, alpha: f32) -> Quat {
    if alpha >= 1.0 {
        to
    } else if alpha <= 0.0 {
        from
    } else {
        // glam picks the shortest arc when the dot product is negative.
        from.slerp(to, alpha).normalize()
    }
}
