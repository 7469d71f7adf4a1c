//! Target to prototype mapping.
//!
//! Decides which visual to spawn for each recognized target. A lookup miss
//! is a recoverable condition handled by the synchronizer. Two mappings for
//! the same target name are rejected at construction: the registry fails
//! closed rather than letting one silently shadow the other.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracksync_types::TargetId;

/// Errors raised while building a [`PrototypeRegistry`].
#[derive(Debug, thiserror::Error)]
pub enum PrototypeError {
    /// The same target name is mapped more than once.
    #[error("target {target} is mapped to both {first} and {second}")]
    DuplicateTarget {
        /// The colliding target name.
        target: TargetId,
        /// Prototype of the first mapping.
        first: String,
        /// Prototype of the rejected mapping.
        second: String,
    },

    /// A mapping has an unusable scale.
    #[error("target {target} has invalid scale {scale}")]
    InvalidScale {
        /// The offending target.
        target: TargetId,
        /// The configured scale.
        scale: f32,
    },
}

/// One configured `target -> prototype` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrototypeMapping {
    /// Recognizer name of the target.
    pub target: TargetId,
    /// Name of the visual prototype to spawn.
    pub prototype: String,
    /// Uniform scale applied to the spawned instance.
    #[serde(default = "default_scale")]
    pub scale: f32,
}

const fn default_scale() -> f32 {
    1.0
}

/// Resolved prototype for a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
    /// Name of the visual prototype.
    pub name: String,
    /// Uniform scale applied at spawn.
    pub scale: f32,
}

/// Lookup table from target to prototype.
#[derive(Debug, Clone, Default)]
pub struct PrototypeRegistry {
    entries: BTreeMap<TargetId, Prototype>,
}

impl PrototypeRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Build a registry from configured mappings.
    ///
    /// # Errors
    ///
    /// Returns [`PrototypeError::DuplicateTarget`] if a target appears twice,
    /// or [`PrototypeError::InvalidScale`] for a non-positive or non-finite
    /// scale.
    pub fn from_mappings(mappings: &[PrototypeMapping]) -> Result<Self, PrototypeError> {
        let mut registry = Self::new();
        for mapping in mappings {
            registry.register(mapping.target.clone(), &mapping.prototype, mapping.scale)?;
        }
        Ok(registry)
    }

    /// Add a mapping.
    ///
    /// # Errors
    ///
    /// See [`PrototypeRegistry::from_mappings`].
    pub fn register(
        &mut self,
        target: TargetId,
        prototype: &str,
        scale: f32,
    ) -> Result<(), PrototypeError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(PrototypeError::InvalidScale { target, scale });
        }
        if let Some(existing) = self.entries.get(&target) {
            return Err(PrototypeError::DuplicateTarget {
                first: existing.name.clone(),
                second: prototype.to_owned(),
                target,
            });
        }
        self.entries.insert(
            target,
            Prototype {
                name: prototype.to_owned(),
                scale,
            },
        );
        Ok(())
    }

    /// Prototype configured for `target`.
    pub fn lookup(&self, target: &TargetId) -> Option<&Prototype> {
        self.entries.get(target)
    }

    /// Number of configured targets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no targets are configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mapping(target: &str, prototype: &str) -> PrototypeMapping {
        PrototypeMapping {
            target: TargetId::new(target),
            prototype: prototype.to_owned(),
            scale: 1.0,
        }
    }

    #[test]
    fn lookup_hits_and_misses() {
        let registry =
            PrototypeRegistry::from_mappings(&[mapping("card_a", "dragon")]).unwrap();
        assert_eq!(
            registry.lookup(&TargetId::new("card_a")).map(|p| p.name.as_str()),
            Some("dragon")
        );
        assert!(registry.lookup(&TargetId::new("card_b")).is_none());
    }

    #[test]
    fn duplicate_target_fails_closed() {
        let result = PrototypeRegistry::from_mappings(&[
            mapping("card_a", "dragon"),
            mapping("card_a", "knight"),
        ]);
        assert!(matches!(
            result,
            Err(PrototypeError::DuplicateTarget { ref first, ref second, .. })
                if first == "dragon" && second == "knight"
        ));
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        let mut registry = PrototypeRegistry::new();
        let result = registry.register(TargetId::new("card_a"), "dragon", 0.0);
        assert!(matches!(result, Err(PrototypeError::InvalidScale { .. })));
        assert!(registry.is_empty());
    }
}
