//! Entity record store: the single source of truth for what is visible.
//!
//! Records live in generation-tagged slots. Removing a record bumps its
//! slot's generation, so an [`EntityKey`] handed out earlier stops
//! resolving the moment its record is torn down, even if the slot is later
//! reused for another target. A secondary index maps each [`TargetId`] to
//! its live key and enforces one record per target.

use std::collections::BTreeMap;

use tracksync_types::{AnchorId, InstanceId, Pose, TargetId, TrackingQuality};

/// Errors from structural store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A live record already exists for the target.
    #[error("a record for target {0} already exists")]
    Duplicate(TargetId),

    /// Slot indices are exhausted.
    #[error("entity store is full")]
    Full,
}

/// Generation-checked reference to a slot in the store.
///
/// Holding a key never keeps a record alive; it only names where the
/// record was. Lookups through a stale key return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    index: u32,
    generation: u32,
}

impl EntityKey {
    /// Slot index.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation at the time the key was issued.
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Anchor frame owned by a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorFrame {
    /// Scene handle of the anchor.
    pub id: AnchorId,
    /// Pose the anchor was pinned at. Never changes.
    pub pose: Pose,
}

/// Live state for one tracked target.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// The target this record represents.
    pub target: TargetId,
    /// Prototype the visual instance was constructed from.
    pub prototype: String,
    /// Visual instance owned by this record.
    pub instance: InstanceId,
    /// Anchor frame owned by this record, if the policy keeps one.
    pub anchor: Option<AnchorFrame>,
    /// Pose currently written to the visual instance.
    pub displayed_pose: Pose,
    /// Most recent pose reported by the recognizer.
    pub observed_pose: Pose,
    /// Most recent tracking quality reported by the recognizer.
    pub quality: TrackingQuality,
    /// Whether the visual instance is currently shown.
    pub visible: bool,
    /// Frame on which the record was created.
    pub spawned_frame: u64,
    /// Number of observations applied since creation.
    pub observation_count: u64,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    record: Option<EntityRecord>,
}

/// Mapping from target identifier to live entity record.
#[derive(Debug, Clone, Default)]
pub struct EntityRecordStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_target: BTreeMap<TargetId, EntityKey>,
}

impl EntityRecordStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_target: BTreeMap::new(),
        }
    }

    /// Insert a record under its target.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the target already has a live
    /// record; the store is unchanged in that case.
    pub fn insert(&mut self, record: EntityRecord) -> Result<EntityKey, StoreError> {
        if self.by_target.contains_key(&record.target) {
            return Err(StoreError::Duplicate(record.target));
        }

        let target = record.target.clone();
        let key = if let Some(index) = self.free.pop() {
            let slot = self.slot_mut(index).ok_or(StoreError::Full)?;
            slot.record = Some(record);
            EntityKey {
                index,
                generation: slot.generation,
            }
        } else {
            let index = u32::try_from(self.slots.len()).map_err(|_err| StoreError::Full)?;
            self.slots.push(Slot {
                generation: 0,
                record: Some(record),
            });
            EntityKey {
                index,
                generation: 0,
            }
        };

        self.by_target.insert(target, key);
        Ok(key)
    }

    /// Remove and return the record for `target`, invalidating its key.
    pub fn remove(&mut self, target: &TargetId) -> Option<EntityRecord> {
        let key = self.by_target.remove(target)?;
        let slot = self.slot_mut(key.index)?;
        let record = slot.record.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        record
    }

    /// Resolve a key, returning `None` if its record has been removed.
    pub fn get(&self, key: EntityKey) -> Option<&EntityRecord> {
        self.slots
            .get(usize::try_from(key.index).ok()?)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.record.as_ref())
    }

    /// Resolve a key mutably, returning `None` if its record has been removed.
    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut EntityRecord> {
        self.slot_mut(key.index)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.record.as_mut())
    }

    /// Live key for `target`.
    pub fn key_of(&self, target: &TargetId) -> Option<EntityKey> {
        self.by_target.get(target).copied()
    }

    /// Record for `target`.
    pub fn find(&self, target: &TargetId) -> Option<&EntityRecord> {
        self.get(self.key_of(target)?)
    }

    /// Record for `target`, mutably.
    pub fn find_mut(&mut self, target: &TargetId) -> Option<&mut EntityRecord> {
        let key = self.key_of(target)?;
        self.get_mut(key)
    }

    /// Whether `target` has a live record.
    pub fn contains(&self, target: &TargetId) -> bool {
        self.by_target.contains_key(target)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.by_target.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }

    /// Targets with a live record, in sorted order.
    pub fn targets(&self) -> impl Iterator<Item = &TargetId> {
        self.by_target.keys()
    }

    /// Live records in target order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &EntityRecord)> {
        self.by_target
            .values()
            .filter_map(|&key| self.get(key).map(|record| (key, record)))
    }

    fn slot_mut(&mut self, index: u32) -> Option<&mut Slot> {
        self.slots.get_mut(usize::try_from(index).ok()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(name: &str) -> EntityRecord {
        EntityRecord {
            target: TargetId::new(name),
            prototype: String::from("model"),
            instance: InstanceId::new(),
            anchor: None,
            displayed_pose: Pose::IDENTITY,
            observed_pose: Pose::IDENTITY,
            quality: TrackingQuality::Tracking,
            visible: true,
            spawned_frame: 0,
            observation_count: 1,
        }
    }

    #[test]
    fn insert_and_find() {
        let mut store = EntityRecordStore::new();
        let key = store.insert(record("a")).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.key_of(&TargetId::new("a")), Some(key));
        assert_eq!(store.get(key).map(|r| r.target.as_str()), Some("a"));
        assert!(store.find(&TargetId::new("b")).is_none());
    }

    #[test]
    fn duplicate_insert_is_rejected_and_store_unchanged() {
        let mut store = EntityRecordStore::new();
        let first = record("a");
        let original_instance = first.instance;
        store.insert(first).unwrap();

        let result = store.insert(record("a"));
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.find(&TargetId::new("a")).map(|r| r.instance),
            Some(original_instance)
        );
    }

    #[test]
    fn remove_invalidates_key() {
        let mut store = EntityRecordStore::new();
        let key = store.insert(record("a")).unwrap();

        let removed = store.remove(&TargetId::new("a"));
        assert!(removed.is_some());
        assert!(store.get(key).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn reused_slot_does_not_resolve_stale_key() {
        let mut store = EntityRecordStore::new();
        let stale = store.insert(record("a")).unwrap();
        store.remove(&TargetId::new("a"));

        let fresh = store.insert(record("b")).unwrap();
        assert_eq!(fresh.index(), stale.index());
        assert_ne!(fresh.generation(), stale.generation());
        assert!(store.get(stale).is_none());
        assert!(store.get_mut(stale).is_none());
        assert_eq!(store.get(fresh).map(|r| r.target.as_str()), Some("b"));
    }

    #[test]
    fn remove_missing_is_none() {
        let mut store = EntityRecordStore::new();
        assert!(store.remove(&TargetId::new("ghost")).is_none());
        assert!(store.remove(&TargetId::new("ghost")).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn iter_yields_live_records_in_target_order() {
        let mut store = EntityRecordStore::new();
        store.insert(record("c")).unwrap();
        store.insert(record("a")).unwrap();
        store.insert(record("b")).unwrap();
        store.remove(&TargetId::new("b"));

        let names: Vec<&str> = store.iter().map(|(_, r)| r.target.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }
}
