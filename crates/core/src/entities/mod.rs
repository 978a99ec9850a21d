//! Weak entity references
//!
//! Host entities are never owned by the agent. Callers that need to refer to
//! an entity later (e.g. an entity-bound deferred action) hold an
//! [`EntityKey`] instead of a raw pointer. A key is generational: once the
//! entity is removed from its [`EntityTable`], the key stops resolving, even
//! if the slot is reused by a new entity.
//!
//! # Example
//!
//! ```ignore
//! use overlayhook_core::entities::EntityTable;
//!
//! let table = EntityTable::new();
//! let key = table.insert(hero_ptr as usize);
//!
//! // Host deleted the object
//! table.remove(key);
//! assert!(table.get(key).is_none());
//! ```

use parking_lot::RwLock;
use slotmap::{new_key_type, KeyData, SlotMap};

new_key_type! {
    /// Generational weak reference to a host entity
    pub struct EntityKey;
}

impl EntityKey {
    /// Pack the key into a `u64` for passing through FFI
    pub fn to_ffi(self) -> u64 {
        self.0.as_ffi()
    }

    /// Rebuild a key packed with [`EntityKey::to_ffi`]
    pub fn from_ffi(value: u64) -> Self {
        KeyData::from_ffi(value).into()
    }
}

/// Lookup deciding whether a weak entity reference still resolves
pub trait EntityLookup: Send + Sync {
    fn is_alive(&self, key: EntityKey) -> bool;
}

/// Table of live host entities
///
/// Insertion hands out a key; removal is the invalidation transition every
/// holder of that key observes.
pub struct EntityTable<T> {
    entries: RwLock<SlotMap<EntityKey, T>>,
}

impl<T> Default for EntityTable<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(SlotMap::with_key()),
        }
    }
}

impl<T> EntityTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new entity
    pub fn insert(&self, entity: T) -> EntityKey {
        self.entries.write().insert(entity)
    }

    /// Stop tracking an entity, invalidating every key that refers to it
    pub fn remove(&self, key: EntityKey) -> Option<T> {
        let removed = self.entries.write().remove(key);
        if removed.is_some() {
            tracing::trace!("Entity {:?} invalidated", key);
        }
        removed
    }

    /// Run `f` on the entity if the key still resolves
    pub fn with<R>(&self, key: EntityKey, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.entries.read().get(key).map(f)
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entity (e.g. when the host unloads its world)
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<T: Clone> EntityTable<T> {
    /// Resolve a key to a copy of the entity
    pub fn get(&self, key: EntityKey) -> Option<T> {
        self.with(key, T::clone)
    }
}

impl<T: Send + Sync> EntityLookup for EntityTable<T> {
    fn is_alive(&self, key: EntityKey) -> bool {
        self.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_key_stops_resolving() {
        let table = EntityTable::new();
        let key = table.insert(0x1000usize);
        assert_eq!(table.get(key), Some(0x1000));
        assert!(table.is_alive(key));

        assert_eq!(table.remove(key), Some(0x1000));
        assert!(table.get(key).is_none());
        assert!(!table.is_alive(key));
        assert!(table.remove(key).is_none());
    }

    #[test]
    fn test_reused_slot_does_not_revive_old_key() {
        let table = EntityTable::new();
        let old = table.insert(1u32);
        table.remove(old);
        let new = table.insert(2u32);

        assert!(!table.is_alive(old));
        assert_eq!(table.get(new), Some(2));
    }

    #[test]
    fn test_ffi_round_trip() {
        let table = EntityTable::new();
        let key = table.insert("hero");
        let packed = key.to_ffi();
        assert_eq!(EntityKey::from_ffi(packed), key);
        assert_eq!(table.with(EntityKey::from_ffi(packed), |name| name.len()), Some(4));
    }

    #[test]
    fn test_clear() {
        let table = EntityTable::new();
        let a = table.insert(1u8);
        table.insert(2u8);
        assert_eq!(table.len(), 2);
        table.clear();
        assert!(table.is_empty());
        assert!(!table.contains(a));
    }
}
