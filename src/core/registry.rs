//! Purpose: Named key/value stores backing every piece of console state.
//! Exports: `Registry`, `Store`, `Destructor`, `CATALOG`.
//! Role: Single source of truth for cfg, env, users, logins, and loaded commands.
//! Invariants: Stores are created lazily on first use of their name.
//! Invariants: An entry's destructor runs exactly once, when the entry is removed.
//! Invariants: The most recently supplied destructor is the one that runs.
//! Invariants: Lookups are linear scans; stores are expected to stay small.
use tracing::{debug, trace};

use crate::core::error::{Error, ErrorKind};
use crate::core::value::{Slot, Value};

/// Reserved name of the root store that holds every other store.
pub const CATALOG: &str = "_kv";

/// Cleanup callback attached to an entry; receives the slot's final value.
pub type Destructor = Box<dyn FnOnce(Slot)>;

struct Entry {
    key: String,
    slot: Slot,
    dtor: Option<Destructor>,
}

impl Entry {
    fn destroy(self) {
        let Entry { key, slot, dtor } = self;
        trace!(key = %key, has_dtor = dtor.is_some(), "destroying entry");
        match dtor {
            Some(dtor) => dtor(slot),
            None => drop(slot),
        }
    }
}

/// An unordered collection of entries keyed by string.
///
/// Dropping a store removes every entry, running each destructor.
#[derive(Default)]
pub struct Store {
    entries: Vec<Entry>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Slot for `key`, or `None` when no entry exists.
    pub fn slot(&self, key: &str) -> Option<&Slot> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.slot)
    }

    /// Mutable slot for `key`, creating an empty entry when absent.
    ///
    /// The supplied destructor replaces whatever the entry carried before.
    pub fn reference(&mut self, key: &str, dtor: Option<Destructor>) -> Result<&mut Slot, Error> {
        let index = match self.position(key) {
            Some(index) => index,
            None => {
                let mut owned = String::new();
                owned.try_reserve_exact(key.len())?;
                owned.push_str(key);
                self.entries.try_reserve(1)?;
                self.entries.push(Entry {
                    key: owned,
                    slot: None,
                    dtor: None,
                });
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[index];
        entry.dtor = dtor;
        Ok(&mut entry.slot)
    }

    /// Removes `key`, running its destructor. Returns false when absent.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(index) => {
                self.entries.swap_remove(index).destroy();
                true
            }
            None => false,
        }
    }

    /// Visits every entry. The visitor may rewrite slots but cannot add or remove entries.
    pub fn for_each(&mut self, mut visit: impl FnMut(&str, &mut Slot)) {
        for entry in &mut self.entries {
            visit(&entry.key, &mut entry.slot);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    pub fn clear(&mut self) {
        while let Some(entry) = self.entries.pop() {
            entry.destroy();
        }
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.clear();
    }
}

fn destroy_store(slot: Slot) {
    match &slot {
        Some(Value::Store(store)) if !store.is_empty() => {
            debug!(entries = store.len(), "destroying store");
        }
        _ => trace!("destroying empty store"),
    }
    drop(slot);
}

/// Process-wide state container: the catalog plus every store it tracks.
#[derive(Default)]
pub struct Registry {
    catalog: Store,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            catalog: Store::new(),
        }
    }

    fn store_mut(&mut self, name: &str) -> Result<&mut Store, Error> {
        if name == CATALOG {
            return Ok(&mut self.catalog);
        }

        let slot = self.catalog.reference(name, Some(Box::new(destroy_store)))?;
        if slot.is_none() {
            debug!(store = %name, "creating store");
            *slot = Some(Value::Store(Store::new()));
        }

        match slot {
            Some(Value::Store(store)) => Ok(store),
            _ => Err(Error::new(ErrorKind::Internal)
                .with_message(format!("catalog entry {name} does not hold a store"))),
        }
    }

    /// Mutable slot for `key` in `store`, creating both when absent.
    pub fn reference(
        &mut self,
        store: &str,
        key: &str,
        dtor: Option<Destructor>,
    ) -> Result<&mut Slot, Error> {
        self.store_mut(store)?.reference(key, dtor)
    }

    /// Value for `key`. An empty slot and a missing key both read as `None`.
    pub fn get(&mut self, store: &str, key: &str) -> Option<&Value> {
        self.store_mut(store).ok()?.slot(key)?.as_ref()
    }

    /// Like `get`, but keeps "present and empty" apart from "absent".
    pub fn lookup(&mut self, store: &str, key: &str) -> Option<Option<&Value>> {
        self.store_mut(store)
            .ok()?
            .slot(key)
            .map(|slot| slot.as_ref())
    }

    pub fn exists(&mut self, store: &str, key: &str) -> bool {
        self.store_mut(store)
            .map(|store| store.contains(key))
            .unwrap_or(false)
    }

    pub fn iterate(
        &mut self,
        store: &str,
        visit: impl FnMut(&str, &mut Slot),
    ) -> Result<(), Error> {
        self.store_mut(store)?.for_each(visit);
        Ok(())
    }

    pub fn delete(&mut self, store: &str, key: &str) -> Result<(), Error> {
        if self.store_mut(store)?.remove(key) {
            trace!(store = %store, key = %key, "deleted entry");
            Ok(())
        } else {
            Err(Error::new(ErrorKind::NotFound)
                .with_message(format!("no entry {key} in store {store}")))
        }
    }

    /// Drops the store called `name` and everything in it.
    pub fn flush(&mut self, name: &str) -> Result<(), Error> {
        debug!(store = %name, "flushing store");
        self.delete(CATALOG, name)
    }

    /// Destroys every tracked store.
    pub fn clear(&mut self) {
        debug!(stores = self.catalog.len(), "clearing registry");
        self.catalog.clear();
    }

    pub fn store_names(&self) -> Vec<String> {
        self.catalog.keys().map(str::to_string).collect()
    }
}
