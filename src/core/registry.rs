//! Purpose: Hold the process-wide mapping from slot id to slot configuration.
//! Exports: `SlotRegistry`.
//! Role: Pure key-value store consulted by the service on every dispatch.
//! Invariants: Defining an existing id replaces its configuration (last write wins).
//! Invariants: Entries are never removed implicitly.
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::error::{Error, ErrorKind};
use super::slot::SlotConfig;

#[derive(Debug, Default)]
pub struct SlotRegistry {
    slots: RwLock<HashMap<String, SlotConfig>>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a JSON object of `{ "<slot id>": { "type": ... } }`.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let registry = Self::new();
        registry.define_slots_json(text)?;
        Ok(registry)
    }

    pub fn define_slots<I, K>(&self, slots: I)
    where
        I: IntoIterator<Item = (K, SlotConfig)>,
        K: Into<String>,
    {
        let mut guard = self.write();
        for (id, config) in slots {
            guard.insert(id.into(), config);
        }
    }

    pub fn define_slot(&self, id: impl Into<String>, config: SlotConfig) {
        self.write().insert(id.into(), config);
    }

    pub fn define_slots_json(&self, text: &str) -> Result<(), Error> {
        let slots: HashMap<String, SlotConfig> = serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid slot definitions: {err}"))
                .with_hint("Expected a JSON object mapping slot ids to { \"type\": ..., \"adId\": ... }.")
                .with_source(err)
        })?;
        self.define_slots(slots);
        Ok(())
    }

    pub fn get_slot(&self, id: &str) -> Option<SlotConfig> {
        self.read().get(id).cloned()
    }

    /// Snapshot of the known ids, in no particular order.
    pub fn slot_ids(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn has_slot(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SlotConfig>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SlotConfig>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}
