use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::io::slot_store::{SlotStore, StoreError};
use crate::model::task::TaskId;

/// Slot holding the task id → category id map
pub const CATEGORY_MAP_SLOT: &str = "task_categories";
/// Slot holding the user-chosen task order
pub const ORDER_SLOT: &str = "task_order";
/// Slot holding the category collection
pub const CATEGORIES_SLOT: &str = "categories";

/// Category assignments, in the order they were made
pub type CategoryMap = IndexMap<TaskId, String>;

/// Read and decode a slot. Missing, unreadable, and unparsable slots all
/// come back as `None`; the latter two are logged.
pub fn read_slot<S: SlotStore, T: DeserializeOwned>(store: &S, slot: &str) -> Option<T> {
    let raw = match store.get(slot) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(slot, error = %e, "could not read slot");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(slot, error = %e, "ignoring unparsable slot");
            None
        }
    }
}

/// Encode and write a slot.
pub fn write_slot<S: SlotStore, T: Serialize + ?Sized>(
    store: &S,
    slot: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(value).map_err(|e| StoreError::Serialize {
        slot: slot.to_string(),
        source: e,
    })?;
    store.set(slot, &json)
}

/// Typed access to the category-assignment and order overlays.
///
/// Writes are fire-and-forget: a failed write is logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct Overlays<S> {
    store: S,
}

impl<S: SlotStore> Overlays<S> {
    pub fn new(store: S) -> Self {
        Overlays { store }
    }

    pub fn category_map(&self) -> CategoryMap {
        read_slot(&self.store, CATEGORY_MAP_SLOT).unwrap_or_default()
    }

    pub fn save_category_map(&self, map: &CategoryMap) {
        if let Err(e) = write_slot(&self.store, CATEGORY_MAP_SLOT, map) {
            warn!(error = %e, "could not persist category assignments");
        }
    }

    /// Set or clear one task's category assignment
    pub fn assign(&self, task_id: TaskId, category_id: Option<&str>) {
        let mut map = self.category_map();
        match category_id {
            Some(category_id) => {
                map.insert(task_id, category_id.to_string());
            }
            None => {
                map.shift_remove(&task_id);
            }
        }
        self.save_category_map(&map);
    }

    pub fn order(&self) -> Vec<TaskId> {
        read_slot(&self.store, ORDER_SLOT).unwrap_or_default()
    }

    pub fn save_order(&self, ids: &[TaskId]) {
        if let Err(e) = write_slot(&self.store, ORDER_SLOT, ids) {
            warn!(error = %e, "could not persist task order");
        }
    }
}
