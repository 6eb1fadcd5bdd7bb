use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tempfile::NamedTempFile;

/// Error type for slot persistence
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not serialize slot {slot}: {source}")]
    Serialize {
        slot: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Key-value persistence port: one JSON document per named slot.
///
/// A written value must be visible to the next `get` in the same process.
pub trait SlotStore {
    /// Raw JSON text of a slot, or `None` if it was never written
    fn get(&self, slot: &str) -> Result<Option<String>, StoreError>;
    /// Replace the slot's JSON text
    fn set(&self, slot: &str, json: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Stores each slot as `<dir>/<slot>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slot))
    }
}

impl SlotStore for FileStore {
    fn get(&self, slot: &str) -> Result<Option<String>, StoreError> {
        let path = self.slot_path(slot);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io { path, source: e }),
        }
    }

    fn set(&self, slot: &str, json: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::Io {
            path: self.dir.clone(),
            source: e,
        })?;
        let path = self.slot_path(slot);
        atomic_write(&self.dir, &path, json.as_bytes())
            .map_err(|e| StoreError::Io { path, source: e })
    }
}

/// Write via a temp file in the same directory, then rename over the target
fn atomic_write(dir: &Path, path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Shared in-memory store. Clones see the same slots, which lets a test keep a
/// handle while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Rc<RefCell<BTreeMap<String, String>>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Number of successful `set` calls across all clones
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Raw slot contents
    pub fn raw(&self, slot: &str) -> Option<String> {
        self.slots.borrow().get(slot).cloned()
    }

    /// Seed a slot without counting it as a write
    pub fn seed(&self, slot: &str, json: &str) {
        self.slots
            .borrow_mut()
            .insert(slot.to_string(), json.to_string());
    }
}

impl SlotStore for MemoryStore {
    fn get(&self, slot: &str) -> Result<Option<String>, StoreError> {
        Ok(self.raw(slot))
    }

    fn set(&self, slot: &str, json: &str) -> Result<(), StoreError> {
        self.seed(slot, json);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
