use tracing::debug;
use uuid::Uuid;

use crate::io::overlay::{CATEGORIES_SLOT, read_slot, write_slot};
use crate::io::slot_store::{SlotStore, StoreError};
use crate::model::category::Category;

/// Categories offered before the user has saved any of their own
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("1", "Personal", "#3b82f6"),
        Category::new("2", "Work", "#22c55e"),
        Category::new("3", "Shopping", "#f97316"),
    ]
}

/// CRUD store for categories. The whole collection is written back after
/// every mutation, and a failed write leaves the in-memory collection as it was. Deleting a category never touches task assignments:
/// a dangling id simply resolves to `None` through [`CategoryRegistry::get`].
#[derive(Debug)]
pub struct CategoryRegistry<S> {
    store: S,
    categories: Vec<Category>,
}

impl<S: SlotStore> CategoryRegistry<S> {
    /// Load the persisted collection, falling back to the defaults
    pub fn open(store: S) -> Self {
        let categories = read_slot(&store, CATEGORIES_SLOT).unwrap_or_else(default_categories);
        CategoryRegistry { store, categories }
    }

    pub fn all(&self) -> &[Category] {
        &self.categories
    }

    /// Look up by id; `None` ids and unknown ids both yield `None`
    pub fn get(&self, id: Option<&str>) -> Option<&Category> {
        let id = id?;
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Category> {
        let name = name.trim();
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Resolve a user-supplied reference: exact id first, then name
    pub fn resolve(&self, id_or_name: &str) -> Option<&Category> {
        self.get(Some(id_or_name))
            .or_else(|| self.find_by_name(id_or_name))
    }

    /// Add a category with a fresh id. Blank names are ignored.
    pub fn add(&mut self, name: &str, color: &str) -> Result<Option<Category>, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let category = Category::new(Uuid::new_v4().to_string(), name, color);
        let mut next = self.categories.clone();
        next.push(category.clone());
        self.commit(next)?;
        debug!(id = %category.id, "added category");
        Ok(Some(category))
    }

    /// Rename/recolor. Returns false when the id is unknown or the name blank.
    pub fn update(&mut self, id: &str, name: &str, color: &str) -> Result<bool, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let mut next = self.categories.clone();
        let Some(category) = next.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        category.name = name.to_string();
        category.color = color.to_string();
        self.commit(next)?;
        Ok(true)
    }

    pub fn delete(&mut self, id: &str) -> Result<Option<Category>, StoreError> {
        let Some(idx) = self.categories.iter().position(|c| c.id == id) else {
            return Ok(None);
        };
        let mut next = self.categories.clone();
        let removed = next.remove(idx);
        self.commit(next)?;
        debug!(id, "deleted category");
        Ok(Some(removed))
    }

    /// Write `next` and adopt it only once the store has accepted it
    fn commit(&mut self, next: Vec<Category>) -> Result<(), StoreError> {
        write_slot(&self.store, CATEGORIES_SLOT, &next)?;
        self.categories = next;
        Ok(())
    }
}
