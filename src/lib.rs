pub mod api;
pub mod collection;
pub mod document;
pub mod errors;
pub mod logger;
pub mod model;
pub mod query;
pub mod types;

use crate::collection::Collection;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// The main database struct: an in-memory map of named collections.
pub struct Database {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Database {
    /// Creates a new in-memory database instance.
    #[must_use]
    pub fn new() -> Self {
        Self { collections: RwLock::new(HashMap::new()) }
    }

    /// Creates a collection with the given name, returning the existing one
    /// when it is already present.
    pub fn create_collection(&self, name: &str) -> Arc<Collection> {
        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Collection::new(name.to_string())))
            .clone()
    }

    /// Retrieves a collection by its name.
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    /// Deletes a collection by its name.
    pub fn delete_collection(&self, name: &str) -> bool {
        self.collections.write().remove(name).is_some()
    }

    /// Lists the names of all collections.
    pub fn list_collection_names(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

/// Initializes the logging system.
///
/// This function should be called once, before any other operations.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::init()?;
    Ok(())
}
