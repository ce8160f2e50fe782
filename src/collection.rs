use bson::{Bson, Document as BsonDocument};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::document::Document;
use crate::types::DocumentId;

/// Identity field stamped on every stored document.
pub const ID_FIELD: &str = "_id";
/// Engine-internal revision counter, hidden from projections by default.
pub const REVISION_FIELD: &str = "_rev";
/// Creation timestamp, stamped on insert when the caller does not supply one.
pub const CREATED_AT_FIELD: &str = "created_at";

/// An in-memory, insertion-ordered document collection.
pub struct Collection {
    name: String,
    order: RwLock<Vec<DocumentId>>,
    docs: RwLock<HashMap<DocumentId, Document>>,
}

impl Collection {
    #[must_use]
    pub fn new(name: String) -> Self {
        Self { name, order: RwLock::new(Vec::new()), docs: RwLock::new(HashMap::new()) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a document, stamping the engine-maintained fields into its data.
    pub fn insert_document(&self, mut document: Document) -> DocumentId {
        let id = document.id.clone();
        stamp_engine_fields(&mut document);
        self.order.write().push(id.clone());
        self.docs.write().insert(id.clone(), document);
        id
    }

    pub fn find_document(&self, id: &DocumentId) -> Option<Document> {
        self.docs.read().get(id).cloned()
    }

    /// Replaces a document's data in place, bumping its revision.
    ///
    /// The engine fields survive the replacement: `_id` and `created_at` are
    /// preserved and `_rev` is refreshed from the new revision.
    pub fn update_document(&self, id: &DocumentId, new_data: BsonDocument) -> bool {
        let mut docs = self.docs.write();
        let Some(doc) = docs.get_mut(id) else { return false };
        let created = doc.data.get(CREATED_AT_FIELD).cloned();
        doc.update(new_data);
        if doc.data.get(CREATED_AT_FIELD).is_none()
            && let Some(created) = created
        {
            doc.data.insert(CREATED_AT_FIELD, created);
        }
        doc.data.insert(ID_FIELD, Bson::String(id.to_string()));
        doc.data.insert(REVISION_FIELD, Bson::Int64(i64::from(doc.metadata.revision)));
        true
    }

    pub fn delete_document(&self, id: &DocumentId) -> bool {
        let removed = self.docs.write().remove(id).is_some();
        if removed {
            self.order.write().retain(|x| x != id);
        }
        removed
    }

    pub fn list_ids(&self) -> Vec<DocumentId> {
        self.order.read().clone()
    }

    /// Returns all documents in insertion order.
    pub fn get_all_documents(&self) -> Vec<Document> {
        let docs = self.docs.read();
        self.order.read().iter().filter_map(|id| docs.get(id).cloned()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

fn stamp_engine_fields(document: &mut Document) {
    document.data.insert(ID_FIELD, Bson::String(document.id.to_string()));
    document.data.insert(REVISION_FIELD, Bson::Int64(i64::from(document.metadata.revision)));
    if document.data.get(CREATED_AT_FIELD).is_none() {
        let millis = document.metadata.created_at.timestamp_millis();
        document.data.insert(CREATED_AT_FIELD, Bson::DateTime(bson::DateTime::from_millis(millis)));
    }
}
