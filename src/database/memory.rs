use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::store::{
    document_id, string_field, unique_conflict, Document, DocumentStore, ID_FIELD,
};

/// In-process document store. Collections keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn has_id(document: &Document, id: &str) -> bool {
    document.get(ID_FIELD).and_then(Value::as_str) == Some(id)
}

/// Whether a document other than `except_id` holds `value` in `field`
fn value_taken(docs: &[Document], field: &str, value: &str, except_id: Option<&str>) -> bool {
    docs.iter().any(|d| {
        string_field(d, field) == Some(value) && except_id.map_or(true, |id| !has_id(d, id))
    })
}

fn push_new(collection: &str, docs: &mut Vec<Document>, document: Document) -> Result<(), DatabaseError> {
    let id = document_id(&document)?;
    if docs.iter().any(|d| has_id(d, id)) {
        return Err(DatabaseError::Conflict(format!("{} {} already exists", collection, id)));
    }
    docs.push(document);
    Ok(())
}

fn merge_into(docs: &mut [Document], id: &str, patch: Document) -> Option<Document> {
    let doc = docs.iter_mut().find(|d| has_id(d, id))?;
    for (key, value) in patch {
        if key != ID_FIELD {
            doc.insert(key, value);
        }
    }
    Some(doc.clone())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| has_id(d, id)))
            .cloned())
    }

    async fn find_one_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| {
                docs.iter()
                    .find(|d| d.get(field).and_then(Value::as_str) == Some(value))
            })
            .cloned())
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), DatabaseError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        push_new(collection, docs, document)
    }

    async fn insert_unique(
        &self,
        collection: &str,
        field: &str,
        document: Document,
    ) -> Result<(), DatabaseError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if let Some(value) = string_field(&document, field) {
            if value_taken(docs, field, value, None) {
                return Err(unique_conflict(collection, field, value));
            }
        }
        push_new(collection, docs, document)
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .and_then(|docs| merge_into(docs, id, patch)))
    }

    async fn update_unique_by_id(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        patch: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        if let Some(value) = string_field(&patch, field) {
            if value_taken(docs, field, value, Some(id)) {
                return Err(unique_conflict(collection, field, value));
            }
        }
        Ok(merge_into(docs, id, patch))
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        Ok(docs
            .iter()
            .position(|d| has_id(d, id))
            .map(|index| docs.remove(index)))
    }
}
