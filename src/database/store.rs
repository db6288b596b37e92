use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::database::manager::DatabaseError;

/// A stored document: a JSON object keyed by `_id`
pub type Document = Map<String, Value>;

/// Field holding a document's identifier
pub const ID_FIELD: &str = "_id";

/// Collection-oriented operations every store backend provides.
///
/// Handlers only see this trait through `AppState`, so tests can swap in an
/// in-memory or failing implementation.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create whatever schema the backend needs. Idempotent.
    async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    /// Cheap connectivity check for health endpoints
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// All documents of a collection in insertion order
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, DatabaseError>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError>;

    /// First document whose top-level string `field` equals `value`
    async fn find_one_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, DatabaseError>;

    /// Insert a document carrying its own `_id`
    async fn insert(&self, collection: &str, document: Document) -> Result<(), DatabaseError>;

    /// Insert unless another document of the collection already holds the
    /// same string value in `field`. The check and the write are atomic; a
    /// taken value fails with `DatabaseError::Conflict`.
    async fn insert_unique(
        &self,
        collection: &str,
        field: &str,
        document: Document,
    ) -> Result<(), DatabaseError>;

    /// Shallow-merge `patch` into the stored document and return the result.
    /// `_id` in the patch is ignored. `None` when no document has that id.
    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, DatabaseError>;

    /// `update_by_id` that fails with `DatabaseError::Conflict` when the patch
    /// sets `field` to a value held by a different document
    async fn update_unique_by_id(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        patch: Document,
    ) -> Result<Option<Document>, DatabaseError>;

    /// Remove a document, returning what was removed
    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError>;
}

/// Read the `_id` of a document about to be stored
pub fn document_id(document: &Document) -> Result<&str, DatabaseError> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| DatabaseError::InvalidDocument(format!("missing string field '{}'", ID_FIELD)))
}

/// The string value of `field`, if the document carries one
pub fn string_field<'a>(document: &'a Document, field: &str) -> Option<&'a str> {
    document.get(field).and_then(Value::as_str)
}

pub fn unique_conflict(collection: &str, field: &str, value: &str) -> DatabaseError {
    DatabaseError::Conflict(format!("{} with {} '{}' already exists", collection, field, value))
}

/// Generate a fresh document identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
