use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::database::manager::DatabaseError;
use crate::database::store::{Document, DocumentStore};

/// A type persisted as a document in a named collection
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;
}

/// Typed pass-through to the document store for one entity type
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn find_all(&self) -> Result<Vec<T>, DatabaseError> {
        self.store
            .find_all(T::COLLECTION)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>, DatabaseError> {
        self.store
            .find_by_id(T::COLLECTION, id)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn find_one_by(&self, field: &str, value: &str) -> Result<Option<T>, DatabaseError> {
        self.store
            .find_one_by(T::COLLECTION, field, value)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn insert(&self, entity: &T) -> Result<(), DatabaseError> {
        self.store.insert(T::COLLECTION, to_document(entity)?).await
    }

    /// Insert, refusing a value of `field` another entity already holds
    pub async fn insert_unique(&self, field: &str, entity: &T) -> Result<(), DatabaseError> {
        self.store
            .insert_unique(T::COLLECTION, field, to_document(entity)?)
            .await
    }

    pub async fn update_by_id(&self, id: &str, patch: Document) -> Result<Option<T>, DatabaseError> {
        self.store
            .update_by_id(T::COLLECTION, id, patch)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn update_unique_by_id(
        &self,
        id: &str,
        field: &str,
        patch: Document,
    ) -> Result<Option<T>, DatabaseError> {
        self.store
            .update_unique_by_id(T::COLLECTION, id, field, patch)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<Option<T>, DatabaseError> {
        self.store
            .delete_by_id(T::COLLECTION, id)
            .await?
            .map(from_document)
            .transpose()
    }
}

/// Serialize any value that renders as a JSON object into a document
pub fn to_document<S: Serialize>(value: &S) -> Result<Document, DatabaseError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::InvalidDocument(format!("expected object, found {}", other))),
    }
}

fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, DatabaseError> {
    Ok(serde_json::from_value(Value::Object(document))?)
}
