pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod store;

use std::sync::Arc;

use crate::config::{DatabaseConfig, StoreBackend};

pub use manager::DatabaseError;
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;
pub use repository::{Entity, Repository};
pub use store::{Document, DocumentStore};

/// Build the store handle the configuration asks for
pub async fn connect_store(config: &DatabaseConfig) -> Result<Arc<dyn DocumentStore>, DatabaseError> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let pool = manager::connect(config).await?;
            Ok(Arc::new(PgDocumentStore::new(pool)))
        }
    }
}
