use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::models::{Article, Category, User};
use crate::database::{DocumentStore, Repository};

/// Shared handler state: the store handle and configuration.
///
/// Cheap to clone; both fields sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn articles(&self) -> Repository<Article> {
        Repository::new(Arc::clone(&self.store))
    }

    pub fn categories(&self) -> Repository<Category> {
        Repository::new(Arc::clone(&self.store))
    }

    pub fn users(&self) -> Repository<User> {
        Repository::new(Arc::clone(&self.store))
    }
}
