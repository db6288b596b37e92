#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use articles_api::auth::{generate_jwt, Claims};
use articles_api::config::{AppConfig, StoreBackend};
use articles_api::database::{Document, DocumentStore, DatabaseError, MemoryStore};
use articles_api::AppState;

/// A PNG signature is enough for the content-type based image check
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
    // Keeps the upload directory alive for the server's lifetime
    _uploads: TempDir,
}

impl TestServer {
    /// Serve the app in-process on a free port with a fresh in-memory store
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_store(Arc::new(MemoryStore::new())).await
    }

    pub async fn spawn_with_store(store: Arc<dyn DocumentStore>) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let uploads = tempfile::tempdir().context("failed to create upload dir")?;

        let mut config = AppConfig::development();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = port;
        config.database.backend = StoreBackend::Memory;
        config.uploads.dir = uploads.path().to_path_buf();

        let state = AppState::new(store, config);
        let listener = tokio::net::TcpListener::bind(state.config.bind_addr())
            .await
            .context("failed to bind test listener")?;
        let app = articles_api::app(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            port,
            base_url,
            client: reqwest::Client::new(),
            state,
            _uploads: uploads,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A valid bearer token signed with the server's secret
    pub fn token(&self) -> Result<String> {
        let security = &self.state.config.security;
        let claims = Claims::new("test-user", "test@example.com", security.jwt_expiry_hours);
        Ok(generate_jwt(&claims, security)?)
    }

    pub fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.token()?))
    }

    /// Create a category through the guarded API and return its `_id`
    pub async fn create_category(&self, title: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/categories"))
            .header("Authorization", self.bearer()?)
            .json(&json!({ "title": title, "description": format!("{} things", title) }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "category create failed: {}", res.status());

        let body: Value = res.json().await?;
        body["category"]["_id"]
            .as_str()
            .map(str::to_string)
            .context("category response without _id")
    }

    /// Post a complete multipart article and return the raw response
    pub async fn post_article(&self, title: &str, category_id: &str) -> Result<reqwest::Response> {
        let image = multipart::Part::bytes(PNG_BYTES.to_vec())
            .file_name("cover.png")
            .mime_str("image/png")?;
        let form = multipart::Form::new()
            .text("title", title.to_string())
            .text("description", "A short summary")
            .text("content", "Body text")
            .text("categoryId", category_id.to_string())
            .part("articleImage", image);

        Ok(self.client.post(self.url("/articles")).multipart(form).send().await?)
    }

    /// Create an article and return its `_id`
    pub async fn create_article(&self, title: &str, category_id: &str) -> Result<String> {
        let res = self.post_article(title, category_id).await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "article create failed: {}", res.status());

        let body: Value = res.json().await?;
        body["article"]["_id"]
            .as_str()
            .map(str::to_string)
            .context("article response without _id")
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/users/signup"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?)
    }
}

/// Store whose every operation fails, for exercising 500 responses
pub struct FailingStore;

pub fn unavailable() -> DatabaseError {
    DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Err(unavailable())
    }

    async fn find_all(&self, _collection: &str) -> Result<Vec<Document>, DatabaseError> {
        Err(unavailable())
    }

    async fn find_by_id(&self, _collection: &str, _id: &str) -> Result<Option<Document>, DatabaseError> {
        Err(unavailable())
    }

    async fn find_one_by(
        &self,
        _collection: &str,
        _field: &str,
        _value: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        Err(unavailable())
    }

    async fn insert(&self, _collection: &str, _document: Document) -> Result<(), DatabaseError> {
        Err(unavailable())
    }

    async fn insert_unique(
        &self,
        _collection: &str,
        _field: &str,
        _document: Document,
    ) -> Result<(), DatabaseError> {
        Err(unavailable())
    }

    async fn update_by_id(
        &self,
        _collection: &str,
        _id: &str,
        _patch: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        Err(unavailable())
    }

    async fn update_unique_by_id(
        &self,
        _collection: &str,
        _id: &str,
        _field: &str,
        _patch: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        Err(unavailable())
    }

    async fn delete_by_id(&self, _collection: &str, _id: &str) -> Result<Option<Document>, DatabaseError> {
        Err(unavailable())
    }
}

/// In-memory store that refuses inserts into one collection and behaves
/// normally otherwise
pub struct RejectingInserts {
    inner: MemoryStore,
    collection: &'static str,
}

impl RejectingInserts {
    pub fn new(collection: &'static str) -> Self {
        Self {
            inner: MemoryStore::new(),
            collection,
        }
    }
}

#[async_trait]
impl DocumentStore for RejectingInserts {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.inner.ping().await
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, DatabaseError> {
        self.inner.find_all(collection).await
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError> {
        self.inner.find_by_id(collection, id).await
    }

    async fn find_one_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        self.inner.find_one_by(collection, field, value).await
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), DatabaseError> {
        if collection == self.collection {
            return Err(unavailable());
        }
        self.inner.insert(collection, document).await
    }

    async fn insert_unique(
        &self,
        collection: &str,
        field: &str,
        document: Document,
    ) -> Result<(), DatabaseError> {
        if collection == self.collection {
            return Err(unavailable());
        }
        self.inner.insert_unique(collection, field, document).await
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        self.inner.update_by_id(collection, id, patch).await
    }

    async fn update_unique_by_id(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        patch: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        self.inner.update_unique_by_id(collection, id, field, patch).await
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError> {
        self.inner.delete_by_id(collection, id).await
    }
}
