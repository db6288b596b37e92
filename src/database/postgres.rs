use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, PgPool, Postgres, Transaction};
use tracing::info;

use crate::database::manager::DatabaseError;
use crate::database::store::{
    document_id, string_field, unique_conflict, Document, DocumentStore, ID_FIELD,
};

/// Document store over a single Postgres table of JSONB bodies
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_document(value: Value) -> Result<Document, DatabaseError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::InvalidDocument(format!("expected object, found {}", other))),
    }
}

fn map_insert_error(err: sqlx::Error, collection: &str, id: &str) -> DatabaseError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DatabaseError::Conflict(format!("{} {} already exists", collection, id))
        }
        _ => DatabaseError::Sqlx(err),
    }
}

/// Key serialising writers that claim the same value of a unique field
fn unique_lock_key(collection: &str, field: &str, value: &str) -> String {
    format!("{}\u{1f}{}\u{1f}{}", collection, field, value)
}

/// Take the transaction-scoped lock for `value`, then fail if a document
/// other than `except_id` already holds it
async fn claim_unique_value(
    tx: &mut Transaction<'_, Postgres>,
    collection: &str,
    field: &str,
    value: &str,
    except_id: Option<&str>,
) -> Result<(), DatabaseError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(unique_lock_key(collection, field, value))
        .execute(&mut **tx)
        .await?;

    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM documents
             WHERE collection = $1 AND body ->> $2 = $3
               AND ($4::TEXT IS NULL OR id <> $4)
        )",
    )
    .bind(collection)
    .bind(field)
    .bind(value)
    .bind(except_id)
    .fetch_one(&mut **tx)
    .await?;

    if taken {
        return Err(unique_conflict(collection, field, value));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (collection, id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_collection_created_idx
                ON documents (collection, created_at)",
        )
        .execute(&self.pool)
        .await?;

        info!("Document store schema is up to date");
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, DatabaseError> {
        let rows = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM documents WHERE collection = $1 ORDER BY created_at, id",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|Json(body)| into_document(body)).collect()
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError> {
        let row = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|Json(body)| into_document(body)).transpose()
    }

    async fn find_one_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        let row = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM documents
             WHERE collection = $1 AND body ->> $2 = $3
             ORDER BY created_at, id
             LIMIT 1",
        )
        .bind(collection)
        .bind(field)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|Json(body)| into_document(body)).transpose()
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), DatabaseError> {
        let id = document_id(&document)?.to_string();

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(Value::Object(document)))
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, collection, &id))?;

        Ok(())
    }

    async fn insert_unique(
        &self,
        collection: &str,
        field: &str,
        document: Document,
    ) -> Result<(), DatabaseError> {
        let id = document_id(&document)?.to_string();
        let mut tx = self.pool.begin().await?;

        if let Some(value) = string_field(&document, field) {
            claim_unique_value(&mut tx, collection, field, value, None).await?;
        }

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(Value::Object(document)))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_insert_error(e, collection, &id))?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        mut patch: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        patch.remove(ID_FIELD);

        let row = sqlx::query_scalar::<_, Json<Value>>(
            "UPDATE documents SET body = body || $3
             WHERE collection = $1 AND id = $2
             RETURNING body",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(patch)))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|Json(body)| into_document(body)).transpose()
    }

    async fn update_unique_by_id(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        mut patch: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        patch.remove(ID_FIELD);
        let mut tx = self.pool.begin().await?;

        if let Some(value) = string_field(&patch, field) {
            claim_unique_value(&mut tx, collection, field, value, Some(id)).await?;
        }

        let row = sqlx::query_scalar::<_, Json<Value>>(
            "UPDATE documents SET body = body || $3
             WHERE collection = $1 AND id = $2
             RETURNING body",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(patch)))
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        row.map(|Json(body)| into_document(body)).transpose()
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError> {
        let row = sqlx::query_scalar::<_, Json<Value>>(
            "DELETE FROM documents WHERE collection = $1 AND id = $2 RETURNING body",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|Json(body)| into_document(body)).transpose()
    }
}
