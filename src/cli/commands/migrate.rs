use anyhow::Context;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::{AppConfig, StoreBackend};
use crate::database::{connect_store, manager::redact_url};

pub async fn handle(config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    if config.database.backend != StoreBackend::Postgres {
        anyhow::bail!("migrate only applies to the postgres store backend");
    }
    config.validate()?;

    let store = connect_store(&config.database).await?;
    store
        .ensure_schema()
        .await
        .context("failed to create documents table")?;

    let mut data = serde_json::Map::new();
    if let Some(url) = config.database.url.as_deref() {
        data.insert("database".to_string(), redact_url(url)?.into());
    }
    output_success(&output_format, "Document schema is up to date", Some(data))
}
