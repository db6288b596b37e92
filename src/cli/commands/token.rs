use serde_json::{json, Map};

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

/// Sign a token locally; the user is not looked up in the store
pub fn handle(
    config: AppConfig,
    user_id: String,
    email: String,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let security = &config.security;
    let claims = Claims::new(user_id, email, security.jwt_expiry_hours);
    let token = generate_jwt(&claims, security)?;

    let mut data = Map::new();
    data.insert("token".to_string(), json!(token));
    data.insert("expires_at".to_string(), json!(claims.exp));
    output_success(&output_format, "Token issued", Some(data))
}
