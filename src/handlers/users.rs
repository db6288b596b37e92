use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{generate_jwt, Claims};
use crate::database::models::user::is_valid_email;
use crate::database::models::{Credentials, PublicUser, User, UserPatch};
use crate::database::store::new_id;
use crate::database::DatabaseError;
use crate::error::{ApiError, ApiResult};
use crate::extract::Payload;
use crate::state::AppState;

fn user_not_found() -> ApiError {
    ApiError::not_found("User not found")
}

/// Email uniqueness lost to a concurrent writer surfaces as a store conflict
fn mail_exists(err: DatabaseError) -> ApiError {
    match err {
        DatabaseError::Conflict(_) => ApiError::conflict("Mail exists"),
        other => other.into(),
    }
}

fn check_email(email: &str) -> ApiResult<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid email address"))
    }
}

fn check_password(password: &str) -> ApiResult<()> {
    if password.is_empty() {
        Err(ApiError::bad_request("Password cannot be empty"))
    } else {
        Ok(())
    }
}

/// GET /users
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let users: Vec<PublicUser> = state
        .users()
        .find_all()
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();

    Ok(Json(json!({ "users": users })))
}

/// POST /users/signup
pub async fn signup(
    State(state): State<AppState>,
    Payload(credentials): Payload<Credentials>,
) -> ApiResult<Json<Value>> {
    check_email(&credentials.email)?;
    check_password(&credentials.password)?;

    let users = state.users();
    if users.find_one_by("email", &credentials.email).await?.is_some() {
        return Err(ApiError::conflict("Mail exists"));
    }

    let user = User {
        id: new_id(),
        email: credentials.email,
        password: hash_password(credentials.password).await?,
    };
    users.insert_unique("email", &user).await.map_err(mail_exists)?;

    info!(user_id = %user.id, "created user");
    Ok(Json(json!({ "message": "User created", "user": PublicUser::from(user) })))
}

/// POST /users/login - exchange credentials for an access token
pub async fn login(
    State(state): State<AppState>,
    Payload(credentials): Payload<Credentials>,
) -> ApiResult<Json<Value>> {
    let user = state
        .users()
        .find_one_by("email", &credentials.email)
        .await?
        .ok_or_else(ApiError::auth_failed)?;

    if !verify_password(credentials.password, user.password.clone()).await? {
        return Err(ApiError::auth_failed());
    }

    let security = &state.config.security;
    let claims = Claims::new(&user.id, &user.email, security.jwt_expiry_hours);
    let token = generate_jwt(&claims, security)?;

    Ok(Json(json!({ "message": "Auth successful", "token": token })))
}

/// GET /users/:userId
pub async fn show(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user = state
        .users()
        .find_by_id(&user_id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(json!({ "user": PublicUser::from(user) })))
}

/// PUT|PATCH /users/:userId - change email and/or password
pub async fn update(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Payload(patch): Payload<UserPatch>,
) -> ApiResult<Json<Value>> {
    let users = state.users();
    users.find_by_id(&user_id).await?.ok_or_else(user_not_found)?;

    let mut changes = Map::new();

    if let Some(email) = patch.email {
        check_email(&email)?;
        changes.insert("email".to_string(), Value::String(email));
    }

    if let Some(password) = patch.password {
        check_password(&password)?;
        changes.insert("password".to_string(), Value::String(hash_password(password).await?));
    }

    let user = users
        .update_unique_by_id(&user_id, "email", changes)
        .await
        .map_err(mail_exists)?
        .ok_or_else(user_not_found)?;

    Ok(Json(json!({ "message": "User updated", "user": PublicUser::from(user) })))
}

/// DELETE /users/:userId
pub async fn delete(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .users()
        .delete_by_id(&user_id)
        .await?
        .ok_or_else(user_not_found)?;

    info!(user_id = %user_id, "deleted user");
    Ok(Json(json!({ "message": format!("User _id: {} Deleted", user_id) })))
}
