use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::database::models::{CategoryPatch, NewCategory};
use crate::database::store::new_id;
use crate::error::{ApiError, ApiResult};
use crate::extract::Payload;
use crate::state::AppState;

fn category_not_found() -> ApiError {
    ApiError::not_found("Category not found")
}

/// GET /categories
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let categories = state.categories().find_all().await?;
    Ok(Json(json!({ "categories": categories })))
}

/// POST /categories
pub async fn create(
    State(state): State<AppState>,
    Payload(body): Payload<NewCategory>,
) -> ApiResult<Json<Value>> {
    let category = body.into_category(new_id());
    state.categories().insert(&category).await?;

    info!(category_id = %category.id, "created category");
    Ok(Json(json!({ "message": "Created category", "category": category })))
}

/// GET /categories/:categoryId
pub async fn show(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let category = state
        .categories()
        .find_by_id(&category_id)
        .await?
        .ok_or_else(category_not_found)?;

    Ok(Json(json!({ "category": category })))
}

/// PUT|PATCH /categories/:categoryId
pub async fn update(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
    Payload(patch): Payload<CategoryPatch>,
) -> ApiResult<Json<Value>> {
    let category = state
        .categories()
        .update_by_id(&category_id, patch.into_document()?)
        .await?
        .ok_or_else(category_not_found)?;

    Ok(Json(json!({ "message": "Category updated", "category": category })))
}

/// DELETE /categories/:categoryId
///
/// Articles that reference the category are left as they are.
pub async fn delete(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .categories()
        .delete_by_id(&category_id)
        .await?
        .ok_or_else(category_not_found)?;

    info!(category_id = %category_id, "deleted category");
    Ok(Json(json!({ "message": format!("Category _id: {} Deleted", category_id) })))
}
