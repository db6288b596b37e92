use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    Json,
};
use futures::future::try_join_all;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

use crate::database::models::{Article, ArticleListing, ArticlePatch, CategorySummary};
use crate::database::store::new_id;
use crate::error::{ApiError, ApiResult};
use crate::extract::Payload;
use crate::state::AppState;
use crate::uploads::{self, UploadedFile};

fn article_not_found() -> ApiError {
    ApiError::not_found("Article not found")
}

fn category_not_found() -> ApiError {
    ApiError::not_found("Category not found")
}

/// Fail with 404 unless the referenced category exists
async fn require_category(state: &AppState, category_id: &str) -> ApiResult<()> {
    state
        .categories()
        .find_by_id(category_id)
        .await?
        .map(|_| ())
        .ok_or_else(category_not_found)
}

/// Text fields and the single image file of a create request
#[derive(Debug, Default)]
struct ArticleForm {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    category_id: Option<String>,
    image: Option<UploadedFile>,
}

impl ArticleForm {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = ArticleForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if let Some(file_name) = field.file_name().map(str::to_string) {
                if form.image.is_some() {
                    return Err(ApiError::bad_request("Only one image file may be uploaded"));
                }
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                form.image = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            match name.as_str() {
                "title" => form.title = Some(value),
                "description" => form.description = Some(value),
                "content" => form.content = Some(value),
                "categoryId" => form.category_id = Some(value),
                _ => {}
            }
        }

        Ok(form)
    }
}

fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    value.ok_or_else(|| ApiError::bad_request(format!("{} is required", field)))
}

/// GET /articles - every article with its category title populated
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let articles = state.articles().find_all().await?;

    let mut category_ids: Vec<String> = articles
        .iter()
        .filter_map(|a| a.category_id.clone())
        .collect();
    category_ids.sort();
    category_ids.dedup();

    let categories = state.categories();
    let found = try_join_all(category_ids.iter().map(|id| categories.find_by_id(id))).await?;
    let summaries: HashMap<String, CategorySummary> = found
        .into_iter()
        .flatten()
        .map(|c| (c.id.clone(), CategorySummary::from(c)))
        .collect();

    let articles: Vec<ArticleListing> = articles
        .into_iter()
        .map(|article| {
            let category = article
                .category_id
                .as_ref()
                .and_then(|id| summaries.get(id))
                .cloned();
            ArticleListing::populate(article, category)
        })
        .collect();

    Ok(Json(json!({ "articles": articles })))
}

/// POST /articles - multipart create with exactly one image file
pub async fn create(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Value>> {
    let multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let form = ArticleForm::read(multipart).await?;

    let title = required(form.title, "title")?;
    let description = required(form.description, "description")?;
    let content = required(form.content, "content")?;
    let image = form
        .image
        .ok_or_else(|| ApiError::bad_request("An image file is required"))?;

    let category_id = form.category_id.ok_or_else(category_not_found)?;
    require_category(&state, &category_id).await?;

    let stored = uploads::save(&state.config.uploads.dir, &image).await?;

    let article = Article {
        id: new_id(),
        title,
        description,
        content,
        category_id: Some(category_id),
        image: Some(stored.public_path.clone()),
    };

    if let Err(e) = state.articles().insert(&article).await {
        uploads::discard(&stored).await;
        return Err(e.into());
    }

    info!(article_id = %article.id, "created article");
    Ok(Json(json!({ "message": "Created article", "article": article })))
}

/// GET /articles/:articleId
pub async fn show(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let article = state
        .articles()
        .find_by_id(&article_id)
        .await?
        .ok_or_else(article_not_found)?;

    Ok(Json(json!({ "article": article })))
}

/// PUT|PATCH /articles/:articleId - partial update.
///
/// The article must exist, and a supplied `categoryId` must resolve, before
/// anything is written.
pub async fn update(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    Payload(patch): Payload<ArticlePatch>,
) -> ApiResult<Json<Value>> {
    let articles = state.articles();

    articles
        .find_by_id(&article_id)
        .await?
        .ok_or_else(article_not_found)?;

    if let Some(category_id) = patch.category_id.as_deref() {
        require_category(&state, category_id).await?;
    }

    let article = articles
        .update_by_id(&article_id, patch.into_document()?)
        .await?
        .ok_or_else(article_not_found)?;

    info!(article_id = %article.id, "updated article");
    Ok(Json(json!({ "message": "Article updated", "article": article })))
}

/// DELETE /articles/:articleId
pub async fn delete(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .articles()
        .delete_by_id(&article_id)
        .await?
        .ok_or_else(article_not_found)?;

    info!(article_id = %article_id, "deleted article");
    Ok(Json(json!({ "message": format!("Article _id: {} Deleted", article_id) })))
}
