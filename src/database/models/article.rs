use serde::{Deserialize, Serialize};

use crate::database::manager::DatabaseError;
use crate::database::models::category::CategorySummary;
use crate::database::repository::{to_document, Entity};
use crate::database::store::Document;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    /// Owning category. Optional in storage, required by the create handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    /// Server-relative path of the uploaded image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Entity for Article {
    const COLLECTION: &'static str = "articles";
}

/// Partial article update. The image is only set through upload.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

impl ArticlePatch {
    pub fn into_document(self) -> Result<Document, DatabaseError> {
        to_document(&self)
    }
}

/// An article as listed, with its category reference populated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListing {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    /// `null` when the article has no category or it no longer exists
    pub category_id: Option<CategorySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ArticleListing {
    pub fn populate(article: Article, category: Option<CategorySummary>) -> Self {
        Self {
            id: article.id,
            title: article.title,
            description: article.description,
            content: article.content,
            category_id: category,
            image: article.image,
        }
    }
}
