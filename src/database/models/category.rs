use serde::{Deserialize, Serialize};

use crate::database::manager::DatabaseError;
use crate::database::repository::{to_document, Entity};
use crate::database::store::Document;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
}

impl Entity for Category {
    const COLLECTION: &'static str = "categories";
}

/// Body of a category create request
#[derive(Debug, Deserialize)]
pub struct NewCategory {
    pub title: String,
    pub description: String,
}

impl NewCategory {
    pub fn into_category(self, id: String) -> Category {
        Category {
            id,
            title: self.title,
            description: self.description,
        }
    }
}

/// Partial category update; absent fields are left alone
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategoryPatch {
    pub fn into_document(self) -> Result<Document, DatabaseError> {
        to_document(&self)
    }
}

/// The slice of a category embedded into article listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
}

impl From<Category> for CategorySummary {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            title: category.title,
        }
    }
}
