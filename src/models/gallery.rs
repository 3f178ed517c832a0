// src/models/gallery.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{nullable, set_nullable, set_required, set_required_text, yes, NullColumn, RowId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryImage {
    pub id: RowId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "yes")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewGalleryImage {
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub category: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CreateGalleryRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub display_order: Option<i64>,
}

/// Partial update; `null` clears the nullable columns only.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateGalleryRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_active: Option<Option<bool>>,
    #[serde(default, deserialize_with = "nullable")]
    pub display_order: Option<Option<i64>>,
}

impl UpdateGalleryRequest {
    pub fn fields(self) -> Result<Vec<(&'static str, Option<Value>)>, NullColumn> {
        Ok(vec![
            ("title", set_required_text("title", self.title)?),
            ("description", set_nullable(self.description)),
            ("image_url", set_required_text("image_url", self.image_url)?),
            ("category", set_nullable(self.category)),
            ("is_active", set_required("is_active", self.is_active)?),
            ("display_order", set_nullable(self.display_order)),
        ])
    }
}
