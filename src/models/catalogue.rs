// src/models/catalogue.rs
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::{de_opt_i64, nullable, set_nullable, set_required, set_required_text, yes, NullColumn};

pub const DEFAULT_CATEGORY_TYPE: &str = "single";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceCategory {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default = "yes")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub price: String,
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub price_numeric: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "yes")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: Option<i64>,
}

/// A service with its category joined in.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceDetail {
    #[serde(flatten)]
    pub service: Service,
    pub service_categories: Option<ServiceCategory>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceOption {
    pub id: String,
    pub name: String,
    pub price: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryGroup {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub options: Vec<ServiceOption>,
}

/// Public service menu keyed by category id, in category display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalogue(pub Vec<(String, CategoryGroup)>);

impl Serialize for Catalogue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, group) in &self.0 {
            map.serialize_entry(id, group)?;
        }
        map.end()
    }
}

impl Catalogue {
    pub fn get(&self, category_id: &str) -> Option<&CategoryGroup> {
        self.0.iter().find(|(id, _)| id == category_id).map(|(_, g)| g)
    }
}

/// Groups already-ordered services under already-ordered categories.
/// Services whose category is not listed are left out.
pub fn group_catalogue(categories: Vec<ServiceCategory>, services: &[Service]) -> Catalogue {
    let groups = categories
        .into_iter()
        .map(|category| {
            let options = services
                .iter()
                .filter(|s| s.category_id == category.id)
                .map(|s| ServiceOption {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    price: s.price.clone(),
                    image: s.image_url.clone(),
                })
                .collect();
            let group = CategoryGroup {
                title: category.title,
                description: category.description,
                kind: category.kind,
                options,
            };
            (category.id, group)
        })
        .collect();
    Catalogue(groups)
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CreateServiceRequest {
    pub category_id: Option<String>,
    pub name: Option<String>,
    pub price: Option<String>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub price_numeric: Option<i64>,
    pub image_url: Option<String>,
    pub display_order: Option<i64>,
}

/// Only the fields present in the body are written; an explicit `null`
/// clears a nullable column and is refused for the others.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateServiceRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub price: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub price_numeric: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_active: Option<Option<bool>>,
    #[serde(default, deserialize_with = "nullable")]
    pub display_order: Option<Option<i64>>,
}

impl UpdateServiceRequest {
    pub fn fields(self) -> Result<Vec<(&'static str, Option<Value>)>, NullColumn> {
        Ok(vec![
            ("name", set_required_text("name", self.name)?),
            ("price", set_required_text("price", self.price)?),
            ("price_numeric", set_nullable(self.price_numeric)),
            ("image_url", set_nullable(self.image_url)),
            ("is_active", set_required("is_active", self.is_active)?),
            ("display_order", set_nullable(self.display_order)),
        ])
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CreateCategoryRequest {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateCategoryRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_active: Option<Option<bool>>,
    #[serde(default, deserialize_with = "nullable")]
    pub display_order: Option<Option<i64>>,
}

impl UpdateCategoryRequest {
    pub fn fields(self) -> Result<Vec<(&'static str, Option<Value>)>, NullColumn> {
        Ok(vec![
            ("title", set_required_text("title", self.title)?),
            ("description", set_nullable(self.description)),
            ("type", set_nullable(self.kind)),
            ("is_active", set_required("is_active", self.is_active)?),
            ("display_order", set_nullable(self.display_order)),
        ])
    }
}
