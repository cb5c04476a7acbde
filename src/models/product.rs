use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
    pub category_id: Option<i64>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl crate::events::Loggable for Product {
    fn entity_type() -> &'static str { "product" }
    fn subject_id(&self) -> Option<i64> { Some(self.id) }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    #[schema(example = "Espresso machine")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = 249.99)]
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    pub category_id: Option<i64>,
}
