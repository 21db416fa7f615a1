use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

// Trending tag entry returned to feeds
#[derive(Debug, Clone, Serialize)]
pub struct TrendingTag {
    pub id: Uuid,
    pub name: String,
    pub score: f64,
}
