use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, error::Result};

#[derive(Debug, Deserialize, Validate)]
pub struct TrendingQuery {
    #[validate(range(min = 1))]
    pub limit: Option<usize>,
}

pub async fn trending_tags(
    State(state): State<AppState>,
    Query(params): Query<TrendingQuery>,
) -> Result<Json<Value>> {
    params.validate()?;
    let limit = params.limit.unwrap_or(10);

    let tags = state.engine.trending.trending_tags(limit).await?;

    Ok(Json(json!({ "tags": tags })))
}

pub async fn tag_score(
    State(state): State<AppState>,
    Path(tag_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let score = state.engine.trending.trending_score(tag_id).await?;

    Ok(Json(json!({
        "tag_id": tag_id,
        "score": score
    })))
}
