use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{SortMode, TargetKind},
};

#[derive(Debug, Deserialize, Validate)]
pub struct RankedContentQuery {
    pub sort: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

pub async fn ranked_content(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<RankedContentQuery>,
) -> Result<Json<Value>> {
    params.validate()?;

    let kind: TargetKind = kind.parse().map_err(AppError::BadRequest)?;
    let sort = SortMode::normalize(params.sort.as_deref());
    let limit = params.limit.unwrap_or(25);

    let items = state
        .engine
        .ranking
        .ranked_content(kind, sort, limit)
        .await?;

    Ok(Json(json!({
        "kind": kind,
        "sort": sort,
        "items": items
    })))
}
