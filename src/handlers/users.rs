use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{AppState, error::Result};

pub async fn recalculate_karma(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let correction = state.engine.karma.recalculate_karma(user_id).await;

    Ok(Json(json!({ "correction": correction })))
}

pub async fn check_badges(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let awarded = state.engine.badges.check_all_badges(user_id).await?;

    Ok(Json(json!({ "awarded": awarded })))
}

pub async fn get_badges(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let badges = state.engine.badges.badges_for_user(user_id).await?;

    Ok(Json(json!({ "badges": badges })))
}
