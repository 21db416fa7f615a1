use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState,
    error::Result,
    models::{TargetKind, TargetRef, VoteValue},
};

// Identity resolution lives in the surrounding gateway; the voter arrives
// already authenticated.
#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub voter_id: Uuid,
    pub target_id: Uuid,
    pub target_type: TargetKind,
    pub value: VoteValue,
}

#[derive(Debug, Deserialize)]
pub struct RetractVoteRequest {
    pub voter_id: Uuid,
    pub target_id: Uuid,
    pub target_type: TargetKind,
}

pub async fn cast_vote(
    State(state): State<AppState>,
    Json(payload): Json<CastVoteRequest>,
) -> Result<Json<Value>> {
    let target = TargetRef {
        id: payload.target_id,
        kind: payload.target_type,
    };

    let outcome = state
        .engine
        .votes
        .cast_vote(payload.voter_id, target, payload.value)
        .await?;
    let tally = state
        .engine
        .votes
        .tally(target, Some(payload.voter_id))
        .await?;

    Ok(Json(json!({
        "outcome": outcome,
        "tally": tally
    })))
}

pub async fn retract_vote(
    State(state): State<AppState>,
    Json(payload): Json<RetractVoteRequest>,
) -> Result<Json<Value>> {
    let target = TargetRef {
        id: payload.target_id,
        kind: payload.target_type,
    };

    let removed = state
        .engine
        .votes
        .retract_vote(payload.voter_id, target)
        .await?;
    let tally = state.engine.votes.tally(target, None).await?;

    Ok(Json(json!({
        "removed": removed,
        "tally": tally
    })))
}
