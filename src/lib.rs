pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod redis;
pub mod services;
pub mod stores;

use axum::{
    Json, Router,
    extract::State,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::Config, redis::RedisClient, services::Engine};

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub config: Arc<Config>,
    pub redis: Option<Arc<RedisClient>>,
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    let api_routes = Router::new()
        // Vote routes
        .route("/api/votes", post(handlers::votes::cast_vote))
        .route("/api/votes", delete(handlers::votes::retract_vote))
        // Feed routes
        .route(
            "/api/content/{kind}",
            get(handlers::content::ranked_content),
        )
        // Tag routes
        .route("/api/tags/trending", get(handlers::tags::trending_tags))
        .route("/api/tags/{tag_id}/score", get(handlers::tags::tag_score))
        // User routes
        .route(
            "/api/users/{user_id}/karma/recalculate",
            post(handlers::users::recalculate_karma),
        )
        .route(
            "/api/users/{user_id}/badges/check",
            post(handlers::users::check_badges),
        )
        .route(
            "/api/users/{user_id}/badges",
            get(handlers::users::get_badges),
        );

    Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let redis = match &state.redis {
        Some(redis) => match redis.ping().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::warn!("Redis health check failed: {}", e);
                "unavailable"
            }
        },
        None => "disabled",
    };

    Json(json!({
        "status": "ok",
        "redis": redis
    }))
}
