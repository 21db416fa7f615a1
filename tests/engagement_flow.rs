use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use forum_engagement::{
    AppState,
    config::{Config, DEFAULT_HOT_GRAVITY},
    create_app,
    models::{TargetRef, VoteValue},
    services::{Engine, notification_service::NoopNotifier, ranking_service::Ranker},
    stores::{MemoryStore, UserStore},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

fn engine(store: &Arc<MemoryStore>) -> Engine {
    Engine::new(
        store.clone(),
        Arc::new(NoopNotifier),
        Ranker::new(DEFAULT_HOT_GRAVITY).unwrap(),
        50,
    )
}

fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/forum_test".to_string(),
        redis_url: "redis://localhost:6379".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        allowed_origins: vec!["http://localhost:3000".to_string()],
        hot_gravity: DEFAULT_HOT_GRAVITY,
        trending_max_limit: 50,
        notification_queue: "notifications:test".to_string(),
    }
}

fn karma_sum(writes: &[(Uuid, i64)], user: Uuid) -> i64 {
    writes
        .iter()
        .filter(|(id, _)| *id == user)
        .map(|(_, delta)| delta)
        .sum()
}

#[tokio::test]
async fn double_cast_nets_zero_karma() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine(&store);
    let owner = store.add_user(Utc::now()).unwrap();
    let voter = store.add_user(Utc::now()).unwrap();

    for value in [VoteValue::Upvote, VoteValue::Downvote] {
        let comment = TargetRef::comment(store.add_comment(owner, Utc::now()).unwrap());
        engine.votes.cast_vote(voter, comment, value).await.unwrap();
        engine.votes.cast_vote(voter, comment, value).await.unwrap();

        assert_eq!(engine.votes.vote_of(voter, comment).await.unwrap(), None);
    }

    let writes = store.karma_writes().unwrap();
    assert_eq!(writes.len(), 4);
    assert_eq!(karma_sum(&writes, owner), 0);
}

#[tokio::test]
async fn flip_applies_exactly_two() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine(&store);
    let owner = store.add_user(Utc::now()).unwrap();
    let voter = store.add_user(Utc::now()).unwrap();
    let post = TargetRef::post(store.add_post(owner, Utc::now()).unwrap());

    engine
        .votes
        .cast_vote(voter, post, VoteValue::Downvote)
        .await
        .unwrap();
    let flip = engine
        .votes
        .cast_vote(voter, post, VoteValue::Upvote)
        .await
        .unwrap();

    assert_eq!(flip.karma_delta, 2);
    assert_eq!(store.karma_writes().unwrap().last(), Some(&(owner, 2)));
}

#[tokio::test]
async fn owner_votes_never_move_karma() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine(&store);
    let owner = store.add_user(Utc::now()).unwrap();
    let post = TargetRef::post(store.add_post(owner, Utc::now()).unwrap());

    for value in [
        VoteValue::Upvote,
        VoteValue::Downvote,
        VoteValue::Downvote,
        VoteValue::Upvote,
    ] {
        engine.votes.cast_vote(owner, post, value).await.unwrap();
    }
    engine.votes.retract_vote(owner, post).await.unwrap();

    assert!(store.karma_writes().unwrap().is_empty());
}

#[tokio::test]
async fn recalculation_is_idempotent_and_matches_ledger() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine(&store);
    let owner = store.add_user(Utc::now()).unwrap();
    let post = TargetRef::post(store.add_post(owner, Utc::now()).unwrap());
    let comment = TargetRef::comment(store.add_comment(owner, Utc::now()).unwrap());

    for _ in 0..3 {
        let voter = store.add_user(Utc::now()).unwrap();
        engine
            .votes
            .cast_vote(voter, post, VoteValue::Upvote)
            .await
            .unwrap();
        engine
            .votes
            .cast_vote(voter, comment, VoteValue::Downvote)
            .await
            .unwrap();
    }
    // Out-of-band removal leaves the counter one behind the ledger.
    let voter = store.add_user(Utc::now()).unwrap();
    engine
        .votes
        .cast_vote(voter, comment, VoteValue::Downvote)
        .await
        .unwrap();
    engine.votes.remove_vote(voter, comment).await.unwrap();
    assert_eq!(store.get_karma(owner).await.unwrap(), Some(-1));

    let first = engine.karma.recalculate_karma(owner).await;
    assert_eq!(first.computed, 0);
    assert_eq!(first.delta, 1);

    let second = engine.karma.recalculate_karma(owner).await;
    assert_eq!(second.delta, 0);
    assert_eq!(store.get_karma(owner).await.unwrap(), Some(0));
}

#[tokio::test]
async fn recalculation_ignores_self_votes() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine(&store);
    let owner = store.add_user(Utc::now()).unwrap();
    let post = TargetRef::post(store.add_post(owner, Utc::now()).unwrap());
    let comment = TargetRef::comment(store.add_comment(owner, Utc::now()).unwrap());

    engine
        .votes
        .cast_vote(owner, post, VoteValue::Upvote)
        .await
        .unwrap();
    engine
        .votes
        .cast_vote(owner, comment, VoteValue::Downvote)
        .await
        .unwrap();

    let correction = engine.karma.recalculate_karma(owner).await;
    assert_eq!(correction.computed, 0);
    assert_eq!(correction.delta, 0);
    assert_eq!(store.get_karma(owner).await.unwrap(), Some(0));
    assert!(store.karma_writes().unwrap().is_empty());
}

#[tokio::test]
async fn rising_star_awarded_through_votes() {
    let store = Arc::new(MemoryStore::new());
    store.seed_badges().unwrap();
    let engine = engine(&store);
    let owner = store.add_user(Utc::now()).unwrap();
    let post = TargetRef::post(store.add_post(owner, Utc::now()).unwrap());
    store.set_karma(owner, 99).unwrap();

    let voter = store.add_user(Utc::now()).unwrap();
    engine
        .votes
        .cast_vote(voter, post, VoteValue::Upvote)
        .await
        .unwrap();

    let names: Vec<_> = engine
        .badges
        .badges_for_user(owner)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["Rising Star"]);

    // The full pass adds First Post but never repeats Rising Star.
    let awarded = engine.badges.check_all_badges(owner).await.unwrap();
    assert_eq!(awarded.len(), 1);
    assert_eq!(awarded[0].name, "First Post");
    assert!(engine.badges.check_all_badges(owner).await.unwrap().is_empty());
    assert_eq!(store.award_count().unwrap(), 2);
}

#[tokio::test]
async fn ranked_feed_from_store() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine(&store);
    let owner = store.add_user(Utc::now()).unwrap();
    let now = Utc::now();

    let a = store.add_post(owner, now - Duration::hours(3)).unwrap();
    let b = store.add_post(owner, now - Duration::hours(2)).unwrap();
    let c = store.add_post(owner, now - Duration::hours(1)).unwrap();
    for (post, votes) in [(a, 1), (b, 2), (c, 3)] {
        for _ in 0..votes {
            let voter = store.add_user(now).unwrap();
            engine
                .votes
                .cast_vote(voter, TargetRef::post(post), VoteValue::Upvote)
                .await
                .unwrap();
        }
    }

    let best = engine
        .ranking
        .ranked_content(
            forum_engagement::models::TargetKind::Post,
            forum_engagement::models::SortMode::Best,
            10,
        )
        .await
        .unwrap();
    let ids: Vec<_> = best.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![c, b, a]);
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn http_vote_and_toggle() {
    let store = Arc::new(MemoryStore::new());
    let owner = store.add_user(Utc::now()).unwrap();
    let voter = store.add_user(Utc::now()).unwrap();
    let post = store.add_post(owner, Utc::now()).unwrap();
    let app = create_app(AppState {
        engine: engine(&store),
        config: Arc::new(test_config()),
        redis: None,
    });

    let vote = json!({
        "voter_id": voter,
        "target_id": post,
        "target_type": "post",
        "value": "upvote"
    });
    let request = || {
        Request::builder()
            .method("POST")
            .uri("/api/votes")
            .header("content-type", "application/json")
            .body(Body::from(vote.to_string()))
            .unwrap()
    };

    let response = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"]["transition"]["transition"], "created");
    assert_eq!(body["tally"]["upvotes"], 1);
    assert_eq!(body["tally"]["user_vote"], "upvote");

    let response = app.oneshot(request()).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["outcome"]["transition"]["transition"], "toggled_off");
    assert_eq!(body["tally"]["upvotes"], 0);
    assert_eq!(body["tally"]["user_vote"], Value::Null);
}

#[tokio::test]
async fn http_unknown_target_is_404() {
    let store = Arc::new(MemoryStore::new());
    let voter = store.add_user(Utc::now()).unwrap();
    let app = create_app(AppState {
        engine: engine(&store),
        config: Arc::new(test_config()),
        redis: None,
    });

    let request = Request::builder()
        .method("POST")
        .uri("/api/votes")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "voter_id": voter,
                "target_id": Uuid::new_v4(),
                "target_type": "comment",
                "value": "downvote"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_feed_defaults_unknown_sort_to_new() {
    let store = Arc::new(MemoryStore::new());
    let owner = store.add_user(Utc::now()).unwrap();
    let older = store.add_post(owner, Utc::now() - Duration::hours(5)).unwrap();
    let newer = store.add_post(owner, Utc::now()).unwrap();
    let app = create_app(AppState {
        engine: engine(&store),
        config: Arc::new(test_config()),
        redis: None,
    });

    let request = Request::builder()
        .uri("/api/content/posts?sort=sideways&limit=10")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["sort"], "new");
    assert_eq!(body["items"][0]["id"], json!(newer));
    assert_eq!(body["items"][1]["id"], json!(older));
}

#[tokio::test]
async fn http_trending_excludes_idle_tags() {
    let store = Arc::new(MemoryStore::new());
    let owner = store.add_user(Utc::now()).unwrap();
    let busy = store.add_tag("rust").unwrap();
    store.add_tag("empty").unwrap();
    let post = store.add_post(owner, Utc::now()).unwrap();
    store.tag_content(busy, post).unwrap();
    let app = create_app(AppState {
        engine: engine(&store),
        config: Arc::new(test_config()),
        redis: None,
    });

    let request = Request::builder()
        .uri("/api/tags/trending?limit=5")
        .body(Body::empty())
        .unwrap();
    let body = body_json(app.oneshot(request).await.unwrap()).await;

    let tags = body["tags"].as_array().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["name"], "rust");
    assert_eq!(tags[0]["score"], 1.0);
}
