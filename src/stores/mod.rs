//! Storage collaborators consumed by the engagement services.
//!
//! Each trait covers one concern of the durable store. Services hold them as
//! `Arc<dyn ...>` so the Postgres backend and the in-memory backend used by
//! tests are interchangeable.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::Result,
    models::{
        AwardKey, Badge, RankableItem, Tag, TargetKind, TargetRef, UserBadgeAward, Vote, VoteKey,
        VoteValue,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn get(&self, key: VoteKey) -> Result<Option<Vote>>;

    /// Create a vote. Fails with `Conflict` if one already exists for the key.
    async fn insert(&self, vote: &Vote) -> Result<()>;

    /// Create or overwrite the vote for `vote.key`.
    async fn upsert(&self, vote: &Vote) -> Result<()>;

    /// Delete the vote for `key`, returning it if one existed.
    async fn delete(&self, key: VoteKey) -> Result<Option<Vote>>;

    async fn count_by_target_and_value(&self, target: TargetRef, value: VoteValue) -> Result<i64>;

    /// Net votes (+1 per upvote, -1 per downvote) cast by other users over
    /// every post and comment owned by `user_id`.
    async fn sum_net_votes_for_owned_content(&self, user_id: Uuid) -> Result<i64>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn exists(&self, user_id: Uuid) -> Result<bool>;

    async fn get_karma(&self, user_id: Uuid) -> Result<Option<i64>>;

    /// Atomically add `delta` to the stored karma and return the new value.
    async fn increment_karma(&self, user_id: Uuid, delta: i64) -> Result<i64>;

    async fn get_created_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>>;

    async fn get_post_count(&self, user_id: Uuid) -> Result<i64>;

    async fn get_comment_count(&self, user_id: Uuid) -> Result<i64>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Owner of a post or comment, `None` when the target does not exist.
    async fn owner_of(&self, target: TargetRef) -> Result<Option<Uuid>>;

    /// Up to `limit` items of `kind` with their current vote counts.
    async fn rankable_items(&self, kind: TargetKind, limit: i64) -> Result<Vec<RankableItem>>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
    async fn get_tag(&self, tag_id: Uuid) -> Result<Option<Tag>>;

    async fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Creation timestamps of the content carrying this tag. `None` means the
    /// association is absent altogether.
    async fn content_ages_for_tag(&self, tag_id: Uuid) -> Result<Option<Vec<DateTime<Utc>>>>;
}

#[async_trait]
pub trait BadgeStore: Send + Sync {
    async fn rule_definitions(&self) -> Result<Vec<Badge>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Badge>> {
        Ok(self
            .rule_definitions()
            .await?
            .into_iter()
            .find(|badge| badge.name == name))
    }

    async fn has_award(&self, key: AwardKey) -> Result<bool>;

    /// Record an award. Fails with `Conflict` if the pair already exists.
    async fn award(&self, key: AwardKey) -> Result<UserBadgeAward>;

    async fn awards_for_user(&self, user_id: Uuid) -> Result<Vec<UserBadgeAward>>;
}
