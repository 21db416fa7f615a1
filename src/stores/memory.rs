//! In-memory store for tests and local experiments.
//!
//! One `MemoryStore` implements every store trait over a single
//! `RwLock`-guarded state, so ownership, votes and awards stay consistent the
//! way they would inside one database.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        AwardKey, Badge, BadgeRule, RankableItem, Tag, TargetKind, TargetRef, UserBadgeAward,
        Vote, VoteKey, VoteValue,
    },
    stores::{BadgeStore, ContentStore, TagStore, UserStore, VoteStore},
};

#[derive(Debug, Clone)]
struct UserRecord {
    karma: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ContentRecord {
    kind: TargetKind,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct TagRecord {
    tag: Tag,
    content: Option<Vec<Uuid>>,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, UserRecord>,
    content: HashMap<Uuid, ContentRecord>,
    votes: HashMap<VoteKey, Vote>,
    tags: HashMap<Uuid, TagRecord>,
    badges: HashMap<Uuid, Badge>,
    awards: HashMap<AwardKey, UserBadgeAward>,
    karma_writes: Vec<(Uuid, i64)>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }

    pub fn add_user(&self, created_at: DateTime<Utc>) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.write()?
            .users
            .insert(id, UserRecord { karma: 0, created_at });
        Ok(id)
    }

    /// Overwrite a user's stored karma without recording a karma write.
    /// Used to simulate drift between the counter and the ledger.
    pub fn set_karma(&self, user_id: Uuid, karma: i64) -> Result<()> {
        let mut state = self.write()?;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.karma = karma;
        Ok(())
    }

    pub fn add_post(&self, owner_id: Uuid, created_at: DateTime<Utc>) -> Result<Uuid> {
        self.add_content(TargetKind::Post, owner_id, created_at)
    }

    pub fn add_comment(&self, owner_id: Uuid, created_at: DateTime<Utc>) -> Result<Uuid> {
        self.add_content(TargetKind::Comment, owner_id, created_at)
    }

    fn add_content(
        &self,
        kind: TargetKind,
        owner_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.write()?.content.insert(
            id,
            ContentRecord {
                kind,
                owner_id,
                created_at,
            },
        );
        Ok(id)
    }

    pub fn add_tag(&self, name: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.write()?.tags.insert(
            id,
            TagRecord {
                tag: Tag {
                    id,
                    name: name.to_string(),
                },
                content: Some(Vec::new()),
            },
        );
        Ok(id)
    }

    pub fn tag_content(&self, tag_id: Uuid, content_id: Uuid) -> Result<()> {
        let mut state = self.write()?;
        let record = state
            .tags
            .get_mut(&tag_id)
            .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;
        record.content.get_or_insert_with(Vec::new).push(content_id);
        Ok(())
    }

    /// Drop a tag's content association entirely (not just empty it).
    pub fn clear_tag_content(&self, tag_id: Uuid) -> Result<()> {
        let mut state = self.write()?;
        let record = state
            .tags
            .get_mut(&tag_id)
            .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;
        record.content = None;
        Ok(())
    }

    pub fn add_badge(&self, name: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.write()?.badges.insert(
            id,
            Badge {
                id,
                name: name.to_string(),
            },
        );
        Ok(id)
    }

    /// Define one badge per rule in the eligibility table.
    pub fn seed_badges(&self) -> Result<()> {
        for rule in BadgeRule::ALL {
            self.add_badge(rule.name())?;
        }
        Ok(())
    }

    pub fn remove_badge(&self, name: &str) -> Result<()> {
        self.write()?.badges.retain(|_, badge| badge.name != name);
        Ok(())
    }

    /// Every karma increment applied so far, in order.
    pub fn karma_writes(&self) -> Result<Vec<(Uuid, i64)>> {
        Ok(self.read()?.karma_writes.clone())
    }

    pub fn award_count(&self) -> Result<usize> {
        Ok(self.read()?.awards.len())
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn get(&self, key: VoteKey) -> Result<Option<Vote>> {
        Ok(self.read()?.votes.get(&key).cloned())
    }

    async fn insert(&self, vote: &Vote) -> Result<()> {
        let mut state = self.write()?;
        if state.votes.contains_key(&vote.key) {
            return Err(AppError::Conflict("Vote already exists".to_string()));
        }
        state.votes.insert(vote.key, vote.clone());
        Ok(())
    }

    async fn upsert(&self, vote: &Vote) -> Result<()> {
        self.write()?.votes.insert(vote.key, vote.clone());
        Ok(())
    }

    async fn delete(&self, key: VoteKey) -> Result<Option<Vote>> {
        Ok(self.write()?.votes.remove(&key))
    }

    async fn count_by_target_and_value(&self, target: TargetRef, value: VoteValue) -> Result<i64> {
        let state = self.read()?;
        let count = state
            .votes
            .values()
            .filter(|vote| vote.target() == target && vote.value == value)
            .count();
        Ok(count as i64)
    }

    async fn sum_net_votes_for_owned_content(&self, user_id: Uuid) -> Result<i64> {
        let state = self.read()?;
        let net = state
            .votes
            .values()
            .filter(|vote| vote.key.voter_id != user_id)
            .filter(|vote| {
                state.content.get(&vote.key.target_id).is_some_and(|content| {
                    content.owner_id == user_id && content.kind == vote.target_kind
                })
            })
            .map(|vote| vote.value.weight())
            .sum();
        Ok(net)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn exists(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.read()?.users.contains_key(&user_id))
    }

    async fn get_karma(&self, user_id: Uuid) -> Result<Option<i64>> {
        Ok(self.read()?.users.get(&user_id).map(|user| user.karma))
    }

    async fn increment_karma(&self, user_id: Uuid, delta: i64) -> Result<i64> {
        let mut state = self.write()?;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.karma += delta;
        let karma = user.karma;
        state.karma_writes.push((user_id, delta));
        Ok(karma)
    }

    async fn get_created_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        Ok(self.read()?.users.get(&user_id).map(|user| user.created_at))
    }

    async fn get_post_count(&self, user_id: Uuid) -> Result<i64> {
        let state = self.read()?;
        Ok(count_owned(&state, user_id, TargetKind::Post))
    }

    async fn get_comment_count(&self, user_id: Uuid) -> Result<i64> {
        let state = self.read()?;
        Ok(count_owned(&state, user_id, TargetKind::Comment))
    }
}

fn count_owned(state: &State, user_id: Uuid, kind: TargetKind) -> i64 {
    state
        .content
        .values()
        .filter(|content| content.owner_id == user_id && content.kind == kind)
        .count() as i64
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn owner_of(&self, target: TargetRef) -> Result<Option<Uuid>> {
        let state = self.read()?;
        Ok(state
            .content
            .get(&target.id)
            .filter(|content| content.kind == target.kind)
            .map(|content| content.owner_id))
    }

    async fn rankable_items(&self, kind: TargetKind, limit: i64) -> Result<Vec<RankableItem>> {
        let state = self.read()?;
        let mut items: Vec<RankableItem> = state
            .content
            .iter()
            .filter(|(_, content)| content.kind == kind)
            .map(|(id, content)| {
                let (mut upvote_count, mut downvote_count) = (0, 0);
                for vote in state.votes.values().filter(|v| v.key.target_id == *id) {
                    match vote.value {
                        VoteValue::Upvote => upvote_count += 1,
                        VoteValue::Downvote => downvote_count += 1,
                    }
                }
                RankableItem {
                    id: *id,
                    owner_id: content.owner_id,
                    created_at: content.created_at,
                    upvote_count,
                    downvote_count,
                }
            })
            .collect();

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        items.truncate(limit.max(0) as usize);
        Ok(items)
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn get_tag(&self, tag_id: Uuid) -> Result<Option<Tag>> {
        Ok(self.read()?.tags.get(&tag_id).map(|record| record.tag.clone()))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        Ok(self
            .read()?
            .tags
            .values()
            .map(|record| record.tag.clone())
            .collect())
    }

    async fn content_ages_for_tag(&self, tag_id: Uuid) -> Result<Option<Vec<DateTime<Utc>>>> {
        let state = self.read()?;
        let Some(record) = state.tags.get(&tag_id) else {
            return Ok(None);
        };

        Ok(record.content.as_ref().map(|ids| {
            ids.iter()
                .filter_map(|id| state.content.get(id))
                .map(|content| content.created_at)
                .collect()
        }))
    }
}

#[async_trait]
impl BadgeStore for MemoryStore {
    async fn rule_definitions(&self) -> Result<Vec<Badge>> {
        Ok(self.read()?.badges.values().cloned().collect())
    }

    async fn has_award(&self, key: AwardKey) -> Result<bool> {
        Ok(self.read()?.awards.contains_key(&key))
    }

    async fn award(&self, key: AwardKey) -> Result<UserBadgeAward> {
        let mut state = self.write()?;
        if !state.badges.contains_key(&key.badge_id) {
            return Err(AppError::NotFound("Badge not found".to_string()));
        }
        if state.awards.contains_key(&key) {
            return Err(AppError::Conflict("Badge already awarded".to_string()));
        }

        let award = UserBadgeAward {
            key,
            awarded_at: Utc::now(),
        };
        state.awards.insert(key, award.clone());
        Ok(award)
    }

    async fn awards_for_user(&self, user_id: Uuid) -> Result<Vec<UserBadgeAward>> {
        let state = self.read()?;
        let mut awards: Vec<_> = state
            .awards
            .values()
            .filter(|award| award.key.user_id == user_id)
            .cloned()
            .collect();
        awards.sort_by_key(|award| award.awarded_at);
        Ok(awards)
    }
}
