use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        AwardKey, Badge, RankableItem, Tag, TargetKind, TargetRef, UserBadgeAward, Vote, VoteKey,
        VoteValue,
    },
    stores::{BadgeStore, ContentStore, TagStore, UserStore, VoteStore},
};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromRow)]
struct VoteRow {
    voter_id: Uuid,
    target_id: Uuid,
    target_type: TargetKind,
    value: i16,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VoteRow> for Vote {
    type Error = AppError;

    fn try_from(row: VoteRow) -> Result<Self> {
        let value = VoteValue::from_i16(row.value)
            .ok_or_else(|| AppError::Internal(format!("Invalid vote value: {}", row.value)))?;

        Ok(Vote {
            key: VoteKey::new(row.voter_id, row.target_id),
            target_kind: row.target_type,
            value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AwardRow {
    user_id: Uuid,
    badge_id: Uuid,
    awarded_at: DateTime<Utc>,
}

impl From<AwardRow> for UserBadgeAward {
    fn from(row: AwardRow) -> Self {
        UserBadgeAward {
            key: AwardKey::new(row.user_id, row.badge_id),
            awarded_at: row.awarded_at,
        }
    }
}

/// Translate a unique-constraint violation into `Conflict`.
fn conflict_on_unique(error: sqlx::Error, message: &str) -> AppError {
    match error {
        sqlx::Error::Database(ref db_error) if db_error.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        other => AppError::Database(other),
    }
}

#[async_trait]
impl VoteStore for PgStore {
    async fn get(&self, key: VoteKey) -> Result<Option<Vote>> {
        let row = sqlx::query_as::<_, VoteRow>(
            r#"
            SELECT voter_id, target_id, target_type, value, created_at, updated_at
            FROM votes
            WHERE voter_id = $1 AND target_id = $2
            "#,
        )
        .bind(key.voter_id)
        .bind(key.target_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Vote::try_from).transpose()
    }

    async fn insert(&self, vote: &Vote) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO votes (voter_id, target_id, target_type, value, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(vote.key.voter_id)
        .bind(vote.key.target_id)
        .bind(vote.target_kind)
        .bind(vote.value.as_i16())
        .bind(vote.created_at)
        .bind(vote.updated_at)
        .execute(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "Vote already exists"))?;

        Ok(())
    }

    async fn upsert(&self, vote: &Vote) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO votes (voter_id, target_id, target_type, value, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (voter_id, target_id)
            DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(vote.key.voter_id)
        .bind(vote.key.target_id)
        .bind(vote.target_kind)
        .bind(vote.value.as_i16())
        .bind(vote.created_at)
        .bind(vote.updated_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: VoteKey) -> Result<Option<Vote>> {
        let row = sqlx::query_as::<_, VoteRow>(
            r#"
            DELETE FROM votes
            WHERE voter_id = $1 AND target_id = $2
            RETURNING voter_id, target_id, target_type, value, created_at, updated_at
            "#,
        )
        .bind(key.voter_id)
        .bind(key.target_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Vote::try_from).transpose()
    }

    async fn count_by_target_and_value(&self, target: TargetRef, value: VoteValue) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM votes WHERE target_id = $1 AND target_type = $2 AND value = $3",
        )
        .bind(target.id)
        .bind(target.kind)
        .bind(value.as_i16())
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    async fn sum_net_votes_for_owned_content(&self, user_id: Uuid) -> Result<i64> {
        let net: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(v.value), 0)::BIGINT
            FROM votes v
            WHERE v.voter_id <> $1
              AND ((v.target_type = 'post'
                    AND v.target_id IN (SELECT id FROM posts WHERE author_id = $1))
                OR (v.target_type = 'comment'
                    AND v.target_id IN (SELECT id FROM comments WHERE author_id = $1)))
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(net)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn exists(&self, user_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        Ok(exists)
    }

    async fn get_karma(&self, user_id: Uuid) -> Result<Option<i64>> {
        let karma: Option<i64> = sqlx::query_scalar("SELECT karma_points FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(karma)
    }

    async fn increment_karma(&self, user_id: Uuid, delta: i64) -> Result<i64> {
        let karma: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET karma_points = karma_points + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING karma_points
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .fetch_optional(&self.db)
        .await?;

        karma.ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn get_created_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        let created_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT created_at FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

        Ok(created_at)
    }

    async fn get_post_count(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }

    async fn get_comment_count(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE author_id = $1")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn owner_of(&self, target: TargetRef) -> Result<Option<Uuid>> {
        let query = match target.kind {
            TargetKind::Post => "SELECT author_id FROM posts WHERE id = $1",
            TargetKind::Comment => "SELECT author_id FROM comments WHERE id = $1",
        };

        let owner: Option<Uuid> = sqlx::query_scalar(query)
            .bind(target.id)
            .fetch_optional(&self.db)
            .await?;

        Ok(owner)
    }

    async fn rankable_items(&self, kind: TargetKind, limit: i64) -> Result<Vec<RankableItem>> {
        let table = match kind {
            TargetKind::Post => "posts",
            TargetKind::Comment => "comments",
        };

        let query = format!(
            r#"
            SELECT
                t.id, t.author_id AS owner_id, t.created_at,
                COUNT(v.value) FILTER (WHERE v.value = 1) AS upvote_count,
                COUNT(v.value) FILTER (WHERE v.value = -1) AS downvote_count
            FROM {} t
            LEFT JOIN votes v ON v.target_id = t.id AND v.target_type = $1
            GROUP BY t.id, t.author_id, t.created_at
            ORDER BY t.created_at DESC
            LIMIT $2
            "#,
            table
        );

        let items = sqlx::query_as::<_, RankableItem>(&query)
            .bind(kind)
            .bind(limit)
            .fetch_all(&self.db)
            .await?;

        Ok(items)
    }
}

#[async_trait]
impl TagStore for PgStore {
    async fn get_tag(&self, tag_id: Uuid) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE id = $1")
            .bind(tag_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(tag)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY name")
            .fetch_all(&self.db)
            .await?;

        Ok(tags)
    }

    async fn content_ages_for_tag(&self, tag_id: Uuid) -> Result<Option<Vec<DateTime<Utc>>>> {
        let ages: Vec<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT p.created_at
            FROM post_tags pt
            JOIN posts p ON pt.post_id = p.id
            WHERE pt.tag_id = $1
            "#,
        )
        .bind(tag_id)
        .fetch_all(&self.db)
        .await?;

        Ok(Some(ages))
    }
}

#[async_trait]
impl BadgeStore for PgStore {
    async fn rule_definitions(&self) -> Result<Vec<Badge>> {
        let badges = sqlx::query_as::<_, Badge>("SELECT id, name FROM badges")
            .fetch_all(&self.db)
            .await?;

        Ok(badges)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Badge>> {
        let badge = sqlx::query_as::<_, Badge>("SELECT id, name FROM badges WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

        Ok(badge)
    }

    async fn has_award(&self, key: AwardKey) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_badges WHERE user_id = $1 AND badge_id = $2)",
        )
        .bind(key.user_id)
        .bind(key.badge_id)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    async fn award(&self, key: AwardKey) -> Result<UserBadgeAward> {
        let row = sqlx::query_as::<_, AwardRow>(
            r#"
            INSERT INTO user_badges (user_id, badge_id, awarded_at)
            VALUES ($1, $2, NOW())
            RETURNING user_id, badge_id, awarded_at
            "#,
        )
        .bind(key.user_id)
        .bind(key.badge_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "Badge already awarded"))?;

        Ok(row.into())
    }

    async fn awards_for_user(&self, user_id: Uuid) -> Result<Vec<UserBadgeAward>> {
        let rows = sqlx::query_as::<_, AwardRow>(
            r#"
            SELECT user_id, badge_id, awarded_at
            FROM user_badges
            WHERE user_id = $1
            ORDER BY awarded_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(UserBadgeAward::from).collect())
    }
}
