use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Sorting options for content feeds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    New,
    Best,
    Hot,
}

impl SortMode {
    /// Case-insensitive, whitespace-trimmed parse. Anything unrecognised,
    /// including a missing value, falls back to `New`.
    pub fn normalize(input: Option<&str>) -> Self {
        let Some(raw) = input else {
            return SortMode::New;
        };

        match raw.trim().to_ascii_lowercase().as_str() {
            "best" => SortMode::Best,
            "hot" => SortMode::Hot,
            "new" => SortMode::New,
            other => {
                if !other.is_empty() {
                    tracing::debug!("Unknown sort mode {:?}, defaulting to new", raw);
                }
                SortMode::New
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::New => "new",
            SortMode::Best => "best",
            SortMode::Hot => "hot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RankableItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub upvote_count: i64,
    pub downvote_count: i64,
}

impl RankableItem {
    pub fn net_votes(&self) -> i64 {
        self.upvote_count - self.downvote_count
    }

    /// Age in fractional hours at `now`; content dated in the future is age zero.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        let seconds = (now - self.created_at).num_seconds().max(0);
        seconds as f64 / 3600.0
    }
}
