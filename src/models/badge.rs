use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::UserStats;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Badge {
    pub id: Uuid,
    pub name: String,
}

/// Composite identity of an award. A user holds a given badge at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AwardKey {
    pub user_id: Uuid,
    pub badge_id: Uuid,
}

impl AwardKey {
    pub fn new(user_id: Uuid, badge_id: Uuid) -> Self {
        Self { user_id, badge_id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBadgeAward {
    pub key: AwardKey,
    pub awarded_at: DateTime<Utc>,
}

/// The fixed eligibility table. Badge definitions in the store are matched
/// to rules by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeRule {
    FirstPost,
    ProlificPoster,
    Commentator,
    RisingStar,
    Popular,
    Veteran,
}

impl BadgeRule {
    pub const ALL: [BadgeRule; 6] = [
        BadgeRule::FirstPost,
        BadgeRule::ProlificPoster,
        BadgeRule::Commentator,
        BadgeRule::RisingStar,
        BadgeRule::Popular,
        BadgeRule::Veteran,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BadgeRule::FirstPost => "First Post",
            BadgeRule::ProlificPoster => "Prolific Poster",
            BadgeRule::Commentator => "Commentator",
            BadgeRule::RisingStar => "Rising Star",
            BadgeRule::Popular => "Popular",
            BadgeRule::Veteran => "Veteran",
        }
    }

    pub fn is_karma_based(&self) -> bool {
        matches!(self, BadgeRule::RisingStar | BadgeRule::Popular)
    }

    pub fn is_satisfied(&self, stats: &UserStats) -> bool {
        match self {
            BadgeRule::FirstPost => stats.post_count >= 1,
            BadgeRule::ProlificPoster => stats.post_count >= 10,
            BadgeRule::Commentator => stats.comment_count >= 50,
            BadgeRule::RisingStar => stats.karma >= 100,
            BadgeRule::Popular => stats.karma >= 1000,
            BadgeRule::Veteran => stats.account_age_days >= 365,
        }
    }
}

// Badge award as shown to clients
#[derive(Debug, Clone, Serialize)]
pub struct AwardedBadge {
    pub badge_id: Uuid,
    pub name: String,
    pub awarded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(post_count: i64, comment_count: i64, karma: i64, account_age_days: i64) -> UserStats {
        UserStats {
            user_id: Uuid::new_v4(),
            post_count,
            comment_count,
            karma,
            account_age_days,
        }
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        assert!(BadgeRule::FirstPost.is_satisfied(&stats(1, 0, 0, 0)));
        assert!(!BadgeRule::FirstPost.is_satisfied(&stats(0, 0, 0, 0)));
        assert!(BadgeRule::ProlificPoster.is_satisfied(&stats(10, 0, 0, 0)));
        assert!(!BadgeRule::ProlificPoster.is_satisfied(&stats(9, 0, 0, 0)));
        assert!(BadgeRule::Commentator.is_satisfied(&stats(0, 50, 0, 0)));
        assert!(BadgeRule::RisingStar.is_satisfied(&stats(0, 0, 100, 0)));
        assert!(!BadgeRule::Popular.is_satisfied(&stats(0, 0, 999, 0)));
        assert!(BadgeRule::Veteran.is_satisfied(&stats(0, 0, 0, 365)));
        assert!(!BadgeRule::Veteran.is_satisfied(&stats(0, 0, 0, 364)));
    }

    #[test]
    fn test_karma_rules() {
        let karma: Vec<_> = BadgeRule::ALL
            .into_iter()
            .filter(BadgeRule::is_karma_based)
            .collect();
        assert_eq!(karma, vec![BadgeRule::RisingStar, BadgeRule::Popular]);
    }
}
