use serde::Serialize;
use uuid::Uuid;

/// Activity statistics the badge rules are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub user_id: Uuid,
    pub post_count: i64,
    pub comment_count: i64,
    pub karma: i64,
    pub account_age_days: i64,
}

// Result of a karma reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KarmaCorrection {
    pub user_id: Uuid,
    pub stored: i64,
    pub computed: i64,
    pub delta: i64,
}
