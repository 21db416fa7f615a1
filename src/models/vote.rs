use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two kinds of votable content. Target ids are unique across both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "target_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Post => "post",
            TargetKind::Comment => "comment",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" | "posts" => Ok(TargetKind::Post),
            "comment" | "comments" => Ok(TargetKind::Comment),
            _ => Err(format!("Unknown TargetKind: {}", s)),
        }
    }
}

/// A post or comment addressed by id and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    pub id: Uuid,
    pub kind: TargetKind,
}

impl TargetRef {
    pub fn post(id: Uuid) -> Self {
        Self {
            id,
            kind: TargetKind::Post,
        }
    }

    pub fn comment(id: Uuid) -> Self {
        Self {
            id,
            kind: TargetKind::Comment,
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    Upvote,
    Downvote,
}

impl VoteValue {
    /// Karma contribution of a single vote with this value.
    pub fn weight(self) -> i64 {
        match self {
            VoteValue::Upvote => 1,
            VoteValue::Downvote => -1,
        }
    }

    /// Database encoding: 1 for upvote, -1 for downvote.
    pub fn as_i16(self) -> i16 {
        self.weight() as i16
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(VoteValue::Upvote),
            -1 => Some(VoteValue::Downvote),
            _ => None,
        }
    }
}

/// Composite identity of a vote. At most one vote exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteKey {
    pub voter_id: Uuid,
    pub target_id: Uuid,
}

impl VoteKey {
    pub fn new(voter_id: Uuid, target_id: Uuid) -> Self {
        Self {
            voter_id,
            target_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub key: VoteKey,
    pub target_kind: TargetKind,
    pub value: VoteValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(voter_id: Uuid, target: TargetRef, value: VoteValue) -> Self {
        let now = Utc::now();
        Self {
            key: VoteKey::new(voter_id, target.id),
            target_kind: target.kind,
            value,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn target(&self) -> TargetRef {
        TargetRef {
            id: self.key.target_id,
            kind: self.target_kind,
        }
    }
}

/// State change produced by a single cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum VoteTransition {
    Created { value: VoteValue },
    ToggledOff { value: VoteValue },
    Flipped { from: VoteValue, to: VoteValue },
}

impl VoteTransition {
    /// Signed karma delta owed to the target's owner.
    pub fn karma_delta(&self) -> i64 {
        match *self {
            VoteTransition::Created { value } => value.weight(),
            VoteTransition::ToggledOff { value } => -value.weight(),
            VoteTransition::Flipped { from, to } => to.weight() - from.weight(),
        }
    }
}

// Vote counts for a target, optionally from one voter's perspective
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub user_vote: Option<VoteValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteOutcome {
    pub target: TargetRef,
    pub owner_id: Uuid,
    pub transition: VoteTransition,
    pub karma_delta: i64,
}
