use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::KarmaCorrection,
    services::badge_service::BadgeService,
    stores::{UserStore, VoteStore},
};

#[derive(Clone)]
pub struct KarmaService {
    users: Arc<dyn UserStore>,
    votes: Arc<dyn VoteStore>,
    badges: BadgeService,
}

impl KarmaService {
    pub fn new(users: Arc<dyn UserStore>, votes: Arc<dyn VoteStore>, badges: BadgeService) -> Self {
        Self {
            users,
            votes,
            badges,
        }
    }

    /// Credit `delta` to the owner of voted content. Returns whether a write
    /// happened; self-votes and zero deltas never touch the counter.
    pub async fn apply_vote_delta(
        &self,
        target_owner_id: Uuid,
        voter_id: Uuid,
        delta: i64,
    ) -> Result<bool> {
        if target_owner_id == voter_id {
            tracing::debug!("Ignoring self-vote karma for user {}", voter_id);
            return Ok(false);
        }
        if delta == 0 {
            return Ok(false);
        }

        let karma = self.users.increment_karma(target_owner_id, delta).await?;
        tracing::debug!(
            "Karma for {} changed by {} to {}",
            target_owner_id,
            delta,
            karma
        );

        if delta > 0 {
            if let Err(e) = self.badges.check_karma_badges(target_owner_id).await {
                tracing::warn!("Karma badge check failed for {}: {}", target_owner_id, e);
            }
        }

        Ok(true)
    }

    /// Reconcile the stored counter with the vote ledger by applying the
    /// difference. Best effort: failures are logged and reported as a zero
    /// correction.
    pub async fn recalculate_karma(&self, user_id: Uuid) -> KarmaCorrection {
        match self.try_recalculate(user_id).await {
            Ok(correction) => correction,
            Err(e) => {
                tracing::warn!("Karma recalculation skipped for {}: {}", user_id, e);
                KarmaCorrection {
                    user_id,
                    stored: 0,
                    computed: 0,
                    delta: 0,
                }
            }
        }
    }

    async fn try_recalculate(&self, user_id: Uuid) -> Result<KarmaCorrection> {
        let stored = self
            .users
            .get_karma(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let computed = self.votes.sum_net_votes_for_owned_content(user_id).await?;
        let delta = computed - stored;

        if delta != 0 {
            self.users.increment_karma(user_id, delta).await?;
            tracing::info!(
                "Corrected karma drift for {}: stored {}, computed {}",
                user_id,
                stored,
                computed
            );
        }

        Ok(KarmaCorrection {
            user_id,
            stored,
            computed,
            delta,
        })
    }
}
