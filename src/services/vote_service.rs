use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{TargetRef, Vote, VoteKey, VoteOutcome, VoteTally, VoteTransition, VoteValue},
    services::karma_service::KarmaService,
    stores::{ContentStore, UserStore, VoteStore},
};

/// Owns the one-vote-per-(voter, target) invariant and the toggle/flip
/// state machine. Every cast yields exactly one karma delta.
#[derive(Clone)]
pub struct VoteService {
    votes: Arc<dyn VoteStore>,
    users: Arc<dyn UserStore>,
    content: Arc<dyn ContentStore>,
    karma: KarmaService,
}

impl VoteService {
    pub fn new(
        votes: Arc<dyn VoteStore>,
        users: Arc<dyn UserStore>,
        content: Arc<dyn ContentStore>,
        karma: KarmaService,
    ) -> Self {
        Self {
            votes,
            users,
            content,
            karma,
        }
    }

    /// Resolve the target's owner, failing if the voter, the target or the
    /// owner's account is unknown. Runs before any ledger write.
    async fn resolve(&self, voter_id: Uuid, target: TargetRef) -> Result<Uuid> {
        if !self.users.exists(voter_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let owner_id = self
            .content
            .owner_of(target)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} not found", target)))?;

        if owner_id != voter_id && !self.users.exists(owner_id).await? {
            return Err(AppError::NotFound(format!("Owner of {} not found", target)));
        }

        Ok(owner_id)
    }

    /// Put the ledger back to `previous` after a failed karma write.
    async fn restore(&self, key: VoteKey, previous: Option<Vote>) {
        let restored = match &previous {
            Some(vote) => self.votes.upsert(vote).await,
            None => self.votes.delete(key).await.map(|_| ()),
        };

        if let Err(e) = restored {
            tracing::error!(
                "Failed to restore vote {}/{} after karma error: {}",
                key.voter_id,
                key.target_id,
                e
            );
        }
    }

    pub async fn cast_vote(
        &self,
        voter_id: Uuid,
        target: TargetRef,
        value: VoteValue,
    ) -> Result<VoteOutcome> {
        let owner_id = self.resolve(voter_id, target).await?;
        let key = VoteKey::new(voter_id, target.id);

        let previous = self.votes.get(key).await?;

        let transition = match previous.clone() {
            None => {
                self.votes.insert(&Vote::new(voter_id, target, value)).await?;
                VoteTransition::Created { value }
            }
            Some(existing) if existing.value == value => {
                self.votes.delete(key).await?;
                VoteTransition::ToggledOff { value }
            }
            Some(mut existing) => {
                let from = existing.value;
                existing.value = value;
                existing.updated_at = chrono::Utc::now();
                self.votes.upsert(&existing).await?;
                VoteTransition::Flipped { from, to: value }
            }
        };

        let karma_delta = transition.karma_delta();
        if let Err(e) = self
            .karma
            .apply_vote_delta(owner_id, voter_id, karma_delta)
            .await
        {
            self.restore(key, previous).await;
            return Err(e);
        }

        tracing::debug!(
            "Vote by {} on {}: {:?} (karma {:+})",
            voter_id,
            target,
            transition,
            karma_delta
        );

        Ok(VoteOutcome {
            target,
            owner_id,
            transition,
            karma_delta,
        })
    }

    /// Delete the voter's vote on `target` without touching karma. The removed
    /// vote is returned so a caller can apply the inverse delta itself.
    pub async fn remove_vote(&self, voter_id: Uuid, target: TargetRef) -> Result<Option<Vote>> {
        self.resolve(voter_id, target).await?;
        self.votes.delete(VoteKey::new(voter_id, target.id)).await
    }

    /// Remove the vote and reverse its karma contribution.
    pub async fn retract_vote(
        &self,
        voter_id: Uuid,
        target: TargetRef,
    ) -> Result<Option<VoteValue>> {
        let owner_id = self.resolve(voter_id, target).await?;
        let key = VoteKey::new(voter_id, target.id);
        let Some(removed) = self.votes.delete(key).await? else {
            return Ok(None);
        };

        let delta = VoteTransition::ToggledOff {
            value: removed.value,
        }
        .karma_delta();
        if let Err(e) = self.karma.apply_vote_delta(owner_id, voter_id, delta).await {
            self.restore(key, Some(removed)).await;
            return Err(e);
        }

        Ok(Some(removed.value))
    }

    pub async fn upvote_count(&self, target: TargetRef) -> Result<i64> {
        self.votes
            .count_by_target_and_value(target, VoteValue::Upvote)
            .await
    }

    pub async fn downvote_count(&self, target: TargetRef) -> Result<i64> {
        self.votes
            .count_by_target_and_value(target, VoteValue::Downvote)
            .await
    }

    pub async fn vote_of(&self, voter_id: Uuid, target: TargetRef) -> Result<Option<VoteValue>> {
        let vote = self.votes.get(VoteKey::new(voter_id, target.id)).await?;
        Ok(vote
            .filter(|vote| vote.target_kind == target.kind)
            .map(|vote| vote.value))
    }

    pub async fn tally(&self, target: TargetRef, viewer_id: Option<Uuid>) -> Result<VoteTally> {
        let upvotes = self.upvote_count(target).await?;
        let downvotes = self.downvote_count(target).await?;
        let user_vote = match viewer_id {
            Some(viewer_id) => self.vote_of(viewer_id, target).await?,
            None => None,
        };

        Ok(VoteTally {
            upvotes,
            downvotes,
            score: upvotes - downvotes,
            user_vote,
        })
    }
}
