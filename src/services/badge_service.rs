use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{AwardKey, AwardedBadge, BadgeRule, UserStats},
    services::notification_service::{BadgeNotification, Notifier, notify_in_background},
    stores::{BadgeStore, UserStore},
};

#[derive(Clone)]
pub struct BadgeService {
    users: Arc<dyn UserStore>,
    badges: Arc<dyn BadgeStore>,
    notifier: Arc<dyn Notifier>,
}

impl BadgeService {
    pub fn new(
        users: Arc<dyn UserStore>,
        badges: Arc<dyn BadgeStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            users,
            badges,
            notifier,
        }
    }

    pub async fn user_stats(&self, user_id: Uuid) -> Result<UserStats> {
        let created_at = self
            .users
            .get_created_at(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(UserStats {
            user_id,
            post_count: self.users.get_post_count(user_id).await?,
            comment_count: self.users.get_comment_count(user_id).await?,
            karma: self.users.get_karma(user_id).await?.unwrap_or_default(),
            account_age_days: (Utc::now() - created_at).num_days().max(0),
        })
    }

    /// Run every rule for the user and award what they newly qualify for.
    /// Returns only the awards created by this pass.
    pub async fn check_all_badges(&self, user_id: Uuid) -> Result<Vec<AwardedBadge>> {
        let stats = self.user_stats(user_id).await?;
        Ok(self.evaluate(&stats, BadgeRule::ALL.into_iter()).await)
    }

    /// Re-check only the karma thresholds, after the user's karma went up.
    pub async fn check_karma_badges(&self, user_id: Uuid) -> Result<Vec<AwardedBadge>> {
        let stats = self.user_stats(user_id).await?;
        let rules = BadgeRule::ALL
            .into_iter()
            .filter(BadgeRule::is_karma_based);
        Ok(self.evaluate(&stats, rules).await)
    }

    async fn evaluate(
        &self,
        stats: &UserStats,
        rules: impl Iterator<Item = BadgeRule>,
    ) -> Vec<AwardedBadge> {
        let mut awarded = Vec::new();

        for rule in rules {
            if !rule.is_satisfied(stats) {
                continue;
            }

            match self.award_rule(stats.user_id, rule).await {
                Ok(Some(badge)) => awarded.push(badge),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        "Skipping {} badge for user {}: {}",
                        rule.name(),
                        stats.user_id,
                        e
                    );
                }
            }
        }

        awarded
    }

    async fn award_rule(&self, user_id: Uuid, rule: BadgeRule) -> Result<Option<AwardedBadge>> {
        let badge = self
            .badges
            .find_by_name(rule.name())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Badge definition '{}' not found", rule.name()))
            })?;

        let key = AwardKey::new(user_id, badge.id);
        if self.badges.has_award(key).await? {
            return Ok(None);
        }

        let award = match self.badges.award(key).await {
            Ok(award) => award,
            // Lost a race with a concurrent evaluation; the badge is held.
            Err(e) if e.is_conflict() => {
                tracing::debug!("{} badge already held by {}", badge.name, user_id);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        tracing::info!("Awarded {} badge to user {}", badge.name, user_id);
        notify_in_background(
            self.notifier.clone(),
            BadgeNotification::new(&award, &badge.name),
        );

        Ok(Some(AwardedBadge {
            badge_id: badge.id,
            name: badge.name,
            awarded_at: award.awarded_at,
        }))
    }

    pub async fn badges_for_user(&self, user_id: Uuid) -> Result<Vec<AwardedBadge>> {
        if !self.users.exists(user_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let names: HashMap<Uuid, String> = self
            .badges
            .rule_definitions()
            .await?
            .into_iter()
            .map(|badge| (badge.id, badge.name))
            .collect();

        let awards = self.badges.awards_for_user(user_id).await?;
        Ok(awards
            .into_iter()
            .map(|award| AwardedBadge {
                badge_id: award.key.badge_id,
                name: names
                    .get(&award.key.badge_id)
                    .cloned()
                    .unwrap_or_default(),
                awarded_at: award.awarded_at,
            })
            .collect())
    }
}
