use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::UserBadgeAward,
    redis::RedisClient,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeNotification {
    pub recipient_id: Uuid,
    pub badge_id: Uuid,
    pub badge_name: String,
    pub title: String,
    pub awarded_at: DateTime<Utc>,
}

impl BadgeNotification {
    pub fn new(award: &UserBadgeAward, badge_name: &str) -> Self {
        Self {
            recipient_id: award.key.user_id,
            badge_id: award.key.badge_id,
            badge_name: badge_name.to_string(),
            title: format!("You earned the {} badge", badge_name),
            awarded_at: award.awarded_at,
        }
    }
}

/// Downstream delivery of award notifications. Delivery is best effort and
/// never part of the award itself.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn badge_awarded(&self, notification: &BadgeNotification) -> Result<()>;
}

/// Spawn delivery on a detached task; failures are logged only.
pub fn notify_in_background(notifier: Arc<dyn Notifier>, notification: BadgeNotification) {
    tokio::spawn(async move {
        if let Err(e) = notifier.badge_awarded(&notification).await {
            tracing::warn!(
                "Failed to deliver badge notification to {}: {}",
                notification.recipient_id,
                e
            );
        }
    });
}

/// Pushes notifications onto a Redis list for the delivery workers and
/// publishes them on the recipient's channel for connected clients.
#[derive(Clone)]
pub struct RedisNotifier {
    redis: Arc<RedisClient>,
    queue: String,
}

impl RedisNotifier {
    pub fn new(redis: Arc<RedisClient>, queue: impl Into<String>) -> Self {
        Self {
            redis,
            queue: queue.into(),
        }
    }
}

#[async_trait]
impl Notifier for RedisNotifier {
    async fn badge_awarded(&self, notification: &BadgeNotification) -> Result<()> {
        let payload = serde_json::to_string(notification)
            .map_err(|e| AppError::Internal(format!("Failed to encode notification: {}", e)))?;

        self.redis.push_to_queue(&self.queue, &payload).await?;

        let channel = format!("user_notifications:{}", notification.recipient_id);
        self.redis.publish(&channel, &payload).await?;

        tracing::debug!(
            "Queued {} badge notification for {}",
            notification.badge_name,
            notification.recipient_id
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn badge_awarded(&self, _notification: &BadgeNotification) -> Result<()> {
        Ok(())
    }
}

/// Keeps every notification in memory; can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<BadgeNotification>>,
    fail: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<BadgeNotification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn badge_awarded(&self, notification: &BadgeNotification) -> Result<()> {
        if self.fail {
            return Err(AppError::Internal("notification transport down".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| AppError::Internal("notifier lock poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }
}
