use crate::error::Result;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct RedisClient {
    manager: Arc<Mutex<ConnectionManager>>,
}

impl RedisClient {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            manager: Arc::new(Mutex::new(manager)),
        })
    }

    // Queues
    pub async fn push_to_queue(&self, queue: &str, payload: &str) -> Result<()> {
        let mut conn = self.manager.lock().await;
        let _: () = conn.lpush(queue, payload).await?;
        Ok(())
    }

    // Real-time features
    pub async fn publish(&self, channel: &str, message: &str) -> Result<()> {
        let mut conn = self.manager.lock().await;
        let _: () = conn.publish(channel, message).await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.lock().await;
        let _: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(())
    }
}
