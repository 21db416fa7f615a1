use std::env;

use crate::error::{AppError, Result};

pub const DEFAULT_HOT_GRAVITY: f64 = 1.8;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,

    // Ranking
    pub hot_gravity: f64,
    pub trending_max_limit: usize,

    // Notifications
    pub notification_queue: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let hot_gravity = parse_gravity(env::var("HOT_GRAVITY").ok().as_deref())?;

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| AppError::Config("DATABASE_URL must be set".to_string()))?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            hot_gravity,
            trending_max_limit: env::var("TRENDING_MAX_LIMIT")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .unwrap_or(50),
            notification_queue: env::var("NOTIFICATION_QUEUE")
                .unwrap_or_else(|_| "notifications:badges".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_gravity(self.hot_gravity)?;
        if self.trending_max_limit == 0 {
            return Err(AppError::Config(
                "TRENDING_MAX_LIMIT must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read `HOT_GRAVITY`, falling back to the default only when it is unset.
pub fn parse_gravity(raw: Option<&str>) -> Result<f64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_HOT_GRAVITY);
    };
    raw.trim().parse().map_err(|_| {
        AppError::Config(format!("HOT_GRAVITY must be a number, got '{}'", raw))
    })
}

/// Hot ranking only decays for gravity strictly above 1.
pub fn validate_gravity(gravity: f64) -> Result<()> {
    if gravity.is_finite() && gravity > 1.0 && gravity <= 2.0 {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "HOT_GRAVITY must be in (1, 2], got {}",
            gravity
        )))
    }
}
