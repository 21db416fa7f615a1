use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::TrendingTag,
    stores::TagStore,
};

const DAY_SECONDS: i64 = 86_400;

// (exclusive upper age bound in seconds, weight); older content weighs 0
const AGE_BUCKETS: [(i64, f64); 3] = [
    (DAY_SECONDS, 1.0),
    (7 * DAY_SECONDS, 0.5),
    (30 * DAY_SECONDS, 0.1),
];

fn bucket_of(age: Duration) -> Option<usize> {
    let seconds = age.num_seconds().max(0);
    AGE_BUCKETS.iter().position(|(upper, _)| seconds < *upper)
}

/// Weight of one piece of content by its age.
pub fn age_weight(age: Duration) -> f64 {
    bucket_of(age).map_or(0.0, |bucket| AGE_BUCKETS[bucket].1)
}

/// Recency-weighted score of a tag's content: the count in each age bucket
/// times the bucket weight. Absent or empty content scores exactly zero.
pub fn trending_score(content_created_at: Option<&[DateTime<Utc>]>, now: DateTime<Utc>) -> f64 {
    let Some(created) = content_created_at else {
        return 0.0;
    };

    let mut counts = [0u32; AGE_BUCKETS.len()];
    for created_at in created {
        if let Some(bucket) = bucket_of(now - *created_at) {
            counts[bucket] += 1;
        }
    }

    counts
        .iter()
        .zip(AGE_BUCKETS)
        .map(|(count, (_, weight))| f64::from(*count) * weight)
        .sum()
}

#[derive(Clone)]
pub struct TrendingService {
    tags: Arc<dyn TagStore>,
    max_limit: usize,
}

impl TrendingService {
    pub fn new(tags: Arc<dyn TagStore>, max_limit: usize) -> Self {
        Self { tags, max_limit }
    }

    pub async fn trending_score(&self, tag_id: Uuid) -> Result<f64> {
        if self.tags.get_tag(tag_id).await?.is_none() {
            return Err(AppError::NotFound("Tag not found".to_string()));
        }

        let ages = self.tags.content_ages_for_tag(tag_id).await?;
        Ok(trending_score(ages.as_deref(), Utc::now()))
    }

    /// Tags with recent activity, highest score first, at most `limit`
    /// (capped by the configured maximum).
    pub async fn trending_tags(&self, limit: usize) -> Result<Vec<TrendingTag>> {
        let limit = limit.min(self.max_limit);
        let now = Utc::now();

        let mut trending = Vec::new();
        for tag in self.tags.list_tags().await? {
            let ages = self.tags.content_ages_for_tag(tag.id).await?;
            let score = trending_score(ages.as_deref(), now);
            if score > 0.0 {
                trending.push(TrendingTag {
                    id: tag.id,
                    name: tag.name,
                    score,
                });
            }
        }

        trending.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        trending.truncate(limit);
        Ok(trending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;

    #[test]
    fn test_bucket_arithmetic() {
        let now = Utc::now();
        let ages = vec![
            now - Duration::hours(12),
            now - Duration::hours(12),
            now - Duration::days(4),
            now - Duration::days(20),
            now - Duration::days(40),
        ];

        let score = trending_score(Some(ages.as_slice()), now);
        assert!((score - 2.6).abs() < 1e-9, "score was {}", score);
    }

    #[test]
    fn test_empty_and_absent_score_zero() {
        let now = Utc::now();
        assert_eq!(trending_score(Some(&[][..]), now), 0.0);
        assert_eq!(trending_score(None, now), 0.0);
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(age_weight(Duration::hours(24) - Duration::seconds(1)), 1.0);
        assert_eq!(age_weight(Duration::hours(24)), 0.5);
        assert_eq!(age_weight(Duration::days(7)), 0.1);
        assert_eq!(age_weight(Duration::days(30)), 0.0);
    }

    #[test]
    fn test_future_content_counts_as_fresh() {
        let now = Utc::now();
        let ages = vec![now + Duration::hours(2)];
        assert_eq!(trending_score(Some(ages.as_slice()), now), 1.0);
    }

    #[tokio::test]
    async fn test_trending_tags_excludes_idle_and_orders() {
        let store = Arc::new(MemoryStore::new());
        let user = store.add_user(Utc::now()).unwrap();
        let now = Utc::now();

        let rust = store.add_tag("rust").unwrap();
        let go = store.add_tag("go").unwrap();
        let idle = store.add_tag("cobol").unwrap();
        let absent = store.add_tag("fortran").unwrap();
        store.clear_tag_content(absent).unwrap();

        for hours in [1, 2, 3] {
            let post = store.add_post(user, now - Duration::hours(hours)).unwrap();
            store.tag_content(rust, post).unwrap();
        }
        let post = store.add_post(user, now - Duration::days(3)).unwrap();
        store.tag_content(go, post).unwrap();
        let ancient = store.add_post(user, now - Duration::days(90)).unwrap();
        store.tag_content(idle, ancient).unwrap();

        let service = TrendingService::new(store.clone(), 50);
        let trending = service.trending_tags(10).await.unwrap();
        let names: Vec<_> = trending.iter().map(|t| t.name.as_str()).collect();

        assert_eq!(names, vec!["rust", "go"]);
        assert_eq!(service.trending_tags(1).await.unwrap().len(), 1);
        assert_eq!(service.trending_score(absent).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_unknown_tag_not_found() {
        let store = Arc::new(MemoryStore::new());
        let service = TrendingService::new(store, 50);

        let err = service.trending_score(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
