use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::{
    config::validate_gravity,
    error::Result,
    models::{RankableItem, SortMode, TargetKind},
    stores::ContentStore,
};

/// Most recent items considered when building a ranked feed.
const CANDIDATE_POOL: i64 = 500;

/// Pure ordering of content by a sort mode.
#[derive(Debug, Clone, Copy)]
pub struct Ranker {
    gravity: f64,
}

impl Ranker {
    pub fn new(gravity: f64) -> Result<Self> {
        validate_gravity(gravity)?;
        Ok(Self { gravity })
    }

    /// `net / (age_hours + 2)^gravity`: grows with net votes at a fixed age
    /// and decays toward zero as the item gets older. Decay works on the
    /// magnitude, so a net-negative item climbs toward zero with age and an
    /// old downvoted item sits above a fresh one with the same votes. Both
    /// still rank below every item with positive net votes.
    pub fn hot_score(&self, item: &RankableItem, now: DateTime<Utc>) -> f64 {
        item.net_votes() as f64 / (item.age_hours(now) + 2.0).powf(self.gravity)
    }

    pub fn rank(
        &self,
        items: Vec<RankableItem>,
        mode: SortMode,
        now: DateTime<Utc>,
    ) -> Vec<RankableItem> {
        match mode {
            SortMode::New => {
                let mut items = items;
                items.sort_by(newest_first);
                items
            }
            SortMode::Best => {
                let mut items = items;
                items.sort_by(|a, b| {
                    b.net_votes()
                        .cmp(&a.net_votes())
                        .then_with(|| newest_first(a, b))
                });
                items
            }
            SortMode::Hot => {
                let mut scored: Vec<(f64, RankableItem)> = items
                    .into_iter()
                    .map(|item| (self.hot_score(&item, now), item))
                    .collect();
                scored.sort_by(|(score_a, a), (score_b, b)| {
                    score_b.total_cmp(score_a).then_with(|| newest_first(a, b))
                });
                scored.into_iter().map(|(_, item)| item).collect()
            }
        }
    }
}

// created_at descending, id ascending for identical timestamps
fn newest_first(a: &RankableItem, b: &RankableItem) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

#[derive(Clone)]
pub struct RankingService {
    content: Arc<dyn ContentStore>,
    ranker: Ranker,
}

impl RankingService {
    pub fn new(content: Arc<dyn ContentStore>, ranker: Ranker) -> Self {
        Self { content, ranker }
    }

    pub fn rank(&self, items: Vec<RankableItem>, mode: SortMode) -> Vec<RankableItem> {
        self.ranker.rank(items, mode, Utc::now())
    }

    /// Rank the most recent content of `kind` and return the top `limit`.
    pub async fn ranked_content(
        &self,
        kind: TargetKind,
        mode: SortMode,
        limit: usize,
    ) -> Result<Vec<RankableItem>> {
        let candidates = self.content.rankable_items(kind, CANDIDATE_POOL).await?;
        let mut ranked = self.rank(candidates, mode);
        ranked.truncate(limit);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_HOT_GRAVITY;
    use chrono::Duration;
    use uuid::Uuid;

    fn item(upvotes: i64, downvotes: i64, created_at: DateTime<Utc>) -> RankableItem {
        RankableItem {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            created_at,
            upvote_count: upvotes,
            downvote_count: downvotes,
        }
    }

    fn ranker() -> Ranker {
        Ranker::new(DEFAULT_HOT_GRAVITY).unwrap()
    }

    fn ids(items: &[RankableItem]) -> Vec<Uuid> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_best_orders_by_net_votes() {
        let now = Utc::now();
        let a = item(1, 0, now - Duration::hours(3));
        let b = item(2, 0, now - Duration::hours(2));
        let c = item(3, 0, now - Duration::hours(1));

        let ranked = ranker().rank(vec![a.clone(), b.clone(), c.clone()], SortMode::Best, now);
        assert_eq!(ids(&ranked), vec![c.id, b.id, a.id]);
    }

    #[test]
    fn test_best_tie_prefers_newer() {
        let now = Utc::now();
        let older = item(3, 1, now - Duration::hours(5));
        let newer = item(2, 0, now - Duration::hours(1));

        let ranked = ranker().rank(vec![older.clone(), newer.clone()], SortMode::Best, now);
        assert_eq!(ids(&ranked), vec![newer.id, older.id]);
    }

    #[test]
    fn test_hot_decays_with_age() {
        let now = Utc::now();
        let old = item(1, 0, now - Duration::hours(72));
        let recent = item(1, 0, now - Duration::hours(1));

        let ranked = ranker().rank(vec![old.clone(), recent.clone()], SortMode::Hot, now);
        assert_eq!(ids(&ranked), vec![recent.id, old.id]);
    }

    #[test]
    fn test_hot_old_favourite_eventually_sinks() {
        let now = Utc::now();
        let old = item(50, 0, now - Duration::days(30));
        let fresh = item(3, 0, now - Duration::hours(2));

        let ranked = ranker().rank(vec![old.clone(), fresh.clone()], SortMode::Hot, now);
        assert_eq!(ids(&ranked), vec![fresh.id, old.id]);
    }

    #[test]
    fn test_hot_negative_scores_decay_toward_zero() {
        let now = Utc::now();
        let buried_old = item(0, 4, now - Duration::hours(48));
        let buried_fresh = item(0, 4, now - Duration::hours(1));
        let modest = item(1, 0, now - Duration::days(20));

        let r = ranker();
        assert!(r.hot_score(&buried_fresh, now) < r.hot_score(&buried_old, now));
        assert!(r.hot_score(&buried_old, now) < 0.0);

        let ranked = r.rank(
            vec![buried_fresh.clone(), buried_old.clone(), modest.clone()],
            SortMode::Hot,
            now,
        );
        assert_eq!(ids(&ranked), vec![modest.id, buried_old.id, buried_fresh.id]);
    }

    #[test]
    fn test_new_is_deterministic_for_equal_timestamps() {
        let now = Utc::now();
        let mut same: Vec<_> = (0..5).map(|_| item(0, 0, now)).collect();
        let first = ranker().rank(same.clone(), SortMode::New, now);
        same.reverse();
        let second = ranker().rank(same, SortMode::New, now);

        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_invalid_gravity_rejected() {
        assert!(Ranker::new(1.0).is_err());
        assert!(Ranker::new(0.5).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Property: more net votes never lowers the hot score at equal age
            #[test]
            fn prop_hot_monotonic_in_votes(
                net in -1000i64..1000,
                age_minutes in 0i64..100_000,
                gravity in 1.01f64..=2.0,
            ) {
                let now = Utc::now();
                let ranker = Ranker::new(gravity).unwrap();
                let created = now - Duration::minutes(age_minutes);
                let lower = item(net.max(0), (-net).max(0), created);
                let higher = item(net.max(0) + 1, (-net).max(0), created);
                prop_assert!(ranker.hot_score(&higher, now) > ranker.hot_score(&lower, now));
            }

            // Property: positive scores decay as the item ages
            #[test]
            fn prop_hot_decays_with_age(
                upvotes in 1i64..10_000,
                age_minutes in 0i64..100_000,
                extra_minutes in 1i64..100_000,
            ) {
                let now = Utc::now();
                let ranker = ranker();
                let younger = item(upvotes, 0, now - Duration::minutes(age_minutes));
                let older = item(upvotes, 0, now - Duration::minutes(age_minutes + extra_minutes));
                prop_assert!(ranker.hot_score(&younger, now) > ranker.hot_score(&older, now));
            }

            // Property: best ordering agrees with (net votes, created_at) descending
            #[test]
            fn prop_best_is_lexicographic(
                cases in prop::collection::vec((0i64..20, 0i64..20, 0i64..500), 0..30),
            ) {
                let now = Utc::now();
                let items: Vec<_> = cases
                    .into_iter()
                    .map(|(up, down, age)| item(up, down, now - Duration::hours(age)))
                    .collect();
                let ranked = ranker().rank(items, SortMode::Best, now);
                for pair in ranked.windows(2) {
                    let key_a = (pair[0].net_votes(), pair[0].created_at);
                    let key_b = (pair[1].net_votes(), pair[1].created_at);
                    prop_assert!(key_a >= key_b);
                }
            }
        }
    }
}
