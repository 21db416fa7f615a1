pub mod badge_service;
pub mod karma_service;
pub mod notification_service;
pub mod ranking_service;
pub mod trending_service;
pub mod vote_service;

use std::sync::Arc;

use crate::stores::{BadgeStore, ContentStore, TagStore, UserStore, VoteStore};
use badge_service::BadgeService;
use karma_service::KarmaService;
use notification_service::Notifier;
use ranking_service::{Ranker, RankingService};
use trending_service::TrendingService;
use vote_service::VoteService;

/// The engagement services wired to one set of stores.
#[derive(Clone)]
pub struct Engine {
    pub votes: VoteService,
    pub karma: KarmaService,
    pub ranking: RankingService,
    pub trending: TrendingService,
    pub badges: BadgeService,
}

impl Engine {
    pub fn new<S>(
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
        ranker: Ranker,
        trending_max_limit: usize,
    ) -> Self
    where
        S: VoteStore + UserStore + ContentStore + TagStore + BadgeStore + 'static,
    {
        let badges = BadgeService::new(store.clone(), store.clone(), notifier);
        let karma = KarmaService::new(store.clone(), store.clone(), badges.clone());
        let votes = VoteService::new(store.clone(), store.clone(), store.clone(), karma.clone());
        let ranking = RankingService::new(store.clone(), ranker);
        let trending = TrendingService::new(store, trending_max_limit);

        Self {
            votes,
            karma,
            ranking,
            trending,
            badges,
        }
    }
}
