//! Question service
//!
//! Owns the loaded store together with its subject cache. Both are swapped
//! as one snapshot on reload, so a cached set always belongs to the store
//! it was computed from.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::classify::{filter_questions, Subject};
use crate::feed::{
    pagination::slice, paginate, CacheStats, CombinedFeed, CompositeFeed, PageRequest,
    QuestionPage, QuestionSet, SubjectCache,
};
use crate::models::Question;
use crate::store::{LoadOutcome, LoadReport, QuestionLoader, QuestionStore};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("No question root configured")]
    NoLoader,

    #[error("Load task failed: {0}")]
    LoadTask(String),
}

/// One store generation and the cache built on top of it
#[derive(Debug)]
struct Snapshot {
    store: QuestionStore,
    cache: SubjectCache,
    disciplines: HashSet<String>,
    empty: QuestionSet,
}

impl Snapshot {
    fn new(store: QuestionStore) -> Self {
        let disciplines = store.disciplines().into_iter().collect();
        Self {
            store,
            cache: SubjectCache::new(),
            disciplines,
            empty: Arc::from(Vec::new()),
        }
    }

    async fn subject_set(&self, subject: &Subject) -> QuestionSet {
        // Plain discipline tokens absent from the store match nothing and
        // never get a cache slot
        if let Subject::Discipline(token) = subject {
            if !self.disciplines.contains(token) {
                return Arc::clone(&self.empty);
            }
        }

        self.cache
            .get_or_compute(subject.token(), || {
                filter_questions(self.store.questions(), subject)
            })
            .await
    }

    async fn combined(&self, feed: &CompositeFeed) -> CombinedFeed {
        let mut parts = Vec::with_capacity(feed.constituents.len());
        for constituent in &feed.constituents {
            let set = self.subject_set(&constituent.subject).await;
            parts.push((constituent.clone(), set));
        }
        CombinedFeed::new(parts)
    }
}

pub struct QuestionService {
    loader: Option<QuestionLoader>,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl QuestionService {
    /// Load the store from disk
    ///
    /// The directory walk runs on the blocking pool.
    pub async fn load(loader: QuestionLoader) -> Result<Self, ServiceError> {
        let outcome = run_loader(loader.clone()).await?;
        Ok(Self {
            loader: Some(loader),
            snapshot: RwLock::new(Arc::new(Snapshot::new(QuestionStore::from_outcome(
                outcome,
            )))),
        })
    }

    /// Build a service over an in-memory collection (no reload source)
    pub fn from_questions(questions: Vec<Question>) -> Self {
        Self {
            loader: None,
            snapshot: RwLock::new(Arc::new(Snapshot::new(QuestionStore::new(questions)))),
        }
    }

    /// Rescan the root and swap in a fresh store with an empty cache
    pub async fn reload(&self) -> Result<LoadReport, ServiceError> {
        let loader = self.loader.clone().ok_or(ServiceError::NoLoader)?;
        let outcome = run_loader(loader).await?;
        let store = QuestionStore::from_outcome(outcome);
        let report = store.report().clone();

        *self.snapshot.write().await = Arc::new(Snapshot::new(store));
        info!("Question store reloaded ({} questions)", report.loaded);
        Ok(report)
    }

    async fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    pub async fn len(&self) -> usize {
        self.current().await.store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Full canonically ordered set for one subject token
    pub async fn subject_set(&self, token: &str) -> QuestionSet {
        self.current().await.subject_set(&Subject::parse(token)).await
    }

    /// One page of a single-subject set
    pub async fn page(&self, token: &str, request: PageRequest) -> QuestionPage {
        let set = self.subject_set(token).await;
        paginate(&set, request)
    }

    /// Pages for several subjects at once, keyed by the token as given
    pub async fn batch(
        &self,
        tokens: &[String],
        request: PageRequest,
    ) -> BTreeMap<String, QuestionPage> {
        let snapshot = self.current().await;
        let mut pages = BTreeMap::new();
        for token in tokens {
            if pages.contains_key(token) {
                continue;
            }
            let set = snapshot.subject_set(&Subject::parse(token)).await;
            pages.insert(token.clone(), paginate(&set, request));
        }
        pages
    }

    /// Resolve a composite recipe against the current store
    pub async fn combined(&self, feed: &CompositeFeed) -> CombinedFeed {
        self.current().await.combined(feed).await
    }

    /// One page of a composite feed; `total` is the sum of constituent totals
    pub async fn composite_page(&self, token: &str, request: PageRequest) -> QuestionPage {
        let combined = self.combined(&CompositeFeed::for_token(token)).await;
        QuestionPage {
            questions: slice(&combined.concatenated(), request.offset, request.limit),
            total: combined.total(),
        }
    }

    /// Subject set restricted to one year, ordered by index
    pub async fn by_year(&self, token: &str, year: u16) -> Vec<Arc<Question>> {
        self.subject_set(token)
            .await
            .iter()
            .filter(|q| q.year == year)
            .cloned()
            .collect()
    }

    /// One uniformly chosen question of `by_year`
    pub async fn random_by_year(&self, token: &str, year: u16) -> Option<Arc<Question>> {
        use rand::seq::SliceRandom;

        let questions = self.by_year(token, year).await;
        questions.choose(&mut rand::thread_rng()).cloned()
    }

    pub async fn disciplines(&self) -> Vec<String> {
        self.current().await.store.disciplines()
    }

    pub async fn years(&self) -> Vec<u16> {
        self.current().await.store.years()
    }

    pub async fn areas(&self) -> Vec<String> {
        self.current().await.store.areas()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.current().await.cache.stats().await
    }
}

async fn run_loader(loader: QuestionLoader) -> Result<LoadOutcome, ServiceError> {
    tokio::task::spawn_blocking(move || loader.load())
        .await
        .map_err(|e| ServiceError::LoadTask(e.to_string()))
}
