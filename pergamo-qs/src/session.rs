//! Practice sessions
//!
//! A session fixes its presentation order once at creation (or restart) and
//! then serves it page by page. A question id is served at most once per
//! session even when a weighted constituent repeats it in the feed.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::feed::{sampling, OrderPolicy, QuestionPage};
use crate::models::Question;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("Question {0} has not been served in this session")]
    NotServed(String),

    #[error("Question {0} was already answered")]
    AlreadyAnswered(String),

    #[error("Invalid answer letter {0:?}")]
    InvalidLetter(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Correct,
    Incorrect,
    Skipped,
}

/// Result of answering one question
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub question_id: String,
    pub correct: bool,
    pub correct_alternative: char,
}

/// Progress snapshot of a session
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub subjects: Vec<String>,
    pub policy: String,
    pub total: usize,
    pub served: usize,
    pub remaining: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub skipped: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: i64,
}

#[derive(Debug)]
pub struct PracticeSession {
    id: Uuid,
    subjects: Vec<String>,
    policy: OrderPolicy,
    feed: Vec<Arc<Question>>,
    order: Vec<Arc<Question>>,
    unique_total: usize,
    offset: usize,
    served: HashSet<String>,
    outcomes: HashMap<String, Outcome>,
    started_at: DateTime<Utc>,
    last_active: Instant,
}

impl PracticeSession {
    /// Create a session over `feed`, ordering it once according to `policy`
    pub fn new<R: Rng + ?Sized>(
        subjects: Vec<String>,
        feed: Vec<Arc<Question>>,
        policy: OrderPolicy,
        rng: &mut R,
    ) -> Self {
        let unique_total = feed.iter().map(|q| q.id()).collect::<HashSet<_>>().len();
        let order = sampling::order(&feed, policy, rng);
        Self {
            id: Uuid::new_v4(),
            subjects,
            policy,
            feed,
            order,
            unique_total,
            offset: 0,
            served: HashSet::new(),
            outcomes: HashMap::new(),
            started_at: Utc::now(),
            last_active: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// Time since the session was last used
    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    /// Serve up to `limit` questions not served before
    pub fn next_page(&mut self, limit: usize) -> QuestionPage {
        let mut questions = Vec::new();
        while questions.len() < limit && self.offset < self.order.len() {
            let question = &self.order[self.offset];
            self.offset += 1;
            if self.served.insert(question.id()) {
                questions.push(Arc::clone(question));
            }
        }
        QuestionPage {
            questions,
            total: self.unique_total,
        }
    }

    fn served_question(&self, question_id: &str) -> Result<&Arc<Question>, SessionError> {
        if !self.served.contains(question_id) {
            return Err(SessionError::NotServed(question_id.to_string()));
        }
        self.order
            .iter()
            .find(|q| q.id() == question_id)
            .ok_or_else(|| SessionError::NotServed(question_id.to_string()))
    }

    /// Record an answer for a served question
    pub fn answer(&mut self, question_id: &str, letter: &str) -> Result<AnswerResult, SessionError> {
        let letter = parse_answer(letter)?;
        let question = Arc::clone(self.served_question(question_id)?);
        if self.outcomes.contains_key(question_id) {
            return Err(SessionError::AlreadyAnswered(question_id.to_string()));
        }

        let correct = question.correct_alternative == letter;
        let outcome = if correct {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        };
        self.outcomes.insert(question_id.to_string(), outcome);

        Ok(AnswerResult {
            question_id: question_id.to_string(),
            correct,
            correct_alternative: question.correct_alternative,
        })
    }

    /// Mark a served question as skipped
    pub fn skip(&mut self, question_id: &str) -> Result<(), SessionError> {
        self.served_question(question_id)?;
        if self.outcomes.contains_key(question_id) {
            return Err(SessionError::AlreadyAnswered(question_id.to_string()));
        }
        self.outcomes.insert(question_id.to_string(), Outcome::Skipped);
        Ok(())
    }

    /// Reshuffle the feed and zero all progress
    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order = sampling::order(&self.feed, self.policy, rng);
        self.offset = 0;
        self.served.clear();
        self.outcomes.clear();
        self.started_at = Utc::now();
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.values().filter(|o| **o == outcome).count()
    }

    pub fn summary(&self) -> SessionSummary {
        let policy = match self.policy {
            OrderPolicy::Shuffled => "shuffled",
            OrderPolicy::BalancedByYear => "balanced",
        };
        SessionSummary {
            id: self.id,
            subjects: self.subjects.clone(),
            policy: policy.to_string(),
            total: self.unique_total,
            served: self.served.len(),
            remaining: self.unique_total.saturating_sub(self.served.len()),
            correct: self.count(Outcome::Correct),
            incorrect: self.count(Outcome::Incorrect),
            skipped: self.count(Outcome::Skipped),
            started_at: self.started_at,
            elapsed_secs: (Utc::now() - self.started_at).num_seconds(),
        }
    }
}

fn parse_answer(raw: &str) -> Result<char, SessionError> {
    let mut chars = raw.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Ok(c.to_ascii_uppercase()),
        _ => Err(SessionError::InvalidLetter(raw.to_string())),
    }
}

/// Sessions unused for this long are dropped by [`SessionRegistry::sweep`]
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60 * 60);
/// Live sessions kept before the least recently used one is evicted
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// In-memory registry of live sessions
///
/// Bounded by an idle TTL and a maximum count. Every access refreshes a
/// session's idle clock.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, PracticeSession>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero `max_sessions` is raised to one
    pub fn with_limits(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    pub async fn create(
        &self,
        subjects: Vec<String>,
        feed: Vec<Arc<Question>>,
        policy: OrderPolicy,
    ) -> SessionSummary {
        let session = PracticeSession::new(subjects, feed, policy, &mut rand::thread_rng());
        let summary = session.summary();
        info!(
            "Created session {} ({} questions, {})",
            summary.id, summary.total, summary.policy
        );

        let mut sessions = self.sessions.write().await;
        let idle_ttl = self.idle_ttl;
        sessions.retain(|_, s| s.idle_for() < idle_ttl);
        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .values()
                .max_by_key(|s| s.idle_for())
                .map(PracticeSession::id)
            else {
                break;
            };
            sessions.remove(&oldest);
            info!("Session limit reached, evicted session {}", oldest);
        }
        sessions.insert(session.id(), session);
        summary
    }

    /// Run `f` against one session under the write lock
    pub async fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut PracticeSession) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.touch();
        f(session)
    }

    pub async fn summary(&self, id: Uuid) -> Result<SessionSummary, SessionError> {
        self.with_session(id, |s| Ok(s.summary())).await
    }

    pub async fn next_page(&self, id: Uuid, limit: usize) -> Result<QuestionPage, SessionError> {
        self.with_session(id, |s| Ok(s.next_page(limit))).await
    }

    pub async fn answer(
        &self,
        id: Uuid,
        question_id: &str,
        letter: &str,
    ) -> Result<AnswerResult, SessionError> {
        self.with_session(id, |s| s.answer(question_id, letter)).await
    }

    pub async fn skip(&self, id: Uuid, question_id: &str) -> Result<(), SessionError> {
        self.with_session(id, |s| s.skip(question_id)).await
    }

    pub async fn restart(&self, id: Uuid) -> Result<SessionSummary, SessionError> {
        self.with_session(id, |s| {
            s.restart(&mut rand::thread_rng());
            Ok(s.summary())
        })
        .await
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than the TTL; returns how many went
    pub async fn sweep(&self) -> usize {
        let idle_ttl = self.idle_ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.idle_for() < idle_ttl);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!("Expired {} idle sessions", removed);
        }
        removed
    }
}
