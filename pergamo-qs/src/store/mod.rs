//! In-memory question store
//!
//! Holds the questions produced by one load pass. The store is immutable;
//! a reload builds a new one.

pub mod loader;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::models::Question;

pub use loader::{LoadError, LoadOutcome, LoadReport, QuestionLoader};

/// Immutable collection of validated questions
#[derive(Debug, Default)]
pub struct QuestionStore {
    questions: Vec<Arc<Question>>,
    report: LoadReport,
}

impl QuestionStore {
    pub fn new(questions: Vec<Question>) -> Self {
        let report = LoadReport {
            loaded: questions.len(),
            ..LoadReport::default()
        };
        Self::with_report(questions, report)
    }

    pub fn with_report(questions: Vec<Question>, report: LoadReport) -> Self {
        Self {
            questions: questions.into_iter().map(Arc::new).collect(),
            report,
        }
    }

    pub fn from_outcome(outcome: LoadOutcome) -> Self {
        Self::with_report(outcome.questions, outcome.report)
    }

    /// All questions in load order
    pub fn questions(&self) -> &[Arc<Question>] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Distinct years, ascending
    pub fn years(&self) -> Vec<u16> {
        self.questions
            .iter()
            .map(|q| q.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct non-empty disciplines, sorted
    pub fn disciplines(&self) -> Vec<String> {
        distinct(self.questions.iter().map(|q| q.discipline.as_str()))
    }

    /// Distinct non-empty areas, sorted
    pub fn areas(&self) -> Vec<String> {
        distinct(self.questions.iter().map(|q| q.area.as_str()))
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
