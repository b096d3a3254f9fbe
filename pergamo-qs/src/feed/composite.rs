//! Composite feeds
//!
//! Some subjects are served as a combination of several constituents, each
//! filtered and cached on its own. Constituents are concatenated in order;
//! a weight above 1 repeats a constituent in the presentation feed to bias
//! how often it is sampled. Totals always count each constituent once.

use std::sync::Arc;

use super::cache::QuestionSet;
use crate::classify::{normalize_token, Area, Subject};
use crate::models::{Language, Question};

/// One part of a composite feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constituent {
    pub subject: Subject,
    pub weight: usize,
}

impl Constituent {
    pub fn new(subject: Subject) -> Self {
        Self { subject, weight: 1 }
    }

    pub fn weighted(subject: Subject, weight: usize) -> Self {
        Self {
            subject,
            weight: weight.max(1),
        }
    }
}

/// Recipe for a feed built from one or more subjects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeFeed {
    pub token: String,
    pub constituents: Vec<Constituent>,
}

impl CompositeFeed {
    /// Resolve a feed token
    ///
    /// Recognized composites are the exam areas and `linguagens+ingles` /
    /// `linguagens+espanhol`; any other token is a single-subject feed.
    pub fn for_token(token: &str) -> Self {
        let token = normalize_token(token);

        let constituents = match token.as_str() {
            "ciencias-humanas" => narrow_constituents(Area::CienciasHumanas),
            "ciencias-natureza" => narrow_constituents(Area::CienciasNatureza),
            "matematica" => vec![Constituent::new(Subject::Area(Area::Matematica))],
            "linguagens+ingles" => languages_with(Language::English),
            "linguagens+espanhol" => languages_with(Language::Spanish),
            _ => vec![Constituent::new(Subject::parse(&token))],
        };

        Self {
            token,
            constituents,
        }
    }

    /// Build a feed from several user-chosen subject tokens
    pub fn from_subjects<S: AsRef<str>>(subjects: &[S]) -> Self {
        let mut constituents = Vec::new();
        let mut tokens = Vec::new();
        for subject in subjects {
            let feed = CompositeFeed::for_token(subject.as_ref());
            if feed.token.is_empty() || tokens.contains(&feed.token) {
                continue;
            }
            tokens.push(feed.token);
            constituents.extend(feed.constituents);
        }
        Self {
            token: tokens.join(","),
            constituents,
        }
    }

    pub fn is_composite(&self) -> bool {
        self.constituents.len() > 1
    }
}

fn narrow_constituents(area: Area) -> Vec<Constituent> {
    area.disciplines()
        .iter()
        .map(|d| Constituent::new(Subject::parse(d)))
        .collect()
}

fn languages_with(language: Language) -> Vec<Constituent> {
    vec![
        Constituent::weighted(Subject::ForeignLanguage(language), 2),
        Constituent::new(Subject::Portuguese),
        Constituent::new(Subject::Literature),
        Constituent::new(Subject::Discipline("artes".to_string())),
    ]
}

/// A resolved composite: one filtered set per constituent
#[derive(Debug, Clone)]
pub struct CombinedFeed {
    parts: Vec<(Constituent, QuestionSet)>,
}

impl CombinedFeed {
    pub fn new(parts: Vec<(Constituent, QuestionSet)>) -> Self {
        Self { parts }
    }

    /// Sum of constituent totals
    pub fn total(&self) -> usize {
        self.parts.iter().map(|(_, set)| set.len()).sum()
    }

    /// Plain concatenation, each constituent once
    pub fn concatenated(&self) -> Vec<Arc<Question>> {
        let mut questions = Vec::with_capacity(self.total());
        for (_, set) in &self.parts {
            questions.extend(set.iter().cloned());
        }
        questions
    }

    /// Concatenation with each constituent repeated `weight` times
    pub fn weighted(&self) -> Vec<Arc<Question>> {
        let mut questions = Vec::new();
        for (constituent, set) in &self.parts {
            for _ in 0..constituent.weight {
                questions.extend(set.iter().cloned());
            }
        }
        questions
    }
}
