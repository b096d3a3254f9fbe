//! Subject matching and canonical ordering
//!
//! Matching is a pure function of a question and a parsed [`Subject`]. The
//! rules are dispatched by subject variant:
//!
//! - area tokens match the `area` field, or `discipline` on records that
//!   carry no area
//! - foreign languages match on discipline, language tag or folder suffix
//! - `literatura` also matches untagged `linguagens` records
//! - narrow humanities and science tokens also match records that only carry
//!   the parent area in their discipline
//! - everything else is an exact discipline match

use std::cmp::Ordering;
use std::sync::Arc;

use super::subject::{Area, Subject};
use crate::models::{Language, Question};

/// Whether `question` belongs to `subject`
pub fn matches(question: &Question, subject: &Subject) -> bool {
    match subject {
        Subject::Area(area) => matches_area(question, *area),
        Subject::ForeignLanguage(language) => matches_foreign_language(question, language),
        Subject::Literature => {
            question.discipline == "literatura"
                || (question.discipline == Area::Linguagens.token()
                    && !question.language.is_foreign())
        }
        Subject::Portuguese => {
            question.discipline == "portugues"
                || (question.discipline == Area::Linguagens.token()
                    && question.language == Language::Portuguese)
        }
        Subject::Narrow { discipline, area } => {
            question.discipline == *discipline || question.discipline == area.token()
        }
        Subject::Discipline(token) => !token.is_empty() && question.discipline == *token,
    }
}

fn matches_area(question: &Question, area: Area) -> bool {
    let token = area.token();
    if question.area.is_empty() {
        question.discipline == token
    } else {
        question.area == token
    }
}

fn matches_foreign_language(question: &Question, language: &Language) -> bool {
    let token = language.token();
    if question.discipline == token || question.language == *language {
        return true;
    }
    match &question.dir_name {
        Some(dir) => {
            let dir = dir.to_lowercase();
            dir == token || dir.ends_with(&format!("-{}", token))
        }
        None => false,
    }
}

/// Canonical order: year ascending, then index ascending
pub fn canonical_cmp(a: &Question, b: &Question) -> Ordering {
    a.year.cmp(&b.year).then(a.index.cmp(&b.index))
}

/// Stable sort into canonical order
pub fn sort_canonical(questions: &mut [Arc<Question>]) {
    questions.sort_by(|a, b| canonical_cmp(a, b));
}

/// Matching subset of `questions`, canonically ordered
pub fn filter_questions(questions: &[Arc<Question>], subject: &Subject) -> Vec<Arc<Question>> {
    let mut matched: Vec<Arc<Question>> = questions
        .iter()
        .filter(|q| matches(q, subject))
        .cloned()
        .collect();
    sort_canonical(&mut matched);
    matched
}
