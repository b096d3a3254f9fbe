//! Offset/limit pagination over filtered sets

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::Question;

/// Default page size for progressive loading
pub const DEFAULT_LIMIT: usize = 50;

/// One page of a filtered set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionPage {
    pub questions: Vec<Arc<Question>>,
    pub total: usize,
}

impl QuestionPage {
    pub fn empty() -> Self {
        Self {
            questions: Vec::new(),
            total: 0,
        }
    }
}

/// Offset/limit request parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Slice `items[offset .. offset + limit]`, clamped to the available range
///
/// An offset at or past the end yields an empty page. A final page may be
/// shorter than `limit`.
///
/// # Examples
/// ```
/// use pergamo_qs::feed::pagination::slice;
///
/// let items = vec![1, 2, 3, 4, 5];
/// assert_eq!(slice(&items, 3, 10), vec![4, 5]);
/// assert!(slice(&items, 100, 10).is_empty());
/// ```
pub fn slice<T: Clone>(items: &[T], offset: usize, limit: usize) -> Vec<T> {
    if offset >= items.len() {
        return Vec::new();
    }
    let end = offset.saturating_add(limit).min(items.len());
    items[offset..end].to_vec()
}

/// Build a page from a full canonically ordered set
pub fn paginate(items: &[Arc<Question>], request: PageRequest) -> QuestionPage {
    QuestionPage {
        questions: slice(items, request.offset, request.limit),
        total: items.len(),
    }
}
