//! Subject classification
//!
//! Parses subject tokens and filters the question collection by them.

pub mod filter;
pub mod subject;

pub use filter::{canonical_cmp, filter_questions, matches, sort_canonical};
pub use subject::{normalize_token, Area, Subject};
