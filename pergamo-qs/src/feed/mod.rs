//! Progressive pagination, caching and presentation order

pub mod cache;
pub mod composite;
pub mod pagination;
pub mod sampling;

pub use cache::{CacheStats, QuestionSet, SubjectCache};
pub use composite::{CombinedFeed, CompositeFeed, Constituent};
pub use pagination::{paginate, PageRequest, QuestionPage, DEFAULT_LIMIT};
pub use sampling::OrderPolicy;
