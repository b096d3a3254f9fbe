//! HTTP API handlers for pergamo-qs

pub mod client;
pub mod explain;
pub mod health;
pub mod questions;
pub mod report;
pub mod sessions;

pub use explain::explain;
pub use health::health_routes;
pub use questions::{
    list_areas, list_disciplines, list_years, questions_batch, questions_by_subject,
    questions_by_year, questions_feed, reload_questions,
};
pub use report::report_question;
pub use sessions::{
    answer_question, create_session, delete_session, get_session, next_questions,
    restart_session, skip_question,
};
