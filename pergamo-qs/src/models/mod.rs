//! Data models for the question service

pub mod question;

pub use question::{Alternative, Language, Question, QuestionRecord, ValidationError};
