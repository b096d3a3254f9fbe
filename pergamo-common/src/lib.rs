//! # Pergamo Common Library
//!
//! Shared code for the Pergamo services:
//! - Error type used across crates
//! - Configuration loading and root folder resolution
//! - Server-Sent Events helpers

pub mod config;
pub mod error;
pub mod sse;

pub use error::{Error, Result};
