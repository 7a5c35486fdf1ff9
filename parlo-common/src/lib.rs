//! # Parlo Common Library
//!
//! Shared code for the Parlo demo backend:
//! - Database schema, models, and settings access
//! - Configuration and data-directory resolution
//! - Common error types

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
