//! Multilingual WebSocket chat relay library.
//!
//! Messages are persisted and broadcast to the room immediately; translations
//! into every language a live connection reads are produced by a background
//! job queue and delivered as they complete.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::Config;
pub use error::ServerError;
pub use ui::{run, serve};
