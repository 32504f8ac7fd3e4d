//! Shared utilities for the Tsuyaku workspace.

pub mod logger;
pub mod time;
