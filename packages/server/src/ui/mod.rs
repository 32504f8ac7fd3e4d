//! WebSocket chat relay: HTTP and WebSocket surface.

mod handler;
mod runner;
mod signal;
pub mod state; // UseCase 層からアクセスするため public に変更

pub use runner::{build_router, run, serve};
