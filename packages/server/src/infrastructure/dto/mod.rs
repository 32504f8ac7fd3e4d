//! Data transfer objects for the WebSocket and HTTP surfaces.

pub mod http;
pub mod message;
pub mod websocket;

pub use message::MessageDto;
