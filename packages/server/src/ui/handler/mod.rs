//! Handler modules for HTTP and WebSocket endpoints.

pub mod http;
pub mod websocket;

// Re-export HTTP handlers
pub use http::{
    enqueue_translation, failed_jobs, get_room_detail, get_room_messages, health_check,
    notify_translation, queue_status,
};

// Re-export WebSocket handlers
pub use websocket::websocket_handler;
