//! Startup and runtime errors of the server process.

use thiserror::Error;

use crate::domain::{NotificationError, QueueError, TranslatorError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Translator setup failed: {0}")]
    Translator(#[from] TranslatorError),

    #[error("Notifier setup failed: {0}")]
    Notifier(#[from] NotificationError),

    #[error("Job queue error: {0}")]
    Queue(#[from] QueueError),
}
