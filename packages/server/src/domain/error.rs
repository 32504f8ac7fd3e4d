//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// UserId validation error
    #[error("UserId cannot be empty")]
    UserIdEmpty,

    /// UserId too long error
    #[error("UserId cannot exceed {max} characters (got {actual})")]
    UserIdTooLong { max: usize, actual: usize },

    #[error("DisplayName cannot be empty")]
    DisplayNameEmpty,

    #[error("DisplayName cannot exceed {max} characters (got {actual})")]
    DisplayNameTooLong { max: usize, actual: usize },

    /// RoomId validation error
    #[error("RoomId cannot be empty")]
    RoomIdEmpty,

    /// RoomId invalid format error (not `ddd-ddd-ddd`)
    #[error("RoomId must look like 123-456-789 (got: {0})")]
    RoomIdInvalidFormat(String),

    #[error("MessageId cannot be empty")]
    MessageIdEmpty,

    /// MessageContent validation error
    #[error("MessageContent cannot be empty")]
    MessageContentEmpty,

    /// MessageContent too long error
    #[error("MessageContent cannot exceed {max} characters (got {actual})")]
    MessageContentTooLong { max: usize, actual: usize },

    #[error("Invalid language code: '{0}'")]
    LanguageCodeInvalid(String),
}

/// Errors raised by repository implementations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    /// The connection's outbound channel is closed
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Storage backend failure
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Credential verification failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,
}

/// Failures of the external translation engine
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranslatorError {
    #[error("Translation request failed: {0}")]
    Request(String),

    #[error("Translation engine returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Translation engine returned an empty translation")]
    EmptyResponse,

    #[error("Translation engine response could not be read: {0}")]
    InvalidResponse(String),
}

/// Job queue failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Job queue is closed")]
    Closed,

    #[error("Job queue workers are already running")]
    AlreadyStarted,

    #[error("Job queue unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by a job handler; the queue retries it per the job's options
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct JobError(pub String);

/// Completion notification could not be delivered (never fatal)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Notification rejected with status {0}")]
    Rejected(u16),
}
