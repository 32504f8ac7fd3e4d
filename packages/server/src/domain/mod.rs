//! Domain layer for the chat application.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod factory;
pub mod repository;
pub mod service;
pub mod value_object;

pub use entity::{
    ChatMessage, FailedJob, NewMessage, QueueStatus, Room, Session, TranslatedMessage,
    Translation, TranslationJob, TranslationWrite, UserIdentity,
};
pub use error::{
    AuthError, JobError, NotificationError, QueueError, RepositoryError, TranslatorError,
    ValueObjectError,
};
pub use factory::RoomIdFactory;
pub use repository::{
    ConnectionRepository, MessageRepository, RoomRepository, TranslationRepository,
};
pub use service::{
    CompletionNotifier, JobHandler, JobOptions, JobQueue, TokenVerifier, Translator,
};
pub use value_object::{
    ConnectionId, DisplayName, JobId, LanguageCode, MessageContent, MessageId, RoomId, Timestamp,
    UserId,
};

#[cfg(test)]
pub use service::{MockCompletionNotifier, MockJobQueue, MockTokenVerifier, MockTranslator};
