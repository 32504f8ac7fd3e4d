//! Repository traits.
//!
//! The domain layer defines what storage it needs; the infrastructure layer
//! provides the implementations (dependency inversion).

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::{
    entity::{
        ChatMessage, NewMessage, Room, Session, Translation, TranslationWrite, UserIdentity,
    },
    error::RepositoryError,
    value_object::{ConnectionId, LanguageCode, MessageId, RoomId, UserId},
};

/// Durable room store
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Insert the room unless its id is taken.
    ///
    /// Returns `false` on an id collision. The check and the insert are atomic.
    async fn insert_if_absent(&self, room: Room) -> Result<bool, RepositoryError>;

    async fn find(&self, room_id: &RoomId) -> Result<Option<Room>, RepositoryError>;

    /// Add a user to the room's participant set (idempotent union).
    ///
    /// # Errors
    ///
    /// `RepositoryError::RoomNotFound` when no such room exists
    async fn add_participant(
        &self,
        room_id: &RoomId,
        user_id: UserId,
    ) -> Result<Room, RepositoryError>;
}

/// Append-only message store
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a message, assigning its identifier and creation timestamp
    async fn append(&self, message: NewMessage) -> Result<ChatMessage, RepositoryError>;

    async fn find(&self, message_id: &MessageId) -> Result<Option<ChatMessage>, RepositoryError>;

    /// Most recent `limit` messages of a room, oldest first
    async fn recent(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;

    /// One page of a room's history counted from the newest message, oldest first
    /// within the page, plus the total number of messages in the room
    async fn page(
        &self,
        room_id: &RoomId,
        page: usize,
        per_page: usize,
    ) -> Result<(Vec<ChatMessage>, usize), RepositoryError>;
}

/// Translation store keyed uniquely by (message, target language)
#[async_trait]
pub trait TranslationRepository: Send + Sync {
    /// Single conditional write: stores the translation only if no row exists for its key
    async fn insert_if_absent(
        &self,
        translation: Translation,
    ) -> Result<TranslationWrite, RepositoryError>;

    async fn find(
        &self,
        message_id: &MessageId,
        target_language: &LanguageCode,
    ) -> Result<Option<Translation>, RepositoryError>;

    /// Every stored translation of the given messages, grouped by message
    async fn find_for_messages(
        &self,
        message_ids: &[MessageId],
    ) -> Result<HashMap<MessageId, BTreeMap<LanguageCode, String>>, RepositoryError>;
}

/// Registry of live connections and the rooms they are viewing
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Register a freshly authenticated connection with its outbound channel
    async fn register(&self, session: Session, sender: UnboundedSender<String>);

    /// Drop a connection. Returns its last state if it was registered.
    async fn unregister(&self, connection_id: &ConnectionId) -> Option<Session>;

    async fn get(&self, connection_id: &ConnectionId) -> Option<Session>;

    /// Replace the identity of a registered connection (token refresh)
    async fn update_identity(
        &self,
        connection_id: &ConnectionId,
        user: UserIdentity,
    ) -> Result<(), RepositoryError>;

    /// Bind the connection to a room with the given viewing language.
    ///
    /// Returns the room the connection was bound to before, if any.
    async fn bind_room(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        language: LanguageCode,
    ) -> Result<Option<RoomId>, RepositoryError>;

    /// Unbind the connection from its room. Returns the room it left, if any.
    async fn unbind_room(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<Option<RoomId>, RepositoryError>;

    async fn set_language(
        &self,
        connection_id: &ConnectionId,
        language: LanguageCode,
    ) -> Result<(), RepositoryError>;

    /// Live connections currently bound to the room
    async fn sessions_in_room(&self, room_id: &RoomId) -> Vec<Session>;

    /// Queue a serialized event on the connection's outbound channel
    async fn push(&self, connection_id: &ConnectionId, payload: String)
    -> Result<(), RepositoryError>;

    async fn count(&self) -> usize;
}
