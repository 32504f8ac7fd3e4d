//! Core domain models for the chat application.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::value_object::{
    ConnectionId, DisplayName, JobId, LanguageCode, MessageContent, MessageId, RoomId, Timestamp,
    UserId,
};

/// Represents a chat room and its durable participant set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier
    pub id: RoomId,
    /// Every user that has ever joined the room
    pub participants: BTreeSet<UserId>,
    /// Inactive rooms cannot be joined
    pub is_active: bool,
    /// Timestamp when the room was created
    pub created_at: Timestamp,
}

impl Room {
    /// Create a new active room with its creator as the first participant
    pub fn new(id: RoomId, creator: UserId, created_at: Timestamp) -> Self {
        let mut participants = BTreeSet::new();
        participants.insert(creator);
        Self {
            id,
            participants,
            is_active: true,
            created_at,
        }
    }

    /// Add a participant to the room.
    ///
    /// Returns `false` when the user was already a participant.
    pub fn add_participant(&mut self, user_id: UserId) -> bool {
        self.participants.insert(user_id)
    }

    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.participants.contains(user_id)
    }
}

/// Authenticated identity carried by a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: UserId,
    pub display_name: DisplayName,
    /// Expiry of the credential the identity was derived from
    pub expires_at: Option<Timestamp>,
}

impl UserIdentity {
    pub fn new(user_id: UserId, display_name: DisplayName, expires_at: Option<Timestamp>) -> Self {
        Self {
            user_id,
            display_name,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// A live connection's state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: ConnectionId,
    pub user: UserIdentity,
    /// Room the connection is currently viewing, if any
    pub room_id: Option<RoomId>,
    /// Language the connection currently reads in
    pub language: LanguageCode,
    pub connected_at: Timestamp,
}

impl Session {
    pub fn new(
        id: ConnectionId,
        user: UserIdentity,
        language: LanguageCode,
        connected_at: Timestamp,
    ) -> Self {
        Self {
            id,
            user,
            room_id: None,
            language,
            connected_at,
        }
    }

    pub fn is_in_room(&self, room_id: &RoomId) -> bool {
        self.room_id.as_ref() == Some(room_id)
    }
}

/// A message before the store assigned its identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub author_id: UserId,
    pub author_name: DisplayName,
    pub content: MessageContent,
    pub source_language: LanguageCode,
}

/// Represents a persisted chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub author_id: UserId,
    pub author_name: DisplayName,
    pub content: MessageContent,
    pub source_language: LanguageCode,
    /// Non-decreasing within a room
    pub created_at: Timestamp,
}

impl ChatMessage {
    /// Materialize a new message with the identifier and timestamp chosen by the store
    pub fn from_new(id: MessageId, message: NewMessage, created_at: Timestamp) -> Self {
        Self {
            id,
            room_id: message.room_id,
            author_id: message.author_id,
            author_name: message.author_name,
            content: message.content,
            source_language: message.source_language,
            created_at,
        }
    }
}

/// A stored translation, unique per (message, target language)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub message_id: MessageId,
    pub target_language: LanguageCode,
    pub text: String,
    pub created_at: Timestamp,
}

impl Translation {
    pub fn new(
        message_id: MessageId,
        target_language: LanguageCode,
        text: String,
        created_at: Timestamp,
    ) -> Self {
        Self {
            message_id,
            target_language,
            text,
            created_at,
        }
    }
}

/// Result of an insert-if-absent write on the translation store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationWrite {
    /// The row did not exist and was written
    Inserted(Translation),
    /// A row already existed; it was left untouched
    Existing(Translation),
}

impl TranslationWrite {
    /// The row the store holds after the write
    pub fn translation(&self) -> &Translation {
        match self {
            Self::Inserted(translation) | Self::Existing(translation) => translation,
        }
    }

    pub fn into_translation(self) -> Translation {
        match self {
            Self::Inserted(translation) | Self::Existing(translation) => translation,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// A message together with every translation known for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedMessage {
    pub message: ChatMessage,
    pub translations: BTreeMap<LanguageCode, String>,
}

impl TranslatedMessage {
    pub fn new(message: ChatMessage, translations: BTreeMap<LanguageCode, String>) -> Self {
        Self {
            message,
            translations,
        }
    }

    /// Whether a viewer reading in `language` still lacks a version of this message
    pub fn needs_translation(&self, language: &LanguageCode) -> bool {
        &self.message.source_language != language && !self.translations.contains_key(language)
    }
}

/// A self-contained request to translate one message into one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationJob {
    pub message_id: MessageId,
    pub room_id: RoomId,
    pub body: MessageContent,
    pub source_language: LanguageCode,
    pub target_language: LanguageCode,
}

impl TranslationJob {
    /// Job translating `message` into `target_language`
    pub fn for_message(message: &ChatMessage, target_language: LanguageCode) -> Self {
        Self {
            message_id: message.id.clone(),
            room_id: message.room_id.clone(),
            body: message.content.clone(),
            source_language: message.source_language.clone(),
            target_language,
        }
    }

    pub fn is_same_language(&self) -> bool {
        self.source_language == self.target_language
    }
}

/// A job parked after exhausting its attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedJob {
    pub id: JobId,
    pub job: TranslationJob,
    pub attempts_made: u32,
    pub last_error: String,
    pub failed_at: Timestamp,
}

/// Snapshot of the job queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Accepted and waiting for a worker
    pub waiting: usize,
    /// Currently being processed
    pub active: usize,
    /// Waiting out a retry backoff
    pub delayed: usize,
    pub completed: usize,
    pub failed: usize,
}
