//! WebSocket event DTOs.
//!
//! Every frame is a JSON object tagged by `event`. Client requests may carry a
//! `request_id` that the server echoes in the matching `ack`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::MessageDto;

/// A frame received from a client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    #[serde(default)]
    pub request_id: Option<Value>,
    #[serde(flatten)]
    pub event: ClientEvent,
}

/// Client → server events
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    Authenticate {
        token: String,
    },
    CreateRoom,
    JoinRoom {
        room_id: String,
        #[serde(default)]
        language: Option<String>,
    },
    LeaveRoom,
    SendMessage {
        body: String,
        #[serde(default)]
        room_id: Option<String>,
        #[serde(default)]
        language: Option<String>,
    },
    SetLanguage {
        language: String,
    },
    LanguageChange {
        language: String,
    },
    GetMessageHistory {
        #[serde(default)]
        limit: Option<usize>,
    },
}

impl ClientEvent {
    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::CreateRoom => "create_room",
            Self::JoinRoom { .. } => "join_room",
            Self::LeaveRoom => "leave_room",
            Self::SendMessage { .. } => "send_message",
            Self::SetLanguage { .. } => "set_language",
            Self::LanguageChange { .. } => "language_change",
            Self::GetMessageHistory { .. } => "get_message_history",
        }
    }
}

/// Machine-readable failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    InvalidToken,
    TokenExpired,
    ValidationError,
    ChatNotFound,
    NotChatMember,
    DatabaseError,
    InternalServerError,
}

/// Acknowledgment payload of a successful request
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AckData {
    Authenticated {
        user_id: String,
        display_name: String,
    },
    RoomCreated {
        room_id: String,
    },
    RoomJoined {
        room_id: String,
        language: String,
        messages: Vec<MessageDto>,
    },
    RoomLeft {
        room_id: Option<String>,
    },
    MessageSent {
        message_id: String,
    },
    LanguageSet {
        language: String,
    },
    LanguageChanged {
        room_id: String,
        language: String,
        backfilled: usize,
    },
    History {
        room_id: String,
        messages: Vec<MessageDto>,
    },
}

/// Body of an `ack` event
#[derive(Debug, Clone, Serialize)]
pub struct SocketResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AckData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl SocketResponse {
    pub fn ok(data: AckData) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            code: None,
            retryable: None,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            code: Some(code),
            retryable: Some(retryable),
        }
    }
}

/// Server → client events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    Ack {
        request_id: Option<Value>,
        response: SocketResponse,
    },
    MessageReceived {
        message: MessageDto,
    },
    UserJoined {
        room_id: String,
        user_id: String,
        display_name: String,
        timestamp: i64,
    },
    UserLeft {
        room_id: String,
        user_id: String,
        display_name: String,
        timestamp: i64,
    },
    TranslationAvailable {
        message_id: String,
        room_id: String,
        language: String,
        text: String,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
