//! HTTP API request / response DTOs.

use serde::{Deserialize, Serialize};
use tsuyaku_shared::time::timestamp_to_jst_rfc3339;

use crate::domain::{
    FailedJob, LanguageCode, MessageContent, MessageId, QueueStatus, Room, RoomId,
    TranslationJob, ValueObjectError,
};

use super::message::MessageDto;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
}

/// Room detail for detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub id: String,
    pub participants: Vec<String>,
    pub is_active: bool,
    pub created_at: String, // ISO 8601
    /// Live connections currently viewing the room
    pub connected_count: usize,
}

impl RoomDetailDto {
    pub fn new(room: &Room, connected_count: usize) -> Self {
        Self {
            id: room.id.to_string(),
            participants: room.participants.iter().map(|p| p.to_string()).collect(),
            is_active: room.is_active,
            created_at: timestamp_to_jst_rfc3339(room.created_at.value()),
            connected_count,
        }
    }
}

/// Query string of the paginated history endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMetaDto {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePageDto {
    pub messages: Vec<MessageDto>,
    pub meta: PaginationMetaDto,
}

/// Body of the translation completion callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationNotificationDto {
    pub message_id: String,
    pub room_id: String,
    pub target_language: String,
    pub translated_text: String,
}

/// Body of a translation job submitted over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequestDto {
    pub message_id: String,
    pub room_id: String,
    pub original_text: String,
    pub source_language: String,
    pub target_language: String,
}

impl TryFrom<TranslationRequestDto> for TranslationJob {
    type Error = ValueObjectError;

    fn try_from(dto: TranslationRequestDto) -> Result<Self, Self::Error> {
        Ok(Self {
            message_id: MessageId::new(dto.message_id)?,
            room_id: RoomId::new(dto.room_id)?,
            body: MessageContent::new(dto.original_text)?,
            source_language: LanguageCode::new(dto.source_language)?,
            target_language: LanguageCode::new(dto.target_language)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAcceptedDto {
    pub success: bool,
    pub job_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatusDto {
    pub waiting: usize,
    pub active: usize,
    pub delayed: usize,
    pub completed: usize,
    pub failed: usize,
}

impl From<QueueStatus> for QueueStatusDto {
    fn from(status: QueueStatus) -> Self {
        Self {
            waiting: status.waiting,
            active: status.active,
            delayed: status.delayed,
            completed: status.completed,
            failed: status.failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedJobDto {
    pub id: u64,
    pub message_id: String,
    pub room_id: String,
    pub source_language: String,
    pub target_language: String,
    pub attempts_made: u32,
    pub last_error: String,
    pub failed_at: String, // ISO 8601
}

impl From<&FailedJob> for FailedJobDto {
    fn from(failed: &FailedJob) -> Self {
        Self {
            id: failed.id.value(),
            message_id: failed.job.message_id.to_string(),
            room_id: failed.job.room_id.to_string(),
            source_language: failed.job.source_language.to_string(),
            target_language: failed.job.target_language.to_string(),
            attempts_made: failed.attempts_made,
            last_error: failed.last_error.clone(),
            failed_at: timestamp_to_jst_rfc3339(failed.failed_at.value()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponseDto {
    pub error: String,
}
