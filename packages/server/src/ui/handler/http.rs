//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    domain::{LanguageCode, MessageId, RoomId, TranslationJob},
    infrastructure::dto::{
        MessageDto,
        http::{
            ErrorResponseDto, FailedJobDto, HealthDto, JobAcceptedDto, MessagePageDto, PageQuery,
            PaginationMetaDto, QueueStatusDto, RoomDetailDto, TranslationNotificationDto,
            TranslationRequestDto,
        },
    },
    ui::state::AppState,
    usecase::HistoryError,
};

type ApiError = (StatusCode, Json<ErrorResponseDto>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponseDto {
            error: error.to_string(),
        }),
    )
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
    })
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, ApiError> {
    let room_id = RoomId::new(room_id).map_err(|e| api_error(StatusCode::NOT_FOUND, e))?;

    let room = state
        .rooms
        .find(&room_id)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Room not found: {room_id}")))?;

    let connected = state.connections.sessions_in_room(&room_id).await.len();
    Ok(Json(RoomDetailDto::new(&room, connected)))
}

/// Paginated message history of a room (page 1 is the newest)
pub async fn get_room_messages(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<MessagePageDto>, ApiError> {
    let room_id = RoomId::new(room_id).map_err(|e| api_error(StatusCode::NOT_FOUND, e))?;

    let page = state
        .history
        .page(&room_id, query.page, query.limit)
        .await
        .map_err(|e| match e {
            HistoryError::RoomNotFound(_) => api_error(StatusCode::NOT_FOUND, e),
            HistoryError::NotMember => api_error(StatusCode::FORBIDDEN, e),
            HistoryError::Repository(_) => {
                tracing::error!("History of room '{}' failed: {}", room_id, e);
                api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
            }
        })?;

    Ok(Json(MessagePageDto {
        messages: page.messages.iter().map(MessageDto::from).collect(),
        meta: PaginationMetaDto {
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages: page.total_pages(),
        },
    }))
}

/// Completion callback from a translation worker running in another process
pub async fn notify_translation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TranslationNotificationDto>,
) -> Result<StatusCode, ApiError> {
    let message_id =
        MessageId::new(body.message_id).map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let room_id = RoomId::new(body.room_id).map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let language = LanguageCode::new(body.target_language)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    state
        .notify_translation
        .execute(&message_id, &room_id, &language, &body.translated_text)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit a translation job directly to the queue
pub async fn enqueue_translation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TranslationRequestDto>,
) -> Result<(StatusCode, Json<JobAcceptedDto>), ApiError> {
    let job = TranslationJob::try_from(body).map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let message_id = job.message_id.clone();

    let job_id = state
        .queue
        .enqueue(job, state.job_options)
        .await
        .map_err(|e| {
            tracing::error!("Failed to queue translation of message '{}': {}", message_id, e);
            api_error(StatusCode::SERVICE_UNAVAILABLE, e)
        })?;

    tracing::info!("Translation job {} queued for message '{}'", job_id, message_id);
    Ok((
        StatusCode::CREATED,
        Json(JobAcceptedDto {
            success: true,
            job_id: job_id.value(),
        }),
    ))
}

/// Job queue counters
pub async fn queue_status(State(state): State<Arc<AppState>>) -> Json<QueueStatusDto> {
    Json(state.queue.status().await.into())
}

/// Jobs parked after exhausting their attempts
pub async fn failed_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<FailedJobDto>> {
    let failed = state.queue.failed_jobs().await;
    Json(failed.iter().map(FailedJobDto::from).collect())
}
