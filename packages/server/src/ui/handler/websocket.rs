//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde_json::Value;
use tokio::{sync::mpsc, time::Instant};

use crate::{
    domain::{
        AuthError, ConnectionId, LanguageCode, MessageContent, RepositoryError, RoomId, Session,
        Timestamp, UserIdentity,
    },
    infrastructure::dto::{
        MessageDto,
        http::ErrorResponseDto,
        websocket::{AckData, ClientEvent, ClientFrame, ErrorCode, ServerEvent, SocketResponse},
    },
    ui::state::{AppState, ConnectQuery},
    usecase::{
        AuthenticateError, ChangeLanguageError, CreateRoomError, HistoryError, JoinRoomError,
        SendMessageError,
    },
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, Json<ErrorResponseDto>)> {
    let token = query
        .token
        .filter(|token| !token.trim().is_empty())
        .or_else(|| bearer_token(&headers));

    // Handshake credential is optional; when present it must be valid
    let identity = match token {
        Some(token) => match state.authenticate.verify(&token) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!("Rejected WebSocket handshake: {}", e);
                return Err((
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponseDto {
                        error: e.to_string(),
                    }),
                ));
            }
        },
        None => None,
    };

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, identity))
        .into_response())
}

/// `Authorization: Bearer <token>` header value
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, identity: Option<UserIdentity>) {
    let (mut sender, mut receiver) = socket.split();

    let identity = match identity {
        Some(identity) => identity,
        None => match await_authentication(&state, &mut sender, &mut receiver).await {
            Some(identity) => identity,
            None => {
                let _ = sender.send(Message::Close(None)).await;
                return;
            }
        },
    };

    // Create a channel for this connection to receive events
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = state.connect.execute(identity, tx).await;
    let connection_id = session.id.clone();

    let state_clone = state.clone();
    let connection_id_clone = connection_id.clone();

    // Spawn a task to receive frames from this connection
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    let reply = dispatch(&state_clone, &connection_id_clone, text.as_str()).await;
                    deliver(&state_clone, &connection_id_clone, &reply).await;
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id_clone);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to forward queued events to this connection
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state.disconnect.execute(&connection_id).await;
}

/// Wait for the first frame of a socket that connected without a credential.
///
/// Returns the identity on success. On any failure an `error` event has
/// already been sent and the caller closes the socket.
async fn await_authentication(
    state: &AppState,
    sender: &mut SplitSink<WebSocket, Message>,
    receiver: &mut SplitStream<WebSocket>,
) -> Option<UserIdentity> {
    let deadline = Instant::now() + state.auth_grace;

    let (code, message) = loop {
        let next = match tokio::time::timeout_at(deadline, receiver.next()).await {
            Ok(next) => next,
            Err(_) => break (ErrorCode::Unauthorized, "Authentication timed out".to_string()),
        };

        let text = match next {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
            Some(Ok(_)) => continue,
        };

        let frame = match serde_json::from_str::<ClientFrame>(text.as_str()) {
            Ok(frame) => frame,
            Err(_) => {
                break (
                    ErrorCode::Unauthorized,
                    "Authentication required".to_string(),
                );
            }
        };

        let ClientEvent::Authenticate { token } = frame.event else {
            break (
                ErrorCode::Unauthorized,
                "Authentication required".to_string(),
            );
        };

        match state.authenticate.verify(&token) {
            Ok(identity) => {
                let ack = ServerEvent::Ack {
                    request_id: frame.request_id,
                    response: SocketResponse::ok(AckData::Authenticated {
                        user_id: identity.user_id.to_string(),
                        display_name: identity.display_name.to_string(),
                    }),
                };
                if let Ok(json) = ack.to_json()
                    && sender.send(Message::Text(json.into())).await.is_err()
                {
                    return None;
                }
                return Some(identity);
            }
            Err(e) => break (authenticate_error_code(&e), e.to_string()),
        }
    };

    tracing::warn!("Closing unauthenticated WebSocket: {}", message);
    let event = ServerEvent::Error { code, message };
    if let Ok(json) = event.to_json() {
        let _ = sender.send(Message::Text(json.into())).await;
    }
    None
}

/// Push an event to one connection
async fn deliver(state: &AppState, connection_id: &ConnectionId, event: &ServerEvent) {
    let json = match event.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize reply for '{}': {}", connection_id, e);
            return;
        }
    };
    if let Err(e) = state.connections.push(connection_id, json).await {
        tracing::warn!("Failed to reply to connection '{}': {}", connection_id, e);
    }
}

/// Handle one inbound frame and build the reply for the sender
async fn dispatch(state: &AppState, connection_id: &ConnectionId, text: &str) -> ServerEvent {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to parse frame as JSON: {}", e);
            return ServerEvent::Error {
                code: ErrorCode::ValidationError,
                message: format!("Malformed frame: {e}"),
            };
        }
    };
    let request_id = value.get("request_id").cloned();

    let frame = match serde_json::from_value::<ClientFrame>(value) {
        Ok(frame) => frame,
        Err(e) => {
            return ServerEvent::Ack {
                request_id,
                response: SocketResponse::error(
                    ErrorCode::ValidationError,
                    format!("Invalid request: {e}"),
                    false,
                ),
            };
        }
    };

    let Some(session) = state.connections.get(connection_id).await else {
        return ServerEvent::Ack {
            request_id,
            response: SocketResponse::error(
                ErrorCode::InternalServerError,
                "Connection is no longer registered",
                false,
            ),
        };
    };

    tracing::debug!(
        "Connection '{}' sent '{}'",
        connection_id,
        frame.event.name()
    );

    let response = match frame.event {
        // Refreshing is allowed after expiry
        ClientEvent::Authenticate { token } => refresh(state, &session, &token).await,
        _ if session.user.is_expired(Timestamp::now()) => {
            SocketResponse::error(ErrorCode::TokenExpired, "Token has expired", false)
        }
        event => handle_action(state, &session, event).await,
    };

    ServerEvent::Ack {
        request_id,
        response,
    }
}

async fn refresh(state: &AppState, session: &Session, token: &str) -> SocketResponse {
    match state
        .authenticate
        .refresh(&session.id, &session.user, token)
        .await
    {
        Ok(identity) => SocketResponse::ok(AckData::Authenticated {
            user_id: identity.user_id.to_string(),
            display_name: identity.display_name.to_string(),
        }),
        Err(e) => {
            tracing::warn!("Token refresh for '{}' failed: {}", session.id, e);
            SocketResponse::error(authenticate_error_code(&e), e.to_string(), false)
        }
    }
}

async fn handle_action(state: &AppState, session: &Session, event: ClientEvent) -> SocketResponse {
    match event {
        ClientEvent::Authenticate { token } => refresh(state, session, &token).await,

        ClientEvent::CreateRoom => {
            match state.create_room.execute(session.user.user_id.clone()).await {
                Ok(room) => SocketResponse::ok(AckData::RoomCreated {
                    room_id: room.id.to_string(),
                }),
                Err(e) => {
                    tracing::error!("Room creation by '{}' failed: {}", session.user.user_id, e);
                    let code = match e {
                        CreateRoomError::IdExhausted(_) => ErrorCode::InternalServerError,
                        CreateRoomError::Repository(_) => ErrorCode::DatabaseError,
                    };
                    SocketResponse::error(code, e.to_string(), false)
                }
            }
        }

        ClientEvent::JoinRoom { room_id, language } => {
            let room_id = match RoomId::new(room_id) {
                Ok(room_id) => room_id,
                Err(e) => return validation_error(e),
            };
            let language = match language.map(LanguageCode::new).transpose() {
                Ok(language) => language,
                Err(e) => return validation_error(e),
            };
            match state.join_room.execute(&session.id, &room_id, language).await {
                Ok(snapshot) => SocketResponse::ok(AckData::RoomJoined {
                    room_id: snapshot.room.id.to_string(),
                    language: snapshot.language.to_string(),
                    messages: snapshot.messages.iter().map(MessageDto::from).collect(),
                }),
                Err(JoinRoomError::RoomNotFound(id)) => SocketResponse::error(
                    ErrorCode::ChatNotFound,
                    format!("Chat not found: {id}"),
                    false,
                ),
                Err(JoinRoomError::Repository(e)) => {
                    tracing::error!("Join of room '{}' failed: {}", room_id, e);
                    repository_error(e)
                }
            }
        }

        ClientEvent::LeaveRoom => match state.leave_room.execute(&session.id).await {
            Ok(room_id) => SocketResponse::ok(AckData::RoomLeft {
                room_id: room_id.map(|id| id.to_string()),
            }),
            Err(e) => {
                tracing::error!("Leave by '{}' failed: {}", session.id, e);
                repository_error(e)
            }
        },

        ClientEvent::SendMessage {
            body,
            room_id,
            language,
        } => {
            let content = match MessageContent::new(body) {
                Ok(content) => content,
                Err(e) => return validation_error(e),
            };
            let room_id = match room_id.map(RoomId::new).transpose() {
                Ok(room_id) => room_id,
                Err(e) => return validation_error(e),
            };
            let language = match language.map(LanguageCode::new).transpose() {
                Ok(language) => language,
                Err(e) => return validation_error(e),
            };
            match state
                .send_message
                .execute(&session.id, room_id, content, language)
                .await
            {
                Ok(message) => SocketResponse::ok(AckData::MessageSent {
                    message_id: message.id.to_string(),
                }),
                Err(SendMessageError::NotMember) => not_member(),
                Err(SendMessageError::Repository(e)) => {
                    tracing::error!(
                        "Message from '{}' in room {:?} failed: {}",
                        session.id,
                        session.room_id,
                        e
                    );
                    repository_error(e)
                }
            }
        }

        ClientEvent::SetLanguage { language } => {
            let language = match LanguageCode::new(language) {
                Ok(language) => language,
                Err(e) => return validation_error(e),
            };
            match state.set_language.execute(&session.id, language.clone()).await {
                Ok(()) => SocketResponse::ok(AckData::LanguageSet {
                    language: language.to_string(),
                }),
                Err(e) => repository_error(e),
            }
        }

        ClientEvent::LanguageChange { language } => {
            let language = match LanguageCode::new(language) {
                Ok(language) => language,
                Err(e) => return validation_error(e),
            };
            match state.change_language.execute(&session.id, language).await {
                Ok(change) => SocketResponse::ok(AckData::LanguageChanged {
                    room_id: change.room_id.to_string(),
                    language: change.language.to_string(),
                    backfilled: change.backfilled,
                }),
                Err(ChangeLanguageError::NotMember) => not_member(),
                Err(ChangeLanguageError::Repository(e)) => {
                    tracing::error!("Language change of '{}' failed: {}", session.id, e);
                    repository_error(e)
                }
            }
        }

        ClientEvent::GetMessageHistory { limit } => {
            match state.history.for_connection(&session.id, limit).await {
                Ok((room_id, messages)) => SocketResponse::ok(AckData::History {
                    room_id: room_id.to_string(),
                    messages: messages.iter().map(MessageDto::from).collect(),
                }),
                Err(HistoryError::NotMember) => not_member(),
                Err(HistoryError::RoomNotFound(id)) => SocketResponse::error(
                    ErrorCode::ChatNotFound,
                    format!("Chat not found: {id}"),
                    false,
                ),
                Err(HistoryError::Repository(e)) => {
                    tracing::error!("History of room {:?} failed: {}", session.room_id, e);
                    repository_error(e)
                }
            }
        }
    }
}

fn validation_error(error: impl std::fmt::Display) -> SocketResponse {
    SocketResponse::error(ErrorCode::ValidationError, error.to_string(), false)
}

/// Client recovery: rejoin the room and retry once
fn not_member() -> SocketResponse {
    SocketResponse::error(
        ErrorCode::NotChatMember,
        "You are not a member of this chat",
        true,
    )
}

fn repository_error(error: RepositoryError) -> SocketResponse {
    let code = match error {
        RepositoryError::Unavailable(_) => ErrorCode::DatabaseError,
        RepositoryError::RoomNotFound(_) => ErrorCode::ChatNotFound,
        RepositoryError::ConnectionNotFound(_) | RepositoryError::ConnectionClosed(_) => {
            ErrorCode::InternalServerError
        }
    };
    SocketResponse::error(code, error.to_string(), false)
}

fn authenticate_error_code(error: &AuthenticateError) -> ErrorCode {
    match error {
        AuthenticateError::Auth(AuthError::MissingToken) => ErrorCode::Unauthorized,
        AuthenticateError::Auth(AuthError::InvalidToken) => ErrorCode::InvalidToken,
        AuthenticateError::Auth(AuthError::TokenExpired) => ErrorCode::TokenExpired,
        AuthenticateError::IdentityMismatch => ErrorCode::Unauthorized,
        AuthenticateError::Repository(_) => ErrorCode::InternalServerError,
    }
}
