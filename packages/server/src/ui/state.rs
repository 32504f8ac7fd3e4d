//! Server state shared by every handler.

use serde::Deserialize;
use std::{sync::Arc, time::Duration};

use crate::{
    domain::{ConnectionRepository, JobOptions, JobQueue, RoomRepository},
    usecase::{
        AuthenticateUseCase, ChangeLanguageUseCase, ConnectParticipantUseCase, CreateRoomUseCase,
        DisconnectParticipantUseCase, GetMessageHistoryUseCase, JoinRoomUseCase,
        LeaveRoomUseCase, NotifyTranslationUseCase, SendMessageUseCase, SetLanguageUseCase,
    },
};

/// Query parameters for WebSocket connection
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    /// Credential passed during the handshake. Optional: a socket without one
    /// must send `authenticate` first.
    pub token: Option<String>,
}

/// Shared application state
pub struct AppState {
    /// Repository（データアクセス層の抽象化）
    pub rooms: Arc<dyn RoomRepository>,
    /// 接続レジストリ（WebSocket の送信チャンネルを保持）
    pub connections: Arc<dyn ConnectionRepository>,
    /// 翻訳ジョブの待ち行列
    pub queue: Arc<dyn JobQueue>,
    /// 外部から投入されるジョブの再試行設定
    pub job_options: JobOptions,

    pub authenticate: AuthenticateUseCase,
    pub connect: ConnectParticipantUseCase,
    pub disconnect: DisconnectParticipantUseCase,
    pub create_room: CreateRoomUseCase,
    pub join_room: JoinRoomUseCase,
    pub leave_room: LeaveRoomUseCase,
    pub set_language: SetLanguageUseCase,
    pub change_language: ChangeLanguageUseCase,
    pub send_message: SendMessageUseCase,
    pub history: GetMessageHistoryUseCase,
    pub notify_translation: Arc<NotifyTranslationUseCase>,

    /// How long an unauthenticated socket may wait before sending `authenticate`
    pub auth_grace: Duration,
}
