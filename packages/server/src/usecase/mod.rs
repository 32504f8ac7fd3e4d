//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! UI 層から呼び出され、Domain 層を操作します。

pub mod authenticate;
pub mod broadcast;
pub mod change_language;
pub mod connect_participant;
pub mod create_room;
pub mod disconnect_participant;
pub mod error;
pub mod get_message_history;
pub mod join_room;
pub mod leave_room;
pub mod notify_translation;
pub mod process_translation;
pub mod send_message;
pub mod set_language;

pub use authenticate::AuthenticateUseCase;
pub use change_language::{ChangeLanguageUseCase, LanguageChange};
pub use connect_participant::ConnectParticipantUseCase;
pub use create_room::{CreateRoomUseCase, DEFAULT_MAX_ID_ATTEMPTS};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{
    AuthenticateError, ChangeLanguageError, CreateRoomError, HistoryError, JoinRoomError,
    SendMessageError,
};
pub use get_message_history::{GetMessageHistoryUseCase, MessagePage};
pub use join_room::{JoinRoomUseCase, RoomSnapshot};
pub use leave_room::LeaveRoomUseCase;
pub use notify_translation::NotifyTranslationUseCase;
pub use process_translation::ProcessTranslationUseCase;
pub use send_message::SendMessageUseCase;
pub use set_language::SetLanguageUseCase;
