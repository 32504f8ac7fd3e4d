//! UseCase 層のエラー定義
//!
//! ユースケースごとに 1 つのエラー型を持ちます。
//! UI 層はこれをクライアント向けのエラーコードに変換します。

use thiserror::Error;

use crate::domain::{AuthError, RepositoryError};

/// 認証・トークン更新のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthenticateError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// 接続中に別ユーザーのトークンで更新しようとした
    #[error("Token belongs to a different user")]
    IdentityMismatch,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Room 作成のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CreateRoomError {
    /// 衝突しない Room ID を上限回数内に生成できなかった
    #[error("Could not allocate a unique room id after {0} attempts")]
    IdExhausted(u32),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Room 参加のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinRoomError {
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for JoinRoomError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::RoomNotFound(id) => Self::RoomNotFound(id),
            other => Self::Repository(other),
        }
    }
}

/// メッセージ送信のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendMessageError {
    /// 接続が Room に参加していない、または別の Room を指定した
    #[error("Connection is not a member of the room")]
    NotMember,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// メッセージ履歴取得のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Connection is not a member of the room")]
    NotMember,

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 閲覧言語切り替え（翻訳の後追い付き）のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChangeLanguageError {
    /// 接続が Room に参加していない
    #[error("Connection is not in a room")]
    NotMember,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
