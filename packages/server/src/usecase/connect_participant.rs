//! UseCase: 接続登録処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - 認証済みの接続を Session としてレジストリに登録する処理
//!
//! ### なぜこのテストが必要か
//! - 同じユーザーが複数の接続（タブ）を持てることを保証
//! - 新しい接続は Room に未参加で、既定の閲覧言語を持つ
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規接続の登録
//! - エッジケース：同じユーザーの 2 本目の接続

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::domain::{
    ConnectionId, ConnectionRepository, LanguageCode, Session, Timestamp, UserIdentity,
};

/// 接続登録のユースケース
pub struct ConnectParticipantUseCase {
    /// Repository（データアクセス層の抽象化）
    connections: Arc<dyn ConnectionRepository>,
    /// 新しい接続の閲覧言語
    default_language: LanguageCode,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(connections: Arc<dyn ConnectionRepository>, default_language: LanguageCode) -> Self {
        Self {
            connections,
            default_language,
        }
    }

    /// 接続登録を実行
    ///
    /// # Arguments
    ///
    /// * `user` - 認証済みの ID
    /// * `sender` - この接続へのメッセージ送信チャンネル
    ///
    /// # Returns
    ///
    /// 登録された Session
    pub async fn execute(&self, user: UserIdentity, sender: UnboundedSender<String>) -> Session {
        let session = Session::new(
            ConnectionId::generate(),
            user,
            self.default_language.clone(),
            Timestamp::now(),
        );
        self.connections.register(session.clone(), sender).await;
        tracing::info!(
            "Connection '{}' registered for user '{}'",
            session.id,
            session.user.user_id
        );
        session
    }
}
