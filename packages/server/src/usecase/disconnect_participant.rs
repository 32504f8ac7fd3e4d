//! UseCase: 切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - 接続のレジストリからの削除と、Room への退出通知
//!
//! ### なぜこのテストが必要か
//! - 切断しても Room の参加者集合からユーザーは消えない（再参加できる）
//! - 同じ Room に残っている接続には user_left が届く
//!
//! ### どのような状況を想定しているか
//! - 正常系：Room 参加中の接続の切断
//! - エッジケース：Room 未参加の接続、既に削除済みの接続

use std::sync::Arc;

use crate::domain::{ConnectionId, ConnectionRepository, Session};

use super::broadcast::{broadcast_to_room, presence_event};

/// 切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// Repository（データアクセス層の抽象化）
    connections: Arc<dyn ConnectionRepository>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(connections: Arc<dyn ConnectionRepository>) -> Self {
        Self { connections }
    }

    /// 切断を実行
    ///
    /// # Returns
    ///
    /// 削除された接続の最後の Session（未登録なら None）
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<Session> {
        let session = self.connections.unregister(connection_id).await?;

        if let Some(room_id) = &session.room_id {
            let event = presence_event(&session, room_id, false);
            let notified =
                broadcast_to_room(self.connections.as_ref(), room_id, &event, |_| true).await;
            tracing::info!(
                "Connection '{}' left room '{}' on disconnect ({} notified)",
                connection_id,
                room_id,
                notified
            );
        }

        tracing::info!(
            "Connection '{}' removed from registry ({} remaining)",
            connection_id,
            self.connections.count().await
        );
        Some(session)
    }
}
