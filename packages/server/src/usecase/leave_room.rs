//! UseCase: Room 退出処理

use std::sync::Arc;

use crate::domain::{ConnectionId, ConnectionRepository, RepositoryError, RoomId};

use super::broadcast::{broadcast_to_room, presence_event};

/// Room 退出のユースケース
pub struct LeaveRoomUseCase {
    connections: Arc<dyn ConnectionRepository>,
}

impl LeaveRoomUseCase {
    pub fn new(connections: Arc<dyn ConnectionRepository>) -> Self {
        Self { connections }
    }

    /// 接続を Room から外す。Room 未参加なら何もしない
    ///
    /// ユーザーは Room の参加者集合に残り、後から再参加できます。
    ///
    /// # Returns
    ///
    /// 退出した Room（未参加だった場合は None）
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<Option<RoomId>, RepositoryError> {
        let session = self
            .connections
            .get(connection_id)
            .await
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;

        let Some(room_id) = self.connections.unbind_room(connection_id).await? else {
            return Ok(None);
        };

        let event = presence_event(&session, &room_id, false);
        broadcast_to_room(self.connections.as_ref(), &room_id, &event, |_| true).await;
        tracing::info!("Connection '{}' left room '{}'", connection_id, room_id);
        Ok(Some(room_id))
    }
}
