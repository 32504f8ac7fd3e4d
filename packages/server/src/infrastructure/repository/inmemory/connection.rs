//! InMemory Connection Repository 実装
//!
//! 接続中の WebSocket ごとに Session と送信用チャネルを保持します。
//! このレジストリはプロセス内にしか存在せず、再起動で失われます。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc::UnboundedSender};

use crate::domain::{
    ConnectionId, ConnectionRepository, LanguageCode, RepositoryError, RoomId, Session,
    UserIdentity,
};

/// 接続ごとの状態と送信チャネル
struct ConnectionEntry {
    session: Session,
    sender: UnboundedSender<String>,
}

/// インメモリ Connection Repository 実装
#[derive(Default)]
pub struct InMemoryConnectionRepository {
    /// ConnectionId → 接続情報（WebSocket sender を含む）
    connections: Arc<Mutex<HashMap<ConnectionId, ConnectionEntry>>>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn register(&self, session: Session, sender: UnboundedSender<String>) {
        let mut connections = self.connections.lock().await;
        connections.insert(session.id.clone(), ConnectionEntry { session, sender });
    }

    async fn unregister(&self, connection_id: &ConnectionId) -> Option<Session> {
        let mut connections = self.connections.lock().await;
        connections.remove(connection_id).map(|entry| entry.session)
    }

    async fn get(&self, connection_id: &ConnectionId) -> Option<Session> {
        let connections = self.connections.lock().await;
        connections
            .get(connection_id)
            .map(|entry| entry.session.clone())
    }

    async fn update_identity(
        &self,
        connection_id: &ConnectionId,
        user: UserIdentity,
    ) -> Result<(), RepositoryError> {
        let mut connections = self.connections.lock().await;
        let entry = connections
            .get_mut(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
        entry.session.user = user;
        Ok(())
    }

    async fn bind_room(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        language: LanguageCode,
    ) -> Result<Option<RoomId>, RepositoryError> {
        let mut connections = self.connections.lock().await;
        let entry = connections
            .get_mut(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
        entry.session.language = language;
        Ok(entry.session.room_id.replace(room_id))
    }

    async fn unbind_room(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<Option<RoomId>, RepositoryError> {
        let mut connections = self.connections.lock().await;
        let entry = connections
            .get_mut(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
        Ok(entry.session.room_id.take())
    }

    async fn set_language(
        &self,
        connection_id: &ConnectionId,
        language: LanguageCode,
    ) -> Result<(), RepositoryError> {
        let mut connections = self.connections.lock().await;
        let entry = connections
            .get_mut(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
        entry.session.language = language;
        Ok(())
    }

    async fn sessions_in_room(&self, room_id: &RoomId) -> Vec<Session> {
        let connections = self.connections.lock().await;
        connections
            .values()
            .filter(|entry| entry.session.is_in_room(room_id))
            .map(|entry| entry.session.clone())
            .collect()
    }

    async fn push(
        &self,
        connection_id: &ConnectionId,
        payload: String,
    ) -> Result<(), RepositoryError> {
        let connections = self.connections.lock().await;
        let entry = connections
            .get(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
        entry
            .sender
            .send(payload)
            .map_err(|_| RepositoryError::ConnectionClosed(connection_id.to_string()))
    }

    async fn count(&self) -> usize {
        let connections = self.connections.lock().await;
        connections.len()
    }
}
