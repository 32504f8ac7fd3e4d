//! InMemory Message Repository 実装
//!
//! Room ごとにメッセージを作成順の Vec で保持する追記専用ストア。
//! メッセージ ID と作成時刻はここで採番します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ChatMessage, MessageId, MessageRepository, NewMessage, RepositoryError, RoomId, Timestamp,
};

#[derive(Default)]
struct MessageStore {
    /// RoomId → 作成順のメッセージ
    by_room: HashMap<RoomId, Vec<ChatMessage>>,
    /// MessageId → (RoomId, by_room 内の位置)
    index: HashMap<MessageId, (RoomId, usize)>,
}

/// インメモリ Message Repository 実装
#[derive(Default)]
pub struct InMemoryMessageRepository {
    store: Arc<Mutex<MessageStore>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(&self, message: NewMessage) -> Result<ChatMessage, RepositoryError> {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;
        let room_messages = store.by_room.entry(message.room_id.clone()).or_default();

        // 同じ Room 内では作成時刻が逆行しないようにする
        let now = Timestamp::now();
        let created_at = room_messages
            .last()
            .map(|last| last.created_at.max(now))
            .unwrap_or(now);

        let id = MessageId::generate();
        let persisted = ChatMessage::from_new(id.clone(), message, created_at);
        let position = room_messages.len();
        room_messages.push(persisted.clone());
        store
            .index
            .insert(id, (persisted.room_id.clone(), position));

        Ok(persisted)
    }

    async fn find(&self, message_id: &MessageId) -> Result<Option<ChatMessage>, RepositoryError> {
        let store = self.store.lock().await;
        Ok(store.index.get(message_id).and_then(|(room_id, position)| {
            store
                .by_room
                .get(room_id)
                .and_then(|messages| messages.get(*position))
                .cloned()
        }))
    }

    async fn recent(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let store = self.store.lock().await;
        let messages = store.by_room.get(room_id).map(Vec::as_slice).unwrap_or(&[]);
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }

    async fn page(
        &self,
        room_id: &RoomId,
        page: usize,
        per_page: usize,
    ) -> Result<(Vec<ChatMessage>, usize), RepositoryError> {
        let store = self.store.lock().await;
        let messages = store.by_room.get(room_id).map(Vec::as_slice).unwrap_or(&[]);
        let total = messages.len();

        // page は 1 始まり。新しいメッセージから数えてページを切り出す
        let skip = page.saturating_sub(1).saturating_mul(per_page);
        let end = total.saturating_sub(skip);
        let start = end.saturating_sub(per_page);
        Ok((messages[start..end].to_vec(), total))
    }
}
