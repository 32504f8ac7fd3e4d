//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! ID の重複チェックと挿入は同じロックの中で行うため、
//! 同時に作成要求が来ても同じ RoomId が 2 回登録されることはありません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, Room, RoomId, RoomRepository, UserId};

/// インメモリ Room Repository 実装
#[derive(Default)]
pub struct InMemoryRoomRepository {
    /// RoomId → Room
    rooms: Arc<Mutex<HashMap<RoomId, Room>>>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn insert_if_absent(&self, room: Room) -> Result<bool, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        if rooms.contains_key(&room.id) {
            return Ok(false);
        }
        rooms.insert(room.id.clone(), room);
        Ok(true)
    }

    async fn find(&self, room_id: &RoomId) -> Result<Option<Room>, RepositoryError> {
        let rooms = self.rooms.lock().await;
        Ok(rooms.get(room_id).cloned())
    }

    async fn add_participant(
        &self,
        room_id: &RoomId,
        user_id: UserId,
    ) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .filter(|room| room.is_active)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.to_string()))?;
        room.add_participant(user_id);
        Ok(room.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timestamp;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - InMemoryRoomRepository の作成・検索・参加者追加
    // - ID 衝突時に既存 Room が上書きされないこと
    //
    // 【なぜこのテストが必要か】
    // - Room ID の一意性はこの Repository の原子的な挿入で保証している
    // - 参加者集合は接続とは独立した永続的な属性である
    // ========================================

    fn room_id(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find_room() {
        // テスト項目: 作成した Room を ID で取得できる
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let room = Room::new(room_id("123-456-789"), user("alice"), Timestamp::new(0));

        // when (操作):
        let inserted = repo.insert_if_absent(room).await.unwrap();

        // then (期待する結果):
        assert!(inserted);
        let found = repo.find(&room_id("123-456-789")).await.unwrap();
        assert!(found.is_some());
        assert!(found.unwrap().has_participant(&user("alice")));
    }

    #[tokio::test]
    async fn test_insert_collision_keeps_existing_room() {
        // テスト項目: 同じ ID の Room は挿入されず、既存の Room が残る
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        repo.insert_if_absent(Room::new(
            room_id("123-456-789"),
            user("alice"),
            Timestamp::new(0),
        ))
        .await
        .unwrap();

        // when (操作):
        let inserted = repo
            .insert_if_absent(Room::new(
                room_id("123-456-789"),
                user("mallory"),
                Timestamp::new(1),
            ))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(!inserted);
        let room = repo.find(&room_id("123-456-789")).await.unwrap().unwrap();
        assert!(room.has_participant(&user("alice")));
        assert!(!room.has_participant(&user("mallory")));
    }

    #[tokio::test]
    async fn test_find_nonexistent_room() {
        // テスト項目: 存在しない Room は None が返される
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();

        // when (操作):
        let found = repo.find(&room_id("999-999-999")).await.unwrap();

        // then (期待する結果):
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_add_participant_is_union() {
        // テスト項目: 参加者追加は冪等な和集合として動作する
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        repo.insert_if_absent(Room::new(
            room_id("123-456-789"),
            user("alice"),
            Timestamp::new(0),
        ))
        .await
        .unwrap();

        // when (操作):
        repo.add_participant(&room_id("123-456-789"), user("bob"))
            .await
            .unwrap();
        let room = repo
            .add_participant(&room_id("123-456-789"), user("bob"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(room.participants.len(), 2);
        assert!(room.has_participant(&user("bob")));
    }

    #[tokio::test]
    async fn test_add_participant_to_nonexistent_room() {
        // テスト項目: 存在しない Room への参加者追加はエラーになる
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();

        // when (操作):
        let result = repo
            .add_participant(&room_id("111-222-333"), user("bob"))
            .await;

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            RepositoryError::RoomNotFound("111-222-333".to_string())
        );
    }
}
