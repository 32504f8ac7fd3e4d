//! UseCase: Room 作成処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - CreateRoomUseCase::execute() メソッド
//! - ID 衝突時の再生成と、上限回数での打ち切り
//!
//! ### なぜこのテストが必要か
//! - 既存の Room が別の Room で上書きされてはならない
//! - 衝突が続いても無限ループしないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：一発で採番できる
//! - エッジケース：衝突後の再生成で採番できる
//! - 異常系：上限回数まで衝突し続ける
//! - 並行処理：同じ候補 ID を生成する作成要求が同時に走る

use std::sync::Arc;

use crate::domain::{
    Room, RoomId, RoomIdFactory, RoomRepository, Timestamp, UserId, ValueObjectError,
};

use super::error::CreateRoomError;

/// Room ID の生成関数
pub type RoomIdGenerator = Box<dyn Fn() -> Result<RoomId, ValueObjectError> + Send + Sync>;

/// Room ID 採番の既定の試行回数
pub const DEFAULT_MAX_ID_ATTEMPTS: u32 = 10;

/// Room 作成のユースケース
pub struct CreateRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    generate_id: RoomIdGenerator,
    max_attempts: u32,
}

impl CreateRoomUseCase {
    /// ランダムな Room ID を使う CreateRoomUseCase を作成
    pub fn new(rooms: Arc<dyn RoomRepository>, max_attempts: u32) -> Self {
        Self::with_generator(rooms, Box::new(RoomIdFactory::generate), max_attempts)
    }

    pub fn with_generator(
        rooms: Arc<dyn RoomRepository>,
        generate_id: RoomIdGenerator,
        max_attempts: u32,
    ) -> Self {
        Self {
            rooms,
            generate_id,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Room 作成を実行
    ///
    /// 作成者を最初の参加者とする Room を、未使用の ID で登録します。
    pub async fn execute(&self, creator: UserId) -> Result<Room, CreateRoomError> {
        for attempt in 1..=self.max_attempts {
            let room_id = match (self.generate_id)() {
                Ok(room_id) => room_id,
                Err(e) => {
                    tracing::warn!("Generated an invalid room id: {}", e);
                    continue;
                }
            };

            let room = Room::new(room_id, creator.clone(), Timestamp::now());
            if self.rooms.insert_if_absent(room.clone()).await? {
                tracing::info!("Room '{}' created by '{}'", room.id, creator);
                return Ok(room);
            }
            tracing::debug!(
                "Room id '{}' already taken (attempt {}/{})",
                room.id,
                attempt,
                self.max_attempts
            );
        }

        tracing::error!(
            "Gave up allocating a room id after {} attempts",
            self.max_attempts
        );
        Err(CreateRoomError::IdExhausted(self.max_attempts))
    }
}
