//! UseCase: Room 参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - 参加者集合への追加、接続の紐付け、直近の履歴の取得、翻訳の後追い投入
//!
//! ### なぜこのテストが必要か
//! - 参加した時点で閲覧言語の翻訳が無いメッセージには、翻訳ジョブが投入される必要がある
//! - 原文が閲覧言語のメッセージ、翻訳済みのメッセージには投入してはならない
//! - 別の Room に参加中なら、先にその Room から退出する
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加と履歴の取得、後追い投入
//! - 異常系：存在しない Room、キューの障害（参加自体は成功する）
//! - エッジケース：別の Room からの移動

use std::sync::Arc;

use crate::domain::{
    ConnectionId, ConnectionRepository, JobOptions, JobQueue, LanguageCode, MessageRepository,
    RepositoryError, Room, RoomId, RoomRepository, TranslatedMessage, TranslationJob,
    TranslationRepository,
};

use super::{
    broadcast::{broadcast_to_room, presence_event},
    error::JoinRoomError,
    get_message_history::attach_translations,
};

/// 参加直後に接続へ返す Room の状態
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub room: Room,
    /// 接続の閲覧言語
    pub language: LanguageCode,
    /// 直近のメッセージ（古い順、保存済みの翻訳付き）
    pub messages: Vec<TranslatedMessage>,
    /// 後追いで投入した翻訳ジョブの数
    pub backfilled: usize,
}

/// Room 参加のユースケース
pub struct JoinRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    messages: Arc<dyn MessageRepository>,
    translations: Arc<dyn TranslationRepository>,
    connections: Arc<dyn ConnectionRepository>,
    queue: Arc<dyn JobQueue>,
    job_options: JobOptions,
    recent_limit: usize,
}

impl JoinRoomUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        messages: Arc<dyn MessageRepository>,
        translations: Arc<dyn TranslationRepository>,
        connections: Arc<dyn ConnectionRepository>,
        queue: Arc<dyn JobQueue>,
        job_options: JobOptions,
        recent_limit: usize,
    ) -> Self {
        Self {
            rooms,
            messages,
            translations,
            connections,
            queue,
            job_options,
            recent_limit,
        }
    }

    /// Room 参加を実行
    ///
    /// # Arguments
    ///
    /// * `connection_id` - 参加する接続
    /// * `room_id` - 参加先の Room
    /// * `language` - 閲覧言語。省略時は接続の現在の閲覧言語
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        language: Option<LanguageCode>,
    ) -> Result<RoomSnapshot, JoinRoomError> {
        let session = self
            .connections
            .get(connection_id)
            .await
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;

        // 1. 参加者集合に追加（Room が無ければここで失敗する）
        let room = self
            .rooms
            .add_participant(room_id, session.user.user_id.clone())
            .await?;

        // 2. 接続を Room に紐付け、別の Room に居たらそこから退出を通知
        let language = language.unwrap_or_else(|| session.language.clone());
        let previous = self
            .connections
            .bind_room(connection_id, room_id.clone(), language.clone())
            .await?;
        if let Some(previous) = previous.filter(|previous| previous != room_id) {
            let event = presence_event(&session, &previous, false);
            broadcast_to_room(self.connections.as_ref(), &previous, &event, |_| true).await;
            tracing::info!(
                "Connection '{}' moved from room '{}' to '{}'",
                connection_id,
                previous,
                room_id
            );
        }

        // 3. 直近の履歴を翻訳付きで取得
        let recent = self.messages.recent(room_id, self.recent_limit).await?;
        let messages = attach_translations(self.translations.as_ref(), recent).await?;

        // 4. 閲覧言語の翻訳が無いメッセージを後追いで投入
        let backfilled = backfill_translations(
            self.queue.as_ref(),
            self.job_options,
            &messages,
            &language,
        )
        .await;

        // 5. 参加を Room に通知
        let event = presence_event(&session, room_id, true);
        broadcast_to_room(self.connections.as_ref(), room_id, &event, |_| true).await;

        tracing::info!(
            "Connection '{}' joined room '{}' reading '{}' ({} message(s), {} backfilled)",
            connection_id,
            room_id,
            language,
            messages.len(),
            backfilled
        );

        Ok(RoomSnapshot {
            room,
            language,
            messages,
            backfilled,
        })
    }
}

/// 翻訳が不足しているメッセージのジョブを投入する。キューの失敗は記録のみ
pub(super) async fn backfill_translations<'a>(
    queue: &dyn JobQueue,
    options: JobOptions,
    messages: impl IntoIterator<Item = &'a TranslatedMessage>,
    language: &LanguageCode,
) -> usize {
    let mut enqueued = 0;
    for view in messages
        .into_iter()
        .filter(|view| view.needs_translation(language))
    {
        let job = TranslationJob::for_message(&view.message, language.clone());
        match queue.enqueue(job, options).await {
            Ok(job_id) => {
                enqueued += 1;
                tracing::debug!(
                    "Backfill job {} queued for message '{}' -> '{}'",
                    job_id,
                    view.message.id,
                    language
                );
            }
            Err(e) => tracing::error!(
                "Failed to queue backfill for message '{}' in room '{}': {}",
                view.message.id,
                view.message.room_id,
                e
            ),
        }
    }
    enqueued
}
