//! UseCase: Room 内での閲覧言語の切り替え処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ChangeLanguageUseCase::execute() メソッド
//! - 閲覧言語の更新と、直近のメッセージに対する翻訳の後追い投入
//!
//! ### なぜこのテストが必要か
//! - Room の途中で言語を切り替えた閲覧者にも、過去のメッセージの翻訳が届く必要がある
//! - 自分のメッセージ、原文が新しい言語のメッセージ、翻訳済みのメッセージには投入しない
//! - 後追いの対象は直近の一定件数に限られる
//!
//! ### どのような状況を想定しているか
//! - 正常系：切り替えと後追い投入
//! - 異常系：Room に参加していない接続
//! - エッジケース：直近の件数を超える履歴

use std::sync::Arc;

use crate::domain::{
    ConnectionId, ConnectionRepository, JobOptions, JobQueue, LanguageCode, MessageRepository,
    RepositoryError, RoomId, TranslationRepository,
};

use super::{
    error::ChangeLanguageError, get_message_history::attach_translations,
    join_room::backfill_translations,
};

/// 後追いの対象とする直近のメッセージ数
pub const LANGUAGE_CHANGE_BACKFILL_LIMIT: usize = 20;

/// 切り替え後の状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageChange {
    pub room_id: RoomId,
    pub language: LanguageCode,
    /// 後追いで投入した翻訳ジョブの数
    pub backfilled: usize,
}

/// Room 内での閲覧言語切り替えのユースケース
///
/// `SetLanguageUseCase` と異なり、参加中の Room の直近のメッセージのうち
/// 新しい言語の翻訳が無いものについて翻訳ジョブを投入します。
pub struct ChangeLanguageUseCase {
    messages: Arc<dyn MessageRepository>,
    translations: Arc<dyn TranslationRepository>,
    connections: Arc<dyn ConnectionRepository>,
    queue: Arc<dyn JobQueue>,
    job_options: JobOptions,
}

impl ChangeLanguageUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        translations: Arc<dyn TranslationRepository>,
        connections: Arc<dyn ConnectionRepository>,
        queue: Arc<dyn JobQueue>,
        job_options: JobOptions,
    ) -> Self {
        Self {
            messages,
            translations,
            connections,
            queue,
            job_options,
        }
    }

    /// 閲覧言語の切り替えを実行
    ///
    /// # Returns
    ///
    /// * `Ok(LanguageChange)` - 切り替え後の言語と後追いしたジョブ数
    /// * `Err(ChangeLanguageError::NotMember)` - 接続が Room に参加していない（言語も変更しない）
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        language: LanguageCode,
    ) -> Result<LanguageChange, ChangeLanguageError> {
        let session = self
            .connections
            .get(connection_id)
            .await
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
        let room_id = session.room_id.ok_or(ChangeLanguageError::NotMember)?;

        self.connections
            .set_language(connection_id, language.clone())
            .await?;

        let recent = self
            .messages
            .recent(&room_id, LANGUAGE_CHANGE_BACKFILL_LIMIT)
            .await?;
        let messages = attach_translations(self.translations.as_ref(), recent).await?;
        let reader = &session.user.user_id;
        let backfilled = backfill_translations(
            self.queue.as_ref(),
            self.job_options,
            messages
                .iter()
                .filter(|view| &view.message.author_id != reader)
                .collect::<Vec<_>>(),
            &language,
        )
        .await;

        tracing::info!(
            "Connection '{}' switched to '{}' in room '{}' ({} backfilled)",
            connection_id,
            language,
            room_id,
            backfilled
        );
        Ok(LanguageChange {
            room_id,
            language,
            backfilled,
        })
    }
}
