//! UseCase: 翻訳ジョブの処理（ワーカー）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ProcessTranslationUseCase::handle() メソッド
//! - 同一言語の近道、保存済み翻訳の再利用、翻訳・保存・通知
//!
//! ### なぜこのテストが必要か
//! - 同じジョブが重複配信されても翻訳エンジンの呼び出しは 1 回で、保存される翻訳も 1 件
//! - 翻訳の失敗・タイムアウト・空の結果では何も保存せず、キューに再試行させる
//! - 通知の失敗は保存済みの翻訳を取り消さない
//!
//! ### どのような状況を想定しているか
//! - 正常系：翻訳して保存・通知
//! - エッジケース：同一言語、既に翻訳済み、同時実行で先を越された
//! - 並行処理：複数ワーカーのキューに同じジョブが重複して投入された
//! - 異常系：翻訳エラー、タイムアウト、空の結果、通知失敗

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::domain::{
    CompletionNotifier, JobError, JobHandler, Timestamp, Translation, TranslationJob,
    TranslationRepository, Translator,
};

/// 翻訳ジョブ処理のユースケース
pub struct ProcessTranslationUseCase {
    translations: Arc<dyn TranslationRepository>,
    translator: Arc<dyn Translator>,
    notifier: Arc<dyn CompletionNotifier>,
    translate_timeout: Duration,
}

impl ProcessTranslationUseCase {
    pub fn new(
        translations: Arc<dyn TranslationRepository>,
        translator: Arc<dyn Translator>,
        notifier: Arc<dyn CompletionNotifier>,
        translate_timeout: Duration,
    ) -> Self {
        Self {
            translations,
            translator,
            notifier,
            translate_timeout,
        }
    }

    /// ジョブを処理する。重複配信に対して冪等
    pub async fn execute(&self, job: &TranslationJob) -> Result<(), JobError> {
        // 1. 同一言語: 翻訳エンジンを呼ばずに原文を保存
        if job.is_same_language() {
            let stored = self
                .store(job, job.body.as_str().to_string())
                .await?;
            self.notify(job, &stored).await;
            return Ok(());
        }

        // 2. 保存済みならそれを通知して終わり
        let existing = self
            .translations
            .find(&job.message_id, &job.target_language)
            .await
            .map_err(|e| JobError(e.to_string()))?;
        if let Some(existing) = existing {
            tracing::debug!(
                "Message '{}' already translated into '{}'",
                job.message_id,
                job.target_language
            );
            self.notify(job, &existing.text).await;
            return Ok(());
        }

        // 3. 翻訳（時間制限付き）
        let translated = tokio::time::timeout(
            self.translate_timeout,
            self.translator
                .translate(job.body.as_str(), &job.source_language, &job.target_language),
        )
        .await
        .map_err(|_| {
            JobError(format!(
                "translation timed out after {:?}",
                self.translate_timeout
            ))
        })?
        .map_err(|e| JobError(e.to_string()))?;

        if translated.trim().is_empty() {
            return Err(JobError("translator returned empty text".to_string()));
        }

        // 4. 保存（既に行があればそちらが正）して通知
        let stored = self.store(job, translated).await?;
        self.notify(job, &stored).await;
        Ok(())
    }

    /// 存在しなければ保存し、ストアが保持している本文を返す
    async fn store(&self, job: &TranslationJob, text: String) -> Result<String, JobError> {
        let write = self
            .translations
            .insert_if_absent(Translation::new(
                job.message_id.clone(),
                job.target_language.clone(),
                text,
                Timestamp::now(),
            ))
            .await
            .map_err(|e| JobError(e.to_string()))?;

        if write.was_inserted() {
            tracing::info!(
                "Stored translation of '{}' into '{}'",
                job.message_id,
                job.target_language
            );
        } else {
            tracing::debug!(
                "Translation of '{}' into '{}' was stored concurrently; keeping the existing row",
                job.message_id,
                job.target_language
            );
        }
        Ok(write.into_translation().text)
    }

    async fn notify(&self, job: &TranslationJob, text: &str) {
        if let Err(e) = self
            .notifier
            .notify(&job.message_id, &job.room_id, &job.target_language, text)
            .await
        {
            tracing::warn!(
                "Failed to notify translation of '{}' into '{}' for room '{}': {}",
                job.message_id,
                job.target_language,
                job.room_id,
                e
            );
        }
    }
}

#[async_trait]
impl JobHandler for ProcessTranslationUseCase {
    async fn handle(&self, job: &TranslationJob) -> Result<(), JobError> {
        self.execute(job).await
    }
}
