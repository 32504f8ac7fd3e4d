//! UseCase: 閲覧言語の変更処理

use std::sync::Arc;

use crate::domain::{ConnectionId, ConnectionRepository, LanguageCode, RepositoryError};

/// 閲覧言語変更のユースケース
///
/// 接続ローカルな状態の変更のみで、通知や翻訳ジョブの投入は行いません。
/// 変更後に送信されたメッセージから、新しい言語が翻訳対象に含まれます。
pub struct SetLanguageUseCase {
    connections: Arc<dyn ConnectionRepository>,
}

impl SetLanguageUseCase {
    pub fn new(connections: Arc<dyn ConnectionRepository>) -> Self {
        Self { connections }
    }

    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        language: LanguageCode,
    ) -> Result<(), RepositoryError> {
        self.connections
            .set_language(connection_id, language.clone())
            .await?;
        tracing::debug!("Connection '{}' now reads '{}'", connection_id, language);
        Ok(())
    }
}
