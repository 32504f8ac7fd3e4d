//! UseCase: 翻訳完了の配信処理
//!
//! 完成した翻訳を、その Room でその言語を閲覧中の接続だけに配信します。
//! 同一プロセス内では、このユースケース自体が CompletionNotifier として
//! 翻訳ワーカーから直接呼ばれます。

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{
        CompletionNotifier, ConnectionRepository, LanguageCode, MessageId, NotificationError,
        RoomId,
    },
    infrastructure::dto::websocket::ServerEvent,
};

use super::broadcast::broadcast_to_room;

/// 翻訳完了配信のユースケース
pub struct NotifyTranslationUseCase {
    connections: Arc<dyn ConnectionRepository>,
}

impl NotifyTranslationUseCase {
    pub fn new(connections: Arc<dyn ConnectionRepository>) -> Self {
        Self { connections }
    }

    /// `translation_available` を配信する
    ///
    /// # Returns
    ///
    /// 配信した接続の数（閲覧者がいなければ 0）
    pub async fn execute(
        &self,
        message_id: &MessageId,
        room_id: &RoomId,
        language: &LanguageCode,
        text: &str,
    ) -> usize {
        let event = ServerEvent::TranslationAvailable {
            message_id: message_id.to_string(),
            room_id: room_id.to_string(),
            language: language.to_string(),
            text: text.to_string(),
        };
        let delivered = broadcast_to_room(self.connections.as_ref(), room_id, &event, |s| {
            &s.language == language
        })
        .await;
        tracing::debug!(
            "Translation of '{}' into '{}' delivered to {} viewer(s) in room '{}'",
            message_id,
            language,
            delivered,
            room_id
        );
        delivered
    }
}

#[async_trait]
impl CompletionNotifier for NotifyTranslationUseCase {
    async fn notify(
        &self,
        message_id: &MessageId,
        room_id: &RoomId,
        target_language: &LanguageCode,
        text: &str,
    ) -> Result<(), NotificationError> {
        self.execute(message_id, room_id, target_language, text)
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionId, DisplayName, Session, Timestamp, UserId, UserIdentity},
        infrastructure::repository::InMemoryConnectionRepository,
    };
    use tokio::sync::mpsc;

    fn lang(code: &str) -> LanguageCode {
        LanguageCode::new(code.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_notify_reaches_only_matching_viewers() {
        // テスト項目: 翻訳はその言語を閲覧中の接続にだけ届く
        // given (前提条件):
        let connections = Arc::new(InMemoryConnectionRepository::new());
        let room = RoomId::new("123-456-789".to_string()).unwrap();
        let mut receivers = Vec::new();
        for (user, language) in [("alice", "en"), ("bob", "es"), ("carol", "es")] {
            let session = Session::new(
                ConnectionId::generate(),
                UserIdentity::new(
                    UserId::new(user.to_string()).unwrap(),
                    DisplayName::new(user.to_string()).unwrap(),
                    None,
                ),
                lang(language),
                Timestamp::new(0),
            );
            let (tx, rx) = mpsc::unbounded_channel();
            connections.register(session.clone(), tx).await;
            connections
                .bind_room(&session.id, room.clone(), lang(language))
                .await
                .unwrap();
            receivers.push(rx);
        }
        let usecase = NotifyTranslationUseCase::new(connections);
        let message_id = MessageId::generate();

        // when (操作):
        usecase
            .notify(&message_id, &room, &lang("es"), "Hola")
            .await
            .unwrap();

        // then (期待する結果):
        assert!(receivers[0].try_recv().is_err());
        for rx in receivers.iter_mut().skip(1) {
            let event: serde_json::Value =
                serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(event["event"], "translation_available");
            assert_eq!(event["message_id"], message_id.as_str());
            assert_eq!(event["language"], "es");
            assert_eq!(event["text"], "Hola");
        }
    }

    #[tokio::test]
    async fn test_notify_without_viewers() {
        // テスト項目: 閲覧者がいなくても失敗しない
        // given (前提条件):
        let usecase = NotifyTranslationUseCase::new(Arc::new(InMemoryConnectionRepository::new()));

        // when (操作):
        let delivered = usecase
            .execute(
                &MessageId::generate(),
                &RoomId::new("123-456-789".to_string()).unwrap(),
                &lang("es"),
                "Hola",
            )
            .await;

        // then (期待する結果):
        assert_eq!(delivered, 0);
    }
}
