//! UseCase: メッセージ履歴取得処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - GetMessageHistoryUseCase::for_connection() / page() メソッド
//! - 保存済みの翻訳がメッセージに添付されること
//!
//! ### なぜこのテストが必要か
//! - Room に参加していない接続は履歴を読めない
//! - 件数の上限を超えた要求は上限に丸められる
//!
//! ### どのような状況を想定しているか
//! - 正常系：直近の履歴、ページ単位の履歴
//! - 異常系：未参加の接続、存在しない Room

use std::sync::Arc;

use crate::domain::{
    ChatMessage, ConnectionId, ConnectionRepository, MessageId, MessageRepository,
    RepositoryError, RoomId, RoomRepository, TranslatedMessage, TranslationRepository,
};

use super::error::HistoryError;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const MAX_HISTORY_LIMIT: usize = 200;

/// Attach every stored translation to each message, preserving order
pub async fn attach_translations(
    translations: &dyn TranslationRepository,
    messages: Vec<ChatMessage>,
) -> Result<Vec<TranslatedMessage>, RepositoryError> {
    let ids: Vec<MessageId> = messages.iter().map(|m| m.id.clone()).collect();
    let mut stored = translations.find_for_messages(&ids).await?;
    Ok(messages
        .into_iter()
        .map(|message| {
            let texts = stored.remove(&message.id).unwrap_or_default();
            TranslatedMessage::new(message, texts)
        })
        .collect())
}

/// 1 ページ分の履歴
#[derive(Debug, Clone)]
pub struct MessagePage {
    pub messages: Vec<TranslatedMessage>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

impl MessagePage {
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.limit.max(1))
    }
}

/// メッセージ履歴取得のユースケース
pub struct GetMessageHistoryUseCase {
    rooms: Arc<dyn RoomRepository>,
    messages: Arc<dyn MessageRepository>,
    translations: Arc<dyn TranslationRepository>,
    connections: Arc<dyn ConnectionRepository>,
}

impl GetMessageHistoryUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        messages: Arc<dyn MessageRepository>,
        translations: Arc<dyn TranslationRepository>,
        connections: Arc<dyn ConnectionRepository>,
    ) -> Self {
        Self {
            rooms,
            messages,
            translations,
            connections,
        }
    }

    /// 接続が参加中の Room の直近の履歴（古い順）
    pub async fn for_connection(
        &self,
        connection_id: &ConnectionId,
        limit: Option<usize>,
    ) -> Result<(RoomId, Vec<TranslatedMessage>), HistoryError> {
        let session = self
            .connections
            .get(connection_id)
            .await
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
        let room_id = session.room_id.ok_or(HistoryError::NotMember)?;

        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        let recent = self.messages.recent(&room_id, limit).await?;
        let messages = attach_translations(self.translations.as_ref(), recent).await?;
        Ok((room_id, messages))
    }

    /// Room の履歴をページ単位で取得（1 ページ目が最新）
    pub async fn page(
        &self,
        room_id: &RoomId,
        page: Option<usize>,
        limit: Option<usize>,
    ) -> Result<MessagePage, HistoryError> {
        if self.rooms.find(room_id).await?.is_none() {
            return Err(HistoryError::RoomNotFound(room_id.to_string()));
        }

        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        let (items, total) = self.messages.page(room_id, page, limit).await?;
        let messages = attach_translations(self.translations.as_ref(), items).await?;
        Ok(MessagePage {
            messages,
            page,
            limit,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            DisplayName, LanguageCode, MessageContent, NewMessage, Room, Session, Timestamp,
            Translation, UserId, UserIdentity,
        },
        infrastructure::repository::{
            InMemoryConnectionRepository, InMemoryMessageRepository, InMemoryRoomRepository,
            InMemoryTranslationRepository,
        },
    };
    use tokio::sync::mpsc;

    struct Fixture {
        rooms: Arc<InMemoryRoomRepository>,
        messages: Arc<InMemoryMessageRepository>,
        translations: Arc<InMemoryTranslationRepository>,
        connections: Arc<InMemoryConnectionRepository>,
        usecase: GetMessageHistoryUseCase,
    }

    fn fixture() -> Fixture {
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let messages = Arc::new(InMemoryMessageRepository::new());
        let translations = Arc::new(InMemoryTranslationRepository::new());
        let connections = Arc::new(InMemoryConnectionRepository::new());
        let usecase = GetMessageHistoryUseCase::new(
            rooms.clone(),
            messages.clone(),
            translations.clone(),
            connections.clone(),
        );
        Fixture {
            rooms,
            messages,
            translations,
            connections,
            usecase,
        }
    }

    fn room_id() -> RoomId {
        RoomId::new("123-456-789".to_string()).unwrap()
    }

    fn lang(code: &str) -> LanguageCode {
        LanguageCode::new(code.to_string()).unwrap()
    }

    fn session() -> Session {
        Session::new(
            ConnectionId::generate(),
            UserIdentity::new(
                UserId::new("alice".to_string()).unwrap(),
                DisplayName::new("Alice".to_string()).unwrap(),
                None,
            ),
            lang("en"),
            Timestamp::new(0),
        )
    }

    async fn seed(f: &Fixture, count: usize) -> Vec<ChatMessage> {
        f.rooms
            .insert_if_absent(Room::new(
                room_id(),
                UserId::new("alice".to_string()).unwrap(),
                Timestamp::new(0),
            ))
            .await
            .unwrap();
        let mut seeded = Vec::new();
        for i in 1..=count {
            let message = f
                .messages
                .append(NewMessage {
                    room_id: room_id(),
                    author_id: UserId::new("alice".to_string()).unwrap(),
                    author_name: DisplayName::new("Alice".to_string()).unwrap(),
                    content: MessageContent::new(format!("message {i}")).unwrap(),
                    source_language: lang("en"),
                })
                .await
                .unwrap();
            seeded.push(message);
        }
        seeded
    }

    #[tokio::test]
    async fn test_history_for_member_includes_translations() {
        // テスト項目: 参加中の接続は直近の履歴を翻訳付きで取得できる
        // given (前提条件):
        let f = fixture();
        let seeded = seed(&f, 3).await;
        f.translations
            .insert_if_absent(Translation::new(
                seeded[2].id.clone(),
                lang("es"),
                "mensaje 3".to_string(),
                Timestamp::new(0),
            ))
            .await
            .unwrap();
        let alice = session();
        let (tx, _rx) = mpsc::unbounded_channel();
        f.connections.register(alice.clone(), tx).await;
        f.connections
            .bind_room(&alice.id, room_id(), lang("en"))
            .await
            .unwrap();

        // when (操作):
        let (room, messages) = f.usecase.for_connection(&alice.id, Some(2)).await.unwrap();

        // then (期待する結果):
        assert_eq!(room, room_id());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message.content.as_str(), "message 2");
        assert!(messages[0].translations.is_empty());
        assert_eq!(messages[1].translations[&lang("es")], "mensaje 3");
    }

    #[tokio::test]
    async fn test_history_requires_membership() {
        // テスト項目: Room 未参加の接続は NotMember になる
        // given (前提条件):
        let f = fixture();
        let alice = session();
        let (tx, _rx) = mpsc::unbounded_channel();
        f.connections.register(alice.clone(), tx).await;

        // when (操作):
        let result = f.usecase.for_connection(&alice.id, None).await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), HistoryError::NotMember);
    }

    #[tokio::test]
    async fn test_page_metadata() {
        // テスト項目: ページ単位の取得で総件数と総ページ数が分かる
        // given (前提条件):
        let f = fixture();
        seed(&f, 5).await;

        // when (操作):
        let page = f.usecase.page(&room_id(), Some(1), Some(2)).await.unwrap();

        // then (期待する結果):
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages(), 3);
        let bodies: Vec<&str> = page
            .messages
            .iter()
            .map(|m| m.message.content.as_str())
            .collect();
        assert_eq!(bodies, vec!["message 4", "message 5"]);
    }

    #[tokio::test]
    async fn test_page_limit_is_clamped_and_unknown_room_fails() {
        // テスト項目: 上限を超える件数は丸められ、存在しない Room はエラー
        // given (前提条件):
        let f = fixture();
        seed(&f, 1).await;

        // when (操作):
        let page = f.usecase.page(&room_id(), None, Some(10_000)).await.unwrap();
        let missing = f
            .usecase
            .page(&RoomId::new("111-222-333".to_string()).unwrap(), None, None)
            .await;

        // then (期待する結果):
        assert_eq!(page.limit, MAX_HISTORY_LIMIT);
        assert_eq!(
            missing.unwrap_err(),
            HistoryError::RoomNotFound("111-222-333".to_string())
        );
    }
}
