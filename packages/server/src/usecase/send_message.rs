//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 保存 → 配信 → 翻訳対象言語の算出 → ジョブ投入 の順序
//! - target_languages() の算出規則
//!
//! ### なぜこのテストが必要か
//! - メッセージの配信は翻訳を待たない（キューの障害でも送信は成功する）
//! - 翻訳ジョブは原文と異なる言語ごとに 1 件だけ投入される
//! - Room に参加していない接続からは送信できない
//!
//! ### どのような状況を想定しているか
//! - 正常系：送信と配信、言語ごとのジョブ投入
//! - 異常系：未参加の接続、別の Room の指定、キューの障害
//! - エッジケース：全員が原文と同じ言語（ジョブなし）

use std::{collections::BTreeSet, sync::Arc};

use crate::{
    domain::{
        ChatMessage, ConnectionId, ConnectionRepository, JobOptions, JobQueue, LanguageCode,
        MessageContent, MessageRepository, NewMessage, RepositoryError, RoomId, Session,
        TranslationJob,
    },
    infrastructure::dto::{MessageDto, websocket::ServerEvent},
};

use super::{broadcast::broadcast_to_room, error::SendMessageError};

/// 原文の言語を除いた、接続中の閲覧言語の集合
pub fn target_languages(sessions: &[Session], source: &LanguageCode) -> BTreeSet<LanguageCode> {
    sessions
        .iter()
        .map(|session| &session.language)
        .filter(|language| *language != source)
        .cloned()
        .collect()
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    messages: Arc<dyn MessageRepository>,
    connections: Arc<dyn ConnectionRepository>,
    queue: Arc<dyn JobQueue>,
    job_options: JobOptions,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        connections: Arc<dyn ConnectionRepository>,
        queue: Arc<dyn JobQueue>,
        job_options: JobOptions,
    ) -> Self {
        Self {
            messages,
            connections,
            queue,
            job_options,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `connection_id` - 送信元の接続
    /// * `room_id` - 送信先の Room。指定する場合は接続が参加中の Room と一致すること
    /// * `content` - メッセージ本文
    /// * `language` - 原文の言語。省略時は接続の閲覧言語
    ///
    /// # Returns
    ///
    /// * `Ok(ChatMessage)` - 保存・配信済みのメッセージ
    /// * `Err(SendMessageError)` - 送信失敗（この場合は配信も行われない）
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        room_id: Option<RoomId>,
        content: MessageContent,
        language: Option<LanguageCode>,
    ) -> Result<ChatMessage, SendMessageError> {
        let session = self
            .connections
            .get(connection_id)
            .await
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;

        let bound = session.room_id.clone().ok_or(SendMessageError::NotMember)?;
        if room_id.is_some_and(|requested| requested != bound) {
            return Err(SendMessageError::NotMember);
        }

        // 1. 保存（ID はストアが採番する）
        let source_language = language.unwrap_or_else(|| session.language.clone());
        let message = self
            .messages
            .append(NewMessage {
                room_id: bound.clone(),
                author_id: session.user.user_id.clone(),
                author_name: session.user.display_name.clone(),
                content,
                source_language: source_language.clone(),
            })
            .await?;

        // 2. 保存したメッセージをそのまま Room 全体に配信（送信者を含む）
        let event = ServerEvent::MessageReceived {
            message: MessageDto::from(&message),
        };
        let delivered =
            broadcast_to_room(self.connections.as_ref(), &bound, &event, |_| true).await;

        // 3. 翻訳対象言語を算出してジョブを投入
        let sessions = self.connections.sessions_in_room(&bound).await;
        let targets = target_languages(&sessions, &source_language);
        for target in targets {
            let job = TranslationJob::for_message(&message, target.clone());
            match self.queue.enqueue(job, self.job_options).await {
                Ok(job_id) => tracing::debug!(
                    "Translation job {} queued for message '{}' -> '{}'",
                    job_id,
                    message.id,
                    target
                ),
                Err(e) => tracing::error!(
                    "Failed to queue translation of message '{}' in room '{}' -> '{}': {}",
                    message.id,
                    bound,
                    target,
                    e
                ),
            }
        }

        tracing::info!(
            "Message '{}' from '{}' delivered to {} connection(s) in room '{}'",
            message.id,
            message.author_id,
            delivered,
            bound
        );
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            DisplayName, JobId, MockJobQueue, QueueError, Timestamp, UserId, UserIdentity,
        },
        infrastructure::repository::{InMemoryConnectionRepository, InMemoryMessageRepository},
    };
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    fn lang(code: &str) -> LanguageCode {
        LanguageCode::new(code.to_string()).unwrap()
    }

    fn room_id(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn session(user: &str, language: &str) -> Session {
        Session::new(
            ConnectionId::generate(),
            UserIdentity::new(
                UserId::new(user.to_string()).unwrap(),
                DisplayName::new(user.to_string()).unwrap(),
                None,
            ),
            lang(language),
            Timestamp::new(0),
        )
    }

    struct Fixture {
        messages: Arc<InMemoryMessageRepository>,
        connections: Arc<InMemoryConnectionRepository>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                messages: Arc::new(InMemoryMessageRepository::new()),
                connections: Arc::new(InMemoryConnectionRepository::new()),
            }
        }

        fn usecase(&self, queue: MockJobQueue) -> SendMessageUseCase {
            SendMessageUseCase::new(
                self.messages.clone(),
                self.connections.clone(),
                Arc::new(queue),
                JobOptions::default(),
            )
        }

        /// 接続を登録し、room があれば紐付ける
        async fn join(
            &self,
            user: &str,
            language: &str,
            room: Option<&RoomId>,
        ) -> (Session, mpsc::UnboundedReceiver<String>) {
            let s = session(user, language);
            let (tx, rx) = mpsc::unbounded_channel();
            self.connections.register(s.clone(), tx).await;
            if let Some(room) = room {
                self.connections
                    .bind_room(&s.id, room.clone(), lang(language))
                    .await
                    .unwrap();
            }
            (s, rx)
        }
    }

    fn recording_queue() -> (MockJobQueue, Arc<Mutex<Vec<TranslationJob>>>) {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = recorded.clone();
        let mut queue = MockJobQueue::new();
        queue.expect_enqueue().returning(move |job, _| {
            let mut jobs = sink.lock().unwrap();
            jobs.push(job);
            Ok(JobId::new(jobs.len() as u64))
        });
        (queue, recorded)
    }

    #[test]
    fn test_target_languages_excludes_source_and_dedups() {
        // テスト項目: 原文の言語を除き、同じ言語は 1 つにまとめられる
        // given (前提条件):
        let sessions = vec![
            session("alice", "en"),
            session("bob", "es"),
            session("carol", "es"),
            session("dave", "fr"),
        ];

        // when (操作):
        let targets = target_languages(&sessions, &lang("en"));

        // then (期待する結果):
        assert_eq!(targets, BTreeSet::from([lang("es"), lang("fr")]));
    }

    #[test]
    fn test_target_languages_empty_when_all_match_source() {
        // テスト項目: 全員が原文と同じ言語なら翻訳対象は空
        // given (前提条件):
        let sessions = vec![session("alice", "en"), session("bob", "en")];

        // then (期待する結果):
        assert!(target_languages(&sessions, &lang("en")).is_empty());
        assert!(target_languages(&[], &lang("en")).is_empty());
    }

    #[tokio::test]
    async fn test_send_message_persists_broadcasts_and_enqueues() {
        // テスト項目: 保存したメッセージが送信者を含む全員に配信され、言語ごとにジョブが投入される
        // given (前提条件):
        let f = Fixture::new();
        let room = room_id("123-456-789");
        let (alice, mut rx_a) = f.join("alice", "en", Some(&room)).await;
        let (_bob, mut rx_b) = f.join("bob", "es", Some(&room)).await;
        let (_carol, mut rx_c) = f.join("carol", "es", None).await;
        let (queue, recorded) = recording_queue();

        // when (操作):
        let message = f
            .usecase(queue)
            .execute(
                &alice.id,
                None,
                MessageContent::new("Hello".to_string()).unwrap(),
                None,
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(message.source_language, lang("en"));
        assert_eq!(
            f.messages.find(&message.id).await.unwrap(),
            Some(message.clone())
        );

        for rx in [&mut rx_a, &mut rx_b] {
            let event: serde_json::Value =
                serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(event["event"], "message_received");
            assert_eq!(event["message"]["id"], message.id.as_str());
        }
        assert!(rx_c.try_recv().is_err());

        let jobs = recorded.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].target_language, lang("es"));
        assert_eq!(jobs[0].message_id, message.id);
    }

    #[tokio::test]
    async fn test_send_message_explicit_language_overrides_session() {
        // テスト項目: 原文の言語を指定すると、その言語が翻訳対象から外れる
        // given (前提条件):
        let f = Fixture::new();
        let room = room_id("123-456-789");
        let (alice, _rx_a) = f.join("alice", "en", Some(&room)).await;
        let (_bob, _rx_b) = f.join("bob", "es", Some(&room)).await;
        let (queue, recorded) = recording_queue();

        // when (操作):
        let message = f
            .usecase(queue)
            .execute(
                &alice.id,
                Some(room.clone()),
                MessageContent::new("Hola".to_string()).unwrap(),
                Some(lang("es")),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(message.source_language, lang("es"));
        let jobs = recorded.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].target_language, lang("en"));
    }

    #[tokio::test]
    async fn test_send_message_single_language_room_enqueues_nothing() {
        // テスト項目: 全員が同じ言語の Room ではジョブが投入されない
        // given (前提条件):
        let f = Fixture::new();
        let room = room_id("123-456-789");
        let (alice, _rx_a) = f.join("alice", "en", Some(&room)).await;
        let (_bob, _rx_b) = f.join("bob", "en", Some(&room)).await;
        let mut queue = MockJobQueue::new();
        queue.expect_enqueue().never();

        // when (操作):
        let result = f
            .usecase(queue)
            .execute(
                &alice.id,
                None,
                MessageContent::new("Hello".to_string()).unwrap(),
                None,
            )
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_message_survives_queue_failure() {
        // テスト項目: キューが失敗しても送信は成功し、配信も行われる
        // given (前提条件):
        let f = Fixture::new();
        let room = room_id("123-456-789");
        let (alice, _rx_a) = f.join("alice", "en", Some(&room)).await;
        let (_bob, mut rx_b) = f.join("bob", "es", Some(&room)).await;
        let mut queue = MockJobQueue::new();
        queue
            .expect_enqueue()
            .times(1)
            .returning(|_, _| Err(QueueError::Unavailable("down".to_string())));

        // when (操作):
        let result = f
            .usecase(queue)
            .execute(
                &alice.id,
                None,
                MessageContent::new("Hello".to_string()).unwrap(),
                None,
            )
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert!(rx_b.try_recv().unwrap().contains("message_received"));
    }

    #[tokio::test]
    async fn test_send_message_requires_membership() {
        // テスト項目: 未参加の接続や、別の Room を指定した送信は NotMember になり、保存も配信もされない
        // given (前提条件):
        let f = Fixture::new();
        let room = room_id("123-456-789");
        let (outsider, _rx_o) = f.join("mallory", "en", None).await;
        let (alice, _rx_a) = f.join("alice", "en", Some(&room)).await;
        let mut queue = MockJobQueue::new();
        queue.expect_enqueue().never();
        let usecase = f.usecase(queue);

        // when (操作):
        let unbound = usecase
            .execute(
                &outsider.id,
                None,
                MessageContent::new("Hello".to_string()).unwrap(),
                None,
            )
            .await;
        let wrong_room = usecase
            .execute(
                &alice.id,
                Some(room_id("111-222-333")),
                MessageContent::new("Hello".to_string()).unwrap(),
                None,
            )
            .await;

        // then (期待する結果):
        assert_eq!(unbound.unwrap_err(), SendMessageError::NotMember);
        assert_eq!(wrong_room.unwrap_err(), SendMessageError::NotMember);
        assert!(f.messages.recent(&room, 10).await.unwrap().is_empty());
    }
}
