//! Room 単位のイベント配信
//!
//! イベントは 1 回だけ JSON に直列化し、対象の各接続の送信チャネルに積みます。
//! 個々の接続への送信失敗は他の接続への配信に影響しません。

use crate::{
    domain::{ConnectionRepository, RoomId, Session},
    infrastructure::dto::websocket::ServerEvent,
};

/// Push `event` to every live connection in the room accepted by `filter`.
///
/// Returns the number of connections the event was queued for.
pub async fn broadcast_to_room<F>(
    connections: &dyn ConnectionRepository,
    room_id: &RoomId,
    event: &ServerEvent,
    filter: F,
) -> usize
where
    F: Fn(&Session) -> bool,
{
    let payload = match event.to_json() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("Failed to serialize event for room '{}': {}", room_id, e);
            return 0;
        }
    };

    let mut delivered = 0;
    for session in connections.sessions_in_room(room_id).await {
        if !filter(&session) {
            continue;
        }
        match connections.push(&session.id, payload.clone()).await {
            Ok(()) => delivered += 1,
            Err(e) => tracing::debug!("Skipped connection '{}': {}", session.id, e),
        }
    }
    delivered
}

/// Build a presence event for `session` entering or leaving `room_id`
pub fn presence_event(session: &Session, room_id: &RoomId, joined: bool) -> ServerEvent {
    let room_id = room_id.to_string();
    let user_id = session.user.user_id.to_string();
    let display_name = session.user.display_name.to_string();
    let timestamp = crate::domain::Timestamp::now().value();
    if joined {
        ServerEvent::UserJoined {
            room_id,
            user_id,
            display_name,
            timestamp,
        }
    } else {
        ServerEvent::UserLeft {
            room_id,
            user_id,
            display_name,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionId, DisplayName, LanguageCode, Timestamp, UserId, UserIdentity},
        infrastructure::repository::InMemoryConnectionRepository,
    };
    use tokio::sync::mpsc;

    fn session(user: &str, language: &str) -> Session {
        Session::new(
            ConnectionId::generate(),
            UserIdentity::new(
                UserId::new(user.to_string()).unwrap(),
                DisplayName::new(user.to_string()).unwrap(),
                None,
            ),
            LanguageCode::new(language.to_string()).unwrap(),
            Timestamp::new(0),
        )
    }

    #[tokio::test]
    async fn test_broadcast_respects_room_and_filter() {
        // テスト項目: 同じ Room かつフィルタを満たす接続にだけ配信される
        // given (前提条件):
        let repo = InMemoryConnectionRepository::new();
        let room = RoomId::new("123-456-789".to_string()).unwrap();
        let other_room = RoomId::new("111-222-333".to_string()).unwrap();
        let alice = session("alice", "en");
        let bob = session("bob", "es");
        let carol = session("carol", "es");

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();
        repo.register(alice.clone(), tx_a).await;
        repo.register(bob.clone(), tx_b).await;
        repo.register(carol.clone(), tx_c).await;
        repo.bind_room(&alice.id, room.clone(), alice.language.clone())
            .await
            .unwrap();
        repo.bind_room(&bob.id, room.clone(), bob.language.clone())
            .await
            .unwrap();
        repo.bind_room(&carol.id, other_room, carol.language.clone())
            .await
            .unwrap();

        let spanish = LanguageCode::new("es".to_string()).unwrap();
        let event = ServerEvent::TranslationAvailable {
            message_id: "m1".to_string(),
            room_id: room.to_string(),
            language: "es".to_string(),
            text: "Hola".to_string(),
        };

        // when (操作):
        let delivered =
            broadcast_to_room(&repo, &room, &event, |s| s.language == spanish).await;

        // then (期待する結果):
        assert_eq!(delivered, 1);
        assert!(rx_b.try_recv().unwrap().contains("\"translation_available\""));
        assert!(rx_a.try_recv().is_err());
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn test_presence_event_kinds() {
        // テスト項目: 参加時は user_joined、退出時は user_left が作られる
        // given (前提条件):
        let alice = session("alice", "en");
        let room = RoomId::new("123-456-789".to_string()).unwrap();

        // then (期待する結果):
        assert!(matches!(
            presence_event(&alice, &room, true),
            ServerEvent::UserJoined { .. }
        ));
        assert!(matches!(
            presence_event(&alice, &room, false),
            ServerEvent::UserLeft { .. }
        ));
    }
}
