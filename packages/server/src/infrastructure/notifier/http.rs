//! HTTP による CompletionNotifier 実装
//!
//! ワーカーとリレーが別プロセスの場合に使用します。
//! リレー側の `POST /chat/translations/notify` に完了通知を送ります。

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    domain::{CompletionNotifier, LanguageCode, MessageId, NotificationError, RoomId},
    infrastructure::dto::http::TranslationNotificationDto,
};

pub const NOTIFY_PATH: &str = "/chat/translations/notify";

pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotifier {
    /// `base_url` is the relay's root URL, e.g. `http://chat:3000`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), NOTIFY_PATH),
        })
    }
}

#[async_trait]
impl CompletionNotifier for HttpNotifier {
    async fn notify(
        &self,
        message_id: &MessageId,
        room_id: &RoomId,
        target_language: &LanguageCode,
        text: &str,
    ) -> Result<(), NotificationError> {
        let body = TranslationNotificationDto {
            message_id: message_id.to_string(),
            room_id: room_id.to_string(),
            target_language: target_language.to_string(),
            translated_text: text.to_string(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}
