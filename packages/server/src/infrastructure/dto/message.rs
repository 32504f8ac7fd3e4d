//! Message DTO shared by the WebSocket and HTTP surfaces.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ChatMessage, TranslatedMessage};

/// A chat message as sent to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: String,
    pub room_id: String,
    pub author_id: String,
    pub author_name: String,
    pub body: String,
    pub source_language: String,
    /// Unix timestamp (milliseconds since epoch)
    pub created_at: i64,
    /// Target language → translated text, for every stored translation
    #[serde(default)]
    pub translations: BTreeMap<String, String>,
}

impl From<&ChatMessage> for MessageDto {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id.to_string(),
            room_id: message.room_id.to_string(),
            author_id: message.author_id.to_string(),
            author_name: message.author_name.to_string(),
            body: message.content.to_string(),
            source_language: message.source_language.to_string(),
            created_at: message.created_at.value(),
            translations: BTreeMap::new(),
        }
    }
}

impl From<&TranslatedMessage> for MessageDto {
    fn from(view: &TranslatedMessage) -> Self {
        let mut dto = Self::from(&view.message);
        dto.translations = view
            .translations
            .iter()
            .map(|(language, text)| (language.to_string(), text.clone()))
            .collect();
        dto
    }
}
