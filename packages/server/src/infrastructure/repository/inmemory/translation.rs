//! InMemory Translation Repository 実装
//!
//! MessageId ごとに言語別の翻訳を持つ、(MessageId, LanguageCode) 一意のストア。
//! 書き込みは「存在しなければ挿入」の 1 操作のみで、既存の行は上書きしません。

use std::{
    collections::{BTreeMap, HashMap, btree_map::Entry},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    LanguageCode, MessageId, RepositoryError, Translation, TranslationRepository,
    TranslationWrite,
};

/// インメモリ Translation Repository 実装
#[derive(Default)]
pub struct InMemoryTranslationRepository {
    /// MessageId → (LanguageCode → Translation)
    translations: Arc<Mutex<HashMap<MessageId, BTreeMap<LanguageCode, Translation>>>>,
}

impl InMemoryTranslationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranslationRepository for InMemoryTranslationRepository {
    async fn insert_if_absent(
        &self,
        translation: Translation,
    ) -> Result<TranslationWrite, RepositoryError> {
        let mut translations = self.translations.lock().await;
        let by_language = translations
            .entry(translation.message_id.clone())
            .or_default();
        match by_language.entry(translation.target_language.clone()) {
            Entry::Occupied(existing) => Ok(TranslationWrite::Existing(existing.get().clone())),
            Entry::Vacant(slot) => Ok(TranslationWrite::Inserted(slot.insert(translation).clone())),
        }
    }

    async fn find(
        &self,
        message_id: &MessageId,
        target_language: &LanguageCode,
    ) -> Result<Option<Translation>, RepositoryError> {
        let translations = self.translations.lock().await;
        Ok(translations
            .get(message_id)
            .and_then(|by_language| by_language.get(target_language))
            .cloned())
    }

    async fn find_for_messages(
        &self,
        message_ids: &[MessageId],
    ) -> Result<HashMap<MessageId, BTreeMap<LanguageCode, String>>, RepositoryError> {
        let translations = self.translations.lock().await;
        Ok(message_ids
            .iter()
            .filter_map(|message_id| {
                let by_language = translations.get(message_id)?;
                let texts = by_language
                    .iter()
                    .map(|(language, translation)| (language.clone(), translation.text.clone()))
                    .collect();
                Some((message_id.clone(), texts))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timestamp;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - (メッセージ, 言語) ごとに翻訳が高々 1 行であること
    // - 既存の行は後続の書き込みで上書きされないこと
    //
    // 【なぜこのテストが必要か】
    // - 同じジョブが重複配信されても、最初に保存された翻訳だけが正となる
    // ========================================

    fn lang(code: &str) -> LanguageCode {
        LanguageCode::new(code.to_string()).unwrap()
    }

    fn translation(message_id: &MessageId, language: &str, text: &str) -> Translation {
        Translation::new(
            message_id.clone(),
            lang(language),
            text.to_string(),
            Timestamp::new(0),
        )
    }

    #[tokio::test]
    async fn test_insert_new_translation() {
        // テスト項目: 未保存の (メッセージ, 言語) は挿入される
        // given (前提条件):
        let repo = InMemoryTranslationRepository::new();
        let message_id = MessageId::generate();

        // when (操作):
        let write = repo
            .insert_if_absent(translation(&message_id, "es", "Hola"))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(write.was_inserted());
        let found = repo.find(&message_id, &lang("es")).await.unwrap().unwrap();
        assert_eq!(found.text, "Hola");
    }

    #[tokio::test]
    async fn test_insert_existing_translation_is_not_overwritten() {
        // テスト項目: 既存の行があれば書き込まずに既存の行を返す
        // given (前提条件):
        let repo = InMemoryTranslationRepository::new();
        let message_id = MessageId::generate();
        repo.insert_if_absent(translation(&message_id, "es", "Hola"))
            .await
            .unwrap();

        // when (操作):
        let write = repo
            .insert_if_absent(translation(&message_id, "es", "Buenas"))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(!write.was_inserted());
        assert_eq!(write.translation().text, "Hola");
        let found = repo.find(&message_id, &lang("es")).await.unwrap().unwrap();
        assert_eq!(found.text, "Hola");
    }

    #[tokio::test]
    async fn test_find_for_messages_groups_by_message() {
        // テスト項目: 指定したメッセージの翻訳だけが言語ごとにまとめて返される
        // given (前提条件):
        let repo = InMemoryTranslationRepository::new();
        let first = MessageId::generate();
        let second = MessageId::generate();
        let other = MessageId::generate();
        for write in [
            translation(&first, "es", "Hola"),
            translation(&first, "fr", "Bonjour"),
            translation(&second, "es", "Adios"),
            translation(&other, "es", "Otro"),
        ] {
            repo.insert_if_absent(write).await.unwrap();
        }

        // when (操作):
        let grouped = repo
            .find_for_messages(&[first.clone(), second.clone()])
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&first].len(), 2);
        assert_eq!(grouped[&first][&lang("fr")], "Bonjour");
        assert_eq!(grouped[&second][&lang("es")], "Adios");
        assert!(!grouped.contains_key(&other));
    }

    #[tokio::test]
    async fn test_find_for_messages_skips_untranslated_messages() {
        // テスト項目: 翻訳が 1 件も無いメッセージは結果に含まれず、他のメッセージの翻訳にも影響されない
        // given (前提条件):
        let repo = InMemoryTranslationRepository::new();
        let translated = MessageId::generate();
        let untranslated = MessageId::generate();
        repo.insert_if_absent(translation(&translated, "ja", "こんにちは"))
            .await
            .unwrap();
        for _ in 0..100 {
            repo.insert_if_absent(translation(&MessageId::generate(), "es", "Otro"))
                .await
                .unwrap();
        }

        // when (操作):
        let grouped = repo
            .find_for_messages(&[untranslated.clone(), translated.clone()])
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(grouped.len(), 1);
        assert!(!grouped.contains_key(&untranslated));
        assert_eq!(
            grouped[&translated],
            BTreeMap::from([(lang("ja"), "こんにちは".to_string())])
        );
    }
}
