//! CompletionNotifier 実装
//!
//! 同一プロセス内の通知は usecase 層の NotifyTranslationUseCase が担います。

mod http;

pub use http::{HttpNotifier, NOTIFY_PATH};
