//! Translator 実装

mod openai;

pub use openai::{DEFAULT_MODEL, OpenAiTranslator};
