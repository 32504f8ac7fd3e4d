//! OpenAI 互換の chat completions API を使う Translator 実装

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{LanguageCode, Translator, TranslatorError};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<PromptMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct PromptMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions backed translator
pub struct OpenAiTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiTranslator {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, TranslatorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslatorError::Request(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model,
        })
    }
}

fn build_prompt(text: &str, source: &LanguageCode, target: &LanguageCode) -> String {
    format!(
        "Translate the following text from {source} to {target}. \
         Maintain the same tone, sentiment, and meaning. \
         Return only the translated text without any additional explanations or quotes.\n\n\
         Text to translate: {text}"
    )
}

fn extract_text(response: ChatCompletionResponse) -> Result<String, TranslatorError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(TranslatorError::EmptyResponse)?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(TranslatorError::EmptyResponse);
    }
    Ok(trimmed.to_string())
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, TranslatorError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![PromptMessage {
                role: "user",
                content: build_prompt(text, source, target),
            }],
            temperature: TEMPERATURE,
        };

        tracing::debug!("Requesting translation {} -> {}", source, target);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslatorError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslatorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| TranslatorError::InvalidResponse(e.to_string()))?;
        extract_text(parsed)
    }
}
