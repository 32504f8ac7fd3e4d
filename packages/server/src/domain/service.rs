//! External collaborators the domain depends on.
//!
//! Authentication, translation, the job queue and the completion callback are
//! provided from outside the core; only their contracts live here.

use std::time::Duration;

use async_trait::async_trait;

use super::{
    entity::{FailedJob, QueueStatus, TranslationJob, UserIdentity},
    error::{AuthError, JobError, NotificationError, QueueError, TranslatorError},
    value_object::{JobId, LanguageCode, MessageId, RoomId},
};

/// Turns a raw credential into a validated identity
#[cfg_attr(test, mockall::automock)]
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<UserIdentity, AuthError>;
}

/// Machine translation engine. May be slow and may fail.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, TranslatorError>;
}

/// Per-job delivery options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOptions {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry
    pub backoff_initial: Duration,
}

impl JobOptions {
    /// Delay before retrying after `attempts_made` failed attempts
    pub fn backoff_delay(&self, attempts_made: u32) -> Duration {
        let exponent = attempts_made.saturating_sub(1).min(16);
        self.backoff_initial.saturating_mul(1u32 << exponent)
    }
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_initial: Duration::from_secs(1),
        }
    }
}

/// Durable, at-least-once work queue
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: TranslationJob, options: JobOptions) -> Result<JobId, QueueError>;

    async fn status(&self) -> QueueStatus;

    /// Jobs parked after exhausting their attempts
    async fn failed_jobs(&self) -> Vec<FailedJob>;
}

/// Processes jobs pulled from the queue. Must tolerate duplicate delivery.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &TranslationJob) -> Result<(), JobError>;
}

/// Delivers a finished translation to the relay that owns the room's connections
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    async fn notify(
        &self,
        message_id: &MessageId,
        room_id: &RoomId,
        target_language: &LanguageCode,
        text: &str,
    ) -> Result<(), NotificationError>;
}
