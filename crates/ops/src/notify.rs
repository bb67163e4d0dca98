//! Notification content generation and fan-out dispatch.
//!
//! The generative-text collaborator is modeled as a capability behind
//! [`TextGenerator`] with a deterministic fallback, so the pipeline never
//! blocks on or fails because of an external model.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{NotificationStore, StoreError, UserDirectory};
use crate::types::{Notification, OpsEvent};

/// Role instruction sent with every generation request.
const ROLE_INSTRUCTION: &str = "You are an assistant that writes notifications \
for a video platform. Given a structured event, write one short, clear message \
for the people it concerns.";

/// Deterministic message used whenever the generative collaborator is
/// unavailable or returns an unusable response.
pub const FALLBACK_MESSAGE: &str = "New content is available. Check it out!";

/// Text generation failure.
#[derive(Debug, Clone, Error)]
#[error("text generation failed: {0}")]
pub struct TextGenError(pub String);

/// External generative-text collaborator. Treated as unreliable and optional.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, instruction: &str, prompt: &str) -> Result<String, TextGenError>;
}

/// Produces a short human-readable message for a structured event.
#[derive(Clone)]
pub struct NotificationComposer {
    generator: Arc<dyn TextGenerator>,
}

impl NotificationComposer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Never fails: any generator error or blank response falls back to
    /// [`FALLBACK_MESSAGE`].
    pub async fn compose(&self, event: &OpsEvent) -> String {
        let context = serde_json::to_string(event).unwrap_or_else(|_| event.summary.clone());
        let prompt = format!("Write a notification message for this event: {context}");

        match self.generator.generate(ROLE_INSTRUCTION, &prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                debug!(kind = ?event.kind, "text generator returned a blank message, using fallback");
                FALLBACK_MESSAGE.to_string()
            }
            Err(e) => {
                debug!(kind = ?event.kind, error = %e, "text generator unavailable, using fallback");
                FALLBACK_MESSAGE.to_string()
            }
        }
    }
}

/// Per-dispatch accounting, for logging only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DispatchOutcome {
    pub audience_size: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Resolves the audience for an event and persists one notification per
/// opted-in recipient, continuing past individual failures.
pub struct NotificationDispatcher {
    users: Arc<dyn UserDirectory>,
    notifications: Arc<dyn NotificationStore>,
    composer: NotificationComposer,
}

impl NotificationDispatcher {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        notifications: Arc<dyn NotificationStore>,
        composer: NotificationComposer,
    ) -> Self {
        Self {
            users,
            notifications,
            composer,
        }
    }

    /// Fan out one event.
    ///
    /// Fan-out is best-effort and at-least-once per recipient, not
    /// transactional across the audience: per-recipient failures are logged
    /// and counted, never raised. Only audience resolution itself can fail.
    /// Callers are responsible for not double-triggering the same logical
    /// event; two calls produce two notifications per recipient.
    pub async fn dispatch(&self, event: &OpsEvent) -> Result<DispatchOutcome, StoreError> {
        let audience = event.kind.audience();
        let recipients = self.users.opted_in_users(audience).await?;
        let message = self.composer.compose(event).await;

        let mut outcome = DispatchOutcome {
            audience_size: recipients.len(),
            ..DispatchOutcome::default()
        };

        for user_id in recipients {
            // The opt-in flag may have changed since audience resolution.
            match self.users.is_opted_in(user_id).await {
                Ok(true) => match self
                    .notifications
                    .insert(Notification::new(user_id, message.clone()))
                    .await
                {
                    Ok(()) => outcome.delivered += 1,
                    Err(e) => {
                        warn!(user_id = %user_id, error = %e, "failed to persist notification");
                        outcome.failed += 1;
                    }
                },
                Ok(false) => outcome.skipped += 1,
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "failed to re-check opt-in flag");
                    outcome.failed += 1;
                }
            }
        }

        info!(
            kind = ?event.kind,
            audience = outcome.audience_size,
            delivered = outcome.delivered,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "notification fan-out finished"
        );

        Ok(outcome)
    }
}
