// Assistant pipeline
//
// message -> context snapshot -> completion (one repair at most) -> intent
// validation -> dispatch. Each request re-reads everything it needs; nothing
// but configuration and backend handles is shared between requests.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::completion::CompletionRequester;
use crate::config::AssistantConfig;
use crate::context::ContextSnapshot;
use crate::dispatcher::{AssistantReply, IntentDispatcher};
use crate::domain::OwnerId;
use crate::error::{AssistantError, Result};
use crate::intent::Intent;
use crate::traits::{EventStore, LlmDriver, TaskStore};

/// Turns chat messages into store operations for one owner at a time
#[derive(Clone)]
pub struct Assistant {
    requester: CompletionRequester,
    dispatcher: IntentDispatcher,
}

impl Assistant {
    pub fn new(
        driver: Arc<dyn LlmDriver>,
        events: Arc<dyn EventStore>,
        tasks: Arc<dyn TaskStore>,
        config: AssistantConfig,
    ) -> Self {
        Self {
            requester: CompletionRequester::new(driver, config),
            dispatcher: IntentDispatcher::new(events, tasks),
        }
    }

    pub fn config(&self) -> &AssistantConfig {
        self.requester.config()
    }

    /// Dispatcher over the stores this assistant writes to
    pub fn dispatcher(&self) -> &IntentDispatcher {
        &self.dispatcher
    }

    pub async fn handle(&self, owner: &OwnerId, message: &str) -> Result<AssistantReply> {
        self.handle_at(owner, message, Utc::now()).await
    }

    /// Handle a message as of `now`
    pub async fn handle_at(
        &self,
        owner: &OwnerId,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<AssistantReply> {
        if message.trim().is_empty() {
            return Err(AssistantError::InputMissing);
        }

        let snapshot = ContextSnapshot::build(
            owner,
            now,
            self.dispatcher.events().as_ref(),
            self.dispatcher.tasks().as_ref(),
            self.requester.config(),
        )
        .await?;

        let candidate = self
            .requester
            .request_intent(&snapshot.render(), message)
            .await?;

        let intent = Intent::from_value(&candidate).map_err(|violation| {
            tracing::warn!(
                owner = %owner,
                issues = violation.issues.len(),
                error = %violation,
                "Model reply does not match any intent"
            );
            AssistantError::SchemaViolation(violation)
        })?;

        let kind = intent.kind();
        tracing::debug!(owner = %owner, intent = %kind, "Dispatching intent");

        match self.dispatcher.dispatch(owner, intent).await {
            Ok(reply) => {
                tracing::info!(owner = %owner, intent = %kind, action = reply.label(), "Assistant request handled");
                Ok(reply)
            }
            Err(err) => {
                tracing::warn!(owner = %owner, intent = %kind, code = err.code(), error = %err, "Intent dispatch failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryEventStore, InMemoryTaskStore, MockLlmDriver};

    fn assistant(driver: &MockLlmDriver) -> Assistant {
        Assistant::new(
            Arc::new(driver.clone()),
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryTaskStore::new()),
            AssistantConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_blank_message_makes_no_model_call() {
        let driver = MockLlmDriver::new(vec![r#"{"intent":"help"}"#]);
        let assistant = assistant(&driver);

        for message in ["", "   \n"] {
            let err = assistant
                .handle(&OwnerId::new("u1"), message)
                .await
                .unwrap_err();
            assert!(matches!(err, AssistantError::InputMissing));
        }
        assert_eq!(driver.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_schema_violation_is_not_retried() {
        let driver = MockLlmDriver::new(vec![r#"{"intent":"add_event","payload":{"title":"x"}}"#]);
        let assistant = assistant(&driver);

        let err = assistant
            .handle(&OwnerId::new("u1"), "add something")
            .await
            .unwrap_err();

        let AssistantError::SchemaViolation(violation) = err else {
            panic!("expected schema violation");
        };
        assert_eq!(violation.paths(), vec!["payload.start", "payload.end"]);
        assert_eq!(violation.raw["payload"]["title"], "x");
        assert_eq!(driver.call_count().await, 1);
    }
}
