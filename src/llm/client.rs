// ABOUTME: Deadline-bounded completion client with the generic-mode guard
// ABOUTME: The single timeout here is the only deadline in the request path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! Completion client.
//!
//! Wraps a [`CompletionProvider`] with the one authoritative deadline. A
//! generic-mode request reaching this client is a programming error, not a
//! user error, and is rejected before any network traffic.

use super::{CompletionProvider, CompletionRequest, CompletionResponse};
use crate::config::CompletionConfig;
use crate::errors::{AppError, AppResult};
use crate::mode::AssistantMode;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Deadline-enforcing wrapper around a completion provider
pub struct CompletionClient {
    provider: Arc<dyn CompletionProvider>,
    deadline: Duration,
    deadline_secs: u64,
}

impl CompletionClient {
    /// Create a client with the configured deadline
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>, config: &CompletionConfig) -> Self {
        Self {
            provider,
            deadline: Duration::from_secs(config.deadline_secs),
            deadline_secs: config.deadline_secs,
        }
    }

    /// Call the provider within the deadline
    ///
    /// # Errors
    ///
    /// Returns an invariant violation for generic-mode callers, a deadline
    /// error when the provider outlives the timeout, and the provider's own
    /// error otherwise. Deadline and unavailable errors are the two the
    /// orchestrator answers with the deterministic fallback.
    pub async fn call(
        &self,
        mode: AssistantMode,
        request: &CompletionRequest,
    ) -> AppResult<CompletionResponse> {
        if mode == AssistantMode::Generic {
            return Err(AppError::invariant_violation(
                "completion requested in generic mode",
            ));
        }

        match tokio::time::timeout(self.deadline, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    provider = self.provider.name(),
                    deadline_secs = self.deadline_secs,
                    "completion exceeded deadline"
                );
                Err(AppError::completion_timeout(self.deadline_secs))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::llm::TokenUsage;
    use async_trait::async_trait;

    struct SlowProvider;

    #[async_trait]
    impl CompletionProvider for SlowProvider {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn complete(&self, _request: &CompletionRequest) -> AppResult<CompletionResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(CompletionResponse {
                content: "too late".to_owned(),
                usage: None,
            })
        }
    }

    struct EchoProvider;

    #[async_trait]
    impl CompletionProvider for EchoProvider {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
            Ok(CompletionResponse {
                content: format!("echo: {}", request.message),
                usage: Some(TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
            })
        }
    }

    fn config(deadline_secs: u64) -> CompletionConfig {
        CompletionConfig {
            deadline_secs,
            base_url: "http://localhost:11434/v1".to_owned(),
            model: "test".to_owned(),
            api_key: None,
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            instructions: "be helpful".to_owned(),
            history: Vec::new(),
            message: "hola".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_generic_mode_never_reaches_the_provider() {
        let client = CompletionClient::new(Arc::new(EchoProvider), &config(8));
        let err = client
            .call(AssistantMode::Generic, &request())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_produces_timeout_error() {
        let client = CompletionClient::new(Arc::new(SlowProvider), &config(8));
        let err = client
            .call(AssistantMode::Personalized, &request())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DeadlineExceeded);
        assert!(err.is_completion_failure());
    }

    #[tokio::test]
    async fn test_fast_provider_passes_through() {
        let client = CompletionClient::new(Arc::new(EchoProvider), &config(8));
        let response = client
            .call(AssistantMode::Personalized, &request())
            .await
            .unwrap();
        assert_eq!(response.content, "echo: hola");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }
}
