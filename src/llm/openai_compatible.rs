// ABOUTME: Completion provider speaking the OpenAI-compatible chat API
// ABOUTME: Works against any backend exposing /chat/completions (Groq, Ollama, vLLM)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! OpenAI-compatible [`CompletionProvider`].
//!
//! Speaks the de-facto standard `/chat/completions` shape, so the same
//! provider covers Groq, Ollama, vLLM and friends. Transport and protocol
//! failures both surface as unavailable; the client above this layer decides
//! whether that triggers the deterministic fallback.

use super::{
    CompletionMessage, CompletionProvider, CompletionRequest, CompletionResponse, TokenUsage,
};
use crate::config::CompletionConfig;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage>,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    content: String,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Provider for any OpenAI-compatible chat completion endpoint
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Create a provider from the completion configuration
    #[must_use]
    pub fn new(config: &CompletionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        "openai_compatible"
    }

    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(CompletionMessage::system(request.instructions.clone()));
        messages.extend(request.history.iter().cloned());
        messages.push(CompletionMessage::user(request.message.clone()));

        let url = format!("{}/chat/completions", self.base_url);
        let body = WireRequest {
            model: &self.model,
            messages,
        };

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::completion_service(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::completion_service(format!(
                "backend returned {status}: {detail}"
            )));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| AppError::completion_service(format!("malformed response: {e}")))?;

        let content = wire
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::completion_service("response carried no choices"))?;

        let usage = wire.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        debug!(model = %self.model, tokens = usage.map(|u| u.total_tokens), "completion ok");
        Ok(CompletionResponse { content, usage })
    }
}
