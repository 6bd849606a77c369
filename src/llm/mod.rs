// ABOUTME: Completion provider abstraction and wire types
// ABOUTME: Providers are pluggable behind an async trait; the client enforces the deadline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Completion Layer
//!
//! A [`CompletionProvider`] turns assembled instructions plus conversation
//! history into a model reply. [`client::CompletionClient`] wraps a provider
//! with the single authoritative deadline and the generic-mode guard.

pub mod client;
pub mod openai_compatible;

use crate::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role of a wire message sent to the completion backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionRole {
    System,
    User,
    Assistant,
}

/// One message on the completion wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: CompletionRole,
    pub content: String,
}

impl CompletionMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: CompletionRole::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: CompletionRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: CompletionRole::Assistant,
            content: content.into(),
        }
    }
}

/// A fully assembled completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System instructions from the prompt builder
    pub instructions: String,
    /// Prior conversation turns, oldest first
    pub history: Vec<CompletionMessage>,
    /// The current user message
    pub message: String,
}

/// Token accounting reported by the backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A successful completion
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The model's reply text
    pub content: String,
    /// Token usage, when the backend reports it
    pub usage: Option<TokenUsage>,
}

/// A backend capable of producing completions
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Produce a completion for the request
    ///
    /// # Errors
    ///
    /// Returns an unavailable error when the backend cannot be reached or
    /// returns a malformed or non-success response.
    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse>;
}
