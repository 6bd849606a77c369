// ABOUTME: End-to-end request pipeline for one conversational turn
// ABOUTME: Admission, quota, context, mode gating, completion or fallback, persistence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Request Orchestrator
//!
//! Drives a user message through the full pipeline: input validation,
//! relevance admission, rate limiting, session load, context lookup, mode
//! gating, prompt assembly, the completion call (personalized mode only) or
//! the deterministic templates, then persistence and analytics.
//!
//! Ordering matters. Relevance runs before the quota check so a
//! high-confidence rejection costs the user nothing; a denied quota persists
//! nothing. Generic mode answers from a fixed template without ever touching
//! the completion layer, and its context summary is redacted first so daily
//! figures cannot leak through any later step.

use crate::analytics::{AnalyticsRecorder, RequestSample};
use crate::config::AssistantConfig;
use crate::context::ContextCache;
use crate::errors::{AppError, AppResult};
use crate::fallback;
use crate::history::HistoryUsageSummarizer;
use crate::llm::client::CompletionClient;
use crate::llm::{CompletionMessage, CompletionProvider, CompletionRequest};
use crate::mode::{AssistantMode, ModeSelector};
use crate::models::{ChatMessage, MessageRole, ReplyType};
use crate::prompt::PromptBuilder;
use crate::rate_limiting::RateLimiter;
use crate::relevance::RelevanceClassifier;
use crate::session::SessionManager;
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pipeline stage, for structured log events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Admitted,
    RejectedIrrelevant,
    RateLimited,
    ContextReady,
    Bypassed,
    Completed,
    Fallback,
    Persisted,
}

impl Stage {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::RejectedIrrelevant => "rejected_irrelevant",
            Self::RateLimited => "rate_limited",
            Self::ContextReady => "context_ready",
            Self::Bypassed => "bypassed",
            Self::Completed => "completed",
            Self::Fallback => "fallback",
            Self::Persisted => "persisted",
        }
    }
}

/// One inbound conversational turn
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnRequest {
    /// The user's message text
    pub message: String,
    /// Existing session to continue, or absent to start one
    #[serde(default)]
    pub session_id: Option<String>,
}

/// The assistant's answer for one turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnResponse {
    /// Session the turn was recorded in
    pub session_id: String,
    /// Reply text
    pub reply: String,
    /// Reply category for client-side styling
    #[serde(rename = "type")]
    pub reply_type: ReplyType,
    /// Tokens consumed by the completion call, zero otherwise
    pub tokens_used: u32,
    /// Wall time spent handling the turn, in milliseconds
    pub response_time_ms: u64,
    /// Whether the reply is the deterministic completion fallback
    pub was_fallback: bool,
    /// Whether the context summary came from cache
    pub was_from_cache: bool,
}

/// The full request pipeline, shared across handlers
pub struct AssistantOrchestrator {
    classifier: RelevanceClassifier,
    rate_limiter: RateLimiter,
    sessions: SessionManager,
    context: ContextCache,
    history: HistoryUsageSummarizer,
    mode_selector: ModeSelector,
    prompt_builder: PromptBuilder,
    completion: CompletionClient,
    analytics: AnalyticsRecorder,
    max_message_chars: usize,
}

impl AssistantOrchestrator {
    /// Wire up the pipeline over a store and a completion provider
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn CompletionProvider>,
        config: &AssistantConfig,
    ) -> Self {
        Self {
            classifier: RelevanceClassifier::new(),
            rate_limiter: RateLimiter::new(store.clone(), config.rate_limits),
            sessions: SessionManager::new(store.clone(), &config.session),
            context: ContextCache::new(store.clone(), config.context_cache, config.max_insights),
            history: HistoryUsageSummarizer::new(store.clone()),
            mode_selector: ModeSelector::new(config.mode_gate),
            prompt_builder: PromptBuilder::new(),
            completion: CompletionClient::new(provider, &config.completion),
            analytics: AnalyticsRecorder::new(store),
            max_message_chars: config.limits.max_message_chars,
        }
    }

    /// Handle one conversational turn for an authenticated user
    ///
    /// # Errors
    ///
    /// Returns invalid-argument for malformed input or unknown sessions,
    /// resource-exhausted when a quota denies the request, and storage or
    /// internal errors when persistence fails. Completion failures never
    /// surface; they become fallback replies.
    pub async fn handle_message(
        &self,
        user_id: &str,
        request: ChatTurnRequest,
        now: DateTime<Utc>,
    ) -> AppResult<ChatTurnResponse> {
        let started = Instant::now();

        let message = request.message.trim();
        if message.is_empty() {
            return Err(AppError::invalid_argument("message must not be empty"));
        }
        if message.chars().count() > self.max_message_chars {
            return Err(AppError::invalid_argument(format!(
                "message exceeds {} characters",
                self.max_message_chars
            )));
        }

        let verdict = self.classifier.classify(message);
        debug!(
            user_id,
            relevant = verdict.is_relevant,
            confidence = verdict.confidence,
            reason = verdict.reason.as_str(),
            "relevance verdict"
        );

        if verdict.short_circuits() {
            // Costs no quota and never reaches the completion layer, but the
            // exchange is still recorded in the session
            let session = self
                .sessions
                .load_or_create(user_id, request.session_id.as_deref(), now)
                .await?;
            let reply = fallback::out_of_scope_reply();
            self.sessions
                .append_messages(
                    &session.id,
                    vec![
                        ChatMessage::user(message, now),
                        ChatMessage::assistant(reply.clone(), now),
                    ],
                    now,
                )
                .await?;
            let elapsed_ms = elapsed_ms(started);
            info!(
                user_id,
                stage = Stage::RejectedIrrelevant.as_str(),
                reason = verdict.reason.as_str(),
                "turn rejected as out of scope"
            );
            self.analytics
                .record(
                    now,
                    RequestSample {
                        user_id: user_id.to_owned(),
                        latency_ms: elapsed_ms,
                        used_completion: false,
                        was_fallback: false,
                        was_error: false,
                    },
                )
                .await;
            return Ok(ChatTurnResponse {
                session_id: session.id,
                reply,
                reply_type: ReplyType::Normal,
                tokens_used: 0,
                response_time_ms: elapsed_ms,
                was_fallback: false,
                was_from_cache: false,
            });
        }

        let decision = self.rate_limiter.check_rate_limit(user_id, now).await?;
        if !decision.allowed {
            warn!(
                user_id,
                stage = Stage::RateLimited.as_str(),
                retry_after_ms = decision.retry_after_ms,
                blocked = decision.blocked,
                "turn denied by quota"
            );
            self.analytics
                .record(
                    now,
                    RequestSample {
                        user_id: user_id.to_owned(),
                        latency_ms: elapsed_ms(started),
                        used_completion: false,
                        was_fallback: false,
                        was_error: true,
                    },
                )
                .await;
            return Err(AppError::rate_limited(
                decision.retry_after_ms.unwrap_or(60_000),
            ));
        }
        debug!(
            user_id,
            stage = Stage::Admitted.as_str(),
            hourly_remaining = decision.hourly_remaining,
            daily_remaining = decision.daily_remaining,
            "turn admitted"
        );

        let session = self
            .sessions
            .load_or_create(user_id, request.session_id.as_deref(), now)
            .await?;

        let lookup = self.context.build_user_context(user_id, now).await?;
        let usage = self.history.compute_history_summary(user_id, now).await?;
        let mode = self.mode_selector.select_mode(&usage);

        let mut summary = lookup.summary;
        if mode == AssistantMode::Generic {
            summary.redact_daily_fields();
        }

        let prompt = self.prompt_builder.build_instructions(mode, &summary, &usage);
        let redacted = prompt.redacted;
        info!(
            user_id,
            session_id = %session.id,
            stage = Stage::ContextReady.as_str(),
            mode = mode.as_str(),
            cache_hit = lookup.cache_hit,
            fingerprint = %lookup.fingerprint,
            redacted,
            "context assembled"
        );

        let (reply, reply_type, tokens_used, used_completion, was_fallback) = match mode {
            AssistantMode::Generic => {
                debug!(
                    user_id,
                    stage = Stage::Bypassed.as_str(),
                    mode = mode.as_str(),
                    cache_hit = lookup.cache_hit,
                    fingerprint = %lookup.fingerprint,
                    redacted,
                    "generic template reply"
                );
                (fallback::generic_reply(), ReplyType::Normal, 0, false, false)
            }
            AssistantMode::Personalized => {
                let history: Vec<CompletionMessage> = session
                    .recent_messages
                    .iter()
                    .map(|m| match m.role {
                        MessageRole::User => CompletionMessage::user(m.content.clone()),
                        MessageRole::Assistant => CompletionMessage::assistant(m.content.clone()),
                    })
                    .collect();
                let completion_request = CompletionRequest {
                    instructions: prompt.instructions,
                    history,
                    message: message.to_owned(),
                };
                match self.completion.call(mode, &completion_request).await {
                    Ok(response) => {
                        let tokens = response.usage.map_or(0, |u| u.total_tokens);
                        debug!(
                            user_id,
                            stage = Stage::Completed.as_str(),
                            mode = mode.as_str(),
                            cache_hit = lookup.cache_hit,
                            fingerprint = %lookup.fingerprint,
                            redacted,
                            tokens,
                            "completion reply"
                        );
                        let reply_type = fallback::classify_reply(&response.content);
                        (response.content, reply_type, tokens, true, false)
                    }
                    Err(error) if error.is_completion_failure() => {
                        warn!(
                            user_id,
                            stage = Stage::Fallback.as_str(),
                            mode = mode.as_str(),
                            cache_hit = lookup.cache_hit,
                            fingerprint = %lookup.fingerprint,
                            redacted,
                            %error,
                            "serving fallback reply"
                        );
                        let reply = fallback::completion_fallback(&summary);
                        let reply_type = fallback::classify_reply(&reply);
                        (reply, reply_type, 0, true, true)
                    }
                    Err(error) => return Err(error),
                }
            }
        };

        let elapsed = elapsed_ms(started);
        let assistant_message = ChatMessage::assistant(reply.clone(), now)
            .with_tokens(used_completion.then_some(tokens_used))
            .with_latency(elapsed);
        self.sessions
            .append_messages(
                &session.id,
                vec![ChatMessage::user(message, now), assistant_message],
                now,
            )
            .await?;
        debug!(
            user_id,
            session_id = %session.id,
            stage = Stage::Persisted.as_str(),
            mode = mode.as_str(),
            cache_hit = lookup.cache_hit,
            fingerprint = %lookup.fingerprint,
            redacted,
            "turn persisted"
        );

        self.analytics
            .record(
                now,
                RequestSample {
                    user_id: user_id.to_owned(),
                    latency_ms: elapsed,
                    used_completion,
                    was_fallback,
                    was_error: false,
                },
            )
            .await;

        Ok(ChatTurnResponse {
            session_id: session.id,
            reply,
            reply_type,
            tokens_used,
            response_time_ms: elapsed,
            was_fallback,
            was_from_cache: lookup.cache_hit,
        })
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
