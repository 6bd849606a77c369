// ABOUTME: Conversation session lifecycle and bounded message history
// ABOUTME: Appends run inside the store's atomic update and are idempotent by message id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Session Manager
//!
//! Owns the conversation session documents: creation, ownership-checked
//! loading, and message appends. A session keeps only the most recent N
//! messages inline (oldest dropped first); `message_count` keeps counting
//! past the trim so totals survive. Appends deduplicate on message id, so a
//! retried request cannot double-write a turn.

use crate::config::SessionConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{from_document, ChatMessage, ChatSession};
use crate::store::{Collection, DocumentStore, TxnOutcome};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Session lifecycle and history maintenance over the document store
pub struct SessionManager {
    store: Arc<dyn DocumentStore>,
    window: usize,
}

impl SessionManager {
    /// Create a session manager with the configured history window
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: &SessionConfig) -> Self {
        Self {
            store,
            window: config.history_window,
        }
    }

    /// Create and persist a fresh session for `user_id`
    ///
    /// # Errors
    ///
    /// Returns a storage error if the session cannot be persisted.
    pub async fn create_session(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ChatSession> {
        let session = ChatSession::new(user_id, now);
        let document = serde_json::to_value(&session)
            .map_err(|e| AppError::storage(format!("session encode failed: {e}")))?;
        self.store
            .put(Collection::Sessions, &session.id, document)
            .await?;
        debug!(user_id, session_id = %session.id, "session created");
        Ok(session)
    }

    /// Load an existing session, verifying ownership, or create a new one
    /// when no id is supplied
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error when the id is unknown or belongs
    /// to a different user; a storage error if the store fails.
    pub async fn load_or_create(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<ChatSession> {
        let Some(session_id) = session_id else {
            return self.create_session(user_id, now).await;
        };

        let session = self
            .store
            .get(Collection::Sessions, session_id)
            .await?
            .and_then(ChatSession::from_document)
            .ok_or_else(|| AppError::invalid_argument("unknown session"))?;

        if session.user_id != user_id {
            // Same answer as an unknown id so ids cannot be probed
            return Err(AppError::invalid_argument("unknown session"));
        }
        Ok(session)
    }

    /// Append messages to a session atomically: dedup by id, bump the
    /// running count, trim to the window, refresh `updated_at`
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if the session no longer exists,
    /// or a storage error if the update fails.
    pub async fn append_messages(
        &self,
        session_id: &str,
        messages: Vec<ChatMessage>,
        now: DateTime<Utc>,
    ) -> AppResult<ChatSession> {
        let window = self.window;
        let result = self
            .store
            .update(
                Collection::Sessions,
                session_id,
                Box::new(move |current| {
                    let mut session = current
                        .and_then(ChatSession::from_document)
                        .ok_or_else(|| AppError::invalid_argument("unknown session"))?;

                    for message in messages {
                        let duplicate = session
                            .recent_messages
                            .iter()
                            .any(|existing| existing.id == message.id);
                        if duplicate {
                            continue;
                        }
                        session.recent_messages.push(message);
                        session.message_count += 1;
                    }

                    if session.recent_messages.len() > window {
                        let excess = session.recent_messages.len() - window;
                        session.recent_messages.drain(..excess);
                    }
                    session.updated_at = now;

                    let document = serde_json::to_value(&session)
                        .map_err(|e| AppError::storage(format!("session encode failed: {e}")))?;
                    Ok(TxnOutcome {
                        result: document.clone(),
                        document,
                    })
                }),
            )
            .await?;

        from_document(result).ok_or_else(|| AppError::internal("session round-trip failed"))
    }
}
