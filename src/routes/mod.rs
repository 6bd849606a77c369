// ABOUTME: HTTP surface: router assembly and shared server resources
// ABOUTME: One assistant endpoint plus a health probe
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # HTTP Routes
//!
//! Thin axum layer over the orchestrator. Handlers authenticate, delegate,
//! and map [`crate::errors::AppError`] to its HTTP shape; no business logic
//! lives here.

pub mod assistant;

use crate::auth::AuthManager;
use crate::orchestrator::AssistantOrchestrator;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Shared state handed to every handler
pub struct ServerResources {
    pub orchestrator: AssistantOrchestrator,
    pub auth: AuthManager,
}

/// Assemble the application router
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .route("/api/assistant/message", post(assistant::handle_message))
        .route("/health", get(assistant::health))
        .with_state(resources)
}
