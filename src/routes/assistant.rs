// ABOUTME: Handlers for the assistant message endpoint and health probe
// ABOUTME: Authenticates the bearer token, then delegates to the orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

use super::ServerResources;
use crate::errors::AppResult;
use crate::orchestrator::{ChatTurnRequest, ChatTurnResponse};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// POST /api/assistant/message
pub async fn handle_message(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<ChatTurnRequest>,
) -> AppResult<Json<ChatTurnResponse>> {
    let user = resources.auth.authenticate(bearer(&headers))?;
    info!(user_id = %user.user_id, "assistant message received");

    let response = resources
        .orchestrator
        .handle_message(&user.user_id, request, Utc::now())
        .await?;
    Ok(Json(response))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": crate::logging::SERVICE_NAME,
    }))
}
