// ABOUTME: HTTP server binary for the MacroFit assistant backend
// ABOUTME: Wires config, logging, the in-memory store, and the completion provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

use anyhow::{Context, Result};
use macrofit_assistant::auth::AuthManager;
use macrofit_assistant::config::AssistantConfig;
use macrofit_assistant::llm::openai_compatible::OpenAiCompatibleProvider;
use macrofit_assistant::logging::LoggingConfig;
use macrofit_assistant::orchestrator::AssistantOrchestrator;
use macrofit_assistant::routes::{router, ServerResources};
use macrofit_assistant::store::memory::InMemoryStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    LoggingConfig::from_env().init()?;

    let config = AssistantConfig::from_env();
    if config.jwt_secret.is_none() {
        warn!("MACROFIT_JWT_SECRET is not set; all requests will be rejected");
    }

    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(OpenAiCompatibleProvider::new(&config.completion));
    let orchestrator = AssistantOrchestrator::new(store, provider, &config);
    let auth = AuthManager::new(config.jwt_secret.clone());

    let resources = Arc::new(ServerResources { orchestrator, auth });
    let app = router(resources).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!(%addr, model = %config.completion.model, "assistant server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .await
        .context("server terminated")?;
    Ok(())
}
