// ABOUTME: Shared helpers for integration tests
// ABOUTME: Scripted completion provider, config builders, and data seeding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use macrofit_assistant::config::{
    AssistantConfig, CombinationRule, CompletionConfig, ContextCacheConfig, InputLimits,
    ModeGateConfig, RateLimitConfig, SessionConfig,
};
use macrofit_assistant::errors::{AppError, AppResult};
use macrofit_assistant::llm::{
    CompletionProvider, CompletionRequest, CompletionResponse, TokenUsage,
};
use macrofit_assistant::store::memory::InMemoryStore;
use macrofit_assistant::store::{Collection, DocumentStore};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

static INIT_LOGGING: Once = Once::new();

/// Quiet logging for test runs; respects `RUST_LOG` when set
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_owned());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Fixed "now" shared by the integration tests
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap()
}

/// Configuration with defaults shrunk to test-friendly values
pub fn test_config() -> AssistantConfig {
    AssistantConfig {
        http_port: 0,
        jwt_secret: Some("test-secret".to_owned()),
        rate_limits: RateLimitConfig {
            hourly_ceiling: 20,
            daily_ceiling: 100,
        },
        context_cache: ContextCacheConfig { ttl_secs: 900 },
        session: SessionConfig { history_window: 20 },
        completion: CompletionConfig {
            deadline_secs: 8,
            base_url: "http://localhost:11434/v1".to_owned(),
            model: "test-model".to_owned(),
            api_key: None,
        },
        mode_gate: ModeGateConfig {
            meals_days_threshold: 3,
            workouts_threshold: 2,
            rule: CombinationRule::Or,
        },
        limits: InputLimits {
            max_message_chars: 500,
        },
        max_insights: 3,
    }
}

/// What the scripted provider does when called
#[derive(Clone)]
pub enum MockBehavior {
    Reply(String),
    Fail,
}

/// Completion provider with scripted behavior and a call counter
pub struct MockCompletionProvider {
    behavior: Mutex<MockBehavior>,
    calls: AtomicUsize,
    /// Last request seen, for prompt inspection
    pub last_request: Mutex<Option<CompletionRequest>>,
}

impl MockCompletionProvider {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(MockBehavior::Reply(text.to_owned())),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(MockBehavior::Fail),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            MockBehavior::Reply(text) => Ok(CompletionResponse {
                content: text,
                usage: Some(TokenUsage {
                    prompt_tokens: 30,
                    completion_tokens: 12,
                    total_tokens: 42,
                }),
            }),
            MockBehavior::Fail => Err(AppError::completion_service("backend down")),
        }
    }
}

/// Seed a meal `days_ago` days before [`test_now`]
pub async fn seed_meal(store: &InMemoryStore, user_id: &str, id: &str, calories: u32, days_ago: i64) {
    let created = test_now() - Duration::days(days_ago);
    store
        .put(
            Collection::Meals,
            id,
            json!({
                "id": id,
                "userId": user_id,
                "name": format!("Comida {id}"),
                "calories": calories,
                "createdAt": created.to_rfc3339(),
            }),
        )
        .await
        .unwrap();
}

/// Seed a finalized workout `days_ago` days before [`test_now`]
pub async fn seed_workout(store: &InMemoryStore, user_id: &str, id: &str, days_ago: i64) {
    let effective = test_now() - Duration::days(days_ago);
    store
        .put(
            Collection::Workouts,
            id,
            json!({
                "id": id,
                "userId": user_id,
                "name": format!("Entrenamiento {id}"),
                "durationMinutes": 45,
                "effectiveAt": effective.to_rfc3339(),
                "completed": true,
            }),
        )
        .await
        .unwrap();
}

/// Seed an externally produced insight, shaped as the analytics job writes it
pub async fn seed_insight(store: &InMemoryStore, user_id: &str, id: &str, title: &str) {
    store
        .put(
            Collection::Insights,
            id,
            json!({
                "userId": user_id,
                "type": "nutrition",
                "title": title,
                "description": format!("{title}: detalle de la observación"),
                "evidence": ["58g/día en la última semana"],
                "actionable": "Añade una fuente de proteína al desayuno",
            }),
        )
        .await
        .unwrap();
}

/// Seed a profile with a calorie target
pub async fn seed_profile(store: &InMemoryStore, user_id: &str, target_calories: u32) {
    store
        .put(
            Collection::Profiles,
            user_id,
            json!({
                "userId": user_id,
                "targetCalories": target_calories,
                "updatedAt": (test_now() - Duration::days(30)).to_rfc3339(),
            }),
        )
        .await
        .unwrap();
}
