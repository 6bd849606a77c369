// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses env vars into typed config with warn-and-default fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! Environment-based configuration for the assistant request pipeline.
//!
//! All knobs have production defaults so a bare environment boots a working
//! server; unparseable values fall back to the default with a warning rather
//! than aborting startup.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Default hourly request ceiling per user
pub const DEFAULT_HOURLY_CEILING: u32 = 20;
/// Default daily request ceiling per user
pub const DEFAULT_DAILY_CEILING: u32 = 100;
/// Default context cache TTL in seconds (15 minutes)
pub const DEFAULT_CONTEXT_TTL_SECS: u64 = 15 * 60;
/// Default bounded session history window (messages retained)
pub const DEFAULT_HISTORY_WINDOW: usize = 20;
/// Default completion deadline in seconds (single authoritative value, no slack)
pub const DEFAULT_COMPLETION_DEADLINE_SECS: u64 = 8;
/// Default maximum inbound message length in characters
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 500;
/// Default days-with-meals threshold for the personalization gate
pub const DEFAULT_MEALS_DAYS_THRESHOLD: u32 = 3;
/// Default finalized-workouts threshold for the personalization gate
pub const DEFAULT_WORKOUTS_THRESHOLD: u32 = 2;
/// Default maximum insights included in a personalized prompt
pub const DEFAULT_MAX_INSIGHTS: usize = 3;

/// Parse an environment variable, falling back to a default on absence or
/// parse failure (with a warning for the latter)
fn env_parse_or<T: FromStr + Copy + std::fmt::Display>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid value for {var}: {raw:?}, using default {default}");
            default
        }),
        Err(_) => default,
    }
}

/// How the two personalization predicates are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CombinationRule {
    /// Either predicate alone suffices (default)
    #[default]
    Or,
    /// Both predicates must hold
    And,
}

impl CombinationRule {
    /// Parse from string with fallback to the default
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "and" => Self::And,
            "or" => Self::Or,
            other => {
                warn!("Unknown combination rule {other:?}, using OR");
                Self::Or
            }
        }
    }
}

/// Per-user request quota ceilings
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per hourly window
    pub hourly_ceiling: u32,
    /// Maximum admitted requests per daily window
    pub daily_ceiling: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            hourly_ceiling: DEFAULT_HOURLY_CEILING,
            daily_ceiling: DEFAULT_DAILY_CEILING,
        }
    }
}

/// Context cache behavior
#[derive(Debug, Clone, Copy)]
pub struct ContextCacheConfig {
    /// Entry time-to-live in seconds
    pub ttl_secs: u64,
}

impl ContextCacheConfig {
    /// TTL as a `Duration`
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ContextCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CONTEXT_TTL_SECS,
        }
    }
}

/// Session history retention
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Number of most-recent messages retained per session
    pub history_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

/// Completion service call configuration
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Hard deadline for a single completion call, in seconds
    pub deadline_secs: u64,
    /// OpenAI-compatible API base URL
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// API key, if the endpoint requires one
    pub api_key: Option<String>,
}

impl CompletionConfig {
    /// Deadline as a `Duration`
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            deadline_secs: DEFAULT_COMPLETION_DEADLINE_SECS,
            base_url: "http://localhost:11434/v1".into(),
            model: "llama-3.1-8b-instant".into(),
            api_key: None,
        }
    }
}

/// Personalization gate thresholds and combination rule
#[derive(Debug, Clone, Copy)]
pub struct ModeGateConfig {
    /// Minimum distinct days with meals in the trailing 7 days
    pub meals_days_threshold: u32,
    /// Minimum finalized workouts in the trailing 14 days
    pub workouts_threshold: u32,
    /// How the two predicates combine
    pub rule: CombinationRule,
}

impl Default for ModeGateConfig {
    fn default() -> Self {
        Self {
            meals_days_threshold: DEFAULT_MEALS_DAYS_THRESHOLD,
            workouts_threshold: DEFAULT_WORKOUTS_THRESHOLD,
            rule: CombinationRule::Or,
        }
    }
}

/// Inbound request validation limits
#[derive(Debug, Clone, Copy)]
pub struct InputLimits {
    /// Maximum message length in characters
    pub max_message_chars: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
        }
    }
}

/// Top-level configuration for the assistant backend
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// HTTP listen port (server binary only)
    pub http_port: u16,
    /// Secret for verifying platform-issued bearer tokens
    pub jwt_secret: Option<String>,
    /// Per-user quota ceilings
    pub rate_limits: RateLimitConfig,
    /// Context cache behavior
    pub context_cache: ContextCacheConfig,
    /// Session history retention
    pub session: SessionConfig,
    /// Completion service call configuration
    pub completion: CompletionConfig,
    /// Personalization gate configuration
    pub mode_gate: ModeGateConfig,
    /// Inbound request limits
    pub limits: InputLimits,
    /// Maximum insights included in a personalized prompt
    pub max_insights: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            jwt_secret: None,
            rate_limits: RateLimitConfig::default(),
            context_cache: ContextCacheConfig::default(),
            session: SessionConfig::default(),
            completion: CompletionConfig::default(),
            mode_gate: ModeGateConfig::default(),
            limits: InputLimits::default(),
            max_insights: DEFAULT_MAX_INSIGHTS,
        }
    }
}

impl AssistantConfig {
    /// Load configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            http_port: env_parse_or("MACROFIT_HTTP_PORT", 8080),
            jwt_secret: env::var("MACROFIT_JWT_SECRET").ok(),
            rate_limits: RateLimitConfig {
                hourly_ceiling: env_parse_or("MACROFIT_HOURLY_LIMIT", DEFAULT_HOURLY_CEILING),
                daily_ceiling: env_parse_or("MACROFIT_DAILY_LIMIT", DEFAULT_DAILY_CEILING),
            },
            context_cache: ContextCacheConfig {
                ttl_secs: env_parse_or("MACROFIT_CONTEXT_TTL_SECS", DEFAULT_CONTEXT_TTL_SECS),
            },
            session: SessionConfig {
                history_window: env_parse_or("MACROFIT_HISTORY_WINDOW", DEFAULT_HISTORY_WINDOW),
            },
            completion: CompletionConfig {
                deadline_secs: env_parse_or(
                    "MACROFIT_COMPLETION_DEADLINE_SECS",
                    DEFAULT_COMPLETION_DEADLINE_SECS,
                ),
                base_url: env::var("MACROFIT_LLM_BASE_URL")
                    .unwrap_or_else(|_| CompletionConfig::default().base_url),
                model: env::var("MACROFIT_LLM_MODEL")
                    .unwrap_or_else(|_| CompletionConfig::default().model),
                api_key: env::var("MACROFIT_LLM_API_KEY").ok(),
            },
            mode_gate: ModeGateConfig {
                meals_days_threshold: env_parse_or(
                    "MACROFIT_MEALS_DAYS_THRESHOLD",
                    DEFAULT_MEALS_DAYS_THRESHOLD,
                ),
                workouts_threshold: env_parse_or(
                    "MACROFIT_WORKOUTS_THRESHOLD",
                    DEFAULT_WORKOUTS_THRESHOLD,
                ),
                rule: env::var("MACROFIT_MODE_RULE")
                    .map_or(CombinationRule::Or, |s| {
                        CombinationRule::from_str_or_default(&s)
                    }),
            },
            limits: InputLimits {
                max_message_chars: env_parse_or(
                    "MACROFIT_MAX_MESSAGE_CHARS",
                    DEFAULT_MAX_MESSAGE_CHARS,
                ),
            },
            max_insights: env_parse_or("MACROFIT_MAX_INSIGHTS", DEFAULT_MAX_INSIGHTS),
        }
    }
}
