// ABOUTME: Logging configuration and structured logging setup for the assistant backend
// ABOUTME: Configures log levels and output format from environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! Structured logging configuration built on `tracing`.
//!
//! Production deployments log JSON (`LOG_FORMAT=json`); development defaults
//! to the pretty formatter. The mode-gating audit events emitted by the
//! orchestrator rely on structured fields, so JSON output is recommended
//! wherever those events are collected.

use std::env;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Service name used in startup logs
pub const SERVICE_NAME: &str = "macrofit-assistant";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Environment (development, staging, production)
    pub environment: String,
}

/// Log output format options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for space-constrained environments
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            environment: "development".into(),
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            Ok("pretty") => LogFormat::Pretty,
            // Production defaults to JSON unless overridden
            _ if environment == "production" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            level,
            format,
            environment,
        }
    }

    /// Initialize the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed.
    pub fn init(&self) -> anyhow::Result<()> {
        let filter = EnvFilter::try_new(&self.level)
            .or_else(|_| EnvFilter::try_new("info"))
            .map_err(|e| anyhow::anyhow!("invalid log filter: {e}"))?;

        match self.format {
            LogFormat::Json => {
                fmt()
                    .with_env_filter(filter)
                    .json()
                    .with_current_span(false)
                    .try_init()
                    .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
            }
            LogFormat::Pretty => {
                fmt()
                    .with_env_filter(filter)
                    .pretty()
                    .try_init()
                    .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
            }
            LogFormat::Compact => {
                fmt()
                    .with_env_filter(filter)
                    .compact()
                    .try_init()
                    .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
            }
        }

        info!(
            service = SERVICE_NAME,
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.environment,
            "logging initialized"
        );

        Ok(())
    }
}
