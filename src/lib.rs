// ABOUTME: Conversational assistant backend for the MacroFit nutrition and training app
// ABOUTME: Admission, quotas, context caching, mode-gated prompting, completion with fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # MacroFit Assistant
//!
//! Backend core for MacroFit's in-app conversational assistant. A user
//! message flows through relevance admission, per-user rate limiting, a
//! versioned context cache, and a history-driven personalization gate before
//! either a fixed template (generic mode) or a deadline-bounded completion
//! call (personalized mode) produces the reply. Every admitted turn is
//! persisted into a bounded-history session and counted in daily analytics.
//!
//! The [`orchestrator`] module is the entry point; everything else is a
//! pipeline stage it composes.

pub mod analytics;
pub mod auth;
pub mod config;
pub mod context;
pub mod errors;
pub mod fallback;
pub mod history;
pub mod llm;
pub mod logging;
pub mod mode;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod rate_limiting;
pub mod relevance;
pub mod routes;
pub mod session;
pub mod store;
