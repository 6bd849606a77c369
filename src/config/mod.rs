// ABOUTME: Configuration module for the assistant backend
// ABOUTME: Re-exports the environment-driven configuration types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! Environment-driven configuration for the assistant backend

pub mod environment;

pub use environment::{
    AssistantConfig, CombinationRule, CompletionConfig, ContextCacheConfig, InputLimits,
    ModeGateConfig, RateLimitConfig, SessionConfig,
};
