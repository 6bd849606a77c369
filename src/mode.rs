// ABOUTME: History-gated selection between generic and personalized assistance
// ABOUTME: Pure function of usage aggregates plus configured thresholds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Mode Selector
//!
//! Decides whether a request runs in generic or personalized mode. A user
//! earns personalization by logging enough recent activity: distinct meal
//! days over the trailing week, or finalized workouts over the trailing two
//! weeks. The combination rule defaults to OR so either habit unlocks
//! personalization on its own; AND is available for stricter rollouts.

use crate::config::{CombinationRule, ModeGateConfig};
use crate::models::HistoryUsageSummary;
use serde::Serialize;

/// Assistance mode for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantMode {
    /// No personal data flows into the prompt; fixed template reply
    Generic,
    /// Full context summary and conversation history are used
    Personalized,
}

impl AssistantMode {
    /// Stable string form for structured logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Personalized => "personalized",
        }
    }
}

/// Applies the configured thresholds to a usage summary
#[derive(Debug, Clone, Copy)]
pub struct ModeSelector {
    config: ModeGateConfig,
}

impl ModeSelector {
    /// Create a selector with the given gate configuration
    #[must_use]
    pub const fn new(config: ModeGateConfig) -> Self {
        Self { config }
    }

    /// Select the mode for a request given the user's usage aggregates
    #[must_use]
    pub fn select_mode(&self, usage: &HistoryUsageSummary) -> AssistantMode {
        let enough_meals = usage.days_with_meals_7d >= self.config.meals_days_threshold;
        let enough_workouts = usage.workouts_14d >= self.config.workouts_threshold;

        let personalized = match self.config.rule {
            CombinationRule::Or => enough_meals || enough_workouts,
            CombinationRule::And => enough_meals && enough_workouts,
        };

        if personalized {
            AssistantMode::Personalized
        } else {
            AssistantMode::Generic
        }
    }
}
