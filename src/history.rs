// ABOUTME: Trailing-window usage aggregates that gate personalization
// ABOUTME: Pure aggregation recomputed every request, never persisted
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # History Usage Summarizer
//!
//! Computes the lightweight aggregates the mode selector gates on: distinct
//! meal days and total meals over the trailing 7 days, distinct workout days
//! and finalized workouts over the trailing 14 days. Cheap enough to
//! recompute on every request, which keeps the gate fresh.

use crate::errors::AppResult;
use crate::models::{HistoryUsageSummary, MealEntry, WorkoutEntry};
use crate::store::{Collection, DocumentStore};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

const MEAL_WINDOW_DAYS: i64 = 7;
const WORKOUT_WINDOW_DAYS: i64 = 14;

/// Computes gating aggregates from the user's logged history
pub struct HistoryUsageSummarizer {
    store: Arc<dyn DocumentStore>,
}

impl HistoryUsageSummarizer {
    /// Create a summarizer over the given store
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Compute the usage summary for `user_id` as of `now`
    ///
    /// # Errors
    ///
    /// Returns a storage error if either query fails. Malformed stored
    /// records are skipped (fail closed), never counted.
    pub async fn compute_history_summary(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<HistoryUsageSummary> {
        let meal_cutoff = now - Duration::days(MEAL_WINDOW_DAYS);
        let workout_cutoff = now - Duration::days(WORKOUT_WINDOW_DAYS);
        let owner = json!(user_id);

        let meal_docs = self
            .store
            .query_by_field(Collection::Meals, "userId", &owner)
            .await?;
        let mut meal_days = HashSet::new();
        let mut meals_7d = 0u32;
        for meal in meal_docs.into_iter().filter_map(MealEntry::from_document) {
            if meal.created_at > meal_cutoff && meal.created_at <= now {
                meals_7d += 1;
                meal_days.insert(meal.created_at.date_naive());
            }
        }

        let workout_docs = self
            .store
            .query_by_field(Collection::Workouts, "userId", &owner)
            .await?;
        let mut workout_days = HashSet::new();
        let mut workouts_14d = 0u32;
        for workout in workout_docs
            .into_iter()
            .filter_map(WorkoutEntry::from_document)
        {
            if workout.is_finalized()
                && workout.effective_at > workout_cutoff
                && workout.effective_at <= now
            {
                workouts_14d += 1;
                workout_days.insert(workout.effective_at.date_naive());
            }
        }

        Ok(HistoryUsageSummary {
            days_with_meals_7d: u32::try_from(meal_days.len()).unwrap_or(u32::MAX),
            meals_7d,
            days_with_workouts_14d: u32::try_from(workout_days.len()).unwrap_or(u32::MAX),
            workouts_14d,
        })
    }
}
