// ABOUTME: Versioned read-through cache of summarized user activity
// ABOUTME: Keyed by data-version fingerprint so upstream changes invalidate implicitly
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Context Cache
//!
//! Builds the [`UserContextSummary`] handed to the prompt builder. Entries
//! are keyed by (user, data-version fingerprint), where the fingerprint
//! derives from the latest profile/meal/workout update times: any upstream
//! change produces a new key, so stale entries are simply never read again
//! and no explicit invalidation exists. Concurrent writers of the same key
//! overwrite each other with equivalent data, which is safe because the
//! content is a pure function of the fingerprint.

use crate::config::ContextCacheConfig;
use crate::errors::AppResult;
use crate::models::{
    ContextCacheEntry, MealEntry, MealSummary, PersonalInsight, UserContextSummary, UserProfile,
    WeeklyAggregate, WorkoutEntry, WorkoutSummary,
};
use crate::store::{Collection, DocumentStore};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

const WEEKLY_WINDOW_DAYS: i64 = 7;

/// Result of a context lookup
#[derive(Debug, Clone)]
pub struct ContextLookup {
    /// The summarized view of the user's recent activity
    pub summary: UserContextSummary,
    /// Data-version fingerprint the summary was computed for
    pub fingerprint: String,
    /// Whether the summary came from an unexpired cache entry
    pub cache_hit: bool,
}

/// Read-through context cache over the document store
pub struct ContextCache {
    store: Arc<dyn DocumentStore>,
    config: ContextCacheConfig,
    max_insights: usize,
}

impl ContextCache {
    /// Create a context cache
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: ContextCacheConfig,
        max_insights: usize,
    ) -> Self {
        Self {
            store,
            config,
            max_insights,
        }
    }

    /// Build (or fetch) the context summary for `user_id` as of `now`
    ///
    /// # Errors
    ///
    /// Returns a storage error if any upstream read fails.
    pub async fn build_user_context(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ContextLookup> {
        let owner = json!(user_id);

        let profile = self
            .store
            .get(Collection::Profiles, user_id)
            .await?
            .and_then(UserProfile::from_document);

        let meals: Vec<MealEntry> = self
            .store
            .query_by_field(Collection::Meals, "userId", &owner)
            .await?
            .into_iter()
            .filter_map(MealEntry::from_document)
            .collect();

        let workouts: Vec<WorkoutEntry> = self
            .store
            .query_by_field(Collection::Workouts, "userId", &owner)
            .await?
            .into_iter()
            .filter_map(WorkoutEntry::from_document)
            .filter(WorkoutEntry::is_finalized)
            .collect();

        let fingerprint = Self::fingerprint(profile.as_ref(), &meals, &workouts);
        let cache_key = format!("{user_id}:{fingerprint}");

        if let Some(entry) = self
            .store
            .get(Collection::ContextCache, &cache_key)
            .await?
            .and_then(ContextCacheEntry::from_document)
        {
            if !entry.is_expired(now) {
                debug!(user_id, fingerprint, "context cache hit");
                return Ok(ContextLookup {
                    summary: entry.summary,
                    fingerprint,
                    cache_hit: true,
                });
            }
        }

        let summary = self
            .compute_summary(user_id, now, profile.as_ref(), &meals, &workouts)
            .await?;

        // All-empty summaries are never cached; recomputing them is free
        if !summary.is_empty() {
            let entry = ContextCacheEntry {
                user_id: user_id.to_owned(),
                fingerprint: fingerprint.clone(),
                updated_at: now,
                expires_at: now
                    + Duration::seconds(i64::try_from(self.config.ttl_secs).unwrap_or(i64::MAX)),
                summary: summary.clone(),
            };
            if let Ok(document) = serde_json::to_value(&entry) {
                self.store
                    .put(Collection::ContextCache, &cache_key, document)
                    .await?;
            }
        }

        debug!(user_id, fingerprint, "context cache miss, recomputed");
        Ok(ContextLookup {
            summary,
            fingerprint,
            cache_hit: false,
        })
    }

    /// Data-version fingerprint: the maximum of the latest profile update,
    /// meal creation, and workout effective times, in epoch milliseconds
    fn fingerprint(
        profile: Option<&UserProfile>,
        meals: &[MealEntry],
        workouts: &[WorkoutEntry],
    ) -> String {
        let mut latest: i64 = 0;
        if let Some(profile) = profile {
            latest = latest.max(profile.updated_at.timestamp_millis());
        }
        if let Some(ts) = meals.iter().map(|m| m.created_at.timestamp_millis()).max() {
            latest = latest.max(ts);
        }
        if let Some(ts) = workouts
            .iter()
            .map(|w| w.effective_at.timestamp_millis())
            .max()
        {
            latest = latest.max(ts);
        }
        format!("v{latest}")
    }

    async fn compute_summary(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        profile: Option<&UserProfile>,
        meals: &[MealEntry],
        workouts: &[WorkoutEntry],
    ) -> AppResult<UserContextSummary> {
        let today = now.date_naive();
        let weekly_cutoff = now - Duration::days(WEEKLY_WINDOW_DAYS);

        let today_meals: Vec<&MealEntry> = meals
            .iter()
            .filter(|m| m.created_at.date_naive() == today && m.created_at <= now)
            .collect();
        let total_calories_today = if today_meals.is_empty() {
            None
        } else {
            Some(today_meals.iter().map(|m| m.calories).sum())
        };

        let last_meal = meals
            .iter()
            .filter(|m| m.created_at <= now)
            .max_by_key(|m| m.created_at)
            .map(|m| MealSummary {
                name: m.name.clone(),
                calories: m.calories,
                at: m.created_at,
            });

        let last_workout = workouts
            .iter()
            .filter(|w| w.effective_at <= now)
            .max_by_key(|w| w.effective_at)
            .map(|w| WorkoutSummary {
                name: w.name.clone(),
                duration_minutes: w.duration_minutes,
                at: w.effective_at,
                performance_score: w.performance_score,
            });

        let weekly = WeeklyAggregate {
            workout_count: u32::try_from(
                workouts
                    .iter()
                    .filter(|w| w.effective_at > weekly_cutoff && w.effective_at <= now)
                    .count(),
            )
            .unwrap_or(u32::MAX),
            total_calories: meals
                .iter()
                .filter(|m| m.created_at > weekly_cutoff && m.created_at <= now)
                .map(|m| m.calories)
                .sum(),
        };

        let insights: Vec<_> = self
            .store
            .query_by_field(Collection::Insights, "userId", &json!(user_id))
            .await?
            .into_iter()
            .filter_map(PersonalInsight::from_document)
            .take(self.max_insights)
            .map(|insight| insight.summary())
            .collect();

        Ok(UserContextSummary {
            total_calories_today,
            target_calories: profile.and_then(|p| p.target_calories),
            last_meal,
            last_workout,
            weekly,
            insights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 28, 14, 0, 0).unwrap()
    }

    fn cache(store: Arc<InMemoryStore>) -> ContextCache {
        ContextCache::new(store, ContextCacheConfig { ttl_secs: 900 }, 3)
    }

    async fn seed_meal(store: &InMemoryStore, id: &str, calories: u32, hours_ago: i64) {
        let created = now() - Duration::hours(hours_ago);
        store
            .put(
                Collection::Meals,
                id,
                json!({
                    "id": id, "userId": "u1", "name": format!("Meal {id}"),
                    "calories": calories, "createdAt": created.to_rfc3339(),
                }),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_miss_then_hit_with_identical_summary() {
        let store = Arc::new(InMemoryStore::new());
        seed_meal(&store, "m1", 600, 2).await;
        let cache = cache(store);

        let first = cache.build_user_context("u1", now()).await.unwrap();
        assert!(!first.cache_hit);
        assert_eq!(first.summary.total_calories_today, Some(600));

        let second = cache.build_user_context("u1", now()).await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.fingerprint, first.fingerprint);
        assert_eq!(second.summary, first.summary);
    }

    #[tokio::test]
    async fn test_new_data_changes_fingerprint() {
        let store = Arc::new(InMemoryStore::new());
        seed_meal(&store, "m1", 600, 5).await;
        let cache = cache(store.clone());

        let first = cache.build_user_context("u1", now()).await.unwrap();
        seed_meal(&store, "m2", 300, 1).await;
        let second = cache.build_user_context("u1", now()).await.unwrap();

        assert_ne!(second.fingerprint, first.fingerprint);
        assert!(!second.cache_hit);
        assert_eq!(second.summary.total_calories_today, Some(900));
    }

    #[tokio::test]
    async fn test_expired_entry_is_not_read() {
        let store = Arc::new(InMemoryStore::new());
        seed_meal(&store, "m1", 600, 2).await;
        let cache = cache(store);

        let first = cache.build_user_context("u1", now()).await.unwrap();
        assert!(!first.cache_hit);

        let past_ttl = now() + Duration::seconds(901);
        let third = cache.build_user_context("u1", past_ttl).await.unwrap();
        assert!(!third.cache_hit);
    }

    #[tokio::test]
    async fn test_empty_summary_never_cached() {
        let store = Arc::new(InMemoryStore::new());
        let cache = cache(store.clone());

        let lookup = cache.build_user_context("nobody", now()).await.unwrap();
        assert!(!lookup.cache_hit);
        assert!(lookup.summary.is_empty());
        assert_eq!(lookup.fingerprint, "v0");

        let cached = store
            .get(Collection::ContextCache, "nobody:v0")
            .await
            .unwrap();
        assert!(cached.is_none());
    }
}
