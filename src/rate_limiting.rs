// ABOUTME: Per-user rate limiting with hourly and daily windowed counters
// ABOUTME: Check-and-increment runs inside the store's atomic update primitive
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Rate Limiter
//!
//! Enforces per-user hourly and daily request quotas. Counters live in one
//! [`RateLimitRecord`] per user; window starts are zeroed whenever the wall
//! clock crosses an hour or day boundary. The read-reset-check-increment
//! sequence runs inside [`DocumentStore::update`], so two concurrent requests
//! from the same user can never both be admitted past a ceiling.

use crate::config::RateLimitConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{from_document, RateLimitRecord};
use crate::store::{Collection, DocumentStore, TxnOutcome};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const HOUR_SECS: i64 = 3600;
const DAY_SECS: i64 = 86_400;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitDecision {
    /// Whether the request is admitted
    pub allowed: bool,
    /// Requests left in the current hourly window (post-admission)
    pub hourly_remaining: u32,
    /// Requests left in the current daily window (post-admission)
    pub daily_remaining: u32,
    /// Milliseconds until the nearer relevant window boundary, when denied
    pub retry_after_ms: Option<i64>,
    /// Whether the record is administratively blocked
    pub blocked: bool,
}

/// Per-user quota enforcement over the document store
pub struct RateLimiter {
    store: Arc<dyn DocumentStore>,
    config: RateLimitConfig,
}

/// Floor a timestamp to its window start
fn window_floor(now: DateTime<Utc>, window_secs: i64) -> DateTime<Utc> {
    let secs = now.timestamp();
    let start = secs - secs.rem_euclid(window_secs);
    DateTime::from_timestamp(start, 0).unwrap_or(now)
}

impl RateLimiter {
    /// Create a rate limiter with the given ceilings
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Check whether a request from `user_id` at `now` is admitted, and if
    /// so, atomically increment both counters and persist the record.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the transactional update fails.
    pub async fn check_rate_limit(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitDecision> {
        let hour_start = window_floor(now, HOUR_SECS);
        let day_start = window_floor(now, DAY_SECS);
        let config = self.config;
        let owner = user_id.to_owned();

        let result = self
            .store
            .update(
                Collection::RateLimits,
                user_id,
                Box::new(move |current| {
                    let mut record = current
                        .and_then(RateLimitRecord::from_document)
                        .unwrap_or_else(|| RateLimitRecord::new(owner, hour_start, day_start));

                    if record.hour_window_start != hour_start {
                        record.hourly_count = 0;
                        record.hour_window_start = hour_start;
                    }
                    if record.day_window_start != day_start {
                        record.daily_count = 0;
                        record.day_window_start = day_start;
                    }

                    let over_hour = record.hourly_count >= config.hourly_ceiling;
                    let over_day = record.daily_count >= config.daily_ceiling;
                    let allowed = !record.blocked && !over_hour && !over_day;

                    if allowed {
                        record.hourly_count += 1;
                        record.daily_count += 1;
                    }

                    let retry_after_ms = if allowed || record.blocked {
                        None
                    } else {
                        let until_next_hour =
                            (hour_start + Duration::seconds(HOUR_SECS) - now).num_milliseconds();
                        let until_next_day =
                            (day_start + Duration::seconds(DAY_SECS) - now).num_milliseconds();
                        Some(match (over_hour, over_day) {
                            (true, false) => until_next_hour,
                            (false, true) => until_next_day,
                            _ => until_next_hour.min(until_next_day),
                        })
                    };

                    let decision = RateLimitDecision {
                        allowed,
                        hourly_remaining: config.hourly_ceiling.saturating_sub(record.hourly_count),
                        daily_remaining: config.daily_ceiling.saturating_sub(record.daily_count),
                        retry_after_ms,
                        blocked: record.blocked,
                    };

                    Ok(TxnOutcome {
                        document: serde_json::to_value(&record)
                            .map_err(|e| AppError::storage(e.to_string()))?,
                        result: serde_json::to_value(&decision)
                            .map_err(|e| AppError::storage(e.to_string()))?,
                    })
                }),
            )
            .await?;

        from_document(result)
            .ok_or_else(|| AppError::internal("rate limit decision round-trip failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use chrono::TimeZone;

    fn limiter(hourly: u32, daily: u32) -> RateLimiter {
        RateLimiter::new(
            Arc::new(InMemoryStore::new()),
            RateLimitConfig {
                hourly_ceiling: hourly,
                daily_ceiling: daily,
            },
        )
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 28, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_denies_past_hourly_ceiling_with_retry_hint() {
        let limiter = limiter(20, 100);
        let now = at(10, 30);
        for _ in 0..20 {
            assert!(limiter.check_rate_limit("u1", now).await.unwrap().allowed);
        }
        let denied = limiter.check_rate_limit("u1", now).await.unwrap();
        assert!(!denied.allowed);
        // Denied at 10:30, next hourly boundary at 11:00
        assert_eq!(denied.retry_after_ms, Some(30 * 60 * 1000));
    }

    #[tokio::test]
    async fn test_hourly_window_resets_at_boundary() {
        let limiter = limiter(2, 100);
        let now = at(10, 59);
        assert!(limiter.check_rate_limit("u1", now).await.unwrap().allowed);
        assert!(limiter.check_rate_limit("u1", now).await.unwrap().allowed);
        assert!(!limiter.check_rate_limit("u1", now).await.unwrap().allowed);

        let next_hour = at(11, 0);
        let decision = limiter.check_rate_limit("u1", next_hour).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.hourly_remaining, 1);
    }

    #[tokio::test]
    async fn test_daily_ceiling_survives_hourly_reset() {
        let limiter = limiter(100, 3);
        for minute in 0..3 {
            assert!(limiter
                .check_rate_limit("u1", at(9, minute))
                .await
                .unwrap()
                .allowed);
        }
        // A later hour does not reset the daily count
        let denied = limiter.check_rate_limit("u1", at(15, 0)).await.unwrap();
        assert!(!denied.allowed);
        assert!(denied.retry_after_ms.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_concurrent_checks_never_exceed_ceiling() {
        let limiter = Arc::new(limiter(1, 100));
        let now = at(12, 0);
        let a = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.check_rate_limit("u1", now).await.unwrap() })
        };
        let b = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.check_rate_limit("u1", now).await.unwrap() })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(
            u32::from(a.allowed) + u32::from(b.allowed),
            1,
            "exactly one of two concurrent requests may pass a ceiling of 1"
        );
    }

    #[tokio::test]
    async fn test_separate_users_do_not_interfere() {
        let limiter = limiter(1, 1);
        let now = at(8, 0);
        assert!(limiter.check_rate_limit("u1", now).await.unwrap().allowed);
        assert!(limiter.check_rate_limit("u2", now).await.unwrap().allowed);
        assert!(!limiter.check_rate_limit("u1", now).await.unwrap().allowed);
    }
}
