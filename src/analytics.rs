// ABOUTME: Best-effort daily usage counters, merged atomically per date
// ABOUTME: Recording failures are logged and swallowed, never fail a request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Analytics Recorder
//!
//! Maintains one [`AnalyticsDailyRecord`] per calendar date: message totals,
//! unique users, running average latency, completion/fallback/error counts.
//! The merge runs inside the store's atomic update so concurrent requests
//! cannot lose increments. Recording is strictly best-effort; a failure here
//! must never fail the request it describes.

use crate::errors::{AppError, AppResult};
use crate::models::AnalyticsDailyRecord;
use crate::store::{Collection, DocumentStore, TxnOutcome};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

/// One request's contribution to the daily counters
#[derive(Debug, Clone)]
pub struct RequestSample {
    pub user_id: String,
    pub latency_ms: u64,
    /// Whether the request reached the completion service
    pub used_completion: bool,
    /// Whether the reply served was the deterministic fallback
    pub was_fallback: bool,
    /// Whether the request ended in an error surfaced to the caller
    pub was_error: bool,
}

/// Best-effort daily counter maintenance
pub struct AnalyticsRecorder {
    store: Arc<dyn DocumentStore>,
}

impl AnalyticsRecorder {
    /// Create a recorder over the given store
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Merge a request sample into today's record. Failures are logged at
    /// warn and swallowed.
    pub async fn record(&self, now: DateTime<Utc>, sample: RequestSample) {
        if let Err(error) = self.try_record(now, sample).await {
            warn!(%error, "analytics recording failed");
        }
    }

    async fn try_record(&self, now: DateTime<Utc>, sample: RequestSample) -> AppResult<()> {
        let date = now.date_naive();
        let key = date.format("%Y-%m-%d").to_string();

        self.store
            .update(
                Collection::DailyAnalytics,
                &key,
                Box::new(move |current| {
                    let mut record = current
                        .and_then(AnalyticsDailyRecord::from_document)
                        .unwrap_or_else(|| AnalyticsDailyRecord::new(date));

                    record.total_messages += 1;
                    if !record.user_ids.contains(&sample.user_id) {
                        record.user_ids.push(sample.user_id);
                    }

                    // Running average, no need to keep individual samples
                    let n = record.total_messages as f64;
                    let latency = sample.latency_ms as f64;
                    record.avg_latency_ms += (latency - record.avg_latency_ms) / n;

                    if sample.used_completion {
                        record.completion_calls += 1;
                    }
                    if sample.was_fallback {
                        record.fallback_count += 1;
                    }
                    if sample.was_error {
                        record.error_count += 1;
                    }

                    let document = serde_json::to_value(&record)
                        .map_err(|e| AppError::storage(format!("analytics encode failed: {e}")))?;
                    Ok(TxnOutcome {
                        result: serde_json::Value::Null,
                        document,
                    })
                }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 28, 16, 0, 0).unwrap()
    }

    fn sample(user: &str, latency: u64) -> RequestSample {
        RequestSample {
            user_id: user.to_owned(),
            latency_ms: latency,
            used_completion: true,
            was_fallback: false,
            was_error: false,
        }
    }

    async fn today(store: &InMemoryStore) -> AnalyticsDailyRecord {
        store
            .get(Collection::DailyAnalytics, "2026-08-28")
            .await
            .unwrap()
            .and_then(AnalyticsDailyRecord::from_document)
            .unwrap()
    }

    #[tokio::test]
    async fn test_counts_and_unique_users() {
        let store = Arc::new(InMemoryStore::new());
        let recorder = AnalyticsRecorder::new(store.clone());

        recorder.record(now(), sample("u1", 100)).await;
        recorder.record(now(), sample("u2", 200)).await;
        recorder.record(now(), sample("u1", 300)).await;

        let record = today(&store).await;
        assert_eq!(record.total_messages, 3);
        assert_eq!(record.unique_users(), 2);
        assert_eq!(record.completion_calls, 3);
    }

    #[tokio::test]
    async fn test_running_average_latency() {
        let store = Arc::new(InMemoryStore::new());
        let recorder = AnalyticsRecorder::new(store.clone());

        recorder.record(now(), sample("u1", 100)).await;
        recorder.record(now(), sample("u1", 300)).await;

        let record = today(&store).await;
        assert!((record.avg_latency_ms - 200.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_fallback_and_error_flags() {
        let store = Arc::new(InMemoryStore::new());
        let recorder = AnalyticsRecorder::new(store.clone());

        recorder
            .record(
                now(),
                RequestSample {
                    user_id: "u1".to_owned(),
                    latency_ms: 50,
                    used_completion: true,
                    was_fallback: true,
                    was_error: false,
                },
            )
            .await;
        recorder
            .record(
                now(),
                RequestSample {
                    user_id: "u1".to_owned(),
                    latency_ms: 10,
                    used_completion: false,
                    was_fallback: false,
                    was_error: true,
                },
            )
            .await;

        let record = today(&store).await;
        assert_eq!(record.fallback_count, 1);
        assert_eq!(record.error_count, 1);
        assert_eq!(record.completion_calls, 1);
    }
}
