// ABOUTME: Core data models for sessions, quotas, context summaries and analytics
// ABOUTME: Stored documents use camelCase fields and fail-closed validating constructors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Data Models
//!
//! Typed records for everything the assistant pipeline reads or writes
//! through the document store. Stored documents are camelCase JSON; each
//! record offers a [`from_document`]-style constructor that fails closed,
//! treating malformed stored data as absent instead of propagating
//! undefined fields into the pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Deserialize a stored document, failing closed on malformed data
pub fn from_document<T: DeserializeOwned>(value: serde_json::Value) -> Option<T> {
    serde_json::from_value(value).ok()
}

// ============================================================================
// Chat Sessions & Messages
// ============================================================================

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// End-user input
    User,
    /// Assistant reply
    Assistant,
}

impl MessageRole {
    /// String form used in completion payloads
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single exchanged message. Immutable once written; owned by its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message identifier (used for append idempotence)
    pub id: String,
    /// Sender role
    pub role: MessageRole,
    /// Message text
    pub content: String,
    /// When the message was exchanged
    pub timestamp: DateTime<Utc>,
    /// Token usage for assistant replies, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    /// Response latency for assistant replies, when measured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

impl ChatMessage {
    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::User,
            content: content.into(),
            timestamp,
            tokens_used: None,
            response_time_ms: None,
        }
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp,
            tokens_used: None,
            response_time_ms: None,
        }
    }

    /// Attach token usage
    #[must_use]
    pub const fn with_tokens(mut self, tokens: Option<u32>) -> Self {
        self.tokens_used = tokens;
        self
    }

    /// Attach measured response latency
    #[must_use]
    pub const fn with_latency(mut self, latency_ms: u64) -> Self {
        self.response_time_ms = Some(latency_ms);
        self
    }
}

/// A conversation session with a bounded recent-message window.
///
/// Never hard-deleted by this core; lifecycle ends when the owning user's
/// data is purged externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Session identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
    /// Total messages ever exchanged (not capped by the window)
    pub message_count: u32,
    /// Active flag
    pub active: bool,
    /// Most recent messages, size-capped, oldest dropped on overflow
    #[serde(default)]
    pub recent_messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// Create a new empty session for a user
    #[must_use]
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            created_at: now,
            updated_at: now,
            message_count: 0,
            active: true,
            recent_messages: Vec::new(),
        }
    }

    /// Validating constructor over a stored document; fails closed
    #[must_use]
    pub fn from_document(value: serde_json::Value) -> Option<Self> {
        from_document(value)
    }
}

// ============================================================================
// Rate Limiting
// ============================================================================

/// Per-user windowed request counters. One record per user, mutated
/// transactionally on every admitted request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    /// Owning user
    pub user_id: String,
    /// Requests admitted in the current hourly window
    pub hourly_count: u32,
    /// Requests admitted in the current daily window
    pub daily_count: u32,
    /// Start of the current hourly window
    pub hour_window_start: DateTime<Utc>,
    /// Start of the current daily window
    pub day_window_start: DateTime<Utc>,
    /// Administrative block flag
    pub blocked: bool,
}

impl RateLimitRecord {
    /// Fresh record with both windows anchored at their current boundaries
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        hour_start: DateTime<Utc>,
        day_start: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            hourly_count: 0,
            daily_count: 0,
            hour_window_start: hour_start,
            day_window_start: day_start,
            blocked: false,
        }
    }

    /// Validating constructor over a stored document; fails closed
    #[must_use]
    pub fn from_document(value: serde_json::Value) -> Option<Self> {
        from_document(value)
    }
}

// ============================================================================
// Upstream User Data (read-only collaborators)
// ============================================================================

/// User profile record, read-only for this core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Owning user
    pub user_id: String,
    /// Configured daily calorie target
    #[serde(default)]
    pub target_calories: Option<u32>,
    /// Last profile update
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Validating constructor over a stored document; fails closed
    #[must_use]
    pub fn from_document(value: serde_json::Value) -> Option<Self> {
        from_document(value)
    }
}

/// Logged meal record, read-only for this core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealEntry {
    /// Record identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Meal name
    pub name: String,
    /// Calories for this meal
    pub calories: u32,
    /// When the meal was logged
    pub created_at: DateTime<Utc>,
}

impl MealEntry {
    /// Validating constructor over a stored document; fails closed
    #[must_use]
    pub fn from_document(value: serde_json::Value) -> Option<Self> {
        from_document(value)
    }
}

/// Logged workout record, read-only for this core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutEntry {
    /// Record identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Workout name
    pub name: String,
    /// Duration in minutes
    pub duration_minutes: u32,
    /// Effective time of the workout
    pub effective_at: DateTime<Utc>,
    /// Explicit completion marker (absent on legacy records)
    #[serde(default)]
    pub completed: bool,
    /// Completion timestamp (legacy records carry only this)
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Optional performance score
    #[serde(default)]
    pub performance_score: Option<f32>,
}

impl WorkoutEntry {
    /// Whether this workout counts as finalized: explicit completion marker,
    /// or a completion timestamp on legacy records lacking the marker
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.completed || self.completed_at.is_some()
    }

    /// Validating constructor over a stored document; fails closed
    #[must_use]
    pub fn from_document(value: serde_json::Value) -> Option<Self> {
        from_document(value)
    }
}

/// Externally computed personal insight, consumed but never produced here
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInsight {
    /// Insight category; stored as `type` by the analytics job
    #[serde(rename = "type")]
    pub insight_type: String,
    /// Short title
    pub title: String,
    /// Longer description
    pub description: String,
    /// Supporting evidence lines
    #[serde(default)]
    pub evidence: Vec<String>,
    /// One actionable suggestion
    #[serde(default)]
    pub actionable: String,
}

impl PersonalInsight {
    /// Condensed form carried in context summaries and prompts
    #[must_use]
    pub fn summary(&self) -> InsightSummary {
        InsightSummary {
            insight_type: self.insight_type.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            key_evidence: self.evidence.first().cloned(),
            actionable: self.actionable.clone(),
        }
    }

    /// Validating constructor over a stored document; fails closed
    #[must_use]
    pub fn from_document(value: serde_json::Value) -> Option<Self> {
        from_document(value)
    }
}

/// Condensed insight carried in summaries and prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightSummary {
    pub insight_type: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub key_evidence: Option<String>,
    pub actionable: String,
}

// ============================================================================
// Context Summaries
// ============================================================================

/// Most recent meal, condensed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSummary {
    pub name: String,
    pub calories: u32,
    pub at: DateTime<Utc>,
}

/// Most recent workout, condensed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSummary {
    pub name: String,
    pub duration_minutes: u32,
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub performance_score: Option<f32>,
}

/// Trailing-7-day aggregate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyAggregate {
    /// Workouts in the trailing 7 days
    pub workout_count: u32,
    /// Meal calories summed over the trailing 7 days
    pub total_calories: u32,
}

/// Summarized view of a user's recent activity, cached per data version.
///
/// Invariant: when handed to the prompt builder in GENERIC mode, the
/// daily-specific fields (`totalCaloriesToday`, `lastMeal`, `lastWorkout`)
/// must all be null. See [`UserContextSummary::redact_daily_fields`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContextSummary {
    /// Total calories logged today, if any meal was logged today
    #[serde(default)]
    pub total_calories_today: Option<u32>,
    /// Configured daily calorie target
    #[serde(default)]
    pub target_calories: Option<u32>,
    /// Most recent meal
    #[serde(default)]
    pub last_meal: Option<MealSummary>,
    /// Most recent workout
    #[serde(default)]
    pub last_workout: Option<WorkoutSummary>,
    /// Trailing-7-day aggregate
    #[serde(default)]
    pub weekly: WeeklyAggregate,
    /// Up to three externally supplied insights
    #[serde(default)]
    pub insights: Vec<InsightSummary>,
}

impl UserContextSummary {
    /// Whether the summary carries no data at all. All-empty summaries are
    /// never cached, so a user with zero history recomputes every time.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_calories_today.is_none()
            && self.target_calories.is_none()
            && self.last_meal.is_none()
            && self.last_workout.is_none()
            && self.weekly == WeeklyAggregate::default()
            && self.insights.is_empty()
    }

    /// Null out daily-specific fields before GENERIC-mode processing.
    /// Second independent safeguard against personal-data leakage.
    pub fn redact_daily_fields(&mut self) {
        self.total_calories_today = None;
        self.last_meal = None;
        self.last_workout = None;
    }
}

/// Cached context summary keyed by (user, data-version fingerprint).
///
/// Any upstream data change produces a new fingerprint, so stale entries are
/// never read again; no explicit invalidation exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextCacheEntry {
    /// Owning user
    pub user_id: String,
    /// Data-version fingerprint
    pub fingerprint: String,
    /// When the entry was computed
    pub updated_at: DateTime<Utc>,
    /// Entry expiry; never read past this time
    pub expires_at: DateTime<Utc>,
    /// Cached summary payload
    pub summary: UserContextSummary,
}

impl ContextCacheEntry {
    /// Whether this entry is past its expiry time
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Validating constructor over a stored document; fails closed
    #[must_use]
    pub fn from_document(value: serde_json::Value) -> Option<Self> {
        from_document(value)
    }
}

// ============================================================================
// History Usage (gating aggregates, never persisted)
// ============================================================================

/// Lightweight aggregates that gate the personalization mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryUsageSummary {
    /// Distinct days with at least one meal in the trailing 7 days
    pub days_with_meals_7d: u32,
    /// Total meals in the trailing 7 days
    pub meals_7d: u32,
    /// Distinct days with at least one finalized workout in the trailing 14 days
    pub days_with_workouts_14d: u32,
    /// Total finalized workouts in the trailing 14 days
    pub workouts_14d: u32,
}

// ============================================================================
// Analytics
// ============================================================================

/// Daily aggregate counters, updated via merge-increment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsDailyRecord {
    /// Calendar date key
    pub date: NaiveDate,
    /// Total messages handled
    pub total_messages: u64,
    /// Users seen today; unique-user count is this set's size
    #[serde(default)]
    pub user_ids: Vec<String>,
    /// Running average response latency in milliseconds
    pub avg_latency_ms: f64,
    /// Calls that reached the completion service
    pub completion_calls: u64,
    /// Fallback responses served
    pub fallback_count: u64,
    /// Errors surfaced
    pub error_count: u64,
}

impl AnalyticsDailyRecord {
    /// Empty record for a date
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date,
            total_messages: 0,
            user_ids: Vec::new(),
            avg_latency_ms: 0.0,
            completion_calls: 0,
            fallback_count: 0,
            error_count: 0,
        }
    }

    /// Unique users seen on this date
    #[must_use]
    pub fn unique_users(&self) -> usize {
        self.user_ids.len()
    }

    /// Validating constructor over a stored document; fails closed
    #[must_use]
    pub fn from_document(value: serde_json::Value) -> Option<Self> {
        from_document(value)
    }
}

// ============================================================================
// Reply Classification
// ============================================================================

/// Reply category, used only for UI styling by the external client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyType {
    Normal,
    Recommendation,
    Achievement,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_malformed_document_fails_closed() {
        let doc = json!({"userId": "u1", "hourlyCount": "not-a-number"});
        assert!(RateLimitRecord::from_document(doc).is_none());

        let doc = json!({"id": 42});
        assert!(ChatSession::from_document(doc).is_none());
    }

    #[test]
    fn test_workout_finalized_legacy_rule() {
        let doc = json!({
            "id": "w1",
            "userId": "u1",
            "name": "Piernas",
            "durationMinutes": 45,
            "effectiveAt": "2026-08-20T10:00:00Z",
            "completedAt": "2026-08-20T10:45:00Z"
        });
        let workout = WorkoutEntry::from_document(doc).unwrap();
        assert!(!workout.completed);
        assert!(workout.is_finalized());
    }

    #[test]
    fn test_insight_reads_external_type_field() {
        // The analytics job writes the category under "type"
        let doc = json!({
            "type": "nutrition",
            "title": "Proteína baja",
            "description": "Promedias menos proteína de la recomendada",
            "evidence": ["58g/día en la última semana", "objetivo 90g"],
            "actionable": "Añade una fuente de proteína al desayuno"
        });
        let insight = PersonalInsight::from_document(doc).unwrap();
        assert_eq!(insight.insight_type, "nutrition");

        let summary = insight.summary();
        assert_eq!(
            summary.key_evidence.as_deref(),
            Some("58g/día en la última semana")
        );
    }

    #[test]
    fn test_summary_redaction_clears_daily_fields() {
        let mut summary = UserContextSummary {
            total_calories_today: Some(1800),
            target_calories: Some(2200),
            last_meal: Some(MealSummary {
                name: "Ensalada".into(),
                calories: 400,
                at: Utc::now(),
            }),
            last_workout: None,
            weekly: WeeklyAggregate {
                workout_count: 2,
                total_calories: 9000,
            },
            insights: Vec::new(),
        };
        summary.redact_daily_fields();
        assert!(summary.total_calories_today.is_none());
        assert!(summary.last_meal.is_none());
        assert!(summary.last_workout.is_none());
        // Aggregates survive redaction
        assert_eq!(summary.weekly.workout_count, 2);
        assert_eq!(summary.target_calories, Some(2200));
    }

    #[test]
    fn test_empty_summary_detection() {
        assert!(UserContextSummary::default().is_empty());
        let summary = UserContextSummary {
            target_calories: Some(2000),
            ..Default::default()
        };
        assert!(!summary.is_empty());
    }

    #[test]
    fn test_camel_case_wire_format() {
        let record = RateLimitRecord::new("u1", Utc::now(), Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("hourlyCount").is_some());
        assert!(json.get("dayWindowStart").is_some());
    }
}
