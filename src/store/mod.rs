// ABOUTME: Document store abstraction for durable records with pluggable backends
// ABOUTME: Point read/write, query-by-field, and an atomic read-modify-write primitive
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Persistent Store Adapter
//!
//! Generic access to the external document store, expressed as an async trait
//! so the rest of the pipeline never sees the backing technology. Documents
//! are JSON values; typed modules validate them with fail-closed constructors
//! from [`crate::models`].
//!
//! The [`DocumentStore::update`] primitive runs a read-modify-write closure
//! atomically per key. The rate limiter depends on this to avoid quota bypass
//! under concurrent requests from the same user.

pub mod memory;

use crate::errors::AppResult;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Collections this core reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Chat sessions with bounded recent messages
    Sessions,
    /// Per-user rate-limit counters
    RateLimits,
    /// Versioned context summaries
    ContextCache,
    /// Daily analytics aggregates
    DailyAnalytics,
    /// User profiles (read-only collaborator)
    Profiles,
    /// Logged meals (read-only collaborator)
    Meals,
    /// Logged workouts (read-only collaborator)
    Workouts,
    /// Externally produced personal insights (read-only collaborator)
    Insights,
}

impl Collection {
    /// Stable collection name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sessions => "sessions",
            Self::RateLimits => "rate_limits",
            Self::ContextCache => "context_cache",
            Self::DailyAnalytics => "daily_analytics",
            Self::Profiles => "profiles",
            Self::Meals => "meals",
            Self::Workouts => "workouts",
            Self::Insights => "insights",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a transactional update closure: the document to persist plus a
/// caller-defined result payload returned from [`DocumentStore::update`]
pub struct TxnOutcome {
    /// New document state to persist
    pub document: Value,
    /// Payload handed back to the caller
    pub result: Value,
}

/// Transactional read-modify-write closure. Receives the current document
/// (None when absent) and produces the new state plus a result payload.
pub type TxnFn = Box<dyn FnOnce(Option<Value>) -> AppResult<TxnOutcome> + Send>;

/// Document store contract for pluggable backend implementations
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read of a document by key
    async fn get(&self, collection: Collection, key: &str) -> AppResult<Option<Value>>;

    /// Point write of a document by key (create or overwrite)
    async fn put(&self, collection: Collection, key: &str, document: Value) -> AppResult<()>;

    /// Query documents where `field` equals `value`
    async fn query_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> AppResult<Vec<Value>>;

    /// Atomic read-modify-write on a single key. The closure runs with the
    /// key locked; no concurrent update on the same key observes a stale
    /// document. Returns the closure's result payload.
    async fn update(&self, collection: Collection, key: &str, txn: TxnFn) -> AppResult<Value>;
}
