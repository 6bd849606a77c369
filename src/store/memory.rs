// ABOUTME: In-memory document store backend over concurrent maps
// ABOUTME: Per-key async mutexes provide the atomic update primitive
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! In-memory [`DocumentStore`] backend.
//!
//! Used by the test suite and by single-node deployments without an external
//! document store. Collections are concurrent maps; the transactional
//! `update` takes a per-(collection, key) async mutex so read-modify-write
//! sequences serialize per key without a global lock.

use super::{Collection, DocumentStore, TxnFn};
use crate::errors::AppResult;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory document store
#[derive(Clone, Default)]
pub struct InMemoryStore {
    documents: Arc<DashMap<(Collection, String), Value>>,
    key_locks: Arc<DashMap<(Collection, String), Arc<Mutex<()>>>>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, collection: Collection, key: &str) -> Arc<Mutex<()>> {
        self.key_locks
            .entry((collection, key.to_owned()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, collection: Collection, key: &str) -> AppResult<Option<Value>> {
        Ok(self
            .documents
            .get(&(collection, key.to_owned()))
            .map(|entry| entry.value().clone()))
    }

    async fn put(&self, collection: Collection, key: &str, document: Value) -> AppResult<()> {
        self.documents.insert((collection, key.to_owned()), document);
        Ok(())
    }

    async fn query_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> AppResult<Vec<Value>> {
        let matches = self
            .documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .filter(|entry| entry.value().get(field) == Some(value))
            .map(|entry| entry.value().clone())
            .collect();
        Ok(matches)
    }

    async fn update(&self, collection: Collection, key: &str, txn: TxnFn) -> AppResult<Value> {
        let lock = self.lock_for(collection, key);
        let _guard = lock.lock().await;

        let current = self
            .documents
            .get(&(collection, key.to_owned()))
            .map(|entry| entry.value().clone());

        // The closure's own error code passes through untouched
        let outcome = txn(current)?;

        self.documents
            .insert((collection, key.to_owned()), outcome.document);
        Ok(outcome.result)
    }
}
