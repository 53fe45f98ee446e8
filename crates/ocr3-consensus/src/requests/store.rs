//! # Request Store
//!
//! Insertion-ordered map of in-flight requests keyed by workflow execution
//! id.
//!
//! ## Invariants
//!
//! - No two entries share an execution id (checked in `add()`)
//! - `first_n`/`range_n` return items in insertion order
//! - Eviction preserves the relative order of the remaining items
//! - Every read returns copies; callers never alias stored state
//!
//! A single `RwLock` guards both the map and the order list, so every
//! mutation is atomic with respect to the others.

use crate::domain::Request;
use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct StoreInner {
    /// Execution ids in insertion order.
    order: Vec<String>,
    requests: HashMap<String, Request>,
}

impl StoreInner {
    fn collect<'a>(&self, ids: impl Iterator<Item = &'a String>) -> Vec<Request> {
        ids.filter_map(|id| self.requests.get(id).cloned()).collect()
    }
}

/// Thread-safe store of pending requests.
#[derive(Debug, Default)]
pub struct RequestStore {
    inner: RwLock<StoreInner>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a request.
    ///
    /// # Errors
    ///
    /// `StoreError::DuplicateId` if a request with the same execution id is
    /// already stored.
    pub fn add(&self, request: Request) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let id = request.workflow_execution_id().to_string();
        if inner.requests.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }
        inner.order.push(id.clone());
        inner.requests.insert(id, request);
        Ok(())
    }

    /// Returns a copy of the request with this execution id, if present.
    pub fn get(&self, id: &str) -> Option<Request> {
        self.inner.read().requests.get(id).cloned()
    }

    /// Returns copies of the requests whose ids are present, in the order of
    /// `ids`. Unknown ids are skipped.
    pub fn get_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<Request> {
        let inner = self.inner.read();
        ids.iter()
            .filter_map(|id| inner.requests.get(id.as_ref()).cloned())
            .collect()
    }

    /// Returns up to `n` requests, oldest first.
    ///
    /// # Errors
    ///
    /// `StoreError::ZeroBatchSize` if `n == 0`.
    pub fn first_n(&self, n: usize) -> StoreResult<Vec<Request>> {
        if n == 0 {
            return Err(StoreError::ZeroBatchSize);
        }
        let inner = self.inner.read();
        Ok(inner.collect(inner.order.iter().take(n)))
    }

    /// Returns up to `n` requests starting at ordinal `start`.
    ///
    /// # Errors
    ///
    /// - `StoreError::ZeroBatchSize` if `n == 0`
    /// - `StoreError::StartOutOfBounds` if `start` is not a valid ordinal
    pub fn range_n(&self, start: usize, n: usize) -> StoreResult<Vec<Request>> {
        if n == 0 {
            return Err(StoreError::ZeroBatchSize);
        }
        let inner = self.inner.read();
        if start >= inner.order.len() {
            return Err(StoreError::StartOutOfBounds {
                start,
                len: inner.order.len(),
            });
        }
        Ok(inner.collect(inner.order.iter().skip(start).take(n)))
    }

    /// Removes a request, returning it if it was present.
    ///
    /// Compacting the order list is O(n); the store only ever holds
    /// in-flight work.
    pub fn evict(&self, id: &str) -> Option<Request> {
        let mut inner = self.inner.write();
        let removed = inner.requests.remove(id)?;
        inner.order.retain(|existing| existing != id);
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.inner.read().requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
