//! In-memory metric store backend.
//!
//! Holds records in a mutex-guarded vector. Useful for tests, scaffolded
//! project templates, and any context where persistence across processes is
//! not needed. Semantics match the SQL backend: same ordering, same
//! latest-wins `get`.

use std::sync::Mutex;

use chrono::Utc;
use tracing::debug;

use crate::error::{Result, VerdictError};
use crate::store::metric::{ComputedMetric, MetricDraft, MetricFilter, TimeRange};
use crate::store::MetricStore;

/// The registered class name of this backend.
pub const CLASS_NAME: &str = "InMemoryMetricStore";

#[derive(Debug, Default)]
struct State {
    records: Vec<ComputedMetric>,
    next_id: i64,
}

/// A metric store keeping all records in process memory.
#[derive(Debug, Default)]
pub struct InMemoryMetricStore {
    store_name: Option<String>,
    state: Mutex<State>,
}

impl InMemoryMetricStore {
    /// Creates an anonymous in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory store with an instance name.
    pub fn named(store_name: impl Into<String>) -> Self {
        Self {
            store_name: Some(store_name.into()),
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| VerdictError::Internal("metric store lock poisoned".to_string()))
    }
}

impl MetricStore for InMemoryMetricStore {
    fn store_name(&self) -> Option<&str> {
        self.store_name.as_deref()
    }

    fn create(&self, draft: MetricDraft) -> Result<()> {
        let mut metric = draft.into_metric(Utc::now());
        let mut state = self.lock()?;
        state.next_id += 1;
        metric.id = Some(state.next_id);
        debug!(
            store_name = self.store_name.as_deref().unwrap_or("<anonymous>"),
            batch_id = %metric.key.batch_id,
            metric_name = %metric.key.metric_name,
            "storing metric record"
        );
        state.records.push(metric);
        Ok(())
    }

    fn get(&self, filter: &MetricFilter) -> Result<Option<ComputedMetric>> {
        let state = self.lock()?;
        Ok(state
            .records
            .iter()
            .filter(|metric| filter.matches(metric))
            .max_by_key(|metric| metric.updated_at)
            .cloned())
    }

    fn list(&self, time_range: &TimeRange) -> Result<Vec<ComputedMetric>> {
        let state = self.lock()?;
        let mut matched: Vec<ComputedMetric> = state
            .records
            .iter()
            .filter(|metric| time_range.contains(metric.updated_at))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(matched)
    }
}
