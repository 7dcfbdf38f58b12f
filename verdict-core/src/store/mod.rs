//! Pluggable persistence for computed metrics.
//!
//! A [`MetricStore`] is a keyed record store: callers write
//! [`MetricDraft`](metric::MetricDraft)s and read back
//! [`ComputedMetric`](metric::ComputedMetric)s by partial key and time window.
//! Two backends ship with the crate: [`InMemoryMetricStore`] for ephemeral use
//! and [`SqlMetricStore`] backed by SQLite.

use crate::error::Result;

pub mod in_memory;
pub mod keypair;
pub mod metric;
pub mod sql;

pub use in_memory::InMemoryMetricStore;
pub use metric::{ComputedMetric, MetricDraft, MetricFilter, MetricKey, TimeRange};
pub use sql::{SqlCredentials, SqlMetricStore, SqlStoreOptions};

/// Behavior common to all computed-metric store backends.
///
/// Implementations must be safe to share across threads; the context hands out
/// `Arc<dyn MetricStore>` handles.
pub trait MetricStore: std::fmt::Debug + Send + Sync {
    /// The configured name of this store instance, when it has one.
    fn store_name(&self) -> Option<&str> {
        None
    }

    /// Persists one metric record.
    ///
    /// Absent timestamps on the draft default to the time of the call. The
    /// write is atomic: on error, no partial record is visible afterwards.
    fn create(&self, draft: MetricDraft) -> Result<()>;

    /// Returns the most recently updated record matching `filter`, if any.
    fn get(&self, filter: &MetricFilter) -> Result<Option<ComputedMetric>>;

    /// Returns all records whose `updated_at` falls within `time_range`,
    /// ordered by `updated_at` descending.
    fn list(&self, time_range: &TimeRange) -> Result<Vec<ComputedMetric>>;
}
