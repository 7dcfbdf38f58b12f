//! Record and query types for computed-metric stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Composite identity of a computed metric.
///
/// The four components identify the batch the metric was computed over, the
/// metric itself, and fingerprints of its domain and value arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricKey {
    /// Identifier of the data batch the metric describes.
    pub batch_id: String,
    /// Name of the metric (e.g. `column.mean`).
    pub metric_name: String,
    /// Fingerprint of the metric's domain arguments.
    pub metric_domain_kwargs_id: String,
    /// Fingerprint of the metric's value arguments.
    pub metric_value_kwargs_id: String,
}

impl MetricKey {
    /// Creates a metric key from its four components.
    pub fn new(
        batch_id: impl Into<String>,
        metric_name: impl Into<String>,
        metric_domain_kwargs_id: impl Into<String>,
        metric_value_kwargs_id: impl Into<String>,
    ) -> Self {
        Self {
            batch_id: batch_id.into(),
            metric_name: metric_name.into(),
            metric_domain_kwargs_id: metric_domain_kwargs_id.into(),
            metric_value_kwargs_id: metric_value_kwargs_id.into(),
        }
    }

    /// Returns the key components as a tuple, in canonical order.
    pub fn to_tuple(&self) -> (&str, &str, &str, &str) {
        (
            &self.batch_id,
            &self.metric_name,
            &self.metric_domain_kwargs_id,
            &self.metric_value_kwargs_id,
        )
    }
}

/// One persisted computed-metric record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedMetric {
    /// Backend-assigned record id, when the backend assigns one.
    pub id: Option<i64>,

    /// Composite metric identity.
    #[serde(flatten)]
    pub key: MetricKey,

    /// Provenance: the datasource the batch came from.
    pub datasource_name: Option<String>,
    /// Provenance: the asset within the datasource.
    pub data_asset_name: Option<String>,
    /// Provenance: a human-oriented batch label.
    pub batch_name: Option<String>,
    /// Provenance: the context that produced the record.
    pub data_context_uuid: Option<String>,

    /// When the record was first written.
    pub created_at: DateTime<Utc>,
    /// When the record was last written. Stores order results by this field.
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion timestamp, when soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Archival timestamp, when archived.
    pub archived_at: Option<DateTime<Utc>>,
    /// Soft-deletion flag.
    pub deleted: bool,
    /// Archival flag.
    pub archived: bool,

    /// The metric's computed value, as an arbitrary JSON document.
    pub value: Option<Value>,
    /// Free-form auxiliary details about the computation.
    pub details: Option<Map<String, Value>>,
}

/// A metric record under construction, before a store assigns timestamps.
///
/// # Example
///
/// ```rust
/// use verdict_core::store::{MetricDraft, MetricKey};
///
/// let draft = MetricDraft::new(MetricKey::new("batch-1", "column.mean", "d1", "v1"))
///     .with_value(serde_json::json!(42.5))
///     .with_datasource_name("warehouse");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricDraft {
    /// Composite metric identity.
    pub key: MetricKey,
    /// Provenance: the datasource the batch came from.
    pub datasource_name: Option<String>,
    /// Provenance: the asset within the datasource.
    pub data_asset_name: Option<String>,
    /// Provenance: a human-oriented batch label.
    pub batch_name: Option<String>,
    /// Provenance: the context producing the record.
    pub data_context_uuid: Option<String>,
    /// Explicit creation timestamp; the store fills in "now" when absent.
    pub created_at: Option<DateTime<Utc>>,
    /// Explicit update timestamp; the store fills in "now" when absent.
    pub updated_at: Option<DateTime<Utc>>,
    /// The metric's computed value.
    pub value: Option<Value>,
    /// Free-form auxiliary details.
    pub details: Option<Map<String, Value>>,
}

impl Default for MetricKey {
    fn default() -> Self {
        Self::new("", "", "", "")
    }
}

impl MetricDraft {
    /// Creates a draft for the given key.
    pub fn new(key: MetricKey) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    /// Sets the datasource provenance.
    pub fn with_datasource_name(mut self, name: impl Into<String>) -> Self {
        self.datasource_name = Some(name.into());
        self
    }

    /// Sets the data-asset provenance.
    pub fn with_data_asset_name(mut self, name: impl Into<String>) -> Self {
        self.data_asset_name = Some(name.into());
        self
    }

    /// Sets the batch label.
    pub fn with_batch_name(mut self, name: impl Into<String>) -> Self {
        self.batch_name = Some(name.into());
        self
    }

    /// Sets the producing context's identifier.
    pub fn with_data_context_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.data_context_uuid = Some(uuid.into());
        self
    }

    /// Sets explicit creation and update timestamps.
    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
        self
    }

    /// Sets the computed value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Sets the auxiliary details.
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = Some(details);
        self
    }

    /// Finalizes the draft into a full record, defaulting absent timestamps to
    /// `now`.
    pub fn into_metric(self, now: DateTime<Utc>) -> ComputedMetric {
        ComputedMetric {
            id: None,
            key: self.key,
            datasource_name: self.datasource_name,
            data_asset_name: self.data_asset_name,
            batch_name: self.batch_name,
            data_context_uuid: self.data_context_uuid,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
            deleted_at: None,
            archived_at: None,
            deleted: false,
            archived: false,
            value: self.value,
            details: self.details,
        }
    }
}

/// A half-open-at-both-ends time window over `updated_at`.
///
/// Both bounds are inclusive and independently optional; an unbounded range
/// matches every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    /// Inclusive lower bound.
    pub begin: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// The unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    /// Records updated at or after `begin`.
    pub fn since(begin: DateTime<Utc>) -> Self {
        Self {
            begin: Some(begin),
            end: None,
        }
    }

    /// Records updated at or before `end`.
    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            begin: None,
            end: Some(end),
        }
    }

    /// Records updated within `[begin, end]`.
    pub fn between(begin: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            begin: Some(begin),
            end: Some(end),
        }
    }

    /// Whether `timestamp` falls inside the range.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        match (self.begin, self.end) {
            (Some(begin), Some(end)) => timestamp >= begin && timestamp <= end,
            (Some(begin), None) => timestamp >= begin,
            (None, Some(end)) => timestamp <= end,
            (None, None) => true,
        }
    }
}

/// A partial-key query over a metric store.
///
/// Each key component is independently optional; an unset component matches
/// anything. Combined with the optional time range, a filter selects a set of
/// records, of which `get` returns the most recently updated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricFilter {
    /// Match on `batch_id`, when set.
    pub batch_id: Option<String>,
    /// Match on `metric_name`, when set.
    pub metric_name: Option<String>,
    /// Match on `metric_domain_kwargs_id`, when set.
    pub metric_domain_kwargs_id: Option<String>,
    /// Match on `metric_value_kwargs_id`, when set.
    pub metric_value_kwargs_id: Option<String>,
    /// Restrict to records whose `updated_at` falls within this range.
    pub time_range: TimeRange,
}

impl MetricFilter {
    /// A filter matching everything.
    pub fn any() -> Self {
        Self::default()
    }

    /// An exact filter on all four key components.
    pub fn exact(key: &MetricKey) -> Self {
        Self {
            batch_id: Some(key.batch_id.clone()),
            metric_name: Some(key.metric_name.clone()),
            metric_domain_kwargs_id: Some(key.metric_domain_kwargs_id.clone()),
            metric_value_kwargs_id: Some(key.metric_value_kwargs_id.clone()),
            time_range: TimeRange::all(),
        }
    }

    /// Restricts the filter to the given batch.
    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    /// Restricts the filter to the given metric name.
    pub fn with_metric_name(mut self, metric_name: impl Into<String>) -> Self {
        self.metric_name = Some(metric_name.into());
        self
    }

    /// Restricts the filter to the given domain-arguments fingerprint.
    pub fn with_metric_domain_kwargs_id(mut self, id: impl Into<String>) -> Self {
        self.metric_domain_kwargs_id = Some(id.into());
        self
    }

    /// Restricts the filter to the given value-arguments fingerprint.
    pub fn with_metric_value_kwargs_id(mut self, id: impl Into<String>) -> Self {
        self.metric_value_kwargs_id = Some(id.into());
        self
    }

    /// Restricts the filter to the given time range.
    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    /// Whether `metric` matches every set component of the filter.
    pub fn matches(&self, metric: &ComputedMetric) -> bool {
        fn component(want: &Option<String>, have: &str) -> bool {
            want.as_deref().map_or(true, |w| w == have)
        }

        component(&self.batch_id, &metric.key.batch_id)
            && component(&self.metric_name, &metric.key.metric_name)
            && component(
                &self.metric_domain_kwargs_id,
                &metric.key.metric_domain_kwargs_id,
            )
            && component(
                &self.metric_value_kwargs_id,
                &metric.key.metric_value_kwargs_id,
            )
            && self.time_range.contains(metric.updated_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_draft_defaults_timestamps_to_now() {
        let now = ts(1_000);
        let metric = MetricDraft::new(MetricKey::new("b", "m", "d", "v")).into_metric(now);
        assert_eq!(metric.created_at, now);
        assert_eq!(metric.updated_at, now);
        assert!(!metric.deleted);
        assert!(!metric.archived);
        assert_eq!(metric.id, None);
    }

    #[test]
    fn test_draft_explicit_timestamps_win() {
        let metric = MetricDraft::new(MetricKey::new("b", "m", "d", "v"))
            .with_timestamps(ts(10), ts(20))
            .into_metric(ts(1_000));
        assert_eq!(metric.created_at, ts(10));
        assert_eq!(metric.updated_at, ts(20));
    }

    #[test]
    fn test_time_range_contains_all_bound_cases() {
        let all = TimeRange::all();
        assert!(all.contains(ts(0)));

        let since = TimeRange::since(ts(10));
        assert!(since.contains(ts(10)));
        assert!(!since.contains(ts(9)));

        let until = TimeRange::until(ts(10));
        assert!(until.contains(ts(10)));
        assert!(!until.contains(ts(11)));

        let between = TimeRange::between(ts(10), ts(20));
        assert!(between.contains(ts(10)));
        assert!(between.contains(ts(20)));
        assert!(!between.contains(ts(9)));
        assert!(!between.contains(ts(21)));
    }

    #[test]
    fn test_filter_unset_components_match_anything() {
        let metric = MetricDraft::new(MetricKey::new("batch-1", "column.mean", "d1", "v1"))
            .into_metric(ts(100));

        assert!(MetricFilter::any().matches(&metric));
        assert!(MetricFilter::any()
            .with_metric_name("column.mean")
            .matches(&metric));
        assert!(!MetricFilter::any()
            .with_metric_name("column.max")
            .matches(&metric));
        assert!(MetricFilter::exact(&metric.key).matches(&metric));
    }

    #[test]
    fn test_filter_time_range_applies() {
        let metric = MetricDraft::new(MetricKey::new("b", "m", "d", "v")).into_metric(ts(100));
        let hit = MetricFilter::any().with_time_range(TimeRange::between(ts(50), ts(150)));
        let miss = MetricFilter::any().with_time_range(TimeRange::since(ts(101)));
        assert!(hit.matches(&metric));
        assert!(!miss.matches(&metric));
    }
}
