//! Convenience re-exports for common Verdict usage.
//!
//! ```rust
//! use verdict_core::prelude::*;
//! ```

pub use crate::config::{ComponentConfig, ProjectConfig, Variables};
pub use crate::context::{ContextOptions, DataContext, FileDataContext};
pub use crate::error::{ErrorContext, Result, VerdictError};
pub use crate::plugin::{Datasource, PluginRegistry, RuntimeEnvironment, ValidationOperator};
pub use crate::store::{
    ComputedMetric, InMemoryMetricStore, MetricDraft, MetricFilter, MetricKey, MetricStore,
    SqlCredentials, SqlMetricStore, SqlStoreOptions, TimeRange,
};
