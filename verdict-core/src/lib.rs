//! # Verdict Core
//!
//! Configuration and persistence core for the Verdict data-quality toolkit.
//!
//! A project is described by a YAML [`ProjectConfig`](config::ProjectConfig)
//! naming pluggable components by class. A
//! [`DataContext`](context::DataContext) owns that config, builds the
//! components through an explicit [`PluginRegistry`](plugin::PluginRegistry),
//! and hands out shared handles to them; the file-backed variant persists the
//! config (with `${VARIABLE}` secrets kept out of it) across sessions.
//! Computed metrics land in a [`MetricStore`](store::MetricStore), either in
//! memory or in SQLite.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use verdict_core::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let registry = Arc::new(PluginRegistry::with_builtins());
//! let mut context = DataContext::new(ProjectConfig::template(), registry)?;
//!
//! let store = context.expectations_store()?;
//! store.create(
//!     MetricDraft::new(MetricKey::new("batch-1", "column.mean", "d1", "v1"))
//!         .with_value(serde_json::json!(42.5)),
//! )?;
//!
//! let latest = store.get(&MetricFilter::any().with_metric_name("column.mean"))?;
//! assert!(latest.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod plugin;
pub mod prelude;
pub mod store;

pub use error::{Result, VerdictError};
