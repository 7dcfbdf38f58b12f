//! Project configuration model.
//!
//! A Verdict project is described by a single YAML document holding named
//! component configurations (datasources, stores, validation operators,
//! data-docs sites) plus a handful of project-level settings. The raw config
//! may embed `${VARIABLE}` tokens; [`ProjectConfig::substituted`] produces the
//! resolved view without touching the raw tree, so tokens survive save/reload
//! cycles.
//!
//! All component maps preserve **insertion order**: iterating over
//! datasources or stores yields them in the order they were configured. This
//! is a documented guarantee, not an accident of the map implementation.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{Result, VerdictError};

pub mod substitution;
pub mod variables;

pub use substitution::{substitute_string, substitute_value, Variables};

/// Open-ended component options: everything in a component's config fragment
/// beyond `class_name`/`module_name`.
pub type Options = IndexMap<String, Value>;

/// Configuration fragment for one pluggable component.
///
/// Serialized flat: `{class_name, module_name?, ...options}`.
///
/// # Example
///
/// ```rust
/// use verdict_core::config::ComponentConfig;
///
/// let config = ComponentConfig::new("SqlMetricStore")
///     .with_option("connection_string", "sqlite://uncommitted/metrics.db");
/// assert_eq!(config.class_name, "SqlMetricStore");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// The registered class name of the component.
    pub class_name: String,

    /// Optional module namespace for the class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,

    /// Remaining constructor options, preserved in configuration order.
    #[serde(flatten)]
    pub options: Options,
}

impl ComponentConfig {
    /// Creates a config fragment for the given class.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            module_name: None,
            options: Options::new(),
        }
    }

    /// Sets the module namespace.
    pub fn with_module(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = Some(module_name.into());
        self
    }

    /// Adds a constructor option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Returns a constructor option by name.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Deserializes the options mapping into a typed structure.
    pub fn options_as<T: DeserializeOwned>(&self) -> Result<T> {
        let mapping: serde_yaml::Mapping = self
            .options
            .iter()
            .map(|(k, v)| (Value::String(k.clone()), v.clone()))
            .collect();
        serde_yaml::from_value(Value::Mapping(mapping)).map_err(|e| {
            VerdictError::invalid_config(format!(
                "invalid options for component class '{}': {e}",
                self.class_name
            ))
        })
    }
}

/// Root aggregate of a Verdict project configuration.
///
/// Owned exclusively by the `DataContext`; mutated only through its
/// `add_datasource`/`add_store`/`add_validation_operator` operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    /// Configured datasources, in insertion order.
    #[serde(default)]
    pub datasources: IndexMap<String, ComponentConfig>,

    /// Configured stores, in insertion order.
    #[serde(default)]
    pub stores: IndexMap<String, ComponentConfig>,

    /// Configured validation operators, in insertion order.
    #[serde(default)]
    pub validation_operators: IndexMap<String, ComponentConfig>,

    /// Documentation-site configurations, carried opaquely (rendering happens
    /// elsewhere).
    #[serde(default)]
    pub data_docs_sites: IndexMap<String, Value>,

    /// Name of the store holding expectation suites.
    pub expectations_store_name: String,

    /// Name of the store holding validation results.
    pub validations_store_name: String,

    /// Name of the store holding evaluation parameters.
    pub evaluation_parameter_store_name: String,

    /// Directory for custom plugin code, relative to the context root.
    #[serde(default)]
    pub plugins_directory: Option<String>,

    /// Path of the config variables file, relative to the context root.
    #[serde(default)]
    pub config_variables_file_path: Option<String>,
}

impl ProjectConfig {
    /// Validates project-level settings.
    ///
    /// Serde already enforces the document shape; this checks the semantic
    /// constraints on top of it.
    pub fn validate(&self) -> Result<()> {
        for (field, name) in [
            ("expectations_store_name", &self.expectations_store_name),
            ("validations_store_name", &self.validations_store_name),
            (
                "evaluation_parameter_store_name",
                &self.evaluation_parameter_store_name,
            ),
        ] {
            if name.is_empty() {
                return Err(VerdictError::invalid_config(format!(
                    "'{field}' must not be empty"
                )));
            }
        }
        Ok(())
    }

    /// Returns a structurally new config with all `${VARIABLE}` tokens
    /// substituted from `variables`.
    ///
    /// The raw config is left untouched; unresolved tokens stay literal.
    pub fn substituted(&self, variables: &Variables) -> Result<ProjectConfig> {
        let raw = serde_yaml::to_value(self)?;
        let resolved = substitute_value(&raw, variables);
        serde_yaml::from_value(resolved).map_err(|e| {
            VerdictError::invalid_config(format!(
                "config is no longer valid after variable substitution: {e}"
            ))
        })
    }

    /// A minimal, instantiable project template used when scaffolding a new
    /// project.
    pub fn template() -> Self {
        let mut stores = IndexMap::new();
        stores.insert(
            "expectations_store".to_string(),
            ComponentConfig::new("InMemoryMetricStore"),
        );
        stores.insert(
            "validations_store".to_string(),
            ComponentConfig::new("InMemoryMetricStore"),
        );
        stores.insert(
            "evaluation_parameter_store".to_string(),
            ComponentConfig::new("InMemoryMetricStore"),
        );

        let mut validation_operators = IndexMap::new();
        validation_operators.insert(
            "action_list_operator".to_string(),
            ComponentConfig::new("ActionListOperator"),
        );

        Self {
            datasources: IndexMap::new(),
            stores,
            validation_operators,
            data_docs_sites: IndexMap::new(),
            expectations_store_name: "expectations_store".to_string(),
            validations_store_name: "validations_store".to_string(),
            evaluation_parameter_store_name: "evaluation_parameter_store".to_string(),
            plugins_directory: Some("plugins/".to_string()),
            config_variables_file_path: Some("uncommitted/config_variables.yml".to_string()),
        }
    }
}
