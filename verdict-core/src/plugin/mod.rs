//! Component registry and plugin traits.
//!
//! Components (datasources, stores, validation operators) are configured by
//! class name and built through an explicit [`PluginRegistry`] of constructor
//! closures. There is no reflective lookup: a class name resolves only if a
//! constructor was registered for it, and an optional `module_name` in the
//! config must match the module the class was registered under.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_yaml::Value;
use tracing::debug;

use crate::config::ComponentConfig;
use crate::error::{Result, VerdictError};
use crate::store::MetricStore;

pub mod builtins;

/// Canonical module namespace for datasource classes.
pub const DATASOURCE_MODULE: &str = "verdict.datasource";
/// Canonical module namespace for store classes.
pub const STORE_MODULE: &str = "verdict.store";
/// Canonical module namespace for validation-operator classes.
pub const VALIDATION_OPERATOR_MODULE: &str = "verdict.validation_operators";

/// A configured source of data batches.
pub trait Datasource: std::fmt::Debug + Send + Sync {
    /// The instance name of this datasource.
    fn name(&self) -> &str;

    /// Names of the data assets this datasource can produce batches for.
    fn asset_names(&self) -> Result<Vec<String>>;
}

/// A configured validation workflow.
pub trait ValidationOperator: Send + Sync {
    /// The instance name of this operator.
    fn name(&self) -> &str;
}

/// Runtime values passed to component constructors alongside their config.
///
/// Carries the context root directory plus caller-supplied values. Runtime
/// values must not collide with config options; the registry rejects such
/// collisions at construction time.
#[derive(Debug, Clone, Default)]
pub struct RuntimeEnvironment {
    /// The context root directory, when the context is filesystem-backed.
    pub root_directory: Option<PathBuf>,
    values: IndexMap<String, Value>,
}

impl RuntimeEnvironment {
    /// Creates an empty runtime environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the context root directory.
    pub fn with_root_directory(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_directory = Some(root.into());
        self
    }

    /// Adds a runtime value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Returns a runtime value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The keys of all runtime values.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

type DatasourceCtor = Box<
    dyn Fn(&str, &ComponentConfig, &RuntimeEnvironment) -> Result<Arc<dyn Datasource>>
        + Send
        + Sync,
>;
type StoreCtor = Box<
    dyn Fn(&str, &ComponentConfig, &RuntimeEnvironment) -> Result<Arc<dyn MetricStore>>
        + Send
        + Sync,
>;
type OperatorCtor = Box<
    dyn Fn(&str, &ComponentConfig, &RuntimeEnvironment) -> Result<Arc<dyn ValidationOperator>>
        + Send
        + Sync,
>;

/// Hook filling class-specific defaults into a datasource config fragment.
type ConfigHook = Box<dyn Fn(&ComponentConfig) -> Result<ComponentConfig> + Send + Sync>;

struct Entry<C> {
    module_name: &'static str,
    ctor: C,
}

/// Registry of component constructors, keyed by class name.
///
/// # Example
///
/// ```rust
/// use verdict_core::plugin::PluginRegistry;
///
/// let registry = PluginRegistry::with_builtins();
/// assert!(registry.has_store_class("SqlMetricStore"));
/// ```
#[derive(Default)]
pub struct PluginRegistry {
    datasources: IndexMap<String, Entry<DatasourceCtor>>,
    stores: IndexMap<String, Entry<StoreCtor>>,
    operators: IndexMap<String, Entry<OperatorCtor>>,
    config_hooks: IndexMap<String, ConfigHook>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("datasources", &self.datasources.keys().collect::<Vec<_>>())
            .field("stores", &self.stores.keys().collect::<Vec<_>>())
            .field("operators", &self.operators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-loaded with the built-in component classes.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register(&mut registry);
        registry
    }

    /// Registers a datasource class.
    pub fn register_datasource(
        &mut self,
        class_name: impl Into<String>,
        module_name: &'static str,
        ctor: DatasourceCtor,
    ) {
        self.datasources
            .insert(class_name.into(), Entry { module_name, ctor });
    }

    /// Registers a store class.
    pub fn register_store(
        &mut self,
        class_name: impl Into<String>,
        module_name: &'static str,
        ctor: StoreCtor,
    ) {
        self.stores
            .insert(class_name.into(), Entry { module_name, ctor });
    }

    /// Registers a validation-operator class.
    pub fn register_validation_operator(
        &mut self,
        class_name: impl Into<String>,
        module_name: &'static str,
        ctor: OperatorCtor,
    ) {
        self.operators
            .insert(class_name.into(), Entry { module_name, ctor });
    }

    /// Registers a configuration hook for a datasource class.
    pub fn register_config_hook(&mut self, class_name: impl Into<String>, hook: ConfigHook) {
        self.config_hooks.insert(class_name.into(), hook);
    }

    /// Whether a datasource class is registered.
    pub fn has_datasource_class(&self, class_name: &str) -> bool {
        self.datasources.contains_key(class_name)
    }

    /// Whether a store class is registered.
    pub fn has_store_class(&self, class_name: &str) -> bool {
        self.stores.contains_key(class_name)
    }

    /// Whether a validation-operator class is registered.
    pub fn has_validation_operator_class(&self, class_name: &str) -> bool {
        self.operators.contains_key(class_name)
    }

    /// Instantiates a datasource from its config fragment.
    pub fn instantiate_datasource(
        &self,
        name: &str,
        config: &ComponentConfig,
        env: &RuntimeEnvironment,
    ) -> Result<Arc<dyn Datasource>> {
        let entry = resolve(&self.datasources, config)?;
        check_collisions(config, env)?;
        debug!(name, class_name = %config.class_name, "instantiating datasource");
        (entry.ctor)(name, config, env)
            .map_err(|e| VerdictError::construction(config.class_name.clone(), e))
    }

    /// Instantiates a store from its config fragment.
    pub fn instantiate_store(
        &self,
        name: &str,
        config: &ComponentConfig,
        env: &RuntimeEnvironment,
    ) -> Result<Arc<dyn MetricStore>> {
        let entry = resolve(&self.stores, config)?;
        check_collisions(config, env)?;
        debug!(name, class_name = %config.class_name, "instantiating store");
        (entry.ctor)(name, config, env)
            .map_err(|e| VerdictError::construction(config.class_name.clone(), e))
    }

    /// Instantiates a validation operator from its config fragment.
    pub fn instantiate_validation_operator(
        &self,
        name: &str,
        config: &ComponentConfig,
        env: &RuntimeEnvironment,
    ) -> Result<Arc<dyn ValidationOperator>> {
        let entry = resolve(&self.operators, config)?;
        check_collisions(config, env)?;
        debug!(name, class_name = %config.class_name, "instantiating validation operator");
        (entry.ctor)(name, config, env)
            .map_err(|e| VerdictError::construction(config.class_name.clone(), e))
    }

    /// Normalizes a datasource config fragment, applying the class's
    /// configuration hook when one is registered.
    ///
    /// The class must resolve; unresolvable classes fail here rather than at
    /// instantiation time, so a bad `add_datasource` call is rejected before
    /// anything is written to the project config.
    pub fn normalize_datasource_config(&self, config: &ComponentConfig) -> Result<ComponentConfig> {
        resolve(&self.datasources, config)?;
        match self.config_hooks.get(&config.class_name) {
            Some(hook) => hook(config),
            None => Ok(config.clone()),
        }
    }
}

fn resolve<'a, C>(
    entries: &'a IndexMap<String, Entry<C>>,
    config: &ComponentConfig,
) -> Result<&'a Entry<C>> {
    let entry = entries.get(&config.class_name).ok_or_else(|| {
        VerdictError::class_resolution(config.class_name.clone(), config.module_name.clone())
    })?;
    if let Some(module_name) = &config.module_name {
        if module_name != entry.module_name {
            return Err(VerdictError::class_resolution(
                config.class_name.clone(),
                Some(module_name.clone()),
            ));
        }
    }
    Ok(entry)
}

fn check_collisions(config: &ComponentConfig, env: &RuntimeEnvironment) -> Result<()> {
    for key in env.keys() {
        if config.options.contains_key(key) {
            return Err(VerdictError::invalid_config(format!(
                "runtime environment key '{key}' collides with a config option of class '{}'",
                config.class_name
            )));
        }
    }
    if env.root_directory.is_some() && config.options.contains_key("root_directory") {
        return Err(VerdictError::invalid_config(format!(
            "runtime environment key 'root_directory' collides with a config option of class '{}'",
            config.class_name
        )));
    }
    Ok(())
}
