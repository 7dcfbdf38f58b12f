//! The data context: configuration owner and component orchestrator.
//!
//! A [`DataContext`] owns one [`ProjectConfig`], instantiates the components
//! it describes through a [`PluginRegistry`], and caches the live instances.
//! Two views of the configuration coexist: the raw view keeps `${VARIABLE}`
//! tokens literal (and is what gets persisted), while the substituted view —
//! recomputed from the raw view and the current variables on demand — is what
//! components are built from.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_yaml::Value;
use tracing::{debug, info};

use crate::config::{variables, ComponentConfig, ProjectConfig, Variables};
use crate::error::{Result, VerdictError};
use crate::plugin::{Datasource, PluginRegistry, RuntimeEnvironment, ValidationOperator};
use crate::store::MetricStore;

pub mod file;

pub use file::FileDataContext;

/// Construction options for a [`DataContext`].
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Separator used when composing hierarchical asset names.
    pub asset_name_delimiter: char,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            asset_name_delimiter: '/',
        }
    }
}

impl ContextOptions {
    /// Sets the asset-name delimiter. Only `'/'` and `'.'` are accepted at
    /// context construction.
    pub fn with_asset_name_delimiter(mut self, delimiter: char) -> Self {
        self.asset_name_delimiter = delimiter;
        self
    }
}

/// An in-memory data context.
///
/// All configured components are instantiated eagerly at construction, so a
/// config describing an unbuildable component fails fast rather than at first
/// use. Mutations go through `add_datasource`/`add_store`/
/// `add_validation_operator`, which write the raw config and build the
/// component from the substituted view.
pub struct DataContext {
    project_config: ProjectConfig,
    root_directory: Option<PathBuf>,
    asset_name_delimiter: char,
    registry: Arc<PluginRegistry>,
    datasources: IndexMap<String, Arc<dyn Datasource>>,
    stores: IndexMap<String, Arc<dyn MetricStore>>,
    validation_operators: IndexMap<String, Arc<dyn ValidationOperator>>,
}

impl std::fmt::Debug for DataContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataContext")
            .field("root_directory", &self.root_directory)
            .field("datasources", &self.datasources.keys().collect::<Vec<_>>())
            .field("stores", &self.stores.keys().collect::<Vec<_>>())
            .field(
                "validation_operators",
                &self.validation_operators.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl DataContext {
    /// Creates a context from a project config with default options.
    pub fn new(project_config: ProjectConfig, registry: Arc<PluginRegistry>) -> Result<Self> {
        Self::new_with_options(project_config, None, registry, ContextOptions::default())
    }

    /// Creates a context with an explicit root directory and options.
    pub fn new_with_options(
        project_config: ProjectConfig,
        root_directory: Option<PathBuf>,
        registry: Arc<PluginRegistry>,
        options: ContextOptions,
    ) -> Result<Self> {
        if !matches!(options.asset_name_delimiter, '/' | '.') {
            return Err(VerdictError::invalid_config(format!(
                "asset_name_delimiter must be '/' or '.', got '{}'",
                options.asset_name_delimiter
            )));
        }
        project_config.validate()?;

        let mut context = Self {
            project_config,
            root_directory,
            asset_name_delimiter: options.asset_name_delimiter,
            registry,
            datasources: IndexMap::new(),
            stores: IndexMap::new(),
            validation_operators: IndexMap::new(),
        };
        context.init_components()?;
        info!(
            datasources = context.datasources.len(),
            stores = context.stores.len(),
            validation_operators = context.validation_operators.len(),
            "data context initialized"
        );
        Ok(context)
    }

    /// Eagerly builds every component the substituted config describes.
    fn init_components(&mut self) -> Result<()> {
        let config = self.substituted_config()?;
        let env = self.runtime_environment();

        for (name, component) in &config.stores {
            let store = self.registry.instantiate_store(name, component, &env)?;
            self.stores.insert(name.clone(), store);
        }
        for (name, component) in &config.datasources {
            let datasource = self.registry.instantiate_datasource(name, component, &env)?;
            self.datasources.insert(name.clone(), datasource);
        }
        for (name, component) in &config.validation_operators {
            let operator = self
                .registry
                .instantiate_validation_operator(name, component, &env)?;
            self.validation_operators.insert(name.clone(), operator);
        }
        Ok(())
    }

    fn runtime_environment(&self) -> RuntimeEnvironment {
        match &self.root_directory {
            Some(root) => RuntimeEnvironment::new().with_root_directory(root),
            None => RuntimeEnvironment::new(),
        }
    }

    /// The raw project config, with `${VARIABLE}` tokens intact.
    pub fn project_config(&self) -> &ProjectConfig {
        &self.project_config
    }

    /// The context root directory, when filesystem-backed.
    pub fn root_directory(&self) -> Option<&Path> {
        self.root_directory.as_deref()
    }

    /// The configured asset-name delimiter.
    pub fn asset_name_delimiter(&self) -> char {
        self.asset_name_delimiter
    }

    /// The registry this context builds components with.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Loads the current config variables.
    ///
    /// Without a root directory (or a configured variables file) this is the
    /// empty mapping.
    pub fn config_variables(&self) -> Result<Variables> {
        match (
            &self.root_directory,
            &self.project_config.config_variables_file_path,
        ) {
            (Some(root), Some(relative)) => {
                variables::load_config_variables(&variables::variables_file_path(root, relative))
            }
            _ => Ok(Variables::new()),
        }
    }

    /// The substituted view of the project config.
    ///
    /// Recomputed on every call from the raw config and the variables file as
    /// it exists right now, so a newly saved variable is visible immediately.
    pub fn substituted_config(&self) -> Result<ProjectConfig> {
        let variables = self.config_variables()?;
        self.project_config.substituted(&variables)
    }

    /// Saves one config variable to the variables file.
    ///
    /// Requires a filesystem-backed context with a configured variables file
    /// path.
    pub fn save_config_variable(&self, name: &str, value: Value) -> Result<()> {
        let root = self.root_directory.as_ref().ok_or_else(|| {
            VerdictError::invalid_config(
                "cannot save a config variable: this context has no root directory",
            )
        })?;
        let relative = self
            .project_config
            .config_variables_file_path
            .as_ref()
            .ok_or_else(|| {
                VerdictError::invalid_config(
                    "cannot save a config variable: 'config_variables_file_path' is not set",
                )
            })?;
        let path = variables::variables_file_path(root, relative);
        debug!(name, path = %path.display(), "saving config variable");
        variables::save_config_variable(&path, name, value)
    }

    /// The plugins directory resolved against the root, when both are set.
    pub fn plugins_directory(&self) -> Option<PathBuf> {
        let relative = self.project_config.plugins_directory.as_ref()?;
        let path = Path::new(relative);
        if path.is_absolute() {
            Some(path.to_path_buf())
        } else {
            self.root_directory.as_ref().map(|root| root.join(path))
        }
    }

    // ---- datasources ----

    /// Adds a datasource to the config and, when `initialize` is set, builds
    /// and caches it.
    ///
    /// The config fragment is normalized (class defaults applied) and written
    /// to the raw config; the live instance is built from the substituted
    /// view. Returns the instance when initialized.
    pub fn add_datasource(
        &mut self,
        name: &str,
        config: ComponentConfig,
        initialize: bool,
    ) -> Result<Option<Arc<dyn Datasource>>> {
        let normalized = self.registry.normalize_datasource_config(&config)?;
        self.project_config
            .datasources
            .insert(name.to_string(), normalized);

        if !initialize {
            return Ok(None);
        }
        let substituted = self.substituted_config()?;
        let component = substituted
            .datasources
            .get(name)
            .ok_or_else(|| VerdictError::not_found("datasource", name))?;
        let datasource =
            self.registry
                .instantiate_datasource(name, component, &self.runtime_environment())?;
        self.datasources.insert(name.to_string(), Arc::clone(&datasource));
        Ok(Some(datasource))
    }

    /// Returns a datasource by name, building it from config on first access.
    pub fn get_datasource(&mut self, name: &str) -> Result<Arc<dyn Datasource>> {
        if let Some(datasource) = self.datasources.get(name) {
            return Ok(Arc::clone(datasource));
        }
        let substituted = self.substituted_config()?;
        let component = substituted
            .datasources
            .get(name)
            .ok_or_else(|| VerdictError::not_found("datasource", name))?;
        let datasource =
            self.registry
                .instantiate_datasource(name, component, &self.runtime_environment())?;
        self.datasources.insert(name.to_string(), Arc::clone(&datasource));
        Ok(datasource)
    }

    /// Names of all configured datasources, in configuration order.
    pub fn list_datasource_names(&self) -> Vec<String> {
        self.project_config.datasources.keys().cloned().collect()
    }

    // ---- stores ----

    /// Adds a store to the config, builds it, and caches it.
    pub fn add_store(&mut self, name: &str, config: ComponentConfig) -> Result<Arc<dyn MetricStore>> {
        self.project_config
            .stores
            .insert(name.to_string(), config);

        let substituted = self.substituted_config()?;
        let component = substituted
            .stores
            .get(name)
            .ok_or_else(|| VerdictError::not_found("store", name))?;
        let store = self
            .registry
            .instantiate_store(name, component, &self.runtime_environment())?;
        self.stores.insert(name.to_string(), Arc::clone(&store));
        Ok(store)
    }

    /// Returns a store by name, building it from config on first access.
    pub fn get_store(&mut self, name: &str) -> Result<Arc<dyn MetricStore>> {
        if let Some(store) = self.stores.get(name) {
            return Ok(Arc::clone(store));
        }
        let substituted = self.substituted_config()?;
        let component = substituted
            .stores
            .get(name)
            .ok_or_else(|| VerdictError::not_found("store", name))?;
        let store = self
            .registry
            .instantiate_store(name, component, &self.runtime_environment())?;
        self.stores.insert(name.to_string(), Arc::clone(&store));
        Ok(store)
    }

    /// Names of all configured stores, in configuration order.
    pub fn list_store_names(&self) -> Vec<String> {
        self.project_config.stores.keys().cloned().collect()
    }

    /// The store designated for expectation suites.
    pub fn expectations_store(&mut self) -> Result<Arc<dyn MetricStore>> {
        self.designated_store("expectations_store_name", |c| {
            c.expectations_store_name.clone()
        })
    }

    /// The store designated for validation results.
    pub fn validations_store(&mut self) -> Result<Arc<dyn MetricStore>> {
        self.designated_store("validations_store_name", |c| c.validations_store_name.clone())
    }

    /// The store designated for evaluation parameters.
    pub fn evaluation_parameter_store(&mut self) -> Result<Arc<dyn MetricStore>> {
        self.designated_store("evaluation_parameter_store_name", |c| {
            c.evaluation_parameter_store_name.clone()
        })
    }

    fn designated_store(
        &mut self,
        setting: &str,
        pick: impl Fn(&ProjectConfig) -> String,
    ) -> Result<Arc<dyn MetricStore>> {
        let name = pick(&self.project_config);
        self.get_store(&name).map_err(|e| match e {
            VerdictError::NotFound { .. } => VerdictError::invalid_config(format!(
                "'{setting}' refers to '{name}', which is not a configured store"
            )),
            other => other,
        })
    }

    // ---- validation operators ----

    /// Adds a validation operator to the config, builds it, and caches it.
    pub fn add_validation_operator(
        &mut self,
        name: &str,
        config: ComponentConfig,
    ) -> Result<Arc<dyn ValidationOperator>> {
        self.project_config
            .validation_operators
            .insert(name.to_string(), config);

        let substituted = self.substituted_config()?;
        let component = substituted
            .validation_operators
            .get(name)
            .ok_or_else(|| VerdictError::not_found("validation operator", name))?;
        let operator = self.registry.instantiate_validation_operator(
            name,
            component,
            &self.runtime_environment(),
        )?;
        self.validation_operators
            .insert(name.to_string(), Arc::clone(&operator));
        Ok(operator)
    }

    /// Returns a validation operator by name, building it on first access.
    pub fn get_validation_operator(&mut self, name: &str) -> Result<Arc<dyn ValidationOperator>> {
        if let Some(operator) = self.validation_operators.get(name) {
            return Ok(Arc::clone(operator));
        }
        let substituted = self.substituted_config()?;
        let component = substituted
            .validation_operators
            .get(name)
            .ok_or_else(|| VerdictError::not_found("validation operator", name))?;
        let operator = self.registry.instantiate_validation_operator(
            name,
            component,
            &self.runtime_environment(),
        )?;
        self.validation_operators
            .insert(name.to_string(), Arc::clone(&operator));
        Ok(operator)
    }

    /// Names of all configured validation operators, in configuration order.
    pub fn list_validation_operator_names(&self) -> Vec<String> {
        self.project_config
            .validation_operators
            .keys()
            .cloned()
            .collect()
    }

}
