//! Built-in component classes and their registry wiring.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::config::ComponentConfig;
use crate::error::{Result, VerdictError};
use crate::plugin::{
    Datasource, PluginRegistry, RuntimeEnvironment, ValidationOperator, DATASOURCE_MODULE,
    STORE_MODULE, VALIDATION_OPERATOR_MODULE,
};
use crate::store::{InMemoryMetricStore, SqlMetricStore, SqlStoreOptions};

/// Registers all built-in classes into `registry`.
pub fn register(registry: &mut PluginRegistry) {
    registry.register_datasource(
        FilesystemDatasource::CLASS_NAME,
        DATASOURCE_MODULE,
        Box::new(|name, config, env| {
            Ok(Arc::new(FilesystemDatasource::from_config(name, config, env)?)
                as Arc<dyn Datasource>)
        }),
    );
    registry.register_config_hook(
        FilesystemDatasource::CLASS_NAME,
        Box::new(FilesystemDatasource::build_configuration),
    );

    registry.register_store(
        crate::store::in_memory::CLASS_NAME,
        STORE_MODULE,
        Box::new(|name, _config, _env| {
            Ok(Arc::new(InMemoryMetricStore::named(name)) as Arc<dyn crate::store::MetricStore>)
        }),
    );
    registry.register_store(
        crate::store::sql::CLASS_NAME,
        STORE_MODULE,
        Box::new(|name, config, env| {
            let store = sql_store_from_config(name, config, env)?;
            Ok(Arc::new(store) as Arc<dyn crate::store::MetricStore>)
        }),
    );

    registry.register_validation_operator(
        ActionListOperator::CLASS_NAME,
        VALIDATION_OPERATOR_MODULE,
        Box::new(|name, config, _env| {
            Ok(Arc::new(ActionListOperator::from_config(name, config)?)
                as Arc<dyn ValidationOperator>)
        }),
    );
}

#[derive(Debug, Deserialize)]
struct FilesystemDatasourceOptions {
    base_directory: String,
    #[serde(default = "default_asset_glob")]
    asset_glob: String,
}

fn default_asset_glob() -> String {
    "**/*.csv".to_string()
}

/// A datasource producing batches from files under a base directory.
#[derive(Debug)]
pub struct FilesystemDatasource {
    name: String,
    base_directory: PathBuf,
    asset_glob: String,
}

impl FilesystemDatasource {
    /// The registered class name of this datasource.
    pub const CLASS_NAME: &'static str = "FilesystemDatasource";

    /// Builds a datasource from its config fragment.
    ///
    /// A relative `base_directory` resolves against the context root when the
    /// runtime environment provides one.
    pub fn from_config(
        name: &str,
        config: &ComponentConfig,
        env: &RuntimeEnvironment,
    ) -> Result<Self> {
        let options: FilesystemDatasourceOptions = config.options_as()?;
        let base = PathBuf::from(&options.base_directory);
        let base_directory = if base.is_absolute() {
            base
        } else {
            match &env.root_directory {
                Some(root) => root.join(base),
                None => base,
            }
        };
        Ok(Self {
            name: name.to_string(),
            base_directory,
            asset_glob: options.asset_glob,
        })
    }

    /// Fills in class defaults for a datasource config fragment.
    pub fn build_configuration(config: &ComponentConfig) -> Result<ComponentConfig> {
        let mut config = config.clone();
        if config.option("base_directory").is_none() {
            config = config.with_option("base_directory", "data");
        }
        if config.option("asset_glob").is_none() {
            config = config.with_option("asset_glob", default_asset_glob());
        }
        Ok(config)
    }

    /// The directory this datasource reads from.
    pub fn base_directory(&self) -> &PathBuf {
        &self.base_directory
    }
}

impl Datasource for FilesystemDatasource {
    fn name(&self) -> &str {
        &self.name
    }

    fn asset_names(&self) -> Result<Vec<String>> {
        let pattern = self.base_directory.join(&self.asset_glob);
        let pattern = pattern.to_string_lossy();
        debug!(datasource = %self.name, pattern = %pattern, "listing data assets");

        let mut names = Vec::new();
        let paths = glob::glob(&pattern)
            .map_err(|e| VerdictError::invalid_config(format!("invalid asset_glob: {e}")))?;
        for path in paths {
            let path = path.map_err(|e| VerdictError::Io(e.into_error()))?;
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[derive(Debug, Deserialize)]
struct ActionItem {
    name: String,
    #[serde(default)]
    #[allow(dead_code)]
    action: Option<serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct ActionListOperatorOptions {
    #[serde(default)]
    action_list: Vec<ActionItem>,
}

/// A validation operator running a fixed list of named actions.
#[derive(Debug)]
pub struct ActionListOperator {
    name: String,
    actions: Vec<String>,
}

impl ActionListOperator {
    /// The registered class name of this operator.
    pub const CLASS_NAME: &'static str = "ActionListOperator";

    /// Builds an operator from its config fragment.
    pub fn from_config(name: &str, config: &ComponentConfig) -> Result<Self> {
        let options: ActionListOperatorOptions = config.options_as()?;
        Ok(Self {
            name: name.to_string(),
            actions: options.action_list.into_iter().map(|a| a.name).collect(),
        })
    }

    /// Names of the configured actions, in configuration order.
    pub fn action_names(&self) -> &[String] {
        &self.actions
    }
}

impl ValidationOperator for ActionListOperator {
    fn name(&self) -> &str {
        &self.name
    }
}

fn sql_store_from_config(
    name: &str,
    config: &ComponentConfig,
    env: &RuntimeEnvironment,
) -> Result<SqlMetricStore> {
    #[derive(Debug, Deserialize)]
    struct SqlStoreConfig {
        #[serde(default)]
        credentials: Option<crate::store::SqlCredentials>,
        #[serde(default)]
        connection_string: Option<String>,
        #[serde(default)]
        url: Option<String>,
    }

    let parsed: SqlStoreConfig = config.options_as()?;
    let mut options = SqlStoreOptions::new().with_store_name(name);

    if let Some(mut credentials) = parsed.credentials {
        // Relative database paths live under the context root.
        if let (Some(database), Some(root)) = (&credentials.database, &env.root_directory) {
            let path = PathBuf::from(database);
            if !path.is_absolute() {
                credentials.database = Some(root.join(path).to_string_lossy().into_owned());
            }
        }
        options = options.with_credentials(credentials);
    }
    if let Some(connection_string) = parsed.connection_string {
        options = options.with_connection_string(connection_string);
    }
    if let Some(url) = parsed.url {
        options = options.with_url(url);
    }

    SqlMetricStore::new(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginRegistry;
    use std::fs;

    #[test]
    fn test_filesystem_datasource_lists_assets() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("orders.csv"), "a,b\n1,2\n").unwrap();
        fs::write(dir.path().join("customers.csv"), "x\n9\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let config = ComponentConfig::new(FilesystemDatasource::CLASS_NAME)
            .with_option("base_directory", dir.path().display().to_string())
            .with_option("asset_glob", "*.csv");
        let datasource =
            FilesystemDatasource::from_config("files", &config, &RuntimeEnvironment::new())
                .unwrap();

        assert_eq!(datasource.name(), "files");
        assert_eq!(datasource.asset_names().unwrap(), ["customers", "orders"]);
    }

    #[test]
    fn test_relative_base_directory_resolves_against_root() {
        let root = tempfile::tempdir().unwrap();
        let config = ComponentConfig::new(FilesystemDatasource::CLASS_NAME)
            .with_option("base_directory", "data");
        let env = RuntimeEnvironment::new().with_root_directory(root.path());

        let datasource = FilesystemDatasource::from_config("files", &config, &env).unwrap();
        assert_eq!(datasource.base_directory(), &root.path().join("data"));
    }

    #[test]
    fn test_build_configuration_fills_defaults() {
        let config = ComponentConfig::new(FilesystemDatasource::CLASS_NAME);
        let normalized = FilesystemDatasource::build_configuration(&config).unwrap();
        assert_eq!(
            normalized.option("base_directory"),
            Some(&serde_yaml::Value::String("data".into()))
        );
        assert_eq!(
            normalized.option("asset_glob"),
            Some(&serde_yaml::Value::String("**/*.csv".into()))
        );

        // Explicit settings win over defaults.
        let config = config.with_option("base_directory", "lake");
        let normalized = FilesystemDatasource::build_configuration(&config).unwrap();
        assert_eq!(
            normalized.option("base_directory"),
            Some(&serde_yaml::Value::String("lake".into()))
        );
    }

    #[test]
    fn test_missing_base_directory_rejected_at_construction() {
        let config = ComponentConfig::new(FilesystemDatasource::CLASS_NAME);
        let err = FilesystemDatasource::from_config("files", &config, &RuntimeEnvironment::new())
            .unwrap_err();
        assert!(matches!(err, VerdictError::InvalidConfig(_)));
    }

    #[test]
    fn test_action_list_operator_from_config() {
        let config: ComponentConfig = serde_yaml::from_str(
            r"
            class_name: ActionListOperator
            action_list:
              - name: store_validation_result
              - name: update_data_docs
                action:
                  class_name: UpdateDataDocsAction
            ",
        )
        .unwrap();

        let operator = ActionListOperator::from_config("ops", &config).unwrap();
        assert_eq!(operator.name(), "ops");
        assert_eq!(
            operator.action_names(),
            ["store_validation_result", "update_data_docs"]
        );
    }

    #[test]
    fn test_sql_store_database_resolves_against_root() {
        let root = tempfile::tempdir().unwrap();
        let config: ComponentConfig = serde_yaml::from_str(
            r"
            class_name: SqlMetricStore
            credentials:
              drivername: sqlite
              database: uncommitted/metrics.db
            ",
        )
        .unwrap();
        let env = RuntimeEnvironment::new().with_root_directory(root.path());

        let registry = PluginRegistry::with_builtins();
        let store = registry.instantiate_store("metrics", &config, &env).unwrap();
        assert_eq!(store.store_name(), Some("metrics"));
        assert!(root.path().join("uncommitted").join("metrics.db").exists());
    }
}
