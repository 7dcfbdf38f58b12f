//! Filesystem-backed data context.
//!
//! Projects live on disk as a `verdict/` directory holding `verdict.yml` plus
//! the conventional subdirectories. [`FileDataContext`] loads the config from
//! disk, and persists the raw config back to `verdict.yml` after every
//! `add_*` mutation.

use std::env;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::Value;
use tracing::{debug, info};

use crate::config::{variables, ComponentConfig, ProjectConfig};
use crate::context::{ContextOptions, DataContext};
use crate::error::{Result, VerdictError};
use crate::plugin::{Datasource, PluginRegistry, ValidationOperator};
use crate::store::MetricStore;

/// Name of the project directory holding the config file.
pub const PROJECT_DIR: &str = "verdict";
/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "verdict.yml";
/// Environment variable overriding the project-root search.
pub const HOME_ENV_VAR: &str = "VERDICT_HOME";

/// How many parent directories the root search climbs.
const SEARCH_LEVELS: usize = 4;

const CONFIG_FILE_INTRO: &str = "\
# Verdict project configuration.
#
# Values of the form ${VARIABLE} are substituted at load time from the
# config variables file; see config_variables_file_path below.
";

/// A data context whose configuration lives in a `verdict.yml` file.
///
/// Dereferences to [`DataContext`] for all read and get operations; the
/// mutating `add_*` operations are wrapped so the raw config is written back
/// to disk after each one.
pub struct FileDataContext {
    context: DataContext,
}

impl Deref for FileDataContext {
    type Target = DataContext;

    fn deref(&self) -> &DataContext {
        &self.context
    }
}

impl DerefMut for FileDataContext {
    fn deref_mut(&mut self) -> &mut DataContext {
        &mut self.context
    }
}

impl std::fmt::Debug for FileDataContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDataContext")
            .field("root_directory", &self.context.root_directory())
            .finish()
    }
}

impl FileDataContext {
    /// Opens the project at `context_root`, or searches for one when absent.
    ///
    /// The search honors the `VERDICT_HOME` environment variable, then walks
    /// up from the current directory looking for `verdict/verdict.yml`.
    pub fn open(context_root: Option<&Path>, registry: Arc<PluginRegistry>) -> Result<Self> {
        let root = match context_root {
            Some(root) => root.to_path_buf(),
            None => find_context_root_dir()?,
        };
        Self::load(&root, registry)
    }

    /// Loads the project rooted at `root` (the `verdict/` directory itself).
    pub fn load(root: &Path, registry: Arc<PluginRegistry>) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        let contents = match fs::read_to_string(&config_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VerdictError::ConfigNotFound(format!(
                    "no '{CONFIG_FILE}' at '{}'",
                    root.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let project_config: ProjectConfig = serde_yaml::from_str(&contents).map_err(|e| {
            VerdictError::invalid_config(format!(
                "could not parse '{}': {e}",
                config_path.display()
            ))
        })?;

        info!(root = %root.display(), "loading file-backed data context");
        let context = DataContext::new_with_options(
            project_config,
            Some(root.to_path_buf()),
            registry,
            ContextOptions::default(),
        )?;
        Ok(Self { context })
    }

    /// Scaffolds a new project under `project_root` and opens it.
    ///
    /// Creates `<project_root>/verdict/` with the template config, the
    /// conventional subdirectories, and a variables file stub. Idempotent: an
    /// existing config file is left as is.
    pub fn create(project_root: &Path, registry: Arc<PluginRegistry>) -> Result<Self> {
        let root = project_root.join(PROJECT_DIR);
        fs::create_dir_all(&root)?;
        for dir in ["plugins", "uncommitted"] {
            fs::create_dir_all(root.join(dir))?;
        }

        let config_path = root.join(CONFIG_FILE);
        if !config_path.is_file() {
            info!(path = %config_path.display(), "scaffolding new project configuration");
            let body = serde_yaml::to_string(&ProjectConfig::template())?;
            fs::write(&config_path, format!("{CONFIG_FILE_INTRO}{body}"))?;

            let variables_path = root.join("uncommitted").join("config_variables.yml");
            if !variables_path.is_file() {
                fs::write(&variables_path, variables::CONFIG_VARIABLES_INTRO)?;
            }
        }

        Self::load(&root, registry)
    }

    /// The absolute path of the project configuration file.
    pub fn config_file_path(&self) -> Result<PathBuf> {
        self.context
            .root_directory()
            .map(|root| root.join(CONFIG_FILE))
            .ok_or_else(|| {
                VerdictError::Internal("file-backed context has no root directory".to_string())
            })
    }

    /// Writes the raw project config back to `verdict.yml`.
    pub fn save_project_config(&self) -> Result<()> {
        let path = self.config_file_path()?;
        debug!(path = %path.display(), "persisting project configuration");
        let body = serde_yaml::to_string(self.context.project_config())?;
        fs::write(&path, format!("{CONFIG_FILE_INTRO}{body}"))?;
        Ok(())
    }

    /// Adds a datasource and persists the config.
    pub fn add_datasource(
        &mut self,
        name: &str,
        config: ComponentConfig,
        initialize: bool,
    ) -> Result<Option<Arc<dyn Datasource>>> {
        let datasource = self.context.add_datasource(name, config, initialize)?;
        self.save_project_config()?;
        Ok(datasource)
    }

    /// Adds a store and persists the config.
    pub fn add_store(&mut self, name: &str, config: ComponentConfig) -> Result<Arc<dyn MetricStore>> {
        let store = self.context.add_store(name, config)?;
        self.save_project_config()?;
        Ok(store)
    }

    /// Adds a validation operator and persists the config.
    pub fn add_validation_operator(
        &mut self,
        name: &str,
        config: ComponentConfig,
    ) -> Result<Arc<dyn ValidationOperator>> {
        let operator = self.context.add_validation_operator(name, config)?;
        self.save_project_config()?;
        Ok(operator)
    }

    /// Saves one config variable through the underlying context.
    pub fn save_config_variable(&self, name: &str, value: Value) -> Result<()> {
        self.context.save_config_variable(name, value)
    }
}

/// Locates the project root directory (`.../verdict/`).
///
/// `VERDICT_HOME` wins when set; otherwise the search starts at the current
/// directory and climbs a bounded number of parent levels looking for
/// `verdict/verdict.yml`.
pub fn find_context_root_dir() -> Result<PathBuf> {
    let home_override = env::var_os(HOME_ENV_VAR).map(PathBuf::from);
    let cwd = env::current_dir()?;
    find_context_root_dir_from(&cwd, home_override.as_deref())
}

fn find_context_root_dir_from(start: &Path, home_override: Option<&Path>) -> Result<PathBuf> {
    if let Some(home) = home_override {
        if home.join(CONFIG_FILE).is_file() {
            return Ok(home.to_path_buf());
        }
        return Err(VerdictError::ConfigNotFound(format!(
            "{HOME_ENV_VAR} points at '{}', which holds no '{CONFIG_FILE}'",
            home.display()
        )));
    }

    let mut dir = start;
    for _ in 0..=SEARCH_LEVELS {
        let candidate = dir.join(PROJECT_DIR);
        if candidate.join(CONFIG_FILE).is_file() {
            debug!(root = %candidate.display(), "found project root");
            return Ok(candidate);
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => break,
        }
    }
    Err(VerdictError::ConfigNotFound(format!(
        "no '{PROJECT_DIR}/{CONFIG_FILE}' found within {SEARCH_LEVELS} levels above '{}'",
        start.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MetricDraft, MetricKey, TimeRange};

    fn registry() -> Arc<PluginRegistry> {
        Arc::new(PluginRegistry::with_builtins())
    }

    #[test]
    fn test_create_scaffolds_project_layout() {
        let dir = tempfile::tempdir().unwrap();
        let context = FileDataContext::create(dir.path(), registry()).unwrap();

        let root = dir.path().join(PROJECT_DIR);
        assert!(root.join(CONFIG_FILE).is_file());
        assert!(root.join("plugins").is_dir());
        assert!(root.join("uncommitted").is_dir());
        assert_eq!(context.root_directory(), Some(root.as_path()));
    }

    #[test]
    fn test_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = FileDataContext::create(dir.path(), registry()).unwrap();
        context
            .add_store("scratch", ComponentConfig::new("InMemoryMetricStore"))
            .unwrap();

        // A second create keeps the customized config.
        let context = FileDataContext::create(dir.path(), registry()).unwrap();
        assert!(context.list_store_names().contains(&"scratch".to_string()));
    }

    #[test]
    fn test_load_missing_config_is_config_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileDataContext::load(dir.path(), registry()).unwrap_err();
        assert!(matches!(err, VerdictError::ConfigNotFound(_)));
    }

    #[test]
    fn test_load_malformed_config_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "stores: [not, a, mapping]").unwrap();
        let err = FileDataContext::load(dir.path(), registry()).unwrap_err();
        assert!(matches!(err, VerdictError::InvalidConfig(_)));
    }

    #[test]
    fn test_add_store_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = FileDataContext::create(dir.path(), registry()).unwrap();
        let store = context
            .add_store("scratch", ComponentConfig::new("InMemoryMetricStore"))
            .unwrap();
        store
            .create(MetricDraft::new(MetricKey::new("b", "m", "d", "v")))
            .unwrap();

        let reloaded =
            FileDataContext::open(Some(&dir.path().join(PROJECT_DIR)), registry()).unwrap();
        assert!(reloaded
            .list_store_names()
            .contains(&"scratch".to_string()));
    }

    #[test]
    fn test_raw_tokens_survive_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = FileDataContext::create(dir.path(), registry()).unwrap();

        context.save_config_variable("METRICS_DB", Value::String("uncommitted/m.db".into())).unwrap();
        let config: ComponentConfig = serde_yaml::from_str(
            r"
            class_name: SqlMetricStore
            credentials:
              drivername: sqlite
              database: ${METRICS_DB}
            ",
        )
        .unwrap();
        context.add_store("metrics", config).unwrap();

        // The persisted file keeps the token; the substituted view resolves it.
        let persisted =
            fs::read_to_string(dir.path().join(PROJECT_DIR).join(CONFIG_FILE)).unwrap();
        assert!(persisted.contains("${METRICS_DB}"));
        assert!(dir
            .path()
            .join(PROJECT_DIR)
            .join("uncommitted")
            .join("m.db")
            .exists());
    }

    #[test]
    fn test_saved_variable_visible_in_substituted_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = FileDataContext::create(dir.path(), registry()).unwrap();
        context
            .add_datasource(
                "files",
                ComponentConfig::new("FilesystemDatasource")
                    .with_option("base_directory", "${DATA_DIR}"),
                false,
            )
            .unwrap();

        context
            .save_config_variable("DATA_DIR", Value::String("lake".into()))
            .unwrap();
        let substituted = context.substituted_config().unwrap();
        assert_eq!(
            substituted.datasources["files"].option("base_directory"),
            Some(&Value::String("lake".into()))
        );
    }

    #[test]
    fn test_insertion_order_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = FileDataContext::create(dir.path(), registry()).unwrap();
        context
            .add_store("zeta", ComponentConfig::new("InMemoryMetricStore"))
            .unwrap();
        context
            .add_store("alpha", ComponentConfig::new("InMemoryMetricStore"))
            .unwrap();

        let reloaded =
            FileDataContext::load(&dir.path().join(PROJECT_DIR), registry()).unwrap();
        let names = reloaded.list_store_names();
        assert_eq!(&names[names.len() - 2..], ["zeta", "alpha"]);
    }

    #[test]
    fn test_root_search_climbs_parents() {
        let dir = tempfile::tempdir().unwrap();
        FileDataContext::create(dir.path(), registry()).unwrap();

        let nested = dir.path().join("a").join("b").join("c");
        fs::create_dir_all(&nested).unwrap();

        let found = find_context_root_dir_from(&nested, None).unwrap();
        assert_eq!(found, dir.path().join(PROJECT_DIR));
    }

    #[test]
    fn test_root_search_bounded() {
        let dir = tempfile::tempdir().unwrap();
        FileDataContext::create(dir.path(), registry()).unwrap();

        let nested = dir.path().join("a").join("b").join("c").join("d").join("e");
        fs::create_dir_all(&nested).unwrap();

        // Five levels up exceeds the bounded search.
        let err = find_context_root_dir_from(&nested, None).unwrap_err();
        assert!(matches!(err, VerdictError::ConfigNotFound(_)));
    }

    #[test]
    fn test_home_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        FileDataContext::create(dir.path(), registry()).unwrap();
        let root = dir.path().join(PROJECT_DIR);

        let elsewhere = tempfile::tempdir().unwrap();
        let found = find_context_root_dir_from(elsewhere.path(), Some(&root)).unwrap();
        assert_eq!(found, root);

        // An override pointing nowhere useful fails instead of falling back.
        let err = find_context_root_dir_from(dir.path(), Some(elsewhere.path())).unwrap_err();
        assert!(matches!(err, VerdictError::ConfigNotFound(_)));
    }

    #[test]
    fn test_designated_stores_work_after_scaffold() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = FileDataContext::create(dir.path(), registry()).unwrap();
        let store = context.expectations_store().unwrap();
        store
            .create(MetricDraft::new(MetricKey::new("b", "m", "d", "v")))
            .unwrap();
        assert_eq!(store.list(&TimeRange::all()).unwrap().len(), 1);
    }
}
