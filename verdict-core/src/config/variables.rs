//! Loading and saving the config variables file.
//!
//! The variables file is a YAML mapping of `NAME -> value` kept outside
//! version control (typically under `uncommitted/`). An absent file is treated
//! as an empty mapping; the file is created lazily, with an explanatory
//! header, the first time a variable is saved.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, info};

use crate::config::substitution::Variables;
use crate::error::{Result, VerdictError};

/// Header written at the top of a newly created variables file.
pub const CONFIG_VARIABLES_INTRO: &str = "\
# This file holds values substituted into verdict.yml wherever a ${VARIABLE}
# token appears. Keep it out of version control: it is the place for secrets
# and environment-specific settings such as database credentials.
";

/// Resolves the variables file path against the context root directory.
pub fn variables_file_path(root_directory: &Path, relative_path: &str) -> PathBuf {
    let path = Path::new(relative_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root_directory.join(path)
    }
}

/// Loads all config variables from the given file.
///
/// Returns an empty mapping when the file does not exist or is empty.
pub fn load_config_variables(path: &Path) -> Result<Variables> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config variables file; using empty mapping");
            return Ok(Variables::new());
        }
        Err(e) => return Err(e.into()),
    };

    if contents.trim().is_empty() {
        return Ok(Variables::new());
    }

    let value: Value = serde_yaml::from_str(&contents)?;
    match value {
        Value::Null => Ok(Variables::new()),
        Value::Mapping(_) => {
            serde_yaml::from_value(value).map_err(VerdictError::from)
        }
        _ => Err(VerdictError::invalid_config(format!(
            "config variables file '{}' must contain a YAML mapping",
            path.display()
        ))),
    }
}

/// Saves one config variable, rewriting the variables file.
///
/// Parent directories are created as needed. The explanatory header is kept at
/// the top of the file on every rewrite.
pub fn save_config_variable(path: &Path, name: &str, value: Value) -> Result<()> {
    let mut variables = load_config_variables(path)?;
    variables.insert(name.to_string(), value);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if !path.is_file() {
        info!(path = %path.display(), "creating new config variables file");
    }

    let body = serde_yaml::to_string(&variables)?;
    fs::write(path, format!("{CONFIG_VARIABLES_INTRO}{body}"))?;
    Ok(())
}
