//! Error types for the Verdict project core.
//!
//! This module provides the error handling strategy for the crate using
//! `thiserror` for automatic error trait implementations. All errors raised by
//! the configuration, registry, and store layers are represented by the
//! `VerdictError` enum.

use thiserror::Error;

/// The main error type for the Verdict core library.
#[derive(Error, Debug)]
pub enum VerdictError {
    /// No project configuration file could be located.
    ///
    /// Raised when the config file is absent from its expected location or the
    /// upward root-directory search exhausted its bounded number of levels.
    #[error("No project configuration found: {0}")]
    ConfigNotFound(String),

    /// The configuration is present but invalid.
    ///
    /// Covers schema validation failures, missing required connection
    /// parameters, and invalid setting values (e.g. an unsupported asset-name
    /// delimiter).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A component class name could not be resolved by the plugin registry.
    #[error("Unable to resolve component class '{class_name}'{}", module_suffix(.module_name))]
    ClassResolution {
        /// The class name that failed to resolve.
        class_name: String,
        /// The module namespace requested for the class, when one was given.
        module_name: Option<String>,
    },

    /// A registered component constructor failed.
    ///
    /// Construction errors propagate to the caller with the class context
    /// attached; the underlying error is preserved as the source.
    #[error("Failed to construct component '{class_name}': {source}")]
    PluginConstruction {
        /// The class of the component that failed to construct.
        class_name: String,
        /// The underlying construction error.
        #[source]
        source: Box<VerdictError>,
    },

    /// Private-key decryption failed at the decrypt stage.
    #[error("Decryption of key material failed; was the passphrase incorrect?")]
    BadPassphrase,

    /// Private-key material could not be parsed at all.
    ///
    /// Distinguished from [`VerdictError::BadPassphrase`]: this covers
    /// malformed PEM/DER input rather than a wrong passphrase.
    #[error("Invalid private key material: {0}")]
    InvalidKeyMaterial(String),

    /// Error from the SQL persistence backend.
    ///
    /// Store operations roll back their transaction and re-raise the original
    /// driver error unwrapped, so callers see the exact failure.
    #[error("Database error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// A named component was absent from both the registry cache and the
    /// project configuration.
    #[error("{kind} '{name}' was not found in this context")]
    NotFound {
        /// The component kind ("datasource", "store", "validation operator").
        kind: &'static str,
        /// The requested name.
        name: String,
    },

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from YAML parsing or serialization.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Error from JSON payload (de)serialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn module_suffix(module_name: &Option<String>) -> String {
    match module_name {
        Some(module) => format!(" in module '{module}'"),
        None => String::new(),
    }
}

/// A type alias for `Result<T, VerdictError>`.
///
/// This is the standard `Result` type used throughout the crate.
pub type Result<T> = std::result::Result<T, VerdictError>;

impl VerdictError {
    /// Creates a new invalid-configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Creates a new class-resolution error.
    pub fn class_resolution(
        class_name: impl Into<String>,
        module_name: Option<impl Into<String>>,
    ) -> Self {
        Self::ClassResolution {
            class_name: class_name.into(),
            module_name: module_name.map(Into::into),
        }
    }

    /// Wraps a construction failure with the component class context.
    pub fn construction(class_name: impl Into<String>, source: VerdictError) -> Self {
        Self::PluginConstruction {
            class_name: class_name.into(),
            source: Box::new(source),
        }
    }

    /// Creates a new not-found error for a named component.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<VerdictError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            VerdictError::Internal(format!("{}: {}", msg, base_error))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let base_error = e.into();
            VerdictError::Internal(format!("{}: {}", f(), base_error))
        })
    }
}
