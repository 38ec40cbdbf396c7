//! Error types for env-config operations

use std::path::PathBuf;
use thiserror::Error;

use env_config_core::ParseError;

/// The main error type for env-config operations
///
/// Every variant is fatal to the invocation: selection and resolution are
/// all-or-nothing. Messages never include resolved secret values.
#[derive(Error, Debug)]
pub enum EnvConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("No env-config.yaml in {} or parents", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("{} should be a directory or .yaml file", .0.display())]
    InvalidConfigPath(PathBuf),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Group '{group}' includes profile '{profile}' which is not defined")]
    ProfileNotFound { group: String, profile: String },
    #[error("Invalid resolver URI '{0}'")]
    InvalidResolverUri(String),
    #[error("'{0}' is not installed or not on PATH")]
    CommandNotFound(String),
    #[error("`{command}` failed: {message}")]
    ResolverFailed { command: String, message: String },
    #[error("aws-vault session '{session}' did not provide {field}")]
    VaultFieldMissing { session: String, field: String },
}

/// A type alias for `Result<T, EnvConfigError>`
pub type Result<T> = std::result::Result<T, EnvConfigError>;

impl From<ParseError> for EnvConfigError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Io(io_err) => EnvConfigError::Io(io_err),
            ParseError::Yaml(yaml_err) => EnvConfigError::Yaml(yaml_err),
            ParseError::NotFound { start } => EnvConfigError::ConfigNotFound(start),
            ParseError::InvalidPath(path) => EnvConfigError::InvalidConfigPath(path),
            ParseError::Interpolation(msg) => {
                EnvConfigError::InvalidConfig(format!("interpolation failed: {}", msg))
            }
            ParseError::Validation(msg) => EnvConfigError::InvalidConfig(msg),
        }
    }
}

