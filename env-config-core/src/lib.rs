//! # env-config Core
//!
//! This crate provides the configuration tree for env-config: loading the
//! `env-config.yaml` file, interpolating references, and synthesizing the
//! profiles implied by `aws-vault` shorthands.
//!
//! ## Configuration Structure
//!
//! ```yaml
//! aws-vault:
//!   - level12            # becomes profile `aws.level12`
//!
//! profile:
//!   tng:
//!     PICARD: captain
//!     RIKER: op://private/riker/password
//!   ds9:
//!     SISKO: depends on season
//!
//! group:
//!   starfleet: [tng, ds9]
//! ```
//!
//! The process environment is injected as the `env` section before
//! interpolation, so values may reference it as `{env.HOME}`.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod interpolation;

use interpolation::Interpolator;

/// File name searched for when loading from a directory.
pub const CONFIG_FILE_NAME: &str = "env-config.yaml";

/// Prefix of the profiles synthesized for each `aws-vault` shorthand.
pub const AWS_VAULT_PROFILE_PREFIX: &str = "aws.";

/// URI scheme understood by the aws-vault resolver.
pub const AWS_VAULT_SCHEME: &str = "aws-vault://";

/// Variables exported by `aws-vault exec`, in the order they are requested.
pub const AWS_VAULT_VARS: [&str; 6] = [
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_SECURITY_TOKEN",
    "AWS_VAULT",
    "AWS_SESSION_EXPIRATION",
];

/// A named, ordered mapping of environment variable names to raw values.
pub type Profile = IndexMap<String, String>;

/// The loaded configuration tree.
///
/// Declaration order from the file is kept for profiles, groups and the
/// variables inside each profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Profile name to variable mapping
    pub profiles: IndexMap<String, Profile>,
    /// Group name to member profile names
    pub groups: IndexMap<String, Vec<String>>,
    /// Declared aws-vault shorthands
    pub aws_vault: Vec<String>,
    /// File the configuration was read from, if any
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    profile: Option<IndexMap<String, Option<IndexMap<String, Value>>>>,
    #[serde(default)]
    group: Option<IndexMap<String, Option<Vec<String>>>>,
    #[serde(default, rename = "aws-vault")]
    aws_vault: Option<Vec<String>>,
}

impl Config {
    /// Load the configuration starting at `start_at`.
    ///
    /// A directory is searched upwards for `env-config.yaml`; a `.yaml` or
    /// `.yml` file is read directly. The process environment becomes the
    /// `env` section.
    ///
    /// # Errors
    ///
    /// - `ParseError::NotFound` when no configuration file exists in the
    ///   directory or any of its parents
    /// - `ParseError::InvalidPath` when `start_at` is neither a directory
    ///   nor a YAML file
    pub fn load(start_at: &Path) -> Result<Self, ParseError> {
        let path = if start_at.is_dir() {
            find_upwards(start_at, CONFIG_FILE_NAME).ok_or_else(|| ParseError::NotFound {
                start: start_at.to_path_buf(),
            })?
        } else if matches!(
            start_at.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        ) {
            start_at.to_path_buf()
        } else {
            return Err(ParseError::InvalidPath(start_at.to_path_buf()));
        };

        Self::try_from(path.as_path())
    }

    /// Parse a configuration document using `env` as the `env` section.
    pub fn from_str_with_env<I, K, V>(content: &str, env: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut root: Value = serde_yaml::from_str(content)?;
        if root.is_null() {
            root = Value::Mapping(Mapping::new());
        }

        let env_section: Mapping = env
            .into_iter()
            .map(|(k, v)| (Value::String(k.into()), Value::String(v.into())))
            .collect();
        match &mut root {
            Value::Mapping(map) => {
                map.insert(Value::String("env".into()), Value::Mapping(env_section));
            }
            _ => {
                return Err(ParseError::Validation(
                    "The top level of the configuration must be a mapping".into(),
                ));
            }
        }

        let raw: RawConfig = serde_yaml::from_value(root.clone())?;
        let mut interpolator = Interpolator::new(&root);

        let mut profiles = IndexMap::new();
        for (profile_name, vars) in raw.profile.unwrap_or_default() {
            let mut profile = Profile::new();
            for (var_name, value) in vars.unwrap_or_default() {
                let value = match &value {
                    Value::String(s) => interpolator.interpolate(s)?,
                    other => scalar_to_string(other).ok_or_else(|| {
                        ParseError::Validation(format!(
                            "Profile '{}': variable '{}' must be a scalar value",
                            profile_name, var_name
                        ))
                    })?,
                };
                profile.insert(var_name, value);
            }
            profiles.insert(profile_name, profile);
        }

        let groups = raw
            .group
            .unwrap_or_default()
            .into_iter()
            .map(|(name, members)| (name, members.unwrap_or_default()))
            .collect();

        let mut config = Config {
            profiles,
            groups,
            aws_vault: raw.aws_vault.unwrap_or_default(),
            path: None,
        };
        config.synthesize_aws_vault_profiles();
        Ok(config)
    }

    /// Get a profile by name.
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Get a group's member profile names.
    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Profile names in declaration order.
    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Group names in declaration order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    // Internal methods

    fn synthesize_aws_vault_profiles(&mut self) {
        for shorthand in &self.aws_vault {
            let profile = AWS_VAULT_VARS
                .iter()
                .map(|var| {
                    (
                        var.to_string(),
                        format!("{}{}/{}", AWS_VAULT_SCHEME, shorthand, var),
                    )
                })
                .collect();
            self.profiles.insert(
                format!("{}{}", AWS_VAULT_PROFILE_PREFIX, shorthand),
                profile,
            );
        }
    }
}

impl FromStr for Config {
    type Err = ParseError;

    /// Parse configuration from a YAML string, using the process
    /// environment as the `env` section.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Self::from_str_with_env(s, env)
    }
}

impl TryFrom<&Path> for Config {
    type Error = ParseError;

    /// Load configuration from a file path.
    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let content = fs::read_to_string(path).map_err(|e| {
            ParseError::Io(io::Error::new(
                e.kind(),
                format!("Failed to read {}: {}", path.display(), e),
            ))
        })?;
        let mut config: Config = content.parse()?;
        config.path = Some(path.to_path_buf());
        Ok(config)
    }
}

/// Find `file_name` in `dir` or the closest ancestor containing it.
pub fn find_upwards(dir: &Path, file_name: &str) -> Option<PathBuf> {
    dir.ancestors()
        .map(|d| d.join(file_name))
        .find(|candidate| candidate.is_file())
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Errors that can occur when loading env-config configuration files.
#[derive(Debug)]
pub enum ParseError {
    /// I/O error when reading the configuration file
    Io(io::Error),
    /// YAML syntax or shape error
    Yaml(serde_yaml::Error),
    /// No configuration file in the start directory or its parents
    NotFound { start: PathBuf },
    /// The given path is neither a directory nor a YAML file
    InvalidPath(PathBuf),
    /// A `{reference}` could not be resolved
    Interpolation(String),
    /// Validation error
    Validation(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Io(e) => write!(f, "I/O error: {}", e),
            ParseError::Yaml(e) => write!(f, "YAML parsing error: {}", e),
            ParseError::NotFound { start } => write!(
                f,
                "No {} in {} or parents",
                CONFIG_FILE_NAME,
                start.display()
            ),
            ParseError::InvalidPath(path) => write!(
                f,
                "{} should be a directory or .yaml file",
                path.display()
            ),
            ParseError::Interpolation(msg) => write!(f, "Interpolation error: {}", msg),
            ParseError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(e) => Some(e),
            ParseError::Yaml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        ParseError::Io(e)
    }
}

impl From<serde_yaml::Error> for ParseError {
    fn from(e: serde_yaml::Error) -> Self {
        ParseError::Yaml(e)
    }
}
