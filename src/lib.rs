//! env-config - named environment variable profiles for interactive shells
//!
//! Profiles of environment variables are declared in an `env-config.yaml`
//! file and grouped together; activating a selection prints statements the
//! shell sources. Values that are secret references (`op://...`,
//! `aws-vault://...`) are resolved through their command line tools at
//! activation time and never written to disk.
//!
//! # Example
//!
//! ```ignore
//! use env_config::{Config, EnvConfig, shell::{self, Shell}};
//! use std::path::Path;
//!
//! let env_config = EnvConfig::new(Config::load(Path::new("."))?);
//! let vars = env_config.resolve(&["starfleet"])?;
//! print!("{}", shell::set_block(Shell::Bash, &["starfleet"], &vars));
//! ```

mod error;
mod selection;

pub mod resolver;
pub mod shell;

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;

pub use env_config_core::{Config, ParseError, Profile};
pub use error::{EnvConfigError, Result};
pub use selection::EnvConfig;

#[cfg(test)]
mod tests;
