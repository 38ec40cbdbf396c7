//! # Resolver System
//!
//! Profile values are usually literals, but a value shaped like a secret
//! reference is replaced at activation time by asking an external tool for
//! the real secret. Each kind of reference is handled by a [`Resolver`].
//!
//! ## Available Resolvers
//!
//! - [`OnePasswordResolver`]: `op://vault/item/field`, one `op read` per value
//! - [`AwsVaultResolver`]: `aws-vault://<profile>/<VAR>`, one `aws-vault exec`
//!   per profile, shared by every variable of that profile
//!
//! ## Example
//!
//! ```rust,ignore
//! use env_config::resolver::ResolverRegistry;
//!
//! let registry = ResolverRegistry::from_env();
//! let value = registry.resolve_value("op://private/db/password")?;
//! ```

use crate::Result;
use std::sync::Arc;

pub mod aws_vault;
pub mod command;
pub mod onepassword;


pub use aws_vault::{AwsVaultResolver, VaultSettings};
pub use command::{CommandOutput, CommandRunner, Invocation, SystemRunner};
pub use onepassword::OnePasswordResolver;

/// Converts a recognized raw value into its concrete value.
pub trait Resolver: Send + Sync {
    /// Name of this resolver for logs.
    fn name(&self) -> &'static str;

    /// Whether `value` is a reference this resolver handles.
    ///
    /// This is a pure shape check; it must not fail and returns `false` for
    /// empty values.
    fn recognizes(&self, value: &str) -> bool;

    /// Resolve `value`, which [`recognizes`](Resolver::recognizes) accepted.
    ///
    /// May block on an external program.
    fn convert(&self, value: &str) -> Result<String>;
}

/// The resolvers consulted for every value, in registration order.
pub struct ResolverRegistry {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl ResolverRegistry {
    pub fn new(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        Self { resolvers }
    }

    /// A registry that leaves every value untouched.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// The built-in resolvers running their tools through `runner`.
    pub fn builtin(runner: Arc<dyn CommandRunner>, vault: VaultSettings) -> Self {
        Self::new(vec![
            Box::new(OnePasswordResolver::new(runner.clone())),
            Box::new(AwsVaultResolver::new(runner, vault)),
        ])
    }

    /// The built-in resolvers running real processes, with aws-vault settings
    /// read from the environment once.
    pub fn from_env() -> Self {
        Self::builtin(Arc::new(SystemRunner), VaultSettings::from_env())
    }

    /// The first resolver recognizing `value`, if any.
    pub fn find(&self, value: &str) -> Option<&dyn Resolver> {
        for resolver in &self.resolvers {
            if resolver.recognizes(value) {
                return Some(&**resolver);
            }
        }
        None
    }

    /// Resolve `value` with the first resolver that recognizes it, or return
    /// it unchanged.
    pub fn resolve_value(&self, value: &str) -> Result<String> {
        match self.find(value) {
            Some(resolver) => {
                tracing::debug!(resolver = resolver.name(), "resolving value");
                resolver.convert(value)
            }
            None => Ok(value.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}
