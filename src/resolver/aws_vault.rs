use super::Resolver;
use super::command::{CommandRunner, Invocation, run_checked};
use crate::{EnvConfigError, Result};
use env_config_core::{AWS_VAULT_SCHEME, AWS_VAULT_VARS};
use std::collections::HashMap;
use std::env;
use std::sync::{Arc, Mutex, PoisonError};

/// Environment variable overriding the `--duration` passed to aws-vault.
pub const DURATION_ENV: &str = "ENV_CONFIG_AWS_VAULT_DURATION";
/// Environment variable overriding the `--prompt` passed to aws-vault.
pub const PROMPT_ENV: &str = "ENV_CONFIG_AWS_VAULT_PROMPT";

const DEFAULT_DURATION: &str = "1h";
const DEFAULT_PROMPT: &str = "zenity";

/// Session options handed to `aws-vault exec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSettings {
    pub duration: String,
    pub prompt: String,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl VaultSettings {
    /// Read the settings from `ENV_CONFIG_AWS_VAULT_DURATION` and
    /// `ENV_CONFIG_AWS_VAULT_PROMPT`, falling back to `1h` and `zenity`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            duration: env::var(DURATION_ENV).unwrap_or(defaults.duration),
            prompt: env::var(PROMPT_ENV).unwrap_or(defaults.prompt),
        }
    }
}

/// Resolves `aws-vault://<session>/<VAR>` references.
///
/// The first reference to a session runs `aws-vault exec` once and captures
/// every variable in [`AWS_VAULT_VARS`]; later references to the same
/// session, whatever the variable, are answered from the cache owned by
/// this resolver.
pub struct AwsVaultResolver {
    runner: Arc<dyn CommandRunner>,
    settings: VaultSettings,
    sessions: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl AwsVaultResolver {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: VaultSettings) -> Self {
        Self {
            runner,
            settings,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Split a reference into its session and variable name.
    pub fn parse_uri(value: &str) -> Result<(&str, &str)> {
        let invalid = || EnvConfigError::InvalidResolverUri(value.to_string());
        let rest = value.strip_prefix(AWS_VAULT_SCHEME).ok_or_else(invalid)?;
        let (session, field) = rest.split_once('/').ok_or_else(invalid)?;
        if session.is_empty() || field.is_empty() || field.contains('/') {
            return Err(invalid());
        }
        Ok((session, field))
    }

    fn invocation(&self, session: &str) -> Invocation {
        let mut args = vec![
            "exec".to_string(),
            session.to_string(),
            "--duration".to_string(),
            self.settings.duration.clone(),
            "--prompt".to_string(),
            self.settings.prompt.clone(),
            "--".to_string(),
            "printenv".to_string(),
        ];
        args.extend(AWS_VAULT_VARS.iter().map(|v| v.to_string()));

        // aws-vault refuses to nest sessions, so drop any credentials we inherited.
        Invocation::new("aws-vault", args).without_env(AWS_VAULT_VARS)
    }

    fn fetch_session(&self, session: &str) -> Result<HashMap<String, String>> {
        tracing::debug!(session, "starting aws-vault session");
        let stdout = run_checked(self.runner.as_ref(), &self.invocation(session))?;

        Ok(AWS_VAULT_VARS
            .iter()
            .zip(stdout.lines())
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

impl Resolver for AwsVaultResolver {
    fn name(&self) -> &'static str {
        "aws-vault"
    }

    fn recognizes(&self, value: &str) -> bool {
        value.starts_with(AWS_VAULT_SCHEME)
    }

    fn convert(&self, value: &str) -> Result<String> {
        let (session, field) = Self::parse_uri(value)?;

        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if !sessions.contains_key(session) {
            let values = self.fetch_session(session)?;
            sessions.insert(session.to_string(), values);
        }

        sessions
            .get(session)
            .and_then(|values| values.get(field))
            .cloned()
            .ok_or_else(|| EnvConfigError::VaultFieldMissing {
                session: session.to_string(),
                field: field.to_string(),
            })
    }
}
