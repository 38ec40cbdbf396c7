use crate::resolver::ResolverRegistry;
use crate::{EnvConfigError, Result};
use env_config_core::{Config, Profile};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ffi::OsString;

/// Turns a selection of profile and group names into environment variables.
///
/// `EnvConfig` owns the loaded [`Config`], the resolvers used for secret
/// references, and a snapshot of the environment it is activating into.
///
/// # Merge order
///
/// Selections are unordered sets, so the outcome never depends on the order
/// names were requested in. Groups are expanded in the order they are
/// declared in the file, members in list order; directly selected profiles
/// follow, in declaration order. When two profiles define the same
/// variable, the one merged last wins.
///
/// # Example
///
/// ```ignore
/// let env_config = EnvConfig::new(Config::load(Path::new("."))?);
/// for (name, value) in env_config.resolve(&["starfleet"])? {
///     println!("{name}={value}");
/// }
/// ```
pub struct EnvConfig {
    config: Config,
    resolvers: ResolverRegistry,
    environ: BTreeMap<String, String>,
}

impl EnvConfig {
    /// Create an engine with the built-in resolvers and the current process
    /// environment.
    pub fn new(config: Config) -> Self {
        Self::with_resolvers(config, ResolverRegistry::from_env())
    }

    /// Create an engine with the given resolvers and the current process
    /// environment.
    pub fn with_resolvers(config: Config, resolvers: ResolverRegistry) -> Self {
        Self {
            config,
            resolvers,
            environ: environ_snapshot(std::env::vars_os()),
        }
    }

    /// Replace the environment snapshot used by [`present_env_vars`](Self::present_env_vars).
    pub fn with_environ<I, K, V>(mut self, environ: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environ = environ
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Profiles whose names are in `names`, keyed by profile name.
    ///
    /// Names that are not profiles are ignored.
    pub fn select_profiles<S: AsRef<str>>(&self, names: &[S]) -> IndexMap<String, Profile> {
        let names = name_set(names);
        self.config
            .profiles
            .iter()
            .filter(|(name, _)| names.contains(name.as_str()))
            .map(|(name, profile)| (name.clone(), profile.clone()))
            .collect()
    }

    /// Member profiles of the groups whose names are in `names`, keyed by
    /// profile name.
    ///
    /// A profile included by several selected groups appears once.
    ///
    /// # Errors
    ///
    /// Returns `EnvConfigError::ProfileNotFound` when a selected group lists
    /// a profile that is not defined.
    pub fn select_groups<S: AsRef<str>>(&self, names: &[S]) -> Result<IndexMap<String, Profile>> {
        let names = name_set(names);
        let mut selected = IndexMap::new();

        for (group_name, members) in &self.config.groups {
            if !names.contains(group_name.as_str()) {
                continue;
            }
            for member in members {
                let profile = self.config.profile(member).ok_or_else(|| {
                    EnvConfigError::ProfileNotFound {
                        group: group_name.clone(),
                        profile: member.clone(),
                    }
                })?;
                selected.insert(member.clone(), profile.clone());
            }
        }

        Ok(selected)
    }

    /// The flat variable mapping for `names`, values unresolved.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<IndexMap<String, String>> {
        let mut merged = self.select_groups(names)?;
        merged.extend(self.select_profiles(names));

        tracing::debug!(
            profiles = ?merged.keys().collect::<Vec<_>>(),
            "selected profiles"
        );

        let mut vars = IndexMap::new();
        for profile in merged.into_values() {
            vars.extend(profile);
        }
        Ok(vars)
    }

    /// The flat variable mapping for `names` with every secret reference
    /// replaced by its resolved value.
    ///
    /// Values are resolved one at a time in mapping order. The first failure
    /// aborts the whole resolution.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<IndexMap<String, String>> {
        let mut vars = self.select(names)?;
        for (name, value) in vars.iter_mut() {
            let _span = tracing::debug_span!("resolve", variable = %name).entered();
            *value = self.resolvers.resolve_value(value)?;
        }
        Ok(vars)
    }

    /// Variables named in any profile that are set in the environment.
    ///
    /// Every profile is considered, not only selected ones, so a shell can
    /// clear whatever a previous activation left behind.
    pub fn present_env_vars(&self) -> BTreeSet<String> {
        self.config
            .profiles
            .values()
            .flat_map(|profile| profile.keys())
            .filter(|name| self.environ.contains_key(name.as_str()))
            .cloned()
            .collect()
    }
}

/// Environment variables whose names are UTF-8.
///
/// Values that are not UTF-8 are kept lossily, so such a variable still
/// counts as set.
fn environ_snapshot<I>(vars: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.to_string_lossy().into_owned())))
        .collect()
}

fn name_set<S: AsRef<str>>(names: &[S]) -> HashSet<&str> {
    names.iter().map(|n| n.as_ref()).collect()
}
