use super::*;
use crate::resolver::tests::{RecordingRunner, failed, ok, vault_output};
use crate::resolver::{ResolverRegistry, VaultSettings};
use env_config_core::AWS_VAULT_VARS;
use indexmap::IndexMap;
use std::collections::BTreeSet;

const BASICS: &str = r#"
profile:
  tng:
    PICARD: captain
    RIKER: number1
  ds9:
    SISKO: depends on season

group:
  starfleet:
    - tng
    - ds9
"#;

fn config(yaml: &str) -> Config {
    Config::from_str_with_env(yaml, Vec::<(String, String)>::new()).unwrap()
}

/// Engine without resolvers and with an empty environment
fn load(yaml: &str) -> EnvConfig {
    EnvConfig::with_resolvers(config(yaml), ResolverRegistry::empty())
        .with_environ(Vec::<(String, String)>::new())
}

fn vars(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn profile(name: &str, pairs: &[(&str, &str)]) -> (String, Profile) {
    (name.to_string(), vars(pairs))
}

fn profiles<const N: usize>(entries: [(String, Profile); N]) -> IndexMap<String, Profile> {
    entries.into_iter().collect()
}

#[test]
fn test_select_profiles() {
    let ec = load(BASICS);

    assert_eq!(
        ec.select_profiles(&["tng"]),
        profiles([profile("tng", &[("PICARD", "captain"), ("RIKER", "number1")])])
    );
    assert_eq!(
        ec.select_profiles(&["ds9"]),
        profiles([profile("ds9", &[("SISKO", "depends on season")])])
    );
    assert_eq!(
        ec.select_profiles(&["ds9", "tng"]),
        profiles([
            profile("tng", &[("PICARD", "captain"), ("RIKER", "number1")]),
            profile("ds9", &[("SISKO", "depends on season")]),
        ])
    );
}

#[test]
fn test_select_profiles_ignores_unknown_names() {
    let ec = load(BASICS);
    assert!(ec.select_profiles(&["voyager"]).is_empty());
    assert!(ec.select_profiles(&["starfleet"]).is_empty());
    assert!(ec.select_profiles::<&str>(&[]).is_empty());
}

#[test]
fn test_select_groups() {
    let ec = load(BASICS);

    assert_eq!(
        ec.select_groups(&["starfleet"]).unwrap(),
        profiles([
            profile("tng", &[("PICARD", "captain"), ("RIKER", "number1")]),
            profile("ds9", &[("SISKO", "depends on season")]),
        ])
    );
    assert!(ec.select_groups(&["ds9"]).unwrap().is_empty());
    assert!(ec.select_groups(&["tng"]).unwrap().is_empty());
    assert!(ec.select_groups(&["foo"]).unwrap().is_empty());
}

#[test]
fn test_select_groups_collapses_shared_members() {
    let ec = load(
        r#"
profile:
  tng: { PICARD: captain }
  ds9: { SISKO: commander }
group:
  fleet: [tng, ds9]
  enterprise: [tng]
"#,
    );

    let selected = ec.select_groups(&["fleet", "enterprise"]).unwrap();
    assert_eq!(selected.keys().collect::<Vec<_>>(), ["tng", "ds9"]);
}

#[test]
fn test_select_groups_missing_member_is_an_error() {
    let ec = load(
        r#"
profile:
  tng: { PICARD: captain }
group:
  starfleet: [tng, voyager]
"#,
    );

    match ec.select_groups(&["starfleet"]) {
        Err(EnvConfigError::ProfileNotFound { group, profile }) => {
            assert_eq!(group, "starfleet");
            assert_eq!(profile, "voyager");
        }
        other => panic!("expected ProfileNotFound, got {:?}", other),
    }
    assert!(matches!(
        ec.select(&["starfleet"]),
        Err(EnvConfigError::ProfileNotFound { .. })
    ));
    // Groups that are not selected are never expanded
    assert!(ec.select(&["tng"]).is_ok());
}

#[test]
fn test_select() {
    let ec = load(BASICS);
    let union = vars(&[
        ("PICARD", "captain"),
        ("RIKER", "number1"),
        ("SISKO", "depends on season"),
    ]);

    assert_eq!(
        ec.select(&["tng"]).unwrap(),
        vars(&[("PICARD", "captain"), ("RIKER", "number1")])
    );
    assert_eq!(
        ec.select(&["ds9"]).unwrap(),
        vars(&[("SISKO", "depends on season")])
    );
    assert_eq!(ec.select(&["tng", "ds9"]).unwrap(), union);
    assert_eq!(ec.select(&["starfleet"]).unwrap(), union);
    assert_eq!(ec.select(&["starfleet", "tng"]).unwrap(), union);
}

#[test]
fn test_select_name_matching_profile_and_group() {
    let ec = load(
        r#"
profile:
  x: { A: a }
  y: { B: b }
group:
  x: [y]
"#,
    );

    let selected = ec.select(&["x"]).unwrap();
    assert_eq!(selected, vars(&[("B", "b"), ("A", "a")]));
    assert_eq!(selected.keys().collect::<Vec<_>>(), ["B", "A"]);
}

#[test]
fn test_select_unknown_names_yield_nothing() {
    let ec = load(BASICS);
    assert!(ec.select(&["voyager"]).unwrap().is_empty());
}

#[test]
fn test_select_is_idempotent() {
    let ec = load(BASICS);
    let first = ec.select(&["starfleet"]).unwrap();
    let second = ec.select(&["starfleet"]).unwrap();
    assert_eq!(first, second);
    assert_eq!(ec.config(), &config(BASICS));
}

#[test]
fn test_select_later_declared_profile_wins() {
    let ec = load(
        r#"
profile:
  base:
    LOG_LEVEL: info
    REGION: us-east-1
  debug:
    LOG_LEVEL: debug
"#,
    );

    let expected = vars(&[("LOG_LEVEL", "debug"), ("REGION", "us-east-1")]);
    assert_eq!(ec.select(&["base", "debug"]).unwrap(), expected);
    assert_eq!(ec.select(&["debug", "base"]).unwrap(), expected);
}

#[test]
fn test_select_direct_profile_follows_group_members() {
    let ec = load(
        r#"
profile:
  base: { LOG_LEVEL: info }
  debug: { LOG_LEVEL: debug }
group:
  all: [debug, base]
"#,
    );

    // The group lists debug first, so base wins
    assert_eq!(
        ec.select(&["all"]).unwrap(),
        vars(&[("LOG_LEVEL", "info")])
    );
    // Naming debug directly does not move it after base
    assert_eq!(
        ec.select(&["all", "debug"]).unwrap(),
        vars(&[("LOG_LEVEL", "info")])
    );
}

#[test]
fn test_present_env_vars() {
    let ec = load(BASICS).with_environ([("SISKO", "foo"), ("HOME", "/home/ben")]);
    let expected: BTreeSet<String> = ["SISKO".to_string()].into_iter().collect();
    assert_eq!(ec.present_env_vars(), expected);
}

#[test]
fn test_present_env_vars_scans_all_profiles() {
    let ec = load(BASICS).with_environ([("RIKER", "number2"), ("SISKO", "foo")]);
    let present: Vec<String> = ec.present_env_vars().into_iter().collect();
    assert_eq!(present, ["RIKER", "SISKO"]);
}

#[test]
fn test_present_env_vars_nothing_set() {
    assert!(load(BASICS).present_env_vars().is_empty());
}

#[test]
fn test_resolve_without_references_makes_no_calls() {
    let runner = RecordingRunner::new(|_| ok("unexpected"));
    let registry = ResolverRegistry::builtin(runner.clone(), VaultSettings::default());
    let ec = EnvConfig::with_resolvers(config(BASICS), registry);

    assert_eq!(
        ec.resolve(&["tng"]).unwrap(),
        vars(&[("PICARD", "captain"), ("RIKER", "number1")])
    );
    assert!(runner.calls().is_empty());
}

#[test]
fn test_resolve_onepassword() {
    let yaml = r#"
profile:
  tng:
    PICARD: captain
    RIKER: op://private/riker/password
"#;
    let runner = RecordingRunner::new(|_| ok("foo secret"));
    let registry = ResolverRegistry::builtin(runner.clone(), VaultSettings::default());
    let ec = EnvConfig::with_resolvers(config(yaml), registry);

    assert_eq!(
        ec.resolve(&["tng"]).unwrap(),
        vars(&[("PICARD", "captain"), ("RIKER", "foo secret")])
    );
    assert_eq!(runner.calls().len(), 1);
}

#[test]
fn test_resolve_duplicate_references_each_resolved() {
    let yaml = r#"
profile:
  app:
    DB_PASSWORD: op://private/db/password
    PGPASSWORD: op://private/db/password
"#;
    let runner = RecordingRunner::new(|_| ok("hunter2"));
    let registry = ResolverRegistry::builtin(runner.clone(), VaultSettings::default());
    let ec = EnvConfig::with_resolvers(config(yaml), registry);

    let resolved = ec.resolve(&["app"]).unwrap();
    assert_eq!(resolved["DB_PASSWORD"], "hunter2");
    assert_eq!(resolved["PGPASSWORD"], "hunter2");
    assert_eq!(runner.calls().len(), 2);
}

#[test]
fn test_resolve_aws_vault_single_call_per_session() {
    let yaml = r#"
aws-vault:
  - level12
profile:
  extra:
    ALSO_KEY: aws-vault://level12/AWS_ACCESS_KEY_ID
"#;
    let runner = RecordingRunner::new(|_| ok(&vault_output("level12")));
    let registry = ResolverRegistry::builtin(runner.clone(), VaultSettings::default());
    let ec = EnvConfig::with_resolvers(config(yaml), registry);

    let resolved = ec.resolve(&["aws.level12", "extra"]).unwrap();
    assert_eq!(resolved.len(), AWS_VAULT_VARS.len() + 1);
    assert_eq!(resolved["AWS_ACCESS_KEY_ID"], "level12-aws_access_key_id");
    assert_eq!(resolved["AWS_SESSION_TOKEN"], "level12-aws_session_token");
    assert_eq!(resolved["ALSO_KEY"], "level12-aws_access_key_id");
    assert_eq!(runner.calls().len(), 1);
}

#[test]
fn test_resolve_failure_aborts() {
    let yaml = r#"
profile:
  tng:
    PICARD: captain
    RIKER: op://private/riker/password
"#;
    let runner = RecordingRunner::new(|_| failed(1, "", "not signed in"));
    let registry = ResolverRegistry::builtin(runner, VaultSettings::default());
    let ec = EnvConfig::with_resolvers(config(yaml), registry);

    assert!(matches!(
        ec.resolve(&["tng"]),
        Err(EnvConfigError::ResolverFailed { .. })
    ));
}
