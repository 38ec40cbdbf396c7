//! Shell-specific activation output.
//!
//! Output is meant for `source`/`eval` in the calling shell. Each block
//! starts with a marker comment naming the dialect and is sourceable on
//! its own.

use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Variable recording the active selection, space separated.
pub const PROFILES_VAR: &str = "_ENV_CONFIG_PROFILES";

/// Supported shell dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Shell {
    Fish,
    Bash,
}

impl Shell {
    /// Guess the dialect from `$SHELL`, defaulting to bash.
    pub fn detect() -> Self {
        match std::env::var("SHELL") {
            Ok(path) if path.ends_with("fish") => Shell::Fish,
            _ => Shell::Bash,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Shell::Fish => "# FISH SOURCE",
            Shell::Bash => "# BASH SOURCE",
        }
    }

    pub fn export(&self, name: &str, value: &str) -> String {
        match self {
            // -g lifts the variable out of the sourced file's local scope
            Shell::Fish => format!("set -gx {} {}", self.quote(name), self.quote(value)),
            Shell::Bash => format!("export {}={}", self.quote(name), self.quote(value)),
        }
    }

    pub fn unset(&self, name: &str) -> String {
        match self {
            Shell::Fish => format!("set -eg {}", self.quote(name)),
            Shell::Bash => format!("unset {}", self.quote(name)),
        }
    }

    /// Quote `s` so the shell reads it back literally.
    pub fn quote(&self, s: &str) -> String {
        if s.is_empty() {
            return "''".to_string();
        }
        if s.chars().all(is_safe_char) {
            return s.to_string();
        }

        let mut result = String::with_capacity(s.len() + 2);
        result.push('\'');
        for c in s.chars() {
            match (self, c) {
                (Shell::Bash, '\'') => result.push_str("'\"'\"'"),
                (Shell::Fish, '\'') => result.push_str("\\'"),
                (Shell::Fish, '\\') => result.push_str("\\\\"),
                _ => result.push(c),
            }
        }
        result.push('\'');
        result
    }

    /// Wrapper function that runs env-config and sources its output.
    pub fn init_script(&self) -> &'static str {
        match self {
            Shell::Fish => {
                r#"function env-config --description 'Activate env-config profiles'
    command env-config --shell fish $argv | source
end
"#
            }
            Shell::Bash => {
                r#"env-config() {
    eval "$(command env-config --shell bash "$@")"
}
"#
            }
        }
    }
}

/// Statements removing `names` and the active selection marker, or `None`
/// when there is nothing to clear.
pub fn clear_block(shell: Shell, names: &BTreeSet<String>) -> Option<String> {
    if names.is_empty() {
        return None;
    }

    let mut lines = vec![shell.marker().to_string()];
    lines.extend(names.iter().map(|name| shell.unset(name)));
    lines.push(shell.unset(PROFILES_VAR));
    Some(join_lines(lines))
}

/// Statements exporting `vars` and recording `selection` as active.
pub fn set_block<S: AsRef<str>>(
    shell: Shell,
    selection: &[S],
    vars: &IndexMap<String, String>,
) -> String {
    let selection = selection
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" ");

    let mut lines = vec![
        shell.marker().to_string(),
        shell.export(PROFILES_VAR, &selection),
    ];
    lines.extend(vars.iter().map(|(name, value)| shell.export(name, value)));
    join_lines(lines)
}

fn join_lines(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '_' | '-')
}
