use super::Resolver;
use super::command::{CommandRunner, Invocation, run_checked};
use crate::Result;
use std::sync::Arc;

/// URI scheme of 1Password secret references.
pub const OP_SCHEME: &str = "op://";

/// Resolves 1Password secret references such as `op://private/riker/password`.
///
/// Each conversion is one `op read -n <reference>` call; the value is
/// returned exactly as printed, without a trailing newline.
pub struct OnePasswordResolver {
    runner: Arc<dyn CommandRunner>,
}

impl OnePasswordResolver {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl Resolver for OnePasswordResolver {
    fn name(&self) -> &'static str {
        "1password"
    }

    fn recognizes(&self, value: &str) -> bool {
        value.starts_with(OP_SCHEME)
    }

    fn convert(&self, value: &str) -> Result<String> {
        let invocation = Invocation::new("op", ["read", "-n", value]);
        run_checked(self.runner.as_ref(), &invocation)
    }
}
