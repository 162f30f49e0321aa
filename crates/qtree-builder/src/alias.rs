//! Unique variable name generation

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe generator of `<prefix><n>` names with a strictly increasing `n`.
pub struct AliasGenerator {
    prefix: &'static str,
    next: AtomicU64,
}

impl AliasGenerator {
    pub const fn new(prefix: &'static str, base: u64) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(base),
        }
    }

    pub fn next(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let alias = format!("{}{n}", self.prefix);
        tracing::trace!(alias = %alias, "Allocated alias");
        alias
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }
}

static VARIABLES: AliasGenerator = AliasGenerator::new("Var_", 0);

/// Next name from the process-wide variable generator.
pub fn next_alias() -> String {
    VARIABLES.next()
}

/// Name of the group variable paired with an element variable alias.
pub fn group_alias(alias: &str) -> String {
    format!("Group{alias}")
}
