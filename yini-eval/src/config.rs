//! Evaluation configuration: safe-mode and the environment-variable
//! allow-list (`spec.md` §4.D, §5).
//!
//! The allow-list is passed explicitly on `EvalConfig` rather than kept as
//! global mutable state, even though §5 describes it as "process-wide
//! mutable state" that must be serialized — a single-process embedding can
//! still honor that contract by sharing one `EvalConfig` behind an `Arc`
//! and serializing writes to it the same way the DOM's mutation APIs are
//! serialized.

use std::collections::HashSet;

use once_cell::sync::Lazy;

pub const DEFAULT_ENV_ALLOW_LIST: &[&str] = &[
    "YINI_CONFIG_DIR",
    "YINI_DATA_DIR",
    "YINI_RESOURCE_PATH",
    "YINI_LOCALE",
    "YINI_DEBUG",
];

/// The default allow-list built once and cloned per [`EvalConfig`], rather
/// than re-collected from [`DEFAULT_ENV_ALLOW_LIST`] on every
/// `EvalConfig::new` call.
static DEFAULT_ENV_ALLOW_SET: Lazy<HashSet<String>> =
    Lazy::new(|| DEFAULT_ENV_ALLOW_LIST.iter().map(|s| s.to_string()).collect());

#[derive(Clone, Debug)]
pub struct EvalConfig {
    pub safe_mode: bool,
    pub env_allow_list: HashSet<String>,
}

impl EvalConfig {
    pub fn new(safe_mode: bool) -> Self {
        Self {
            safe_mode,
            env_allow_list: DEFAULT_ENV_ALLOW_SET.clone(),
        }
    }

    pub fn safe() -> Self {
        Self::new(true)
    }

    pub fn unrestricted() -> Self {
        Self::new(false)
    }

    pub fn allow_env(&mut self, name: impl Into<String>) {
        self.env_allow_list.insert(name.into());
    }

    pub fn is_env_allowed(&self, name: &str) -> bool {
        !self.safe_mode || self.env_allow_list.contains(name)
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self::safe()
    }
}
