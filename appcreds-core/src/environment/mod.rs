//! Process environment abstraction.
//!
//! This module provides:
//! - [`Environment`] - Trait over get/set/remove/list of environment variables
//! - [`ProcessEnvironment`] - The real process environment
//! - [`MemoryEnvironment`] - In-memory implementation for testing
//!
//! The environment codec only talks to this trait, so tests can run against a
//! [`MemoryEnvironment`] without touching the variables of the test process.

mod memory;

pub use memory::MemoryEnvironment;

/// Abstraction over a set of environment variables.
///
/// Variables persist for the lifetime of the implementation (for
/// [`ProcessEnvironment`], the lifetime of the process) unless removed.
pub trait Environment: Send + Sync {
    /// Retrieve a variable by exact name.
    ///
    /// Returns `None` if it is unset.
    fn get(&self, key: &str) -> Option<String>;

    /// Set a variable, overwriting any existing value.
    fn set(&self, key: &str, value: &str);

    /// Remove a variable. Removing an unset variable is not an error.
    fn remove(&self, key: &str);

    /// List every variable as `(name, value)`.
    fn vars(&self) -> Vec<(String, String)>;
}

/// The environment of the running process.
///
/// Mutating the process environment is only sound while no other thread reads
/// or writes it; this type inherits that constraint from [`std::env::set_var`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl ProcessEnvironment {
    pub fn new() -> Self {
        Self
    }
}

impl Environment for ProcessEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn set(&self, key: &str, value: &str) {
        // SAFETY: the crate is single-threaded and synchronous; callers that
        // share the process environment across threads must serialize access.
        unsafe { std::env::set_var(key, value) };
    }

    fn remove(&self, key: &str) {
        // SAFETY: see `set`.
        unsafe { std::env::remove_var(key) };
    }

    fn vars(&self) -> Vec<(String, String)> {
        // Non-unicode entries cannot belong to this crate's grammar.
        std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }
}
