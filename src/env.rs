//! Environment variable access behind a swappable store.

use std::collections::HashMap;
use std::sync::RwLock;

/// Read/write access to environment variables.
pub trait EnvironmentStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str);
}

/// The current process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl EnvironmentStore for ProcessEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }

    fn set(&self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }
}

/// An in-memory environment, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryEnvironment {
    vars: RwLock<HashMap<String, String>>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }
}

impl EnvironmentStore for MemoryEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        self.vars
            .read()
            .ok()
            .and_then(|vars| vars.get(name).cloned())
    }

    fn set(&self, name: &str, value: &str) {
        if let Ok(mut vars) = self.vars.write() {
            vars.insert(name.to_string(), value.to_string());
        }
    }
}
