//! Runtime holder for the vendor API key.
//!
//! Built once from configuration and handed to both the backend selector and
//! the transport client. Absence of a key is a routing signal, not an error.

use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
pub struct CredentialStore {
    env_var: Option<String>,
    key: Arc<RwLock<Option<String>>>,
}

impl CredentialStore {
    /// Read the key from `env_var` now; `reload` re-reads the same variable.
    pub fn from_env(env_var: impl Into<String>) -> Self {
        let env_var = env_var.into();
        let key = read_env(&env_var);
        Self {
            env_var: Some(env_var),
            key: Arc::new(RwLock::new(key)),
        }
    }

    /// A store with a fixed key and no backing environment variable.
    pub fn with_key(key: Option<String>) -> Self {
        Self {
            env_var: None,
            key: Arc::new(RwLock::new(key.filter(|k| !k.is_empty()))),
        }
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.key.read().map(|k| k.is_some()).unwrap_or(false)
    }

    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.key.read().ok().and_then(|k| k.clone())
    }

    pub fn set(&self, key: Option<String>) {
        if let Ok(mut slot) = self.key.write() {
            *slot = key.filter(|k| !k.is_empty());
        }
    }

    /// Re-read the backing environment variable. Returns whether a key is now present.
    pub fn reload(&self) -> bool {
        if let Some(ref name) = self.env_var {
            self.set(read_env(name));
        }
        let present = self.is_present();
        tracing::info!(present, "Vendor credential reloaded");
        present
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
