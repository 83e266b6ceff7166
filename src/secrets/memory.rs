//! In-process credential store for development and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::error::{Result, SecretsError};
use super::store::CredentialStore;
use super::types::SecretString;

/// Credential store backed by a shared map.
///
/// Clones share the same slots. Every successful `put` is appended to a
/// write log so tests can assert which slots were touched and in what order.
/// `set_unavailable(true)` makes every call fail with
/// [`SecretsError::Unavailable`].
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<String, SecretString>,
    writes: Vec<String>,
    reads: Vec<String>,
    unavailable: bool,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a slot without recording a write.
    pub fn with_slot(self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.lock().slots.insert(id.into(), SecretString::new(value));
        self
    }

    /// Toggle simulated backend outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Current value of a slot.
    pub fn value(&self, id: &str) -> Option<String> {
        self.lock().slots.get(id).map(|v| v.expose_secret().to_string())
    }

    /// Slot identifiers written so far, in write order.
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    /// Slot identifiers read so far, in read order.
    pub fn reads(&self) -> Vec<String> {
        self.lock().reads.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // a poisoned lock only means a test panicked mid-write
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, id: &str) -> Result<SecretString> {
        let mut inner = self.lock();
        if inner.unavailable {
            return Err(SecretsError::unavailable("memory store marked unavailable"));
        }
        inner.reads.push(id.to_string());
        inner.slots.get(id).cloned().ok_or_else(|| SecretsError::not_found(id))
    }

    async fn put(&self, id: &str, value: &str) -> Result<()> {
        let mut inner = self.lock();
        if inner.unavailable {
            return Err(SecretsError::unavailable("memory store marked unavailable"));
        }
        inner.slots.insert(id.to_string(), SecretString::new(value));
        inner.writes.push(id.to_string());
        Ok(())
    }
}
