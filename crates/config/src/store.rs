//! The host's key-value preference store.
//!
//! Values are JSON. Preferences the host keeps as serialized JSON text (the
//! `asJSON` flag of the host API) go through [`PreferenceStoreExt`], which
//! (de)serializes them to and from a JSON string value.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Key-value preference storage supplied by the host.
pub trait PreferenceStore: Send + Sync {
    /// Current value of `key`, or `None` if never set.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replaces the value of `key`.
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Helpers for preferences stored as JSON text.
pub trait PreferenceStoreExt: PreferenceStore {
    /// Reads a preference stored as JSON text and deserializes it.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let text = match self.get(key)? {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(text)) => text,
            Some(other) => exn::bail!(ErrorKind::InvalidPreference {
                key: key.to_string(),
                reason: format!("expected JSON text, found {other}"),
            }),
        };
        let value = serde_json::from_str(&text).or_raise(|| ErrorKind::InvalidPreference {
            key: key.to_string(),
            reason: "malformed JSON".to_string(),
        })?;
        Ok(Some(value))
    }

    /// Serializes `value` and stores it as JSON text.
    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let text = serde_json::to_string(value).or_raise(|| ErrorKind::InvalidPreference {
            key: key.to_string(),
            reason: "not serializable".to_string(),
        })?;
        self.set(key, Value::String(text))
    }
}
impl<S: PreferenceStore + ?Sized> PreferenceStoreExt for S {}

/// In-memory [`PreferenceStore`], for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<BTreeMap<String, Value>>,
}
impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Self {
        Self {
            values: RwLock::new(values.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}
impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self.values.read().map_err(|_| ErrorKind::Store(key.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.write().map_err(|_| ErrorKind::Store(key.to_string()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}
