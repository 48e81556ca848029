//! In-memory attribute storage.
//!
//! Attributes are addressed by `(section, key)`. Both names follow the
//! key-name grammar in [`crate::model`]. Unlike the profile and credential
//! layers, [`AttributeStore::get`] reports absence as `None` rather than an
//! empty string.

use std::collections::BTreeMap;

use crate::error::{CredentialError, Result};
use crate::model::validate_key_name;

/// `section -> key -> value`, ordered so serialized output is stable.
pub type Sections = BTreeMap<String, BTreeMap<String, String>>;

/// Nested `section -> key -> value` mapping with validated names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeStore {
    sections: Sections,
}

impl AttributeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from parsed sections, validating every name.
    pub fn from_sections(sections: Sections) -> Result<Self> {
        let mut store = Self::new();
        for (section, keys) in sections {
            for (key, value) in keys {
                store.set(&section, &key, value)?;
            }
        }
        Ok(store)
    }

    /// Set a value, creating the section on first use.
    ///
    /// Nothing is written if either name is malformed.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) -> Result<()> {
        validate_key_name(section)?;
        validate_key_name(key)?;

        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
        Ok(())
    }

    /// Get a value, `None` if the section or key is absent.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|keys| keys.get(key))
            .map(String::as_str)
    }

    /// Remove a value.
    ///
    /// A section left without keys is dropped as well.
    pub fn delete(&mut self, section: &str, key: &str) -> Result<()> {
        let not_found = || CredentialError::AttributeNotFound {
            section: section.to_string(),
            key: key.to_string(),
        };

        let keys = self.sections.get_mut(section).ok_or_else(not_found)?;
        keys.remove(key).ok_or_else(not_found)?;

        if keys.is_empty() {
            self.sections.remove(section);
        }
        Ok(())
    }

    /// Get every key/value of one section.
    pub fn section(&self, section: &str) -> Option<&BTreeMap<String, String>> {
        self.sections.get(section)
    }

    /// Read-only view of the whole store.
    pub fn all_sections(&self) -> &Sections {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
