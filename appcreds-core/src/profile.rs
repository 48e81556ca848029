//! Named attribute bundles.
//!
//! A [`Profile`] owns one [`AttributeStore`] and knows where its attribute
//! file lives. Its username and password belong to the
//! [`Credential`](crate::Credential) that wraps it.
//!
//! At this layer a missing attribute reads as an empty string; use
//! [`Profile::section`] or [`Profile::attributes`] when presence matters.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::attributes::{AttributeStore, Sections};
use crate::error::{CredentialError, Result};
use crate::model::{NO_SECTION_KEY, validate_key_name};
use crate::serializer::Serializer;

/// A named, independently persisted set of attribute sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    store: AttributeStore,
    config_location: PathBuf,
}

impl Profile {
    /// Create an empty profile. Does not touch storage.
    pub fn new(name: &str, config_location: impl Into<PathBuf>) -> Result<Self> {
        validate_key_name(name)?;

        Ok(Self {
            name: name.to_string(),
            store: AttributeStore::new(),
            config_location: config_location.into(),
        })
    }

    /// Load the profile named by `serializer` from its codec.
    ///
    /// Fails with [`CredentialError::ProfileNotFound`] if the profile has no
    /// attribute storage yet.
    pub fn load(serializer: &Serializer<'_>) -> Result<Self> {
        let name = serializer.profile_name();
        trace!(profile = %name, "Loading existing profile");

        let sections = serializer.deserialize_attributes()?;
        let location = serializer.factory().config_file_for(name)?;

        Ok(Self {
            name: name.to_string(),
            store: AttributeStore::from_sections(sections)?,
            config_location: location,
        })
    }

    /// Write the whole attribute store through `serializer`, replacing what
    /// was stored before.
    pub fn save(&self, serializer: &Serializer<'_>) -> Result<()> {
        trace!(profile = %self.name, "Saving profile");
        serializer.serialize_attributes(self.store.all_sections())
    }

    /// Delete the profile's attribute file.
    ///
    /// A file that does not exist, such as for a profile only ever kept in
    /// the environment, counts as already removed.
    pub fn remove(self) -> Result<()> {
        debug!(profile = %self.name, "Deleting profile");
        match fs::remove_file(&self.config_location) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(path = ?self.config_location, "Profile file already absent");
                Ok(())
            }
            Err(e) => Err(CredentialError::io(&self.config_location, e)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config_location(&self) -> &Path {
        &self.config_location
    }

    /// Set an attribute; a blank section means [`NO_SECTION_KEY`].
    pub fn set_attribute(&mut self, section: &str, key: &str, value: impl Into<String>) -> Result<()> {
        self.store.set(section_or_default(section), key, value)
    }

    /// Get an attribute, or an empty string if it is not set.
    pub fn get_attribute(&self, section: &str, key: &str) -> String {
        self.store
            .get(section_or_default(section), key)
            .unwrap_or_default()
            .to_string()
    }

    pub fn delete_attribute(&mut self, section: &str, key: &str) -> Result<()> {
        self.store.delete(section_or_default(section), key)
    }

    /// Every key/value of one section.
    pub fn section(&self, section: &str) -> Option<&BTreeMap<String, String>> {
        self.store.section(section_or_default(section))
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.store.all_sections().keys().map(String::as_str).collect()
    }

    /// Read-only view of every section.
    pub fn attributes(&self) -> &Sections {
        self.store.all_sections()
    }
}

fn section_or_default(section: &str) -> &str {
    if section.is_empty() {
        NO_SECTION_KEY
    } else {
        section
    }
}
