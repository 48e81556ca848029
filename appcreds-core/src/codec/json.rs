//! JSON codec.
//!
//! The credentials document is shared by every profile:
//!
//! ```json
//! {
//!     "credentials": {
//!         "default": { "username": "alice", "password": "s3cret" }
//!     }
//! }
//! ```
//!
//! Each profile has its own attributes document:
//!
//! ```json
//! {
//!     "attributes": {
//!         "first_section": { "token": "abc" }
//!     }
//! }
//! ```
//!
//! Documents are written with 4-space indentation. Top-level keys this codec
//! does not know about are carried through a rewrite untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{FormatCodec, read_or_init, write_private};
use crate::attributes::Sections;
use crate::error::{CredentialError, Result};
use crate::factory::Factory;
use crate::model::OutputFormat;

const JSON_INDENT: &[u8] = b"    ";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialDocument {
    #[serde(default)]
    credentials: BTreeMap<String, CredentialEntry>,

    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct CredentialEntry {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AttributeDocument {
    #[serde(default)]
    attributes: Sections,

    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

/// Codec for the JSON document format.
#[derive(Debug)]
pub struct JsonCodec<'a> {
    profile: &'a str,
    credential_file: PathBuf,
    config_file: PathBuf,
}

impl<'a> JsonCodec<'a> {
    pub fn new(factory: &'a Factory, profile: &'a str) -> Result<Self> {
        Ok(Self {
            profile,
            credential_file: factory.credential_file()?,
            config_file: factory.config_file_for(profile)?,
        })
    }

    fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let contents = read_or_init(path, "{}")?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
        let mut buffer = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        document.serialize(&mut serializer)?;

        let contents = String::from_utf8(buffer).map_err(|e| {
            CredentialError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        write_private(path, &contents)
    }
}

impl FormatCodec for JsonCodec<'_> {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn encode_credentials(&self, username: &str, password: &str) -> Result<()> {
        trace!(profile = %self.profile, "Serializing credential to json file");

        let mut snapshot: CredentialDocument = Self::read_document(&self.credential_file)?;
        snapshot.credentials.insert(
            self.profile.to_string(),
            CredentialEntry {
                username: username.to_string(),
                password: password.to_string(),
            },
        );

        Self::write_document(&self.credential_file, &snapshot)?;
        debug!(path = ?self.credential_file, "Credential json file saved");
        Ok(())
    }

    fn decode_credentials(&self) -> Result<(String, String)> {
        let snapshot: CredentialDocument = Self::read_document(&self.credential_file)?;
        let entry = snapshot
            .credentials
            .get(self.profile)
            .cloned()
            .unwrap_or_default();
        Ok((entry.username, entry.password))
    }

    fn encode_attributes(&self, attributes: &Sections) -> Result<()> {
        trace!(profile = %self.profile, sections = attributes.len(), "Serializing profile to json file");

        let mut snapshot: AttributeDocument = Self::read_document(&self.config_file)?;
        snapshot.attributes = attributes.clone();

        Self::write_document(&self.config_file, &snapshot)?;
        debug!(path = ?self.config_file, "Profile json file saved");
        Ok(())
    }

    fn decode_attributes(&self) -> Result<Sections> {
        let snapshot: AttributeDocument = Self::read_document(&self.config_file)?;
        Ok(snapshot.attributes)
    }

    fn attributes_exist(&self) -> Result<bool> {
        self.config_file
            .try_exists()
            .map_err(|e| CredentialError::io(&self.config_file, e))
    }
}
