//! Structured-file codec.
//!
//! Two ini files, both made of `[section]` headers followed by `key = value`
//! lines:
//!
//! ```text
//! # <root>/credentials (shared by every profile)
//! [default]
//! password = s3cret
//! username = alice
//!
//! # <root>/config/default (one per profile)
//! [first_section]
//! token = abc
//! ```
//!
//! The username and password keys use the factory's alternate labels. Keys
//! written before any section header belong to [`NO_SECTION_KEY`]. Values are
//! unquoted; backslashes and control characters are backslash-escaped on write
//! and unescaped on read. Surrounding whitespace of a value is not preserved.

use std::path::{Path, PathBuf};

use ini::{EscapePolicy, Ini, ParseOption, WriteOption};
use tracing::{debug, trace};

use super::{FormatCodec, read_or_init, write_private};
use crate::attributes::Sections;
use crate::error::{CredentialError, Result};
use crate::factory::Factory;
use crate::model::{NO_SECTION_KEY, OutputFormat, Role};

/// Codec for the sectioned structured-file format.
#[derive(Debug)]
pub struct StructuredFileCodec<'a> {
    profile: &'a str,
    credential_file: PathBuf,
    config_file: PathBuf,
    username_label: &'a str,
    password_label: &'a str,
}

impl<'a> StructuredFileCodec<'a> {
    pub fn new(factory: &'a Factory, profile: &'a str) -> Result<Self> {
        Ok(Self {
            profile,
            credential_file: factory.credential_file()?,
            config_file: factory.config_file_for(profile)?,
            username_label: factory.alternate_label(Role::Username),
            password_label: factory.alternate_label(Role::Password),
        })
    }

    fn read_sections(path: &Path) -> Result<Sections> {
        let contents = read_or_init(path, "")?;
        let options = ParseOption {
            enabled_quote: false,
            ..ParseOption::default()
        };
        let document = Ini::load_from_str_opt(&contents, options)?;

        let mut sections = Sections::new();
        for (section, properties) in document.iter() {
            let name = section.unwrap_or(NO_SECTION_KEY);
            for (key, value) in properties.iter() {
                sections
                    .entry(name.to_string())
                    .or_default()
                    .insert(key.to_string(), value.to_string());
            }
        }
        Ok(sections)
    }

    fn write_sections(path: &Path, sections: &Sections) -> Result<()> {
        let mut document = Ini::new();
        for (section, keys) in sections {
            for (key, value) in keys {
                document
                    .with_section(Some(section.as_str()))
                    .set(key.as_str(), value.as_str());
            }
        }

        let options = WriteOption {
            escape_policy: EscapePolicy::Basics,
            kv_separator: " = ",
            ..WriteOption::default()
        };
        let mut buffer = Vec::new();
        document
            .write_to_opt(&mut buffer, options)
            .map_err(|e| CredentialError::io(path, e))?;

        let contents = String::from_utf8(buffer).map_err(|e| {
            CredentialError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        write_private(path, &contents)
    }
}

impl FormatCodec for StructuredFileCodec<'_> {
    fn format(&self) -> OutputFormat {
        OutputFormat::Ini
    }

    fn encode_credentials(&self, username: &str, password: &str) -> Result<()> {
        trace!(profile = %self.profile, "Serializing credential to structured file");

        let mut snapshot = Self::read_sections(&self.credential_file)?;
        let entry = snapshot.entry(self.profile.to_string()).or_default();
        entry.insert(self.username_label.to_string(), username.to_string());
        entry.insert(self.password_label.to_string(), password.to_string());

        Self::write_sections(&self.credential_file, &snapshot)?;
        debug!(path = ?self.credential_file, "Credential file saved");
        Ok(())
    }

    fn decode_credentials(&self) -> Result<(String, String)> {
        let snapshot = Self::read_sections(&self.credential_file)?;
        let section = snapshot.get(self.profile);
        let field = |label: &str| {
            section
                .and_then(|keys| keys.get(label))
                .cloned()
                .unwrap_or_default()
        };

        Ok((field(self.username_label), field(self.password_label)))
    }

    fn encode_attributes(&self, attributes: &Sections) -> Result<()> {
        trace!(profile = %self.profile, sections = attributes.len(), "Serializing profile to structured file");
        Self::write_sections(&self.config_file, attributes)?;
        debug!(path = ?self.config_file, "Profile file saved");
        Ok(())
    }

    fn decode_attributes(&self) -> Result<Sections> {
        Self::read_sections(&self.config_file)
    }

    fn attributes_exist(&self) -> Result<bool> {
        self.config_file
            .try_exists()
            .map_err(|e| CredentialError::io(&self.config_file, e))
    }
}
