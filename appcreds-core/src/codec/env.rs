//! Environment-variable codec.
//!
//! # Variable Name Grammar
//!
//! ```text
//! APPLICATIONNAME::PROFILENAME::FIELD
//! APPLICATIONNAME::PROFILENAME::ATTRIBUTE::SECTIONNAME::KEYNAME
//! ```
//!
//! `FIELD` is the username or password label configured on the factory.
//! Names are written upper-cased and matched case-insensitively; decoded
//! sections and keys come back lower-cased, except that a `DEFAULT` section
//! maps back to [`NO_SECTION_KEY`]. There is no escaping of `::`; the key-name
//! grammar already rejects `:` in every segment this codec writes.
//!
//! # Case folding
//!
//! A round trip through the environment is only case-insensitive: an
//! attribute saved as `MySection.Token` loads back as `mysection.token`.
//! Use lower-case section and key names when the environment is a target.
//!
//! Variables with a segment outside `[0-9A-Za-z_]` are not part of the
//! grammar and are skipped when decoding.

use std::fmt;

use tracing::{debug, trace};

use super::FormatCodec;
use crate::attributes::Sections;
use crate::environment::Environment;
use crate::error::{CredentialError, Result};
use crate::factory::Factory;
use crate::model::{
    ENV_ATTRIBUTE_FIELD, ENV_DELIMITER, NO_SECTION_KEY, OutputFormat, Role, is_valid_key_name,
};

/// A parsed environment variable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentKey {
    /// `APP::PROFILE::FIELD`
    Field {
        application: String,
        profile: String,
        field: String,
    },

    /// `APP::PROFILE::ATTRIBUTE::SECTION::KEY`
    Attribute {
        application: String,
        profile: String,
        section: String,
        key: String,
    },
}

impl EnvironmentKey {
    /// Parse a variable name, `None` if it does not follow the grammar.
    ///
    /// Every segment must be a valid key name. Every segment except the
    /// application is lower-cased.
    ///
    /// # Examples
    ///
    /// ```
    /// use appcreds_core::codec::EnvironmentKey;
    ///
    /// let key = EnvironmentKey::parse("MTCA::DEFAULT::ATTRIBUTE::FIRST_SECTION::TOKEN").unwrap();
    /// assert_eq!(
    ///     key,
    ///     EnvironmentKey::Attribute {
    ///         application: "MTCA".to_string(),
    ///         profile: "default".to_string(),
    ///         section: "first_section".to_string(),
    ///         key: "token".to_string(),
    ///     }
    /// );
    /// assert!(EnvironmentKey::parse("PATH").is_none());
    /// assert!(EnvironmentKey::parse("MTCA::DEFAULT::ATTRIBUTE::S::BAD-KEY").is_none());
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        let segments: Vec<&str> = name.split(ENV_DELIMITER).collect();
        if !segments.iter().all(|segment| is_valid_key_name(segment)) {
            return None;
        }

        match segments.as_slice() {
            [application, profile, field] if !field.eq_ignore_ascii_case(ENV_ATTRIBUTE_FIELD) => {
                Some(Self::Field {
                    application: application.to_string(),
                    profile: profile.to_lowercase(),
                    field: field.to_lowercase(),
                })
            }
            [application, profile, marker, section, key]
                if marker.eq_ignore_ascii_case(ENV_ATTRIBUTE_FIELD) =>
            {
                let section = if section.eq_ignore_ascii_case(NO_SECTION_KEY) {
                    NO_SECTION_KEY.to_string()
                } else {
                    section.to_lowercase()
                };
                Some(Self::Attribute {
                    application: application.to_string(),
                    profile: profile.to_lowercase(),
                    section,
                    key: key.to_lowercase(),
                })
            }
            _ => None,
        }
    }

    fn belongs_to(&self, application_name: &str, profile_name: &str) -> bool {
        let (application, profile) = match self {
            Self::Field {
                application,
                profile,
                ..
            }
            | Self::Attribute {
                application,
                profile,
                ..
            } => (application, profile),
        };
        application.eq_ignore_ascii_case(application_name)
            && profile.eq_ignore_ascii_case(profile_name)
    }
}

impl fmt::Display for EnvironmentKey {
    /// Render the upper-cased variable name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Field {
                application,
                profile,
                field,
            } => [application.as_str(), profile.as_str(), field.as_str()].join(ENV_DELIMITER),
            Self::Attribute {
                application,
                profile,
                section,
                key,
            } => [
                application.as_str(),
                profile.as_str(),
                ENV_ATTRIBUTE_FIELD,
                section.as_str(),
                key.as_str(),
            ]
            .join(ENV_DELIMITER),
        };
        write!(f, "{}", name.to_uppercase())
    }
}

/// Codec that reads and writes the environment of a [`Factory`].
pub struct EnvironmentCodec<'a> {
    application: &'a str,
    profile: &'a str,
    username_label: &'a str,
    password_label: &'a str,
    environment: &'a dyn Environment,
}

impl<'a> EnvironmentCodec<'a> {
    pub fn new(factory: &'a Factory, profile: &'a str) -> Self {
        Self {
            application: factory.application_name(),
            profile,
            username_label: factory.alternate_label(Role::Username),
            password_label: factory.alternate_label(Role::Password),
            environment: factory.environment(),
        }
    }

    /// Write the credential and its attributes, returning every variable name
    /// that was set.
    pub fn deploy(&self, username: &str, password: &str, attributes: &Sections) -> Result<Vec<String>> {
        let mut deployed = self.set_credentials(username, password);
        deployed.extend(self.set_attributes(attributes));
        debug!(profile = %self.profile, count = deployed.len(), "Credential deployed to environment");
        Ok(deployed)
    }

    fn field_key(&self, label: &str) -> EnvironmentKey {
        EnvironmentKey::Field {
            application: self.application.to_string(),
            profile: self.profile.to_string(),
            field: label.to_string(),
        }
    }

    fn set_credentials(&self, username: &str, password: &str) -> Vec<String> {
        let username_key = self.field_key(self.username_label).to_string();
        trace!(key = %username_key, "Setting username environment variable");
        self.environment.set(&username_key, username);

        let password_key = self.field_key(self.password_label).to_string();
        trace!(key = %password_key, "Setting password environment variable");
        self.environment.set(&password_key, password);

        vec![username_key, password_key]
    }

    fn set_attributes(&self, attributes: &Sections) -> Vec<String> {
        let mut keys = Vec::new();
        for (section, values) in attributes {
            for (key, value) in values {
                let name = EnvironmentKey::Attribute {
                    application: self.application.to_string(),
                    profile: self.profile.to_string(),
                    section: section.clone(),
                    key: key.clone(),
                }
                .to_string();
                trace!(key = %name, "Setting attribute environment variable");
                self.environment.set(&name, value);
                keys.push(name);
            }
        }
        keys
    }

    /// Every variable of this application and profile, parsed.
    fn scan(&self) -> Vec<(String, EnvironmentKey, String)> {
        self.environment
            .vars()
            .into_iter()
            .filter_map(|(name, value)| {
                let key = EnvironmentKey::parse(&name)?;
                key.belongs_to(self.application, self.profile)
                    .then_some((name, key, value))
            })
            .collect()
    }

    fn is_credential_label(&self, field: &str) -> bool {
        field.eq_ignore_ascii_case(self.username_label)
            || field.eq_ignore_ascii_case(self.password_label)
    }
}

impl FormatCodec for EnvironmentCodec<'_> {
    fn format(&self) -> OutputFormat {
        OutputFormat::Env
    }

    fn encode_credentials(&self, username: &str, password: &str) -> Result<()> {
        trace!(profile = %self.profile, "Serializing credential to environment");
        self.set_credentials(username, password);
        Ok(())
    }

    fn decode_credentials(&self) -> Result<(String, String)> {
        let mut username = None;
        let mut password = None;

        for (_, key, value) in self.scan() {
            if let EnvironmentKey::Field { field, .. } = key {
                if field.eq_ignore_ascii_case(self.username_label) {
                    username = Some(value);
                } else if field.eq_ignore_ascii_case(self.password_label) {
                    password = Some(value);
                }
            }
        }

        let username = username.ok_or_else(|| CredentialError::RequiredVariableUsernameNotFound {
            label: self.username_label.to_string(),
        })?;
        trace!(label = %self.username_label, "Found username label");

        let password = password.ok_or_else(|| CredentialError::RequiredVariablePasswordNotFound {
            label: self.password_label.to_string(),
        })?;
        trace!(label = %self.password_label, "Found password label");

        Ok((username, password))
    }

    fn encode_attributes(&self, attributes: &Sections) -> Result<()> {
        trace!(profile = %self.profile, sections = attributes.len(), "Serializing profile to environment");

        for (name, key, _) in self.scan() {
            if matches!(key, EnvironmentKey::Attribute { .. }) {
                self.environment.remove(&name);
            }
        }
        self.set_attributes(attributes);
        Ok(())
    }

    fn decode_attributes(&self) -> Result<Sections> {
        let mut sections = Sections::new();

        for (_, key, value) in self.scan() {
            let (section, key) = match key {
                EnvironmentKey::Attribute { section, key, .. } => (section, key),
                EnvironmentKey::Field { field, .. } if !self.is_credential_label(&field) => {
                    (NO_SECTION_KEY.to_string(), field)
                }
                EnvironmentKey::Field { .. } => continue,
            };
            sections.entry(section).or_default().insert(key, value);
        }

        Ok(sections)
    }

    fn attributes_exist(&self) -> Result<bool> {
        Ok(!self.scan().is_empty())
    }
}
