//! Format dispatch for saving and loading one profile.
//!
//! A [`Serializer`] binds a [`Factory`] to a profile name and routes every
//! call to the [`FormatCodec`] for the selected [`OutputFormat`]. The codec is
//! chosen on each call rather than cached.

use tracing::trace;

use crate::attributes::Sections;
use crate::codec::{EnvironmentCodec, FormatCodec, JsonCodec, StructuredFileCodec};
use crate::error::{CredentialError, Result};
use crate::factory::Factory;
use crate::model::{OutputFormat, validate_key_name};

/// Routes (de)serialization of one profile to the configured codec.
#[derive(Debug)]
pub struct Serializer<'a> {
    factory: &'a Factory,
    profile_name: String,
    format: OutputFormat,
}

impl<'a> Serializer<'a> {
    /// Create a serializer using the factory's output format.
    pub fn new(factory: &'a Factory, profile_name: &str) -> Result<Self> {
        Self::with_format(factory, profile_name, factory.output_format())
    }

    /// Create a serializer for an explicit format.
    pub fn with_format(factory: &'a Factory, profile_name: &str, format: OutputFormat) -> Result<Self> {
        if !factory.is_initialized() {
            return Err(CredentialError::FactoryNotInitialized);
        }
        validate_key_name(profile_name)?;

        Ok(Self {
            factory,
            profile_name: profile_name.to_string(),
            format,
        })
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn factory(&self) -> &'a Factory {
        self.factory
    }

    /// The codec for this serializer's format.
    pub fn codec(&self) -> Result<Box<dyn FormatCodec + '_>> {
        let codec: Box<dyn FormatCodec + '_> = match self.format {
            OutputFormat::Ini => Box::new(StructuredFileCodec::new(self.factory, &self.profile_name)?),
            OutputFormat::Json => Box::new(JsonCodec::new(self.factory, &self.profile_name)?),
            OutputFormat::Env => Box::new(EnvironmentCodec::new(self.factory, &self.profile_name)),
        };
        Ok(codec)
    }

    /// Store the username, password, and every attribute section.
    pub fn serialize(&self, username: &str, password: &str, attributes: &Sections) -> Result<()> {
        trace!(profile = %self.profile_name, format = %self.format, "Serializing credential and profile");
        let codec = self.codec()?;
        codec.encode_credentials(username, password)?;
        codec.encode_attributes(attributes)
    }

    /// Store only the username and password.
    pub fn serialize_credentials(&self, username: &str, password: &str) -> Result<()> {
        self.codec()?.encode_credentials(username, password)
    }

    /// Store only the attribute sections.
    pub fn serialize_attributes(&self, attributes: &Sections) -> Result<()> {
        self.codec()?.encode_attributes(attributes)
    }

    /// Read the username, password, and every attribute section.
    pub fn deserialize(&self) -> Result<(String, String, Sections)> {
        trace!(profile = %self.profile_name, format = %self.format, "Deserializing credential and profile");
        let codec = self.codec()?;
        let (username, password) = codec.decode_credentials()?;
        let attributes = codec.decode_attributes()?;
        Ok((username, password, attributes))
    }

    /// Read only the attribute sections, failing if the profile has no
    /// attribute storage.
    pub fn deserialize_attributes(&self) -> Result<Sections> {
        let codec = self.codec()?;
        if !codec.attributes_exist()? {
            return Err(CredentialError::ProfileNotFound {
                profile: self.profile_name.clone(),
            });
        }
        codec.decode_attributes()
    }
}
