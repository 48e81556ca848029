//! Encoders/decoders between the credential model and external storage.
//!
//! This module provides:
//! - [`FormatCodec`] - Trait implemented once per external representation
//! - [`StructuredFileCodec`] - Sectioned structured files
//! - [`JsonCodec`] - JSON documents
//! - [`EnvironmentCodec`] - Process environment variables
//!
//! Every codec splits its work into a credentials half (the username and
//! password of one profile) and an attributes half (the sections of one
//! profile), so a [`Profile`](crate::Profile) can be saved or loaded without
//! its credential.
//!
//! # Read-modify-write
//!
//! Files shared between profiles are rewritten whole on every save: the
//! current file is read as a snapshot, this profile's entry is merged in, and
//! the result is written back. Nothing coordinates two writers, so
//! concurrent saves race and the last write wins.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use tracing::trace;

use crate::attributes::Sections;
use crate::error::{CredentialError, Result};
use crate::model::OutputFormat;

mod env;
mod json;
mod structured;

pub use env::{EnvironmentCodec, EnvironmentKey};
pub use json::JsonCodec;
pub use structured::StructuredFileCodec;

/// One external representation of a profile's credential and attributes.
pub trait FormatCodec {
    /// The format this codec implements.
    fn format(&self) -> OutputFormat;

    /// Store the profile's username and password.
    fn encode_credentials(&self, username: &str, password: &str) -> Result<()>;

    /// Read the profile's username and password.
    ///
    /// File codecs return empty strings for a profile that has no entry.
    fn decode_credentials(&self) -> Result<(String, String)>;

    /// Replace the profile's stored attributes with `attributes`.
    fn encode_attributes(&self, attributes: &Sections) -> Result<()>;

    /// Read every attribute section of the profile.
    fn decode_attributes(&self) -> Result<Sections>;

    /// Whether attribute storage exists for the profile.
    fn attributes_exist(&self) -> Result<bool>;
}

/// Read `path`, first creating it with `initial` contents if it is missing.
pub(crate) fn read_or_init(path: &Path, initial: &str) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            trace!(path = ?path, "File does not exist, initializing");
            write_private(path, initial)?;
            Ok(initial.to_string())
        }
        Err(e) => Err(CredentialError::io(path, e)),
    }
}

/// Truncate and write `path`, creating it owner-only if it does not exist.
///
/// The write is not atomic: a failure part way through leaves a truncated
/// file.
pub(crate) fn write_private(path: &Path, contents: &str) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|e| CredentialError::io(path, e))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| CredentialError::io(path, e))
}
