//! Domain model types for appcreds.
//!
//! This module defines the naming rules and small value types used throughout
//! the crate:
//! - [`validate_key_name`] - The `[0-9A-Za-z_]+` grammar shared by
//!   application names, profile names, sections, keys, and labels
//! - [`OutputFormat`] - Which external representation a factory persists to
//! - [`Role`] - The two distinguished credential fields
//! - [`Secret`] - A password wrapper that stays out of logs

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{CredentialError, Result};

/// Reserved section name for attributes set without a section.
pub const NO_SECTION_KEY: &str = "DEFAULT";

/// Profile used by [`Credential::load`](crate::Credential::load).
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// Separator between segments of an environment variable name.
pub const ENV_DELIMITER: &str = "::";

/// Field segment marking an environment variable as an attribute.
pub const ENV_ATTRIBUTE_FIELD: &str = "ATTRIBUTE";

static KEY_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_]+$").expect("Failed to compile key name regex"));

/// Check a name against the key-name grammar without building an error.
pub fn is_valid_key_name(name: &str) -> bool {
    KEY_NAME_PATTERN.is_match(name)
}

/// Validate a name against the key-name grammar.
///
/// The grammar excludes `:`, so no valid name can contain the environment
/// delimiter.
///
/// # Examples
///
/// ```
/// use appcreds_core::model::validate_key_name;
///
/// assert!(validate_key_name("first_section").is_ok());
/// assert!(validate_key_name("bad key").is_err());
/// ```
pub fn validate_key_name(name: &str) -> Result<()> {
    if is_valid_key_name(name) {
        Ok(())
    } else {
        Err(CredentialError::InvalidKeyFormat {
            key: name.to_string(),
        })
    }
}

/// The external representation a factory serializes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Sectioned structured files (credentials file plus per-profile file).
    #[default]
    Ini,

    /// JSON documents (credentials document plus per-profile document).
    Json,

    /// Process environment variables.
    Env,
}

impl OutputFormat {
    /// Get the format as its configuration string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ini => "ini",
            Self::Json => "json",
            Self::Env => "env",
        }
    }

    /// Whether this format persists to disk.
    pub fn is_file_based(&self) -> bool {
        matches!(self, Self::Ini | Self::Json)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ini" => Ok(Self::Ini),
            "json" => Ok(Self::Json),
            "env" => Ok(Self::Env),
            _ => Err(CredentialError::UnrecognizedOutputFormat {
                value: s.to_string(),
            }),
        }
    }
}

/// One of the two distinguished credential fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Username,
    Password,
}

impl Role {
    /// The canonical label, used when no alternate is configured.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Password => "password",
        }
    }

    /// Resolve an attribute key to a role, ignoring case.
    pub fn from_key(key: &str) -> Option<Self> {
        if key.eq_ignore_ascii_case(Self::Username.as_str()) {
            Some(Self::Username)
        } else if key.eq_ignore_ascii_case(Self::Password.as_str()) {
            Some(Self::Password)
        } else {
            None
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A secret value that prevents accidental exposure in logs.
///
/// Values are still stored in clear text on disk; this only keeps them out of
/// `Debug` and `Display` output and wipes the buffer on drop.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_name_grammar() {
        assert!(is_valid_key_name("a_test_attribute"));
        assert!(is_valid_key_name("Section2"));
        assert!(!is_valid_key_name(""));
        assert!(!is_valid_key_name("bad key"));
        assert!(!is_valid_key_name("a_ /test_attribute"));
        assert!(!is_valid_key_name("profile::section"));
        assert!(!is_valid_key_name("line\nbreak"));
    }

    #[test]
    fn test_validate_key_name_error() {
        let result = validate_key_name("bad key");
        assert!(matches!(
            result,
            Err(CredentialError::InvalidKeyFormat { ref key }) if key == "bad key"
        ));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("ini".parse::<OutputFormat>().unwrap(), OutputFormat::Ini);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("env".parse::<OutputFormat>().unwrap(), OutputFormat::Env);

        let result = "nri".parse::<OutputFormat>();
        assert!(matches!(
            result,
            Err(CredentialError::UnrecognizedOutputFormat { .. })
        ));
    }

    #[test]
    fn test_output_format_file_based() {
        assert!(OutputFormat::Ini.is_file_based());
        assert!(OutputFormat::Json.is_file_based());
        assert!(!OutputFormat::Env.is_file_based());
    }

    #[test]
    fn test_role_from_key_ignores_case() {
        assert_eq!(Role::from_key("USERNAME"), Some(Role::Username));
        assert_eq!(Role::from_key("Password"), Some(Role::Password));
        assert_eq!(Role::from_key("token"), None);
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("super-secret");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(format!("{}", secret), "[REDACTED]");
    }
}
