//! Top-level error types for appcreds.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::Role;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Every failure a credential, profile, serializer, or factory can surface.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A section, key, profile, label, or application name broke the
    /// `[0-9A-Za-z_]+` naming rule.
    #[error("invalid key format '{key}': only letters, numbers and underscores [0-9A-Za-z_] are allowed")]
    InvalidKeyFormat { key: String },

    /// A credential was constructed with a blank username or password.
    #[error("username and password must both be set")]
    UsernameOrPasswordEmpty,

    /// The factory was used before [`Factory::initialize`](crate::Factory::initialize).
    #[error("the factory has not been initialized, call initialize() first")]
    FactoryNotInitialized,

    /// The application name given to the factory was blank.
    #[error("the application name must not be blank")]
    ApplicationNameBlank,

    /// An alternate username/password label was blank.
    #[error("the alternate {role} label must not be blank")]
    AlternateLabelBlank { role: Role },

    /// An alternate label collided with the reserved `ATTRIBUTE` segment.
    #[error("'{label}' is reserved and cannot be used as an alternate label")]
    AlternateLabelReserved { label: String },

    /// The username and password labels would name the same key.
    #[error("the username and password labels must differ, both are '{label}'")]
    AlternateLabelsEqual { label: String },

    /// The attribute to delete does not exist.
    #[error("attribute {section}.{key} does not exist")]
    AttributeNotFound { section: String, key: String },

    /// The profile's attribute storage does not exist.
    #[error("profile '{profile}' does not exist")]
    ProfileNotFound { profile: String },

    /// `username`/`password` were addressed through a section view.
    #[error("cannot redirect '{key}' to the credential while scoped to section '{section}'")]
    CannotRedirectWhileSectioned { key: String, section: String },

    /// The username can be overwritten but never removed.
    #[error("the username cannot be deleted, only overwritten")]
    CannotDeleteUsername,

    /// The password can be overwritten but never removed.
    #[error("the password cannot be deleted, only overwritten")]
    CannotDeletePassword,

    /// The output format is not one of `ini`, `json`, or `env`.
    #[error("unrecognized output format '{value}', valid values are ini, json, env")]
    UnrecognizedOutputFormat { value: String },

    /// No environment variable held the username under the configured label.
    #[error("username has not been set via the environment (label '{label}') and is required")]
    RequiredVariableUsernameNotFound { label: String },

    /// No environment variable held the password under the configured label.
    #[error("password has not been set via the environment (label '{label}') and is required")]
    RequiredVariablePasswordNotFound { label: String },

    /// Environment deployment was requested from a factory that does not allow it.
    #[error("environment deployment is disabled for this factory")]
    EnvironmentDeployDisabled,

    /// Reading or writing a file failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An existing ini file could not be parsed.
    #[error("ini parse error: {0}")]
    IniRead(#[from] ini::ParseError),
}

impl CredentialError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the two "required variable missing" failures of the
    /// environment codec.
    pub fn is_missing_environment_variable(&self) -> bool {
        matches!(
            self,
            Self::RequiredVariableUsernameNotFound { .. }
                | Self::RequiredVariablePasswordNotFound { .. }
        )
    }
}
