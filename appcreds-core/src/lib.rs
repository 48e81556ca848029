//! # Appcreds Core
//!
//! Per-application credential profiles.
//!
//! This crate provides:
//! - A [`Factory`] holding the application name, output format, and storage root
//! - [`Credential`]s: a username, password, and sectioned attribute [`Profile`]
//! - Codecs persisting profiles as an ini-like file, JSON, or environment variables
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use appcreds_core::{Credential, Factory};
//!
//! let mut factory = Factory::new("mtca", false)?;
//! factory.initialize()?;
//! let factory = Arc::new(factory);
//!
//! let credential = Credential::load(&factory)?;
//! println!("user = {}", credential.username());
//! # Ok::<(), appcreds_core::CredentialError>(())
//! ```

pub mod attributes;
pub mod codec;
pub mod credential;
pub mod environment;
pub mod error;
pub mod factory;
pub mod model;
pub mod profile;
pub mod serializer;

// Re-export commonly used types at crate root
pub use model::{
    OutputFormat,
    Role,
    Secret,
    NO_SECTION_KEY,
    DEFAULT_PROFILE_NAME,
};

pub use attributes::{
    AttributeStore,
    Sections,
};

pub use environment::{
    Environment,
    ProcessEnvironment,
    MemoryEnvironment,
};

pub use codec::{
    FormatCodec,
    StructuredFileCodec,
    JsonCodec,
    EnvironmentCodec,
    EnvironmentKey,
};

pub use error::{CredentialError, Result};

pub use factory::Factory;
pub use profile::Profile;
pub use credential::Credential;
pub use serializer::Serializer;
