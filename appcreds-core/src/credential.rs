//! Username/password pairs with their profile.
//!
//! A [`Credential`] wraps a [`Profile`] and the two distinguished fields. The
//! attribute API redirects the keys `username` and `password` (any case) to
//! those fields instead of the attribute store.
//!
//! # Section views
//!
//! [`Credential::section`] returns a second handle onto the same credential
//! with a different selected section. Both handles share one state, so a
//! change made through either is visible through the other. While a handle is
//! scoped to a named section, `username`/`password` cannot be redirected, so
//! an attribute literally called `username` inside a section is never
//! confused with the credential's own username.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use appcreds_core::{Credential, Factory};
//!
//! let mut factory = Factory::new("mtca", false)?;
//! factory.initialize()?;
//! let factory = Arc::new(factory);
//!
//! let credential = Credential::new(&factory, "default", "alice", "s3cret")?;
//! credential.section("first_section").set_attribute("token", "abc")?;
//! credential.save()?;
//!
//! let loaded = Credential::load(&factory)?;
//! assert_eq!(loaded.section("first_section").get_attribute("token")?, "abc");
//! # Ok::<(), appcreds_core::CredentialError>(())
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::attributes::Sections;
use crate::codec::EnvironmentCodec;
use crate::error::{CredentialError, Result};
use crate::factory::Factory;
use crate::model::{DEFAULT_PROFILE_NAME, NO_SECTION_KEY, OutputFormat, Role, Secret};
use crate::profile::Profile;
use crate::serializer::Serializer;

struct CredentialState {
    username: String,
    password: Secret,
    profile: Profile,
    environment_variables: Vec<String>,
}

/// A username, password, and attribute profile for one application.
pub struct Credential {
    shared: Arc<RwLock<CredentialState>>,
    section: Option<String>,
    factory: Arc<Factory>,
}

impl Credential {
    /// Create a credential with a fresh, empty profile.
    pub fn new(factory: &Arc<Factory>, profile_name: &str, username: &str, password: &str) -> Result<Self> {
        trace!(profile = %profile_name, "Building credential");

        if !factory.is_initialized() {
            return Err(CredentialError::FactoryNotInitialized);
        }
        if username.is_empty() || password.is_empty() {
            return Err(CredentialError::UsernameOrPasswordEmpty);
        }

        let profile = Profile::new(profile_name, factory.config_file_for(profile_name)?)?;

        Ok(Self {
            shared: Arc::new(RwLock::new(CredentialState {
                username: username.to_string(),
                password: Secret::new(password),
                profile,
                environment_variables: Vec::new(),
            })),
            section: None,
            factory: Arc::clone(factory),
        })
    }

    /// Rebuild a credential from deserialized parts.
    pub fn deserialize(
        factory: &Arc<Factory>,
        profile_name: &str,
        username: &str,
        password: &str,
        attributes: Sections,
    ) -> Result<Self> {
        let credential = Self::new(factory, profile_name, username, password)?;
        {
            let mut state = credential.shared.write();
            for (section, keys) in attributes {
                for (key, value) in keys {
                    state.profile.set_attribute(&section, &key, value)?;
                }
            }
        }
        Ok(credential)
    }

    /// The `(username, password, attributes)` triple handed to a serializer.
    pub fn serialize(&self) -> (String, String, Sections) {
        let state = self.shared.read();
        (
            state.username.clone(),
            state.password.expose().to_string(),
            state.profile.attributes().clone(),
        )
    }

    pub fn username(&self) -> String {
        self.shared.read().username.clone()
    }

    pub fn password(&self) -> String {
        self.shared.read().password.expose().to_string()
    }

    pub fn profile_name(&self) -> String {
        self.shared.read().profile.name().to_string()
    }

    /// The selected section, `None` when unscoped.
    pub fn selected_section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    pub fn factory(&self) -> &Arc<Factory> {
        &self.factory
    }

    /// A view of this credential scoped to `name`.
    ///
    /// An empty `name` selects the no-section bucket. The view shares state
    /// with `self`.
    pub fn section(&self, name: &str) -> Credential {
        Credential {
            shared: Arc::clone(&self.shared),
            section: (!name.is_empty()).then(|| name.to_string()),
            factory: Arc::clone(&self.factory),
        }
    }

    /// Set an attribute in the selected section, or the username/password.
    pub fn set_attribute(&self, key: &str, value: &str) -> Result<()> {
        if let Some(role) = Role::from_key(key) {
            self.ensure_unsectioned(key)?;
            let mut state = self.shared.write();
            match role {
                Role::Username => state.username = value.to_string(),
                Role::Password => state.password = Secret::new(value),
            }
            trace!(%role, "Redirected attribute request to credential field");
            return Ok(());
        }

        trace!(key = %key, section = %self.section_key(), "Setting attribute");
        self.shared
            .write()
            .profile
            .set_attribute(self.section_key(), key, value)
    }

    /// Get an attribute from the selected section, or the username/password.
    ///
    /// A missing attribute reads as an empty string.
    pub fn get_attribute(&self, key: &str) -> Result<String> {
        if let Some(role) = Role::from_key(key) {
            self.ensure_unsectioned(key)?;
            trace!(%role, "Redirected attribute request to credential field");
            return Ok(match role {
                Role::Username => self.username(),
                Role::Password => self.password(),
            });
        }

        Ok(self
            .shared
            .read()
            .profile
            .get_attribute(self.section_key(), key))
    }

    /// Delete an attribute from the selected section.
    ///
    /// The username and password can never be deleted.
    pub fn delete_attribute(&self, key: &str) -> Result<()> {
        match Role::from_key(key) {
            Some(Role::Username) => Err(CredentialError::CannotDeleteUsername),
            Some(Role::Password) => Err(CredentialError::CannotDeletePassword),
            None => self
                .shared
                .write()
                .profile
                .delete_attribute(self.section_key(), key),
        }
    }

    /// Snapshot of every attribute section.
    pub fn get_all_attributes(&self) -> Sections {
        self.shared.read().profile.attributes().clone()
    }

    /// Persist the profile, then the username and password, in the factory's
    /// output format.
    pub fn save(&self) -> Result<()> {
        let state = self.shared.read();
        let serializer = Serializer::new(&self.factory, state.profile.name())?;

        state.profile.save(&serializer)?;
        serializer.serialize_credentials(&state.username, state.password.expose())?;

        debug!(profile = %state.profile.name(), format = %serializer.format(), "Credential saved");
        Ok(())
    }

    /// Load the default profile.
    pub fn load(factory: &Arc<Factory>) -> Result<Self> {
        Self::load_from_profile(DEFAULT_PROFILE_NAME, factory)
    }

    /// Load a named profile.
    ///
    /// For file-based formats the environment is tried first and wins when it
    /// holds both the username and password; otherwise the file is read.
    pub fn load_from_profile(profile_name: &str, factory: &Arc<Factory>) -> Result<Self> {
        if !factory.is_initialized() {
            return Err(CredentialError::FactoryNotInitialized);
        }

        if factory.output_format().is_file_based() {
            match Self::load_from_environment(profile_name, factory) {
                Ok(credential) => {
                    debug!(profile = %profile_name, "Loaded credential from environment override");
                    return Ok(credential);
                }
                Err(e) if e.is_missing_environment_variable() => {
                    trace!(profile = %profile_name, error = %e, "No environment override, reading file");
                }
                Err(e) => {
                    warn!(profile = %profile_name, error = %e, "Ignoring unusable environment override");
                }
            }
        }

        let (username, password, attributes) = Serializer::new(factory, profile_name)?.deserialize()?;
        Self::deserialize(factory, profile_name, &username, &password, attributes)
    }

    /// Load a named profile from the environment only.
    pub fn load_from_environment(profile_name: &str, factory: &Arc<Factory>) -> Result<Self> {
        let serializer = Serializer::with_format(factory, profile_name, OutputFormat::Env)?;
        let (username, password, attributes) = serializer.deserialize()?;
        Self::deserialize(factory, profile_name, &username, &password, attributes)
    }

    /// Write this credential into the factory's environment and remember the
    /// variable names.
    pub fn deploy_env(&self) -> Result<Vec<String>> {
        if !self.factory.use_environment() {
            return Err(CredentialError::EnvironmentDeployDisabled);
        }

        let mut state = self.shared.write();
        let profile_name = state.profile.name().to_string();
        let codec = EnvironmentCodec::new(&self.factory, &profile_name);
        let deployed = codec.deploy(
            &state.username,
            state.password.expose(),
            state.profile.attributes(),
        )?;

        state.environment_variables = deployed.clone();
        Ok(deployed)
    }

    /// Names set by the last [`deploy_env`](Self::deploy_env).
    pub fn environment_variables(&self) -> Vec<String> {
        self.shared.read().environment_variables.clone()
    }

    /// Remove every variable set by the last [`deploy_env`](Self::deploy_env).
    pub fn clean_environment(&self) {
        let mut state = self.shared.write();
        for name in state.environment_variables.drain(..) {
            trace!(key = %name, "Removing environment variable");
            self.factory.environment().remove(&name);
        }
    }

    fn section_key(&self) -> &str {
        self.section.as_deref().unwrap_or(NO_SECTION_KEY)
    }

    fn ensure_unsectioned(&self, key: &str) -> Result<()> {
        match self.section.as_deref() {
            Some(section) if section != NO_SECTION_KEY => {
                Err(CredentialError::CannotRedirectWhileSectioned {
                    key: key.to_string(),
                    section: section.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.read();
        f.debug_struct("Credential")
            .field("username", &state.username)
            .field("password", &state.password)
            .field("profile", &state.profile.name())
            .field("section", &self.section)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MemoryEnvironment;
    use tempfile::TempDir;

    fn test_factory() -> (Arc<Factory>, TempDir) {
        let temp = TempDir::new().unwrap();
        let mut factory = Factory::new("mtca", true)
            .unwrap()
            .with_root_directory(temp.path())
            .with_environment(Arc::new(MemoryEnvironment::new()));
        factory.initialize().unwrap();
        (Arc::new(factory), temp)
    }

    fn test_credential() -> (Credential, TempDir) {
        let (factory, temp) = test_factory();
        let credential = Credential::new(&factory, "default", "a_test_username", "as=/sle\\sowkjg@!").unwrap();
        (credential, temp)
    }

    #[test]
    fn test_new_requires_initialized_factory() {
        let factory = Arc::new(Factory::new("mtca", false).unwrap());
        assert!(matches!(
            Credential::new(&factory, "default", "alice", "s3cret"),
            Err(CredentialError::FactoryNotInitialized)
        ));
    }

    #[test]
    fn test_new_requires_username_and_password() {
        let (factory, _temp) = test_factory();
        assert!(matches!(
            Credential::new(&factory, "default", "", "s3cret"),
            Err(CredentialError::UsernameOrPasswordEmpty)
        ));
        assert!(matches!(
            Credential::new(&factory, "default", "alice", ""),
            Err(CredentialError::UsernameOrPasswordEmpty)
        ));
    }

    #[test]
    fn test_new_validates_profile_name() {
        let (factory, _temp) = test_factory();
        assert!(matches!(
            Credential::new(&factory, "bad profile", "alice", "s3cret"),
            Err(CredentialError::InvalidKeyFormat { .. })
        ));
    }

    #[test]
    fn test_username_password_redirect() {
        let (credential, _temp) = test_credential();

        credential.set_attribute("USERNAME", "another_test_username").unwrap();
        credential.set_attribute("password", ".YaJ5XAA${hh8^C").unwrap();

        assert_eq!(credential.username(), "another_test_username");
        assert_eq!(credential.password(), ".YaJ5XAA${hh8^C");
        assert_eq!(credential.get_attribute("Username").unwrap(), "another_test_username");
        assert!(credential.get_all_attributes().is_empty());
    }

    #[test]
    fn test_attributes_default_to_no_section() {
        let (credential, _temp) = test_credential();
        credential
            .set_attribute("a_test_attribute", "a global attribute value")
            .unwrap();

        let all = credential.get_all_attributes();
        assert_eq!(all[NO_SECTION_KEY]["a_test_attribute"], "a global attribute value");
        assert_eq!(
            credential.section("").get_attribute("a_test_attribute").unwrap(),
            "a global attribute value"
        );
        assert_eq!(credential.get_attribute("missing").unwrap(), "");
    }

    #[test]
    fn test_section_view_shares_state() {
        let (credential, _temp) = test_credential();
        let section = credential.section("first_section");

        section.set_attribute("token", "abc").unwrap();
        assert_eq!(credential.get_all_attributes()["first_section"]["token"], "abc");
        assert_eq!(credential.get_attribute("token").unwrap(), "");

        credential.set_attribute("username", "changed").unwrap();
        assert_eq!(section.username(), "changed");
        assert_eq!(section.selected_section(), Some("first_section"));
        assert_eq!(credential.selected_section(), None);
    }

    #[test]
    fn test_sectioned_redirect_rejected() {
        let (credential, _temp) = test_credential();
        let section = credential.section("x");

        assert!(matches!(
            section.set_attribute("username", "mallory"),
            Err(CredentialError::CannotRedirectWhileSectioned { .. })
        ));
        assert!(matches!(
            section.get_attribute("PASSWORD"),
            Err(CredentialError::CannotRedirectWhileSectioned { .. })
        ));
        assert_eq!(credential.username(), "a_test_username");
    }

    #[test]
    fn test_default_section_view_still_redirects() {
        let (credential, _temp) = test_credential();
        credential
            .section(NO_SECTION_KEY)
            .set_attribute("username", "alice")
            .unwrap();
        assert_eq!(credential.username(), "alice");
    }

    #[test]
    fn test_cannot_delete_username_or_password() {
        let (credential, _temp) = test_credential();

        assert!(matches!(
            credential.delete_attribute("username"),
            Err(CredentialError::CannotDeleteUsername)
        ));
        assert!(matches!(
            credential.section("s").delete_attribute("Password"),
            Err(CredentialError::CannotDeletePassword)
        ));
    }

    #[test]
    fn test_delete_attribute() {
        let (credential, _temp) = test_credential();
        let section = credential.section("s");
        section.set_attribute("k", "v").unwrap();

        section.delete_attribute("k").unwrap();
        assert!(credential.get_all_attributes().is_empty());
        assert!(matches!(
            section.delete_attribute("k"),
            Err(CredentialError::AttributeNotFound { .. })
        ));
    }

    #[test]
    fn test_bad_key_leaves_store_unchanged() {
        let (credential, _temp) = test_credential();
        credential.set_attribute("good", "v").unwrap();
        let before = credential.get_all_attributes();

        assert!(matches!(
            credential.set_attribute("bad key", "v"),
            Err(CredentialError::InvalidKeyFormat { .. })
        ));
        assert_eq!(credential.get_all_attributes(), before);
    }

    #[test]
    fn test_serialize_deserialize() {
        let (credential, _temp) = test_credential();
        credential.section("s").set_attribute("k", "v").unwrap();

        let (username, password, attributes) = credential.serialize();
        let rebuilt =
            Credential::deserialize(credential.factory(), "default", &username, &password, attributes)
                .unwrap();

        assert_eq!(rebuilt.username(), credential.username());
        assert_eq!(rebuilt.password(), credential.password());
        assert_eq!(rebuilt.get_all_attributes(), credential.get_all_attributes());
    }

    #[test]
    fn test_debug_redacts_password() {
        let (credential, _temp) = test_credential();
        let debug = format!("{:?}", credential);
        assert!(debug.contains("a_test_username"));
        assert!(!debug.contains("sowkjg"));
    }

    #[test]
    fn test_deploy_and_clean_environment() {
        let (credential, _temp) = test_credential();
        credential.section("s").set_attribute("k", "v").unwrap();

        let names = credential.deploy_env().unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(credential.environment_variables(), names);

        let env = credential.factory().environment();
        assert_eq!(env.get("MTCA::DEFAULT::USERNAME").as_deref(), Some("a_test_username"));

        credential.clean_environment();
        assert!(env.vars().is_empty());
        assert!(credential.environment_variables().is_empty());
    }

    #[test]
    fn test_deploy_requires_use_environment() {
        let temp = TempDir::new().unwrap();
        let mut factory = Factory::new("mtca", false)
            .unwrap()
            .with_root_directory(temp.path())
            .with_environment(Arc::new(MemoryEnvironment::new()));
        factory.initialize().unwrap();
        let factory = Arc::new(factory);

        let credential = Credential::new(&factory, "default", "alice", "s3cret").unwrap();
        assert!(matches!(
            credential.deploy_env(),
            Err(CredentialError::EnvironmentDeployDisabled)
        ));
    }
}
