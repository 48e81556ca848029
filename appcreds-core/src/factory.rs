//! Application-level credential settings.
//!
//! A [`Factory`] holds everything the serializers need before they can touch
//! storage: the application name, output format, alternate labels for the
//! username/password roles, the configuration root, and the environment to
//! read and write variables through.
//!
//! # Storage Location
//!
//! By default the root is `~/.<application_name>/` (lowercased). Inside it:
//! - `credentials` - shared username/password file, one section per profile
//! - `config/<profile>` - per-profile attribute file
//!
//! # Example
//!
//! ```rust,no_run
//! use appcreds_core::Factory;
//!
//! let mut factory = Factory::new("mtca", false)?;
//! factory.set_output_format("json")?;
//! factory.initialize()?;
//! # Ok::<(), appcreds_core::CredentialError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::environment::{Environment, ProcessEnvironment};
use crate::error::{CredentialError, Result};
use crate::model::{ENV_ATTRIBUTE_FIELD, OutputFormat, Role, validate_key_name};

const CREDENTIAL_FILE_NAME: &str = "credentials";
const CONFIG_DIRECTORY_NAME: &str = "config";

/// Application-level configuration shared by every credential of one
/// application.
pub struct Factory {
    application_name: String,
    use_environment: bool,
    output_format: OutputFormat,
    alternate_username: Option<String>,
    alternate_password: Option<String>,
    root_override: Option<PathBuf>,
    root_directory: Option<PathBuf>,
    environment: Arc<dyn Environment>,
}

impl Factory {
    /// Create a factory for `application_name`.
    ///
    /// `use_environment` controls whether credentials may be deployed into
    /// the environment with [`Credential::deploy_env`](crate::Credential::deploy_env).
    /// The factory must still be [initialized](Self::initialize) before use.
    pub fn new(application_name: &str, use_environment: bool) -> Result<Self> {
        if application_name.is_empty() {
            return Err(CredentialError::ApplicationNameBlank);
        }
        validate_key_name(application_name)?;

        Ok(Self {
            application_name: application_name.to_string(),
            use_environment,
            output_format: OutputFormat::default(),
            alternate_username: None,
            alternate_password: None,
            root_override: None,
            root_directory: None,
            environment: Arc::new(ProcessEnvironment::new()),
        })
    }

    /// Use `root` instead of `~/.<application_name>/`.
    pub fn with_root_directory(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_override = Some(root.into());
        self
    }

    /// Read and write environment variables through `environment` instead of
    /// the process environment.
    pub fn with_environment(mut self, environment: Arc<dyn Environment>) -> Self {
        self.environment = environment;
        self
    }

    /// Resolve the configuration root and create it if missing.
    ///
    /// Directories are created owner-only; permissions of an existing
    /// directory are left as they are.
    pub fn initialize(&mut self) -> Result<()> {
        trace!(application = %self.application_name, "Initializing application credentials");

        let root = match &self.root_override {
            Some(root) => root.clone(),
            None => default_root(&self.application_name)?,
        };

        create_private_dir(&root)?;
        create_private_dir(&root.join(CONFIG_DIRECTORY_NAME))?;

        debug!(root = ?root, "Credential root ready");
        self.root_directory = Some(root);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.root_directory.is_some()
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn use_environment(&self) -> bool {
        self.use_environment
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Set the output format from its configuration string.
    pub fn set_output_format(&mut self, format: &str) -> Result<()> {
        self.output_format = format.parse()?;
        Ok(())
    }

    /// The label used for `role` in files and environment variables.
    pub fn alternate_label(&self, role: Role) -> &str {
        let alternate = match role {
            Role::Username => &self.alternate_username,
            Role::Password => &self.alternate_password,
        };
        alternate.as_deref().unwrap_or(role.as_str())
    }

    /// Set the username label; it must differ from the password label.
    pub fn set_alternate_username(&mut self, label: &str) -> Result<()> {
        let username = checked_label(Role::Username, label)?;
        ensure_distinct(&username, self.alternate_label(Role::Password))?;
        self.alternate_username = Some(username);
        Ok(())
    }

    /// Set the password label; it must differ from the username label.
    pub fn set_alternate_password(&mut self, label: &str) -> Result<()> {
        let password = checked_label(Role::Password, label)?;
        ensure_distinct(self.alternate_label(Role::Username), &password)?;
        self.alternate_password = Some(password);
        Ok(())
    }

    /// Set both alternate labels; neither changes unless both are valid.
    pub fn set_environment_keys(&mut self, username_label: &str, password_label: &str) -> Result<()> {
        let username = checked_label(Role::Username, username_label)?;
        let password = checked_label(Role::Password, password_label)?;
        ensure_distinct(&username, &password)?;

        trace!(username = %username, password = %password, "Alternate labels registered");
        self.alternate_username = Some(username);
        self.alternate_password = Some(password);
        Ok(())
    }

    /// The configuration root, once initialized.
    pub fn root_directory(&self) -> Result<&Path> {
        self.root_directory
            .as_deref()
            .ok_or(CredentialError::FactoryNotInitialized)
    }

    /// Path of the credentials file shared by every profile.
    pub fn credential_file(&self) -> Result<PathBuf> {
        Ok(self.root_directory()?.join(CREDENTIAL_FILE_NAME))
    }

    /// Path of the attribute file belonging to `profile`.
    pub fn config_file_for(&self, profile: &str) -> Result<PathBuf> {
        Ok(self
            .root_directory()?
            .join(CONFIG_DIRECTORY_NAME)
            .join(profile))
    }

    pub fn environment(&self) -> &dyn Environment {
        self.environment.as_ref()
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("application_name", &self.application_name)
            .field("use_environment", &self.use_environment)
            .field("output_format", &self.output_format)
            .field("username_label", &self.alternate_label(Role::Username))
            .field("password_label", &self.alternate_label(Role::Password))
            .field("root_directory", &self.root_directory)
            .finish()
    }
}

fn checked_label(role: Role, label: &str) -> Result<String> {
    if label.is_empty() {
        return Err(CredentialError::AlternateLabelBlank { role });
    }
    validate_key_name(label)?;

    // `APP::PROFILE::ATTRIBUTE` would never parse as a field variable.
    if label.eq_ignore_ascii_case(ENV_ATTRIBUTE_FIELD) {
        return Err(CredentialError::AlternateLabelReserved {
            label: label.to_string(),
        });
    }
    Ok(label.to_lowercase())
}

fn ensure_distinct(username_label: &str, password_label: &str) -> Result<()> {
    if username_label == password_label {
        return Err(CredentialError::AlternateLabelsEqual {
            label: username_label.to_string(),
        });
    }
    Ok(())
}

fn default_root(application_name: &str) -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or_else(|| {
        CredentialError::io(
            PathBuf::from("~"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not available"),
        )
    })?;

    Ok(dirs
        .home_dir()
        .join(format!(".{}", application_name.to_lowercase())))
}

fn create_private_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        trace!(path = ?path, "Directory exists, skipping");
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }

    builder
        .create(path)
        .map_err(|e| CredentialError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_factory() -> (Factory, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut factory = Factory::new("mtca", false)
            .unwrap()
            .with_root_directory(temp_dir.path().join(".mtca"));
        factory.initialize().unwrap();
        (factory, temp_dir)
    }

    #[test]
    fn test_new_validates_application_name() {
        assert!(matches!(
            Factory::new("", false),
            Err(CredentialError::ApplicationNameBlank)
        ));
        assert!(matches!(
            Factory::new("bad name", false),
            Err(CredentialError::InvalidKeyFormat { .. })
        ));

        let factory = Factory::new("mtca", true).unwrap();
        assert_eq!(factory.application_name(), "mtca");
        assert!(factory.use_environment());
        assert_eq!(factory.output_format(), OutputFormat::Ini);
        assert!(!factory.is_initialized());
    }

    #[test]
    fn test_paths_require_initialize() {
        let factory = Factory::new("mtca", false).unwrap();
        assert!(matches!(
            factory.credential_file(),
            Err(CredentialError::FactoryNotInitialized)
        ));
        assert!(matches!(
            factory.config_file_for("default"),
            Err(CredentialError::FactoryNotInitialized)
        ));
    }

    #[test]
    fn test_initialize_creates_directories() {
        let (factory, temp) = test_factory();
        let root = temp.path().join(".mtca");

        assert!(factory.is_initialized());
        assert!(root.is_dir());
        assert!(root.join("config").is_dir());
        assert_eq!(factory.credential_file().unwrap(), root.join("credentials"));
        assert_eq!(
            factory.config_file_for("work").unwrap(),
            root.join("config").join("work")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_initialize_directory_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (factory, _temp) = test_factory();
        let mode = fs::metadata(factory.root_directory().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn test_set_output_format() {
        let (mut factory, _temp) = test_factory();

        factory.set_output_format("json").unwrap();
        assert_eq!(factory.output_format(), OutputFormat::Json);

        factory.set_output_format("env").unwrap();
        assert_eq!(factory.output_format(), OutputFormat::Env);

        let result = factory.set_output_format("nri");
        assert!(matches!(
            result,
            Err(CredentialError::UnrecognizedOutputFormat { .. })
        ));
        assert_eq!(factory.output_format(), OutputFormat::Env);
    }

    #[test]
    fn test_alternate_labels() {
        let (mut factory, _temp) = test_factory();

        assert_eq!(factory.alternate_label(Role::Username), "username");
        assert_eq!(factory.alternate_label(Role::Password), "password");

        assert!(matches!(
            factory.set_alternate_username(""),
            Err(CredentialError::AlternateLabelBlank { role: Role::Username })
        ));
        assert!(matches!(
            factory.set_alternate_password(""),
            Err(CredentialError::AlternateLabelBlank { role: Role::Password })
        ));

        factory.set_alternate_username("ACCESS_TOKEN").unwrap();
        factory.set_alternate_password("Secret_Key").unwrap();
        assert_eq!(factory.alternate_label(Role::Username), "access_token");
        assert_eq!(factory.alternate_label(Role::Password), "secret_key");
    }

    #[test]
    fn test_reserved_label_rejected() {
        let (mut factory, _temp) = test_factory();

        assert!(matches!(
            factory.set_alternate_username("Attribute"),
            Err(CredentialError::AlternateLabelReserved { .. })
        ));
        assert!(matches!(
            factory.set_environment_keys("access_token", "ATTRIBUTE"),
            Err(CredentialError::AlternateLabelReserved { .. })
        ));
        assert_eq!(factory.alternate_label(Role::Username), "username");
        assert_eq!(factory.alternate_label(Role::Password), "password");
    }

    #[test]
    fn test_equal_labels_rejected() {
        let (mut factory, _temp) = test_factory();

        assert!(matches!(
            factory.set_environment_keys("token", "TOKEN"),
            Err(CredentialError::AlternateLabelsEqual { ref label }) if label == "token"
        ));
        assert!(matches!(
            factory.set_alternate_username("password"),
            Err(CredentialError::AlternateLabelsEqual { .. })
        ));

        factory.set_alternate_password("secret_key").unwrap();
        assert!(matches!(
            factory.set_alternate_username("Secret_Key"),
            Err(CredentialError::AlternateLabelsEqual { .. })
        ));
        assert_eq!(factory.alternate_label(Role::Username), "username");
    }

    #[test]
    fn test_set_environment_keys_is_all_or_nothing() {
        let (mut factory, _temp) = test_factory();

        factory
            .set_environment_keys("access_token", "secret_key")
            .unwrap();

        let bad = "bad key with no underscores";
        assert!(factory.set_environment_keys(bad, "other").is_err());
        assert!(factory.set_environment_keys("other", bad).is_err());
        assert!(factory.set_environment_keys(bad, bad).is_err());

        assert_eq!(factory.alternate_label(Role::Username), "access_token");
        assert_eq!(factory.alternate_label(Role::Password), "secret_key");
    }
}
