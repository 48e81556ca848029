#![allow(dead_code)]
//! Shared fixtures for the integration tests.

use std::sync::{Arc, Once};

use appcreds_core::{Factory, MemoryEnvironment};
use tempfile::TempDir;
use tracing_subscriber::{EnvFilter, fmt};

static LOGGING: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}

/// An initialized factory rooted in a fresh temporary directory, reading
/// and writing variables through `env`.
pub fn test_factory(
    application: &str,
    format: &str,
    use_environment: bool,
    env: Arc<MemoryEnvironment>,
) -> (Arc<Factory>, TempDir) {
    init_logging();

    let temp_dir = TempDir::new().unwrap();
    let mut factory = Factory::new(application, use_environment)
        .unwrap()
        .with_root_directory(temp_dir.path().join(format!(".{application}")))
        .with_environment(env);
    factory.set_output_format(format).unwrap();
    factory.initialize().unwrap();

    (Arc::new(factory), temp_dir)
}

/// A second factory sharing `first`'s root and environment, as a restarted
/// process would see it.
pub fn reopen(first: &Factory, format: &str, env: Arc<MemoryEnvironment>) -> Arc<Factory> {
    let mut factory = Factory::new(first.application_name(), first.use_environment())
        .unwrap()
        .with_root_directory(first.root_directory().unwrap())
        .with_environment(env);
    factory.set_output_format(format).unwrap();
    factory.initialize().unwrap();
    Arc::new(factory)
}
