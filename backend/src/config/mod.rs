//! Process configuration.
//!
//! Non-secret settings layer CLI, environment (`ZIMBEAT_*`), and config
//! files through OrthoConfig. Secrets are read straight from the process
//! environment and never pass through the settings struct, so they cannot
//! end up in a dumped or logged configuration.

mod secrets;
mod settings;

pub use secrets::{BuildMode, SecretSettings, SecretsConfigError, secrets_from_env};
pub use settings::AppSettings;
