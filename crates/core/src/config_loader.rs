//! Settings loading.
//!
//! A YAML file is merged with `OPTIONS_BOT_*` environment variables, then
//! normalized and validated before the bot sees it.

use std::path::Path;

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};

use crate::config::Settings;
use crate::error::ConfigError;

/// Default location of the settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_PATH: &str = "settings.yaml";

/// Prefix for environment variables that override settings keys.
pub const ENV_PREFIX: &str = "OPTIONS_BOT_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads settings by merging the YAML file with `OPTIONS_BOT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, cannot be parsed, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!(path = %path.display(), "Loading settings");
        Self::extract(
            Figment::new()
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    /// Loads settings from an in-memory YAML document, without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed or fails validation.
    pub fn from_yaml_str(yaml: &str) -> Result<Settings, ConfigError> {
        Self::extract(Figment::new().merge(Yaml::string(yaml)))
    }

    fn extract(figment: Figment) -> Result<Settings, ConfigError> {
        let mut settings: Settings = figment.extract()?;
        settings.normalize();
        settings.validate()?;
        Ok(settings)
    }
}
