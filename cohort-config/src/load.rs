use std::path::{Path, PathBuf};

use config::FileFormat;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "COHORT";

/// Separator between environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Errors that can occur while loading configuration files and overrides.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    /// The configuration file does not exist.
    #[error("configuration file `{0}` does not exist")]
    MissingConfigurationFile(PathBuf),

    /// The configuration file has an extension no supported format matches.
    #[error("unsupported configuration file extension for `{0}`; expected yaml, yml or json")]
    UnsupportedExtension(PathBuf),

    /// A configuration source existed but could not be read or merged.
    #[error("failed to load configuration from `{path}`: {source}")]
    ConfigurationFileLoad {
        path: PathBuf,
        source: config::ConfigError,
    },

    /// The configuration sources were read but deserialization failed.
    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] config::ConfigError),
}

/// Loads configuration from an explicit file plus environment overrides.
///
/// The file format is chosen by extension (`yaml`/`yml`/`json`). Overrides
/// come from `COHORT_`-prefixed environment variables, with double
/// underscores separating nested keys (`COHORT_RESOURCES__CPU_CORES`).
pub fn load_config_from<T>(path: &Path) -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    if !path.is_file() {
        return Err(LoadConfigError::MissingConfigurationFile(
            path.to_path_buf(),
        ));
    }

    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        _ => return Err(LoadConfigError::UnsupportedExtension(path.to_path_buf())),
    };

    let file_source = config::File::from(path.to_path_buf()).format(format);
    let environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    let settings = config::Config::builder()
        .add_source(file_source)
        .add_source(environment_source)
        .build()
        .map_err(|source| LoadConfigError::ConfigurationFileLoad {
            path: path.to_path_buf(),
            source,
        })?;

    settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}
