use config::{Config, Environment, File};
use serde::Deserialize;
use sos_store::StoreConfig;
use std::path::Path;
use tracing::info;

const ENV_PREFIX: &str = "SOS";

/// Settings file layout; every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) store: StoreConfig,
}

/// Layers an optional settings file under `SOS__*` environment overrides.
///
/// Nested keys use a double underscore, e.g. `SOS__STORE__ROOT=/mnt/objects` or
/// `SOS__STORE__SYNC=false`.
///
/// # Errors
/// Fails if the file is named but missing, or the merged values do not deserialize.
pub(crate) fn load(path: Option<&Path>) -> Result<Settings, config::ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        info!("Loading config from {}", path.display());
        builder = builder.add_source(File::from(path).required(true));
    }

    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
