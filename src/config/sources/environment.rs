//! Environment variable source: CANOPY__* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder.
/// Uses CANOPY prefix and __ as separator for nested keys, e.g. `CANOPY__ADMIN__PASSWORD`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix("CANOPY")
            .separator("__")
            .try_parsing(true),
    );
    Ok(builder)
}
