//! Built-in defaults applied beneath every other source.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Builder seeded with the defaults every run starts from.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("root_path", "/")?
        .set_default("directory.connect_timeout_ms", 1_000)?
        .set_default("directory.read_timeout_ms", 10_000)?
        .set_default("content.connect_timeout_ms", 1_000)?
        .set_default("content.read_timeout_ms", 10_000)
}
