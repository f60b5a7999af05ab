//! Merge rules: defaults and override order.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("flow.flow_path", "flow.json")?
        .set_default("flow.dictionary_path", "facts.json")?
        .set_default("logging.level", "warn")
}
