//! Environment source: FACTFLOW_SECTION__KEY=value

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("FACTFLOW")
            .prefix_separator("_")
            .separator("__"),
    )
}
