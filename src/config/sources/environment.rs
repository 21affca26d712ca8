//! Environment source: IMPRINT_<KEY>, nested keys separated by `__`
//! (e.g. IMPRINT_REGISTRY__PASSWORD).

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("IMPRINT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
