//! CLI domain: parse, route, help, output, and presentation only.
//! Decision logic lives in the library modules; the route table calls into them.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, ConfigFormat, OutputFormat};
pub use presentation::{
    format_config, format_fingerprints_json, format_listing_text, format_plan_json,
    format_plan_text,
};
pub use route::RunContext;
