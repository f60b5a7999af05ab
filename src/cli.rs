//! CLI domain: parse, route, output, and presentation only.
//! Fact graph and flow logic stay in their modules; the route table only wires them together.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use route::RunContext;
