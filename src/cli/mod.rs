pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{BatchArgs, BuildArgs, CliArgs, Commands, DetectArgs, ResolveArgs, RunArgs};
pub use output::{OutputFormat, OutputFormatter};
