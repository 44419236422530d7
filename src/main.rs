use buildsieve::cli::commands::{CliArgs, Commands};
use buildsieve::cli::handlers::{handle_batch, handle_build, handle_detect, handle_resolve};
use buildsieve::util::logging::{config_from_env, init_logging, parse_level};
use buildsieve::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("buildsieve v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Detect(detect_args) => handle_detect(detect_args).await,
        Commands::Build(build_args) => handle_build(build_args).await,
        Commands::Batch(batch_args) => handle_batch(batch_args, args.quiet).await,
        Commands::Resolve(resolve_args) => handle_resolve(resolve_args).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let mut config = config_from_env();
    if let Some(level_str) = &args.log_level {
        config.level = parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }
    init_logging(config);
}
