use crate::config::AdvisorKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Build-system detection and orchestration for checked-out C/C++ projects
#[derive(Parser, Debug)]
#[command(
    name = "buildsieve",
    about = "Detect the build system of checked-out projects and build them",
    version,
    author,
    long_about = "buildsieve inspects source trees for toolchain signal files, runs the \
                  canonical build sequence of the highest-priority match, extracts missing \
                  headers from failed builds and retries after remediation. Batches of \
                  projects are built in parallel with aggregate statistics."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "List applicable build strategies for a project",
        long_about = "Checks the project for signal files and prints every strategy that \
                      applies, highest priority first. No commands are run.\n\n\
                      Examples:\n  \
                      buildsieve detect\n  \
                      buildsieve detect /path/to/repo --format json"
    )]
    Detect(DetectArgs),

    #[command(
        about = "Build one project with remediation",
        long_about = "Builds the project with the highest-priority strategy, retrying after \
                      remediation when headers are missing.\n\n\
                      Exit codes: 0 on success, 2 on build failure or when no build system \
                      is detected, 1 on configuration errors.\n\n\
                      Examples:\n  \
                      buildsieve build /path/to/repo\n  \
                      buildsieve build . --advisor none --max-attempts 1"
    )]
    Build(BuildArgs),

    #[command(
        about = "Build every project under a directory",
        long_about = "Builds each immediate subdirectory of REPOS_DIR on a worker pool and \
                      reports aggregate statistics.\n\n\
                      Examples:\n  \
                      buildsieve batch ./repos --jobs 8\n  \
                      buildsieve batch ./repos --output results.json"
    )]
    Batch(BatchArgs),

    #[command(
        about = "Check which packages provide the given headers",
        long_about = "Guesses a development package for each header and checks whether the \
                      package manager knows it.\n\n\
                      Examples:\n  \
                      buildsieve resolve zlib.h openssl/ssl.h"
    )]
    Resolve(ResolveArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct DetectArgs {
    #[arg(value_name = "PATH", help = "Project directory (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,

    #[arg(long, value_name = "DEPTH", help = "Maximum directory depth searched for .sln files")]
    pub solution_depth: Option<usize>,
}

/// Overrides shared by `build` and `batch`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[arg(long, value_name = "N", help = "Maximum build attempts per project")]
    pub max_attempts: Option<usize>,

    #[arg(long, value_name = "SECONDS", help = "Per-command timeout (0 disables)")]
    pub timeout: Option<u64>,

    #[arg(long, value_parser = parse_advisor, help = "Remediation advisor: none, heuristic, llm, chain")]
    pub advisor: Option<AdvisorKind>,

    #[arg(long, help = "Do not build other detected strategies after a failure")]
    pub no_probe: bool,

    #[arg(long, value_name = "DIR", help = "Append command transcripts to DIR/<project>_build.log")]
    pub transcript_dir: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[arg(value_name = "PATH", help = "Project directory (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,

    #[arg(long, help = "Include the full build output in the report")]
    pub show_output: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct BatchArgs {
    #[arg(value_name = "REPOS_DIR", help = "Directory holding one checked-out project per subdirectory")]
    pub repos_dir: PathBuf,

    #[arg(short = 'j', long, value_name = "N", help = "Number of projects built concurrently")]
    pub jobs: Option<usize>,

    #[command(flatten)]
    pub run: RunArgs,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write all reports and the summary as JSON to FILE"
    )]
    pub output: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Summary output format")]
    pub format: OutputFormatArg,

    #[arg(long, help = "Disable the progress bar")]
    pub no_progress: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ResolveArgs {
    #[arg(value_name = "HEADER", required = true, help = "Header names, e.g. zlib.h")]
    pub headers: Vec<String>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_advisor(s: &str) -> Result<AdvisorKind, String> {
    s.parse::<AdvisorKind>().map_err(|e| e.to_string())
}
