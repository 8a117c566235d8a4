use clap::{Parser, Subcommand, ValueEnum};
use diagnostics_engine::SortKey;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cclens",
    version,
    about = "Browse CodeChecker analysis results",
    long_about = "Loads a CodeChecker output folder and lists its diagnostics and their reproduction paths."
)]
pub struct LensCli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// CodeChecker output folder, overrides the configured one
    #[arg(short, long, global = true, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Write JSON logs to this directory instead of STDERR
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl LensCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the analyzer run and its bug count
    Summary,
    /// List the diagnostics reaching the given source files
    Bugs {
        /// Source files to open
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the reproduction path of each diagnostic
        #[arg(long, default_value_t = false)]
        steps: bool,

        /// Print editor diagnostics as JSON instead of a listing
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Expand the reproduction path of this diagnostic of the first file
        #[arg(long, value_name = "INDEX")]
        expand: Option<usize>,
    },
    /// List every diagnostic of the run, grouped
    List {
        #[arg(long, value_enum, default_value_t = SortArg::Filename)]
        sort: SortArg,
    },
    /// Resolve where a diagnostic or one of its steps is located
    Jump {
        file: PathBuf,
        bug: usize,
        step: Option<usize>,
    },
    /// Reload the output folder and print every emitted event as a JSON line
    Reload,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortArg {
    Filename,
    ReprPath,
    Analyzer,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Filename => SortKey::FileName,
            SortArg::ReprPath => SortKey::ReproPathLength,
            SortArg::Analyzer => SortKey::Analyzer,
        }
    }
}
