use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "system-finder")]
#[command(about = "Find Bevy ECS systems by how their parameters access components, resources and events")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Source roots to index; defaults to the current directory.
    #[arg(long = "path", value_name = "DIR", global = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Find {
        /// Query string; see `system-finder syntax` for the token language.
        #[arg(allow_hyphen_values = true)]
        query: String,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    List,
    Stats,
    /// Print the query-language reference.
    Syntax,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
    Code,
}
