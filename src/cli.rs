use crate::io::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Machine-readable topology report
    Json,
    /// Graphviz digraph
    Dot,
    /// Colored summary
    Terminal,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Dot => OutputFormat::Dot,
            FormatArg::Terminal => OutputFormat::Terminal,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "lambdamap")]
#[command(about = "Discover and lay out the topology of a serverless function fleet", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover functions, their relationships and inferred code dependencies
    Discover {
        /// Inventory snapshot of the region's function metadata (JSON)
        #[arg(short, long, env = "LAMBDAMAP_INVENTORY")]
        inventory: PathBuf,

        /// Configuration file (defaults to the nearest .lambdamap.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format (defaults to the configured format, then terminal)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip downloading and scanning deployment packages
        #[arg(long = "no-code-analysis")]
        no_code_analysis: bool,

        /// Skip the layered layout
        #[arg(long = "no-layout")]
        no_layout: bool,

        /// Items per listing page
        #[arg(long = "page-size", default_value = "50")]
        page_size: usize,

        /// Disable colored output
        #[arg(long)]
        plain: bool,

        /// Increase verbosity level (can be repeated: -v, -vv, -vvv)
        #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
        verbosity: u8,
    },

    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}
