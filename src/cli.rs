use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "larder",
    about = "Full-text search and HTML rendering for your recipe library"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Bring the search index up to date with the library
    Index,
    /// Search the library
    Search(SearchArgs),
    /// Show the number of recipes and their total size
    Stats(StatsArgs),
    /// Render recipe bodies to the HTML cache
    Render(RenderArgs),
    /// Remove a recipe from the search index
    Remove {
        /// Recipe id (file name without extension)
        id: String,
    },
    /// Print a parsed recipe
    Show(ShowArgs),
    /// Convert legacy recipes to the structured format
    Convert(ConvertArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Search terms. Every term is required unless prefixed with `~`;
    /// prefix with `-` to exclude.
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    pub terms: Vec<String>,

    /// Maximum number of results (defaults to max_results from config.toml)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    pub fn query(&self) -> String {
        self.terms.join(" ")
    }
}

// -- Stats --

#[derive(Debug, Parser)]
pub struct StatsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Render --

#[derive(Debug, Parser)]
pub struct RenderArgs {
    /// Recipes to render; all when omitted
    pub ids: Vec<String>,
}

// -- Show --

#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Recipe id (file name without extension)
    pub id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Convert --

#[derive(Debug, Parser)]
pub struct ConvertArgs {
    /// Write `<id>.yaml` files instead of printing them
    #[arg(long)]
    pub write: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "larder",
            &mut std::io::stdout(),
        );
    }
}
