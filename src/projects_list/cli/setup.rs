use clap::{Args, Parser, Subcommand};
use projects_list::model::Column;
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "projects-list", bin_name = "projects-list", version = get_version())]
#[command(about = "Sortable, paginated project tables for markdown vaults", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault directory (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR", help_heading = "Options")]
    pub vault: Option<PathBuf>,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

/// Identifies the table: the hosting document and, optionally, its input block.
#[derive(Args, Debug, Clone)]
pub struct TableArgs {
    /// Hosting document: a vault-relative path or a unique basename
    pub host: String,

    /// Document names to list instead of the host's input block
    #[arg(long, value_name = "NAMES")]
    pub names: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the table
    Show {
        #[command(flatten)]
        table: TableArgs,

        /// Print the current page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Click a column header: same column flips direction, another sorts ascending
    Sort {
        #[command(flatten)]
        table: TableArgs,

        /// Column label or slug (e.g. "Tasks Done", tasks-done, updated)
        #[arg(value_parser = parse_column)]
        column: Column,
    },

    /// Change the page size and go back to the first page
    PageSize {
        #[command(flatten)]
        table: TableArgs,

        /// Rows per page (25, 50, 100 and 300 are the usual choices)
        size: usize,
    },

    /// Go to the next page
    Next {
        #[command(flatten)]
        table: TableArgs,
    },

    /// Go to the previous page
    Prev {
        #[command(flatten)]
        table: TableArgs,
    },

    /// Print the path of the document on a row of the current page
    Path {
        #[command(flatten)]
        table: TableArgs,

        /// Row number as shown in the № column of the current page (1-based)
        row: usize,
    },

    /// Re-render whenever a listed document changes
    Watch {
        #[command(flatten)]
        table: TableArgs,

        /// Stop after this many wait intervals
        #[arg(long, hide = true)]
        ticks: Option<usize>,
    },

    /// Show the effective configuration
    Config {
        /// Print a commented template with every setting instead
        #[arg(long)]
        template: bool,
    },
}

fn parse_column(s: &str) -> Result<Column, String> {
    s.parse::<Column>().map_err(|e| e.to_string())
}
