use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fnav::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fnav::AppCommand {
    fn from(cmd: Commands) -> fnav::AppCommand {
        match cmd {
            Commands::Add { codes } => fnav::AppCommand::Add { codes },
            Commands::Remove { codes } => fnav::AppCommand::Remove { codes },
            Commands::List => fnav::AppCommand::List,
            Commands::Watch => fnav::AppCommand::Watch,
            Commands::Search { query, add } => fnav::AppCommand::Search { query, add },
            Commands::Fav { code } => fnav::AppCommand::Fav { code },
            Commands::Expand { code } => fnav::AppCommand::Expand { code },
            Commands::View { mode } => fnav::AppCommand::View { mode },
            Commands::Interval { ms } => fnav::AppCommand::Interval { ms },
            Commands::Export { path } => fnav::AppCommand::Export { path },
            Commands::Import { path } => fnav::AppCommand::Import { path },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Add funds to the watchlist by code
    Add {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Remove funds from the watchlist
    Remove {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Refresh once and display the watchlist
    List,
    /// Refresh and display periodically
    Watch,
    /// Search funds by name or code
    Search {
        query: String,
        /// Add all matches to the watchlist
        #[arg(long)]
        add: bool,
    },
    /// Toggle a fund's favorite flag
    Fav { code: String },
    /// Toggle a fund's holdings display
    Expand { code: String },
    /// Set the display layout (table|card)
    View { mode: String },
    /// Set the refresh interval in milliseconds (minimum 5000)
    Interval { ms: u64 },
    /// Export the watchlist to a JSON bundle
    Export { path: Option<String> },
    /// Merge a JSON bundle into the watchlist
    Import { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fnav::cli::setup::setup(),
        Some(cmd) => fnav::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
