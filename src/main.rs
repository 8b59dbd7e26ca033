use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use squadplan::core::log::init_logging;
use squadplan::core::squad::Position;
use squadplan::{AppCommand, SavedCommand};

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

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the working squad
    Show,
    /// Display the current and next gameweek
    Gameweek,
    /// Search players by name
    Search {
        query: String,
        /// Only players in this position (GK, DEF, MID, FWD)
        #[arg(short, long)]
        position: Option<Position>,
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Add the best matching player that fits the squad
    Add {
        query: String,
        #[arg(short, long)]
        position: Option<Position>,
    },
    /// Remove a player by id
    Remove { id: u32 },
    /// Set a player's selling price, in millions
    Price { id: u32, value: String },
    /// Set the bank balance, in millions
    Bank { value: String },
    /// Set the number of free transfers
    Transfers { count: String },
    /// Remove every player from the squad
    Clear,
    /// Get transfer advice for the squad
    Suggest {
        /// Show every alternative for each outgoing player
        #[arg(short, long)]
        expand: bool,
    },
    /// Plan a wildcard over several gameweeks
    Plan {
        #[arg(long, default_value_t = 5)]
        horizon: u32,
        /// Budget in millions; defaults to squad value plus bank
        #[arg(short, long)]
        budget: Option<f64>,
    },
    /// Manage saved squads
    #[command(subcommand)]
    Saved(SavedCommands),
}

#[derive(Subcommand)]
enum SavedCommands {
    /// List saved squads
    List,
    /// Save the working squad
    Save { name: String },
    /// Replace the working squad with a saved one
    Load { name: String },
    /// Delete a saved squad
    Delete { name: String },
}

impl From<SavedCommands> for SavedCommand {
    fn from(cmd: SavedCommands) -> SavedCommand {
        match cmd {
            SavedCommands::List => SavedCommand::List,
            SavedCommands::Save { name } => SavedCommand::Save { name },
            SavedCommands::Load { name } => SavedCommand::Load { name },
            SavedCommands::Delete { name } => SavedCommand::Delete { name },
        }
    }
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Show => AppCommand::Show,
            Commands::Gameweek => AppCommand::Gameweek,
            Commands::Search {
                query,
                position,
                limit,
            } => AppCommand::Search {
                query,
                position,
                limit,
            },
            Commands::Add { query, position } => AppCommand::Add { query, position },
            Commands::Remove { id } => AppCommand::Remove { id },
            Commands::Price { id, value } => AppCommand::Price { id, value },
            Commands::Bank { value } => AppCommand::Bank { value },
            Commands::Transfers { count } => AppCommand::Transfers { count },
            Commands::Clear => AppCommand::Clear,
            Commands::Suggest { expand } => AppCommand::Suggest { expand },
            Commands::Plan { horizon, budget } => AppCommand::Plan { horizon, budget },
            Commands::Saved(cmd) => AppCommand::Saved(cmd.into()),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => squadplan::cli::setup::setup_at_path(path),
            None => squadplan::cli::setup::setup(),
        },
        Some(cmd) => squadplan::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
