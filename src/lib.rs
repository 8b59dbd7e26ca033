pub mod cli;
pub mod core;
pub mod providers;
pub mod squad_store;
pub mod store;
pub mod task_client;

use crate::core::advisor::SearchQuery;
use crate::core::config::AppConfig;
use crate::core::squad::Position;
use crate::providers::HttpAdvisor;
use crate::squad_store::SquadStore;
use crate::task_client::TaskClient;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum SavedCommand {
    List,
    Save { name: String },
    Load { name: String },
    Delete { name: String },
}

pub enum AppCommand {
    Show,
    Gameweek,
    Search {
        query: String,
        position: Option<Position>,
        limit: Option<u32>,
    },
    Add {
        query: String,
        position: Option<Position>,
    },
    Remove {
        id: u32,
    },
    Price {
        id: u32,
        value: String,
    },
    Bank {
        value: String,
    },
    Transfers {
        count: String,
    },
    Clear,
    Suggest {
        expand: bool,
    },
    Plan {
        horizon: u32,
        budget: Option<f64>,
    },
    Saved(SavedCommand),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("squadplan starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let mut store = SquadStore::open(store::open_draft_store(&config));
    let advisor = Arc::new(HttpAdvisor::new(
        &config.service.base_url,
        config.service.request_timeout(),
    )?);

    match command {
        AppCommand::Show => cli::squad::show(&store),
        AppCommand::Gameweek => cli::squad::gameweek(advisor.as_ref()).await,
        AppCommand::Search {
            query,
            position,
            limit,
        } => {
            let query = SearchQuery {
                text: query,
                position,
                limit,
            };
            cli::squad::search(advisor.as_ref(), &store, &query).await
        }
        AppCommand::Add { query, position } => {
            let query = SearchQuery {
                text: query,
                position,
                limit: None,
            };
            cli::squad::add(advisor.as_ref(), &mut store, &query).await
        }
        AppCommand::Remove { id } => cli::squad::remove(&mut store, id),
        AppCommand::Price { id, value } => cli::squad::set_price(&mut store, id, &value),
        AppCommand::Bank { value } => cli::squad::set_bank(&mut store, &value),
        AppCommand::Transfers { count } => cli::squad::set_free_transfers(&mut store, &count),
        AppCommand::Clear => cli::squad::clear(&mut store),
        AppCommand::Suggest { expand } => {
            cli::suggest::run(advisor.as_ref(), store.squad(), expand).await
        }
        AppCommand::Plan { horizon, budget } => {
            let tasks = TaskClient::new(advisor.clone(), config.tasks.poll_config());
            cli::plan::run(&tasks, store.squad(), horizon, budget).await
        }
        AppCommand::Saved(command) => match command {
            SavedCommand::List => cli::saved::list(advisor.as_ref()).await,
            SavedCommand::Save { name } => {
                cli::saved::save(advisor.as_ref(), &store, &name).await
            }
            SavedCommand::Load { name } => {
                cli::saved::load(advisor.as_ref(), &mut store, &name).await
            }
            SavedCommand::Delete { name } => cli::saved::delete(advisor.as_ref(), &name).await,
        },
    }
}
