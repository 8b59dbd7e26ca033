//! The in-progress squad draft and the port it is persisted through.

use crate::core::squad::{Squad, SquadPlayer};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed key the draft is stored under.
pub const DRAFT_KEY: &str = "draft";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub players: Vec<SquadPlayer>,
    pub bank: f64,
    pub free_transfers: u8,
    pub updated_at: DateTime<Utc>,
}

impl Draft {
    pub fn capture(squad: &Squad) -> Self {
        Draft {
            players: squad.players.clone(),
            bank: squad.bank,
            free_transfers: squad.free_transfers,
            updated_at: Utc::now(),
        }
    }

    pub fn into_squad(self) -> Squad {
        Squad {
            players: self.players,
            bank: self.bank,
            free_transfers: self.free_transfers,
        }
    }
}

/// Durable storage for a single draft record.
pub trait DraftStore: Send + Sync {
    fn load(&self) -> Result<Option<Draft>>;
    fn save(&self, draft: &Draft) -> Result<()>;
    fn clear(&self) -> Result<()>;
}
