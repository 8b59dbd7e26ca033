//! Remote advisor contracts: player search, gameweek info, transfer advice
//! and saved squads.

use crate::core::lenient;
use crate::core::squad::{Position, Squad, SquadPlayer};
use crate::core::suggestion::{SuggestionResponse, TransferAdvice};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A search hit. `price` is the market price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPlayer {
    pub id: u32,
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub team: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub predicted_points: Option<f64>,
    #[serde(default)]
    pub form: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub news: Option<String>,
}

impl SearchPlayer {
    /// The squad entry for this player, with the selling price seeded from
    /// the market price.
    pub fn to_squad_player(&self) -> SquadPlayer {
        SquadPlayer {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            price: crate::core::money::seed_selling_price(self.price),
            team: self.team.clone(),
            status: self.status.clone(),
            news: self.news.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameweekInfo {
    #[serde(default)]
    pub current: Option<u32>,
    #[serde(default)]
    pub next: Option<u32>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchQuery {
    pub text: String,
    pub position: Option<Position>,
    pub limit: Option<u32>,
}

/// Body of the suggestion and wildcard requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdviceRequest {
    pub squad: Vec<SquadPlayer>,
    pub bank: f64,
    pub free_transfers: u8,
}

impl From<&Squad> for AdviceRequest {
    fn from(squad: &Squad) -> Self {
        AdviceRequest {
            squad: squad.players.clone(),
            bank: squad.bank,
            free_transfers: squad.free_transfers,
        }
    }
}

/// A full rebuild proposal for 4+ transfers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildcardPlan {
    #[serde(default)]
    pub transfers: Vec<TransferAdvice>,
    #[serde(default)]
    pub total_cost: Option<f64>,
    #[serde(default)]
    pub points_gain: Option<f64>,
    #[serde(default)]
    pub remaining_bank: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSquad {
    pub name: String,
    #[serde(default)]
    pub players: Vec<SquadPlayer>,
    #[serde(default)]
    pub bank: f64,
    #[serde(default = "default_free_transfers")]
    pub free_transfers: u8,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_free_transfers() -> u8 {
    crate::core::squad::MIN_FREE_TRANSFERS
}

impl SavedSquad {
    pub fn from_squad(name: &str, squad: &Squad) -> Self {
        SavedSquad {
            name: name.to_string(),
            players: squad.players.clone(),
            bank: squad.bank,
            free_transfers: squad.free_transfers,
            updated_at: None,
        }
    }

    pub fn to_squad(&self) -> Squad {
        Squad {
            players: self.players.clone(),
            bank: self.bank,
            free_transfers: self.free_transfers,
        }
    }
}

#[async_trait]
pub trait AdvisorService: Send + Sync {
    async fn gameweek(&self) -> Result<GameweekInfo>;
    async fn search_players(&self, query: &SearchQuery) -> Result<Vec<SearchPlayer>>;
    async fn transfer_suggestions(&self, request: &AdviceRequest) -> Result<SuggestionResponse>;
    async fn wildcard(&self, request: &AdviceRequest) -> Result<WildcardPlan>;
}

#[async_trait]
pub trait SavedSquadRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<SavedSquad>>;
    async fn create(&self, squad: &SavedSquad) -> Result<SavedSquad>;
    async fn update(&self, squad: &SavedSquad) -> Result<SavedSquad>;
    async fn delete(&self, name: &str) -> Result<()>;
}
