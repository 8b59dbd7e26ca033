//! Squad model and the roster constraint checks.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Maximum number of players in a squad.
pub const SQUAD_SIZE: usize = 15;

/// Free transfers at or above this count call for a full rebuild instead of
/// incremental suggestions.
pub const REBUILD_THRESHOLD: u8 = 4;

pub const MIN_FREE_TRANSFERS: u8 = 1;
pub const MAX_FREE_TRANSFERS: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    #[serde(alias = "GKP")]
    GK,
    DEF,
    MID,
    FWD,
}

impl Position {
    pub const ALL: [Position; 4] = [Position::GK, Position::DEF, Position::MID, Position::FWD];

    /// Number of players of this position a squad may hold.
    pub fn cap(&self) -> usize {
        match self {
            Position::GK => 2,
            Position::DEF => 5,
            Position::MID => 5,
            Position::FWD => 3,
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Position::GK => "GK",
                Position::DEF => "DEF",
                Position::MID => "MID",
                Position::FWD => "FWD",
            }
        )
    }
}

impl FromStr for Position {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GK" | "GKP" => Ok(Position::GK),
            "DEF" => Ok(Position::DEF),
            "MID" => Ok(Position::MID),
            "FWD" => Ok(Position::FWD),
            _ => Err(anyhow::anyhow!("Invalid position: {}", s)),
        }
    }
}

/// A player owned by the squad.
///
/// `price` is the selling price: what the user gets back on a sale. It is
/// seeded from the market price when the player is added and edited
/// independently afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadPlayer {
    pub id: u32,
    pub name: String,
    pub position: Position,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    /// Availability flag reported by search, e.g. "a", "d", "i".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news: Option<String>,
}

/// Whether the advisor should propose a few transfers or a whole rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceMode {
    Incremental,
    Rebuild,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Squad {
    pub players: Vec<SquadPlayer>,
    pub bank: f64,
    pub free_transfers: u8,
}

impl Default for Squad {
    fn default() -> Self {
        Squad {
            players: Vec::new(),
            bank: 0.0,
            free_transfers: MIN_FREE_TRANSFERS,
        }
    }
}

impl Squad {
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn player(&self, id: u32) -> Option<&SquadPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_by_name(&self, name: &str) -> Option<&SquadPlayer> {
        self.players.iter().find(|p| p.name == name)
    }

    /// A full 15-man squad with every position at its cap.
    pub fn is_complete(&self) -> bool {
        self.len() == SQUAD_SIZE && Position::ALL.iter().all(|p| is_position_full(self, *p))
    }

    /// Sum of the selling prices of every owned player.
    pub fn squad_value(&self) -> f64 {
        self.players.iter().map(|p| p.price).sum()
    }

    pub fn total_budget(&self) -> f64 {
        self.squad_value() + self.bank
    }

    pub fn advice_mode(&self) -> AdviceMode {
        if self.free_transfers >= REBUILD_THRESHOLD {
            AdviceMode::Rebuild
        } else {
            AdviceMode::Incremental
        }
    }
}

pub fn position_count(squad: &Squad, position: Position) -> usize {
    squad
        .players
        .iter()
        .filter(|p| p.position == position)
        .count()
}

pub fn is_position_full(squad: &Squad, position: Position) -> bool {
    position_count(squad, position) >= position.cap()
}

/// True when `player` fits in `squad`: room left, position not full and not
/// already owned.
pub fn can_add(squad: &Squad, player: &SquadPlayer) -> bool {
    squad.len() < SQUAD_SIZE
        && !is_position_full(squad, player.position)
        && !squad.contains(player.id)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn player(id: u32, position: Position) -> SquadPlayer {
        SquadPlayer {
            id,
            name: format!("Player {id}"),
            position,
            price: 5.0,
            team: None,
            status: None,
            news: None,
        }
    }

    pub(crate) fn squad_of(players: Vec<SquadPlayer>) -> Squad {
        Squad {
            players,
            ..Squad::default()
        }
    }

    /// 2 GK, 5 DEF, 5 MID and `forwards` FWD with ids starting at 1.
    pub(crate) fn squad_with_forwards(forwards: usize) -> Squad {
        let mut players = Vec::new();
        let mut id = 1;
        for (position, count) in [
            (Position::GK, 2),
            (Position::DEF, 5),
            (Position::MID, 5),
            (Position::FWD, forwards),
        ] {
            for _ in 0..count {
                players.push(player(id, position));
                id += 1;
            }
        }
        squad_of(players)
    }

    #[test]
    fn test_position_count() {
        let squad = squad_with_forwards(1);
        assert_eq!(position_count(&squad, Position::GK), 2);
        assert_eq!(position_count(&squad, Position::DEF), 5);
        assert_eq!(position_count(&squad, Position::FWD), 1);
        assert!(is_position_full(&squad, Position::GK));
        assert!(!is_position_full(&squad, Position::FWD));
    }

    #[test]
    fn test_third_goalkeeper_rejected() {
        let squad = squad_of(vec![player(1, Position::GK), player(2, Position::GK)]);
        assert!(!can_add(&squad, &player(3, Position::GK)));
        assert!(can_add(&squad, &player(3, Position::DEF)));
    }

    #[test]
    fn test_second_forward_fills_squad() {
        let squad = squad_with_forwards(1);
        assert_eq!(squad.len(), 14);
        assert!(can_add(&squad, &player(100, Position::FWD)));
    }

    #[test]
    fn test_full_squad_rejects_everything() {
        let squad = squad_with_forwards(3);
        assert_eq!(squad.len(), SQUAD_SIZE);
        assert!(squad.is_complete());
        for position in Position::ALL {
            assert!(!can_add(&squad, &player(100, position)));
        }
    }

    #[test]
    fn test_duplicate_rejected() {
        let squad = squad_of(vec![player(7, Position::MID)]);
        assert!(!can_add(&squad, &player(7, Position::MID)));
        assert!(can_add(&squad, &player(8, Position::MID)));
    }

    #[test]
    fn test_can_add_truth_table() {
        // Exhaustive over small squads: can_add must agree with the three
        // rejection conditions.
        for gk in 0..=2 {
            for fwd in 0..=3 {
                let mut players = Vec::new();
                let mut id = 1;
                for _ in 0..gk {
                    players.push(player(id, Position::GK));
                    id += 1;
                }
                for _ in 0..fwd {
                    players.push(player(id, Position::FWD));
                    id += 1;
                }
                let squad = squad_of(players);
                for position in Position::ALL {
                    for candidate_id in [1, 99] {
                        let candidate = player(candidate_id, position);
                        let expected = squad.len() < SQUAD_SIZE
                            && position_count(&squad, position) < position.cap()
                            && !squad.contains(candidate_id);
                        assert_eq!(can_add(&squad, &candidate), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn test_advice_mode_threshold() {
        let mut squad = Squad::default();
        for ft in 1..REBUILD_THRESHOLD {
            squad.free_transfers = ft;
            assert_eq!(squad.advice_mode(), AdviceMode::Incremental);
        }
        squad.free_transfers = REBUILD_THRESHOLD;
        assert_eq!(squad.advice_mode(), AdviceMode::Rebuild);
    }

    #[test]
    fn test_budget_totals() {
        let mut squad = squad_of(vec![player(1, Position::GK), player(2, Position::MID)]);
        squad.bank = 1.5;
        assert!((squad.squad_value() - 10.0).abs() < 1e-9);
        assert!((squad.total_budget() - 11.5).abs() < 1e-9);
    }

    #[test]
    fn test_position_parsing() {
        assert_eq!("gkp".parse::<Position>().unwrap(), Position::GK);
        assert_eq!("Mid".parse::<Position>().unwrap(), Position::MID);
        assert!("striker".parse::<Position>().is_err());
        let parsed: Position = serde_json::from_str("\"GKP\"").unwrap();
        assert_eq!(parsed, Position::GK);
    }
}
