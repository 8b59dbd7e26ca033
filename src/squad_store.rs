//! The single writer of the user's roster, bank and free transfers.

use crate::core::advisor::SearchPlayer;
use crate::core::draft::{Draft, DraftStore};
use crate::core::money;
use crate::core::squad::{self, Squad};
use std::sync::Arc;
use tracing::{debug, warn};

/// Owns the squad being planned and mirrors every change into the draft.
///
/// Invalid changes (a full position, a duplicate, an unknown id) are ignored
/// rather than reported; callers are expected to check `can_add` first.
/// Every method that changes state returns whether it did.
pub struct SquadStore {
    squad: Squad,
    draft: Arc<dyn DraftStore>,
}

impl SquadStore {
    /// Opens the store, restoring the last saved draft if there is one.
    pub fn open(draft: Arc<dyn DraftStore>) -> Self {
        let squad = match draft.load() {
            Ok(Some(saved)) => {
                debug!(
                    players = saved.players.len(),
                    updated_at = %saved.updated_at,
                    "Restored squad draft"
                );
                sanitize(saved.into_squad())
            }
            Ok(None) => Squad::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read squad draft, starting empty");
                Squad::default()
            }
        };
        Self { squad, draft }
    }

    pub fn squad(&self) -> &Squad {
        &self.squad
    }

    pub fn can_add(&self, player: &SearchPlayer) -> bool {
        squad::can_add(&self.squad, &player.to_squad_player())
    }

    pub fn add_player(&mut self, player: &SearchPlayer) -> bool {
        let entry = player.to_squad_player();
        if !squad::can_add(&self.squad, &entry) {
            debug!(id = player.id, position = %player.position, "Ignoring invalid add");
            return false;
        }
        debug!(id = entry.id, price = entry.price, "Adding player");
        self.squad.players.push(entry);
        self.persist();
        true
    }

    pub fn remove_player(&mut self, id: u32) -> bool {
        let before = self.squad.len();
        self.squad.players.retain(|p| p.id != id);
        if self.squad.len() == before {
            return false;
        }
        debug!(id, "Removed player");
        self.persist();
        true
    }

    /// Sets a player's selling price. Invalid values become 0.
    pub fn set_player_price(&mut self, id: u32, value: f64) -> bool {
        let price = money::normalize_price(value);
        match self.squad.players.iter_mut().find(|p| p.id == id) {
            Some(player) => {
                player.price = price;
                self.persist();
                true
            }
            None => false,
        }
    }

    pub fn set_bank(&mut self, value: f64) {
        let bank = money::normalize_bank(value);
        if bank < 0.0 {
            warn!(bank, "Bank balance is negative");
        }
        self.squad.bank = bank;
        self.persist();
    }

    /// Sets the free transfer count. Four or more means the next advice
    /// request should be a rebuild; see `Squad::advice_mode`.
    pub fn set_free_transfers(&mut self, count: i64) {
        self.squad.free_transfers = money::normalize_free_transfers(count);
        self.persist();
    }

    /// Empties the roster. Bank and free transfers stay.
    pub fn clear(&mut self) {
        self.squad.players.clear();
        self.persist();
    }

    /// Replaces the whole squad, e.g. when loading a saved one. Players that
    /// would break the roster rules are dropped.
    pub fn replace(&mut self, squad: Squad) {
        self.squad = sanitize(squad);
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.draft.save(&Draft::capture(&self.squad)) {
            warn!(error = %e, "Failed to write squad draft");
        }
    }
}

fn sanitize(squad: Squad) -> Squad {
    let mut clean = Squad {
        players: Vec::with_capacity(squad.players.len()),
        bank: money::normalize_bank(squad.bank),
        free_transfers: money::normalize_free_transfers(squad.free_transfers as i64),
    };
    for mut player in squad.players {
        if squad::can_add(&clean, &player) {
            player.price = money::normalize_price(player.price);
            clean.players.push(player);
        } else {
            warn!(id = player.id, name = %player.name, "Dropping player that breaks squad rules");
        }
    }
    clean
}
