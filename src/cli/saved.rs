use super::ui;
use crate::core::advisor::{SavedSquad, SavedSquadRepository};
use crate::squad_store::SquadStore;
use anyhow::{Result, bail};
use comfy_table::{Cell, CellAlignment};
use tracing::info;

pub fn display_saved(squads: &[SavedSquad]) -> String {
    if squads.is_empty() {
        return ui::style_text("No saved squads", ui::StyleType::Subtle);
    }
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Name"),
        ui::header_cell("Players"),
        ui::header_cell("Bank"),
        ui::header_cell("FT"),
        ui::header_cell("Updated"),
    ]);
    for saved in squads {
        table.add_row(vec![
            Cell::new(&saved.name),
            Cell::new(saved.players.len()).set_alignment(CellAlignment::Right),
            ui::money_cell(saved.bank),
            Cell::new(saved.free_transfers).set_alignment(CellAlignment::Right),
            ui::format_optional_cell(saved.updated_at, |d| {
                d.format("%Y-%m-%d %H:%M").to_string()
            }),
        ]);
    }
    table.to_string()
}

pub async fn list(repo: &dyn SavedSquadRepository) -> Result<()> {
    let squads = repo.list().await?;
    println!("{}", display_saved(&squads));
    Ok(())
}

/// Saves the working squad under `name`, overwriting an existing entry.
pub async fn save(repo: &dyn SavedSquadRepository, store: &SquadStore, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("A saved squad needs a name");
    }
    let squad = SavedSquad::from_squad(name, store.squad());
    let exists = repo.list().await?.iter().any(|s| s.name == name);
    let saved = if exists {
        repo.update(&squad).await?
    } else {
        repo.create(&squad).await?
    };
    info!(name = %saved.name, updated = exists, "Saved squad");
    println!("Saved \"{}\" ({} players)", saved.name, saved.players.len());
    Ok(())
}

/// Replaces the working squad with a saved one.
pub async fn load(
    repo: &dyn SavedSquadRepository,
    store: &mut SquadStore,
    name: &str,
) -> Result<()> {
    let squads = repo.list().await?;
    let Some(saved) = squads.into_iter().find(|s| s.name == name) else {
        bail!("No saved squad named \"{name}\"");
    };
    store.replace(saved.to_squad());
    println!("Loaded \"{name}\"");
    super::squad::show(store)
}

pub async fn delete(repo: &dyn SavedSquadRepository, name: &str) -> Result<()> {
    repo.delete(name).await?;
    println!("Deleted \"{name}\"");
    Ok(())
}
