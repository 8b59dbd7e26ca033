use super::ui;
use crate::core::advisor::{AdvisorService, GameweekInfo, SearchPlayer, SearchQuery};
use crate::core::money;
use crate::core::squad::{self, AdviceMode, Position, Squad};
use crate::squad_store::SquadStore;
use anyhow::{Result, bail};
use comfy_table::{Cell, CellAlignment};

impl Squad {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Pos"),
            ui::header_cell("ID"),
            ui::header_cell("Player"),
            ui::header_cell("Team"),
            ui::header_cell("Selling price"),
            ui::header_cell("Status"),
        ]);

        let mut players: Vec<_> = self.players.iter().collect();
        players.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        for player in players {
            table.add_row(vec![
                Cell::new(player.position),
                Cell::new(player.id).set_alignment(CellAlignment::Right),
                Cell::new(&player.name),
                Cell::new(player.team.as_deref().unwrap_or("")),
                ui::money_cell(player.price),
                Cell::new(player.news.as_deref().or(player.status.as_deref()).unwrap_or("")),
            ]);
        }

        let counts = Position::ALL
            .iter()
            .map(|p| format!("{p} {}/{}", squad::position_count(self, *p), p.cap()))
            .collect::<Vec<_>>()
            .join("  ");
        let mode = match self.advice_mode() {
            AdviceMode::Incremental => "transfer suggestions",
            AdviceMode::Rebuild => "wildcard rebuild",
        };

        let mut output = format!(
            "Squad: {}\n\n",
            ui::style_text(
                &format!("{}/{} players", self.len(), squad::SQUAD_SIZE),
                ui::StyleType::Title
            )
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{}\nSquad value: {}  Bank: {}  {}: {}\nFree transfers: {} ({})",
            ui::style_text(&counts, ui::StyleType::Subtle),
            ui::format_money(self.squad_value()),
            ui::format_money(self.bank),
            ui::style_text("Total budget", ui::StyleType::TotalLabel),
            ui::style_text(&ui::format_money(self.total_budget()), ui::StyleType::TotalValue),
            self.free_transfers,
            mode,
        ));
        output
    }
}

fn search_table(players: &[SearchPlayer], squad: &SquadStore) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Player"),
        ui::header_cell("Pos"),
        ui::header_cell("Team"),
        ui::header_cell("Price"),
        ui::header_cell("Predicted"),
        ui::header_cell("Form"),
        ui::header_cell(""),
    ]);
    for player in players {
        let note = if squad.squad().contains(player.id) {
            "owned"
        } else if !squad.can_add(player) {
            "no room"
        } else {
            ""
        };
        table.add_row(vec![
            Cell::new(player.id).set_alignment(CellAlignment::Right),
            Cell::new(&player.name),
            Cell::new(player.position),
            Cell::new(player.team.as_deref().unwrap_or("")),
            ui::money_cell(player.price),
            ui::format_optional_cell(player.predicted_points, |p| format!("{p:.1}")),
            ui::format_optional_cell(player.form, |f| format!("{f:.1}")),
            Cell::new(note),
        ]);
    }
    table.to_string()
}

pub fn show(store: &SquadStore) -> Result<()> {
    println!("{}", store.squad().display_as_table());
    Ok(())
}

pub async fn gameweek(advisor: &dyn AdvisorService) -> Result<()> {
    let info = advisor.gameweek().await?;
    println!("{}", describe_gameweek(&info));
    Ok(())
}

fn describe_gameweek(info: &GameweekInfo) -> String {
    let current = info
        .current
        .map_or("N/A".to_string(), |gw| format!("GW{gw}"));
    let next = info.next.map_or("N/A".to_string(), |gw| format!("GW{gw}"));
    let deadline = info.deadline.map_or("N/A".to_string(), |d| {
        d.format("%a %d %b %H:%M UTC").to_string()
    });
    format!("Current: {current}  Next: {next}  Deadline: {deadline}")
}

pub async fn search(
    advisor: &dyn AdvisorService,
    store: &SquadStore,
    query: &SearchQuery,
) -> Result<()> {
    let players = advisor.search_players(query).await?;
    if players.is_empty() {
        println!("No players match \"{}\"", query.text);
        return Ok(());
    }
    println!("{}", search_table(&players, store));
    Ok(())
}

/// Adds the best search hit that fits the squad.
pub async fn add(
    advisor: &dyn AdvisorService,
    store: &mut SquadStore,
    query: &SearchQuery,
) -> Result<()> {
    let players = advisor.search_players(query).await?;
    let Some(first) = players.first() else {
        bail!("No players match \"{}\"", query.text);
    };
    let Some(candidate) = players.iter().find(|p| store.can_add(p)) else {
        bail!(
            "{} cannot be added: squad is full, the {} slots are taken or the player is already owned",
            first.name,
            first.position
        );
    };
    store.add_player(candidate);
    println!(
        "Added {} ({}, {}) at {}",
        candidate.name,
        candidate.position,
        candidate.team.as_deref().unwrap_or("?"),
        ui::format_money(money::seed_selling_price(candidate.price))
    );
    show(store)
}

pub fn remove(store: &mut SquadStore, id: u32) -> Result<()> {
    let Some(name) = store.squad().player(id).map(|p| p.name.clone()) else {
        bail!("Player {id} is not in the squad");
    };
    store.remove_player(id);
    println!("Removed {name}");
    show(store)
}

pub fn set_price(store: &mut SquadStore, id: u32, input: &str) -> Result<()> {
    if !store.set_player_price(id, money::parse_money(input)) {
        bail!("Player {id} is not in the squad");
    }
    show(store)
}

pub fn set_bank(store: &mut SquadStore, input: &str) -> Result<()> {
    store.set_bank(money::parse_money(input));
    show(store)
}

pub fn set_free_transfers(store: &mut SquadStore, input: &str) -> Result<()> {
    store.set_free_transfers(money::parse_free_transfers(input) as i64);
    show(store)
}

pub fn clear(store: &mut SquadStore) -> Result<()> {
    store.clear();
    show(store)
}
