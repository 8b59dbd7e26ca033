use super::ui;
use crate::core::advisor::{AdviceRequest, AdvisorService, GameweekInfo, WildcardPlan};
use crate::core::squad::{AdviceMode, Squad};
use crate::core::suggestion::{
    ExpandedGroups, HoldAdvice, PlayerAnalysis, SuggestionBoard, SuggestionGroup, aggregate,
};
use anyhow::{Result, bail};
use comfy_table::{Cell, CellAlignment, Color};
use futures::future::join;
use tracing::{info, warn};

fn hold_text(hold: &HoldAdvice) -> String {
    let mut output = format!("{} {}", ui::style_text("Hold:", ui::StyleType::TotalLabel), hold.reason);
    for why in &hold.why {
        output.push_str(&format!("\n  - {why}"));
    }
    if let Some(alt) = &hold.best_alternative {
        let out = alt.out.as_ref().map_or("?", |p| p.name.as_str());
        let incoming = alt.incoming.as_ref().map_or("?", |p| p.name.as_str());
        let gain = alt
            .points_gain
            .map_or(String::new(), |g| format!(" ({g:+.1} pts)"));
        output.push_str(&ui::style_text(
            &format!("\n  Best alternative: {out} -> {incoming}{gain}"),
            ui::StyleType::Subtle,
        ));
    }
    output
}

fn group_text(group: &SuggestionGroup, expanded: &ExpandedGroups, bank: f64) -> String {
    let sell = group
        .selling_price
        .map_or(String::new(), |p| format!(" (sells for {})", ui::format_money(p)));
    let mut output = format!(
        "{} {}{}\n",
        ui::style_text("Out:", ui::StyleType::TotalLabel),
        ui::style_text(&group.outgoing.name, ui::StyleType::Title),
        sell
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("In"),
        ui::header_cell("Team"),
        ui::header_cell("Price"),
        ui::header_cell("Net cost"),
        ui::header_cell("Gain"),
        ui::header_cell("Priority"),
        ui::header_cell("Fixture"),
        ui::header_cell("Reason"),
    ]);
    for candidate in group.visible(expanded) {
        let net = group.net_cost(candidate);
        let net_cell = if group.is_affordable(candidate, bank) {
            ui::money_cell(net)
        } else {
            Cell::new(format!("{} !", ui::format_money(net)))
                .fg(Color::Red)
                .set_alignment(CellAlignment::Right)
        };
        table.add_row(vec![
            Cell::new(&candidate.incoming.name),
            Cell::new(candidate.incoming.team.as_deref().unwrap_or("")),
            ui::format_optional_cell(candidate.incoming.price, ui::format_money),
            net_cell,
            ui::gain_cell(candidate.points_gain),
            Cell::new(format!("{:.1}", candidate.priority_score))
                .set_alignment(CellAlignment::Right),
            ui::fixture_cell(candidate.incoming.fixture.as_deref(), candidate.incoming.fdr),
            Cell::new(&candidate.reason),
        ]);
    }
    output.push_str(&table.to_string());

    let hidden = group.candidates.len() - group.visible(expanded).len();
    if hidden > 0 {
        output.push_str(&ui::style_text(
            &format!("\n  + {hidden} more option(s), use --expand to compare"),
            ui::StyleType::Subtle,
        ));
    }
    output
}

fn analysis_table(analysis: &[PlayerAnalysis]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Player"),
        ui::header_cell("Predicted"),
        ui::header_cell("Fixture"),
        ui::header_cell("Risk"),
    ]);
    for player in analysis {
        table.add_row(vec![
            Cell::new(&player.name),
            ui::format_optional_cell(player.predicted_points, |p| format!("{p:.1}")),
            ui::fixture_cell(player.fixture.as_deref(), player.fdr),
            Cell::new(player.risk.as_deref().unwrap_or("")),
        ]);
    }
    table.to_string()
}

/// Renders a board. Expansion state is decided by the caller.
pub fn display_board(board: &SuggestionBoard, expanded: &ExpandedGroups, bank: f64) -> String {
    if board.is_empty() {
        return ui::style_text("No suggestions for this squad", ui::StyleType::Subtle);
    }
    let mut sections: Vec<String> = board.holds.iter().map(hold_text).collect();
    sections.extend(
        board
            .groups
            .iter()
            .map(|group| group_text(group, expanded, bank)),
    );
    sections.join("\n\n")
}

pub fn display_wildcard(plan: &WildcardPlan) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Out"),
        ui::header_cell("In"),
        ui::header_cell("Cost"),
        ui::header_cell("Gain"),
        ui::header_cell("Reason"),
    ]);
    for transfer in &plan.transfers {
        table.add_row(vec![
            Cell::new(&transfer.out.name),
            Cell::new(&transfer.incoming.name),
            ui::money_cell(transfer.cost),
            ui::gain_cell(transfer.points_gain),
            Cell::new(&transfer.reason),
        ]);
    }
    let mut output = format!(
        "{}\n\n{}",
        ui::style_text("Wildcard rebuild", ui::StyleType::Title),
        table
    );
    output.push_str(&format!(
        "\n\nTotal cost: {}  Points gain: {}  Bank after: {}",
        plan.total_cost.map_or("N/A".to_string(), ui::format_money),
        plan.points_gain
            .map_or("N/A".to_string(), |g| format!("{g:+.1}")),
        plan.remaining_bank.map_or("N/A".to_string(), ui::format_money),
    ));
    output
}

fn heading(gameweek: Result<GameweekInfo>) -> Option<String> {
    match gameweek {
        Ok(info) => info
            .next
            .or(info.current)
            .map(|gw| ui::style_text(&format!("Advice for GW{gw}"), ui::StyleType::Title)),
        Err(e) => {
            warn!(error = %e, "Failed to fetch gameweek");
            None
        }
    }
}

/// Asks the advisor for transfer advice suited to the squad's free transfer
/// count and prints it. Gameweek info is fetched alongside and only used for
/// the heading.
pub async fn run(advisor: &dyn AdvisorService, squad: &Squad, expand: bool) -> Result<()> {
    if squad.is_empty() {
        bail!("The squad is empty, add players first");
    }
    let request = AdviceRequest::from(squad);

    match squad.advice_mode() {
        AdviceMode::Rebuild => {
            info!(free_transfers = squad.free_transfers, "Requesting wildcard rebuild");
            let (gameweek, plan) = join(advisor.gameweek(), advisor.wildcard(&request)).await;
            let plan = plan?;
            if let Some(title) = heading(gameweek) {
                println!("{title}\n");
            }
            println!("{}", display_wildcard(&plan));
        }
        AdviceMode::Incremental => {
            let (gameweek, response) =
                join(advisor.gameweek(), advisor.transfer_suggestions(&request)).await;
            let response = response?;
            if let Some(title) = heading(gameweek) {
                println!("{title}\n");
            }
            let board = aggregate(&response.suggestions, squad);
            let mut expanded = ExpandedGroups::new();
            if expand {
                expanded.expand_all(&board);
            }
            println!("{}", display_board(&board, &expanded, squad.bank));
            if !response.squad_analysis.is_empty() {
                println!("\n{}", analysis_table(&response.squad_analysis));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::suggestion::{PlayerSnapshot, TransferAdvice, TransferSuggestion};

    fn transfer(out: &str, incoming: &str, priority: f64) -> TransferSuggestion {
        TransferSuggestion::Transfer(TransferAdvice {
            out: PlayerSnapshot {
                id: Some(1),
                name: out.to_string(),
                ..PlayerSnapshot::default()
            },
            incoming: PlayerSnapshot {
                name: incoming.to_string(),
                price: Some(6.0),
                ..PlayerSnapshot::default()
            },
            cost: 0.5,
            points_gain: 1.5,
            priority_score: priority,
            reason: "Form".to_string(),
            all_reasons: vec![],
        })
    }

    #[test]
    fn test_display_board_collapsed_and_expanded() {
        let suggestions = vec![transfer("Out", "First", 5.0), transfer("Out", "Second", 3.0)];
        let board = aggregate(&suggestions, &Squad::default());

        let collapsed = display_board(&board, &ExpandedGroups::new(), 1.0);
        assert!(collapsed.contains("First"));
        assert!(!collapsed.contains("Second"));
        assert!(collapsed.contains("1 more option(s)"));

        let mut expanded = ExpandedGroups::new();
        expanded.expand_all(&board);
        let full = display_board(&board, &expanded, 1.0);
        assert!(full.contains("Second"));
        assert!(!full.contains("more option(s)"));
    }

    #[test]
    fn test_heading_prefers_next_gameweek() {
        let info = GameweekInfo {
            current: Some(7),
            next: Some(8),
            deadline: None,
        };
        assert!(heading(Ok(info)).unwrap().contains("GW8"));
        assert!(heading(Err(anyhow::anyhow!("offline"))).is_none());
    }

    #[test]
    fn test_display_empty_board() {
        let board = SuggestionBoard::default();
        assert!(display_board(&board, &ExpandedGroups::new(), 0.0).contains("No suggestions"));
    }
}
