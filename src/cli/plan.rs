use super::ui;
use crate::core::squad::Squad;
use crate::core::task::{
    PlannedPlayer, TaskKind, TaskRequest, TrajectoryPlan, TrajectoryRequest,
};
use crate::task_client::{TaskClient, TaskState};
use anyhow::{Result, anyhow, bail};
use comfy_table::{Cell, CellAlignment};
use tracing::{debug, info};

/// Budget used when neither the caller nor the squad provides one.
pub const DEFAULT_BUDGET: f64 = 100.0;

pub fn trajectory_request(squad: &Squad, horizon: u32, budget: Option<f64>) -> TrajectoryRequest {
    let budget = budget.unwrap_or(if squad.is_empty() {
        DEFAULT_BUDGET
    } else {
        squad.total_budget()
    });
    TrajectoryRequest {
        budget,
        horizon,
        current_squad: (!squad.is_empty()).then(|| squad.players.clone()),
    }
}

fn names(players: &[PlannedPlayer]) -> String {
    if players.is_empty() {
        return "-".to_string();
    }
    players
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn display_plan(plan: &TrajectoryPlan) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("GW"),
        ui::header_cell("In"),
        ui::header_cell("Out"),
        ui::header_cell("Captain"),
        ui::header_cell("Predicted"),
    ]);
    for step in &plan.steps {
        table.add_row(vec![
            Cell::new(step.gameweek).set_alignment(CellAlignment::Right),
            Cell::new(names(&step.transfers_in)),
            Cell::new(names(&step.transfers_out)),
            Cell::new(step.captain.as_deref().unwrap_or("")),
            ui::format_optional_cell(step.predicted_points, |p| format!("{p:.1}")),
        ]);
    }

    let title = match plan.horizon {
        Some(h) => format!("Wildcard trajectory over {h} gameweeks"),
        None => "Wildcard trajectory".to_string(),
    };
    let total = plan
        .total_predicted_points
        .map_or("N/A".to_string(), |p| format!("{p:.1}"));
    format!(
        "{}\n\n{}\n\n{}: {}",
        ui::style_text(&title, ui::StyleType::Title),
        table,
        ui::style_text("Total predicted points", ui::StyleType::TotalLabel),
        ui::style_text(&total, ui::StyleType::TotalValue),
    )
}

/// Starts a trajectory task and follows it to the end. Ctrl-C stops
/// following the task.
pub async fn run(
    tasks: &TaskClient,
    squad: &Squad,
    horizon: u32,
    budget: Option<f64>,
) -> Result<()> {
    if horizon == 0 {
        bail!("The planning horizon must be at least one gameweek");
    }
    let request = TaskRequest::WildcardTrajectory(trajectory_request(squad, horizon, budget));
    let slot = tasks.slot::<TrajectoryPlan>(TaskKind::WildcardTrajectory);
    let task_id = slot.submit(&request).await?;

    let pb = ui::new_task_progress_bar(&format!("Planning wildcard ({task_id})"));
    let mut rx = slot.subscribe();
    let outcome = loop {
        let state = rx.borrow_and_update().clone();
        if let Some(progress) = state.progress() {
            pb.set_position(u64::from(progress));
        }
        if !state.is_busy() {
            break state;
        }
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break slot.state();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!(%task_id, "Interrupted");
                slot.cancel();
            }
        }
    };
    pb.finish_and_clear();

    match outcome {
        TaskState::Completed { result, .. } => {
            info!(%task_id, steps = result.steps.len(), "Trajectory ready");
            println!("{}", display_plan(&result));
            Ok(())
        }
        TaskState::Failed { error, .. } => Err(anyhow!("Trajectory planning failed: {error}")),
        TaskState::Cancelled => {
            println!(
                "{}",
                ui::style_text("Stopped following the trajectory task", ui::StyleType::Subtle)
            );
            Ok(())
        }
        TaskState::Idle | TaskState::Submitting | TaskState::Polling { .. } => {
            bail!("The trajectory task did not finish")
        }
    }
}
