//! Server-tracked background jobs.

use crate::core::lenient;
use crate::core::squad::SquadPlayer;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    WildcardTrajectory,
    CaptaincyAnalysis,
    DailySnapshot,
    SuggestionRefresh,
}

impl Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TaskKind::WildcardTrajectory => "wildcard trajectory",
                TaskKind::CaptaincyAnalysis => "captaincy analysis",
                TaskKind::DailySnapshot => "daily snapshot",
                TaskKind::SuggestionRefresh => "suggestion refresh",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Status record as reported by `GET /tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::optional")]
    pub kind: Option<TaskKind>,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Task {
    /// Progress clamped to 0..=100.
    pub fn percent(&self) -> u8 {
        if self.progress.is_finite() {
            self.progress.clamp(0.0, 100.0).round() as u8
        } else {
            0
        }
    }
}

/// What the server hands back on submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReceipt {
    pub task_id: String,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryRequest {
    pub budget: f64,
    pub horizon: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_squad: Option<Vec<SquadPlayer>>,
}

/// A job the server can run in the background.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskRequest {
    WildcardTrajectory(TrajectoryRequest),
}

impl TaskRequest {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskRequest::WildcardTrajectory(_) => TaskKind::WildcardTrajectory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPlayer {
    #[serde(default)]
    pub id: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    pub gameweek: u32,
    #[serde(default)]
    pub transfers_in: Vec<PlannedPlayer>,
    #[serde(default)]
    pub transfers_out: Vec<PlannedPlayer>,
    #[serde(default)]
    pub predicted_points: Option<f64>,
    #[serde(default)]
    pub captain: Option<String>,
}

/// Multi-gameweek plan produced by the trajectory optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPlan {
    #[serde(default)]
    pub horizon: Option<u32>,
    #[serde(default)]
    pub steps: Vec<TrajectoryStep>,
    #[serde(default)]
    pub total_predicted_points: Option<f64>,
}

/// Transport for the task protocol.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn submit(&self, request: &TaskRequest) -> Result<TaskReceipt>;
    async fn status(&self, task_id: &str) -> Result<Task>;
    /// Raw result body of a completed task.
    async fn result(&self, kind: TaskKind, task_id: &str) -> Result<serde_json::Value>;
}
