use dayline_core::StreakState;
use serde::Serialize;

use crate::commands::common::{App, AppPaths};
use crate::error::CliError;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StreakReport {
    pub streak: u32,
    pub is_frozen: bool,
    pub frozen_dates: Vec<String>,
    pub max_streak: u32,
    pub active_days: usize,
}

impl StreakReport {
    pub fn new(state: &StreakState, max_streak: u32, active_days: usize) -> Self {
        Self {
            streak: state.streak,
            is_frozen: state.is_frozen,
            frozen_dates: state
                .frozen_dates
                .iter()
                .map(|day| day.format("%Y-%m-%d").to_string())
                .collect(),
            max_streak: max_streak.max(state.streak),
            active_days,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let unit = if self.streak == 1 { "day" } else { "days" };
        let mut lines = vec![format!("Streak: {} {unit}", self.streak)];
        if self.is_frozen {
            lines.push("Kept alive by a freeze today; write something to continue.".to_string());
        }
        lines.push(format!("Best: {}", self.max_streak));
        lines.push(format!("Days written: {}", self.active_days));
        if !self.frozen_dates.is_empty() {
            lines.push(format!("Freeze days: {}", self.frozen_dates.join(", ")));
        }
        lines
    }
}

pub async fn run_streak(as_json: bool, paths: &AppPaths) -> Result<(), CliError> {
    let app = App::start(paths).await?;
    let state = app.coordinator.streak().await;
    let report = StreakReport::new(
        &state,
        app.coordinator.max_streak().await,
        app.coordinator.active_days().await.len(),
    );
    app.finish().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in report.lines() {
            println!("{line}");
        }
    }
    Ok(())
}
