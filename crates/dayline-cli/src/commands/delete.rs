use dayline_core::models::DeleteMode;

use crate::commands::common::{resolve_entry, App, AppPaths};
use crate::error::CliError;

pub async fn run_delete(id: &str, hard: bool, paths: &AppPaths) -> Result<(), CliError> {
    let mode = if hard {
        DeleteMode::Hard
    } else {
        DeleteMode::Soft
    };

    let app = App::start(paths).await?;
    let entry = resolve_entry(&app.coordinator, id).await?;
    app.coordinator.delete_entry(entry.id, mode).await?;
    app.finish().await;

    println!("{}", entry.id);
    Ok(())
}
