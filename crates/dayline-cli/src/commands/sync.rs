use dayline_core::SyncPhase;

use crate::commands::common::{App, AppPaths};
use crate::error::CliError;

pub async fn run_sync(paths: &AppPaths) -> Result<(), CliError> {
    let app = App::start(paths).await?;
    if !app.repository.sync().await? {
        return Err(CliError::SyncNotConfigured);
    }
    app.coordinator.on_foreground().await;
    let phase = app.coordinator.phase();
    app.finish().await;

    if phase == SyncPhase::Error {
        eprintln!("Sync completed, but the journal could not be loaded.");
    } else {
        println!("Sync completed");
    }
    Ok(())
}
