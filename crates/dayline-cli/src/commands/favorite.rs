use crate::commands::common::{resolve_entry, App, AppPaths};
use crate::error::CliError;

pub async fn run_favorite(id: &str, paths: &AppPaths) -> Result<(), CliError> {
    let app = App::start(paths).await?;
    let entry = resolve_entry(&app.coordinator, id).await?;
    let is_favorite = app.coordinator.toggle_favorite(entry.id).await?;
    app.finish().await;

    let state = if is_favorite { "favorited" } else { "unfavorited" };
    println!("{} {state}", entry.id);
    Ok(())
}
