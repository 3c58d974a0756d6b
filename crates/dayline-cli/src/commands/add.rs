use crate::commands::common::{resolve_entry_text, App, AppPaths};
use crate::error::CliError;

pub async fn run_add(content_parts: &[String], paths: &AppPaths) -> Result<(), CliError> {
    let content = resolve_entry_text(content_parts)?;

    let app = App::start(paths).await?;
    let entry = app.coordinator.add_entry(&content).await?;
    app.finish().await;

    println!("{}", entry.id);
    Ok(())
}
