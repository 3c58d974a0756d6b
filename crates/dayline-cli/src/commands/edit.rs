use crate::commands::common::{resolve_entry, resolve_entry_text, App, AppPaths};
use crate::error::CliError;

pub async fn run_edit(id: &str, content_parts: &[String], paths: &AppPaths) -> Result<(), CliError> {
    let content = resolve_entry_text(content_parts)?;

    let app = App::start(paths).await?;
    let entry = resolve_entry(&app.coordinator, id).await?;
    if entry.text != content {
        app.coordinator.edit_entry(entry.id, &content).await?;
    }
    app.finish().await;

    println!("{}", entry.id);
    Ok(())
}
