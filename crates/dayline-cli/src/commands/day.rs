use crate::commands::common::{parse_day, print_entries, App, AppPaths};
use crate::error::CliError;

pub async fn run_day(date: &str, as_json: bool, paths: &AppPaths) -> Result<(), CliError> {
    let day = parse_day(date)?;

    let app = App::start(paths).await?;
    let entries = app.coordinator.entries_for_day(day).await?;
    app.finish().await;

    if entries.is_empty() && !as_json {
        println!("No entries on {day}.");
        return Ok(());
    }
    print_entries(&entries, as_json)
}
