use dayline_core::EntryFilter;

use crate::commands::common::{print_entries, App, AppPaths};
use crate::error::CliError;

pub async fn run_list(
    favorites: bool,
    pages: usize,
    as_json: bool,
    paths: &AppPaths,
) -> Result<(), CliError> {
    let app = App::start(paths).await?;
    if favorites {
        app.coordinator.set_filter(EntryFilter::Favorites).await?;
    }
    for _ in 1..pages {
        if app.coordinator.load_more().await? == 0 {
            break;
        }
    }

    let entries = app.coordinator.entries().await;
    app.finish().await;
    print_entries(&entries, as_json)
}
