//! Dayline CLI - a daily journal with streaks from the terminal
//!
//! Every command opens the journal, binds the stored identity, runs through
//! the sync coordinator, and waits for background writes before exiting.

mod cli;
mod commands;
mod error;
mod session;
#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::resolve_paths;
use crate::commands::config::run_config;
use crate::commands::day::run_day;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::favorite::run_favorite;
use crate::commands::list::run_list;
use crate::commands::session_cmd::{run_login, run_logout, run_whoami};
use crate::commands::streak::run_streak;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "dayline=info"
                    .parse()
                    .map_err(|_| CliError::Config("invalid log directive".to_string()))?,
            ),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let paths = resolve_paths(cli.data_dir, cli.config);

    match cli.command {
        Some(Commands::Add { content }) => run_add(&content, &paths).await?,
        Some(Commands::List {
            favorites,
            pages,
            json,
        }) => run_list(favorites, pages, json, &paths).await?,
        Some(Commands::Day { date, json }) => run_day(&date, json, &paths).await?,
        Some(Commands::Favorite { id }) => run_favorite(&id, &paths).await?,
        Some(Commands::Edit { id, content }) => run_edit(&id, &content, &paths).await?,
        Some(Commands::Delete { id, hard }) => run_delete(&id, hard, &paths).await?,
        Some(Commands::Streak { json }) => run_streak(json, &paths).await?,
        Some(Commands::Whoami) => run_whoami(&paths).await?,
        Some(Commands::Login { user_id }) => run_login(&user_id, &paths).await?,
        Some(Commands::Logout) => run_logout(&paths).await?,
        Some(Commands::Sync) => run_sync(&paths).await?,
        Some(Commands::Config { action }) => run_config(action, &paths)?,
        None => {
            // Quick capture mode: dayline "today I..."
            if cli.entry.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_add(&cli.entry, &paths).await?;
            }
        }
    }

    Ok(())
}
