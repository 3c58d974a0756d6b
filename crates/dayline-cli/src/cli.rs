use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dayline")]
#[command(about = "Keep a daily journal and a streak from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding the journal and cache databases
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Path to the JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Quick capture: dayline "today I..."
    #[arg(trailing_var_arg = true)]
    pub entry: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a new entry
    #[command(alias = "new")]
    Add {
        /// Entry text
        content: Vec<String>,
    },
    /// List recent entries
    List {
        /// Only show favorites
        #[arg(long)]
        favorites: bool,
        /// Number of pages to load
        #[arg(short, long, default_value = "1")]
        pages: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the entries written on one day
    Day {
        /// Local calendar date (YYYY-MM-DD)
        date: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle the favorite flag of an entry
    #[command(alias = "fav")]
    Favorite {
        /// Entry ID or unique ID prefix
        id: String,
    },
    /// Replace the text of an entry
    Edit {
        /// Entry ID or unique ID prefix
        id: String,
        /// New text
        content: Vec<String>,
    },
    /// Delete an entry
    Delete {
        /// Entry ID or unique ID prefix
        id: String,
        /// Remove the entry permanently instead of marking it deleted
        #[arg(long)]
        hard: bool,
    },
    /// Show the current streak
    Streak {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the active identity
    Whoami,
    /// Sign in; entries written anonymously move to this account
    Login {
        /// Account user id
        user_id: String,
    },
    /// Sign out; the next command starts a fresh anonymous identity
    Logout,
    /// Sync with the remote journal and retry a pending merge
    Sync,
    /// Show or change the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective config
    Show,
    /// Update config values
    Set {
        /// Remote journal URL (libsql://...)
        #[arg(long)]
        database_url: Option<String>,
        /// Remote journal auth token
        #[arg(long)]
        auth_token: Option<String>,
        /// Entries per page
        #[arg(long)]
        page_size: Option<usize>,
        /// Replica auto-sync interval in seconds (0 disables)
        #[arg(long)]
        sync_interval_secs: Option<u64>,
    },
}
