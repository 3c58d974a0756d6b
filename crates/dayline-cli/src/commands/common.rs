use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate};
use dayline_core::codec::EnvelopeCodec;
use dayline_core::config::ClientConfig;
use dayline_core::db::{Database, LibSqlJournalRepository, LibSqlLocalStore};
use dayline_core::sync::{SyncCoordinator, SyncDeps};
use dayline_core::Entry;
use serde::Serialize;

use crate::error::CliError;
use crate::session::ensure_identity;

/// Where the CLI keeps its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
}

impl AppPaths {
    /// Journal database (the remote store, or its embedded replica)
    pub fn journal_db(&self) -> PathBuf {
        self.data_dir.join("journal.db")
    }

    /// Local cache database (snapshots, merge marker, stored identity)
    pub fn cache_db(&self) -> PathBuf {
        self.data_dir.join("cache.db")
    }
}

#[derive(Debug, Serialize)]
pub struct EntryListItem {
    pub id: String,
    pub preview: String,
    pub text: String,
    pub is_favorite: bool,
    pub created_at: i64,
    pub created_at_local: String,
}

/// Open databases and the coordinator for one command
pub struct App {
    pub coordinator: SyncCoordinator,
    pub repository: Arc<LibSqlJournalRepository>,
    pub store: Arc<LibSqlLocalStore>,
}

impl App {
    /// Open both databases without binding a session.
    pub async fn open(paths: &AppPaths) -> Result<Self, CliError> {
        let config = load_config(paths)?;
        let journal = Arc::new(open_journal(&paths.journal_db(), &config).await?);
        let cache = Arc::new(Database::open_cache(paths.cache_db()).await?);
        let store = Arc::new(LibSqlLocalStore::new(cache));
        let repository = Arc::new(LibSqlJournalRepository::new(journal));

        let coordinator = SyncCoordinator::new(
            SyncDeps {
                remote: repository.clone(),
                profiles: repository.clone(),
                cache: store.clone(),
                markers: store.clone(),
                codec: Arc::new(EnvelopeCodec),
            },
            config.sync_settings(),
        );

        Ok(Self {
            coordinator,
            repository,
            store,
        })
    }

    /// Open and bind the stored identity, creating an anonymous one on the
    /// first run.
    pub async fn start(paths: &AppPaths) -> Result<Self, CliError> {
        let app = Self::open(paths).await?;
        let identity = ensure_identity(&app.store).await?;
        app.coordinator.bind_session(Some(identity)).await;
        Ok(app)
    }

    /// Wait for background cache and profile writes.
    pub async fn finish(self) {
        self.coordinator.settle().await;
    }
}

pub fn resolve_paths(data_dir: Option<PathBuf>, config_file: Option<PathBuf>) -> AppPaths {
    AppPaths {
        data_dir: data_dir
            .or_else(|| env::var_os("DAYLINE_DATA_DIR").map(PathBuf::from))
            .unwrap_or_else(default_data_dir),
        config_file: config_file
            .or_else(|| env::var_os("DAYLINE_CONFIG").map(PathBuf::from))
            .unwrap_or_else(default_config_file),
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dayline")
}

fn default_config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dayline")
        .join("config.json")
}

/// File config with environment overrides applied
pub fn load_config(paths: &AppPaths) -> Result<ClientConfig, CliError> {
    Ok(ClientConfig::load(&paths.config_file)?.with_env_overrides())
}

async fn open_journal(path: &Path, config: &ClientConfig) -> Result<Database, CliError> {
    let Some(replica) = config.replica_config() else {
        return Ok(Database::open_journal(path).await?);
    };

    tracing::info!("Sync enabled with remote journal");
    let path_buf = path.to_path_buf();
    // Replica bootstrap needs a deeper stack than the main runtime's workers.
    let db = std::thread::Builder::new()
        .stack_size(8 * 1024 * 1024)
        .spawn(move || -> dayline_core::Result<Database> {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(Database::open_journal_replica(&path_buf, replica))
        })
        .map_err(|error| CliError::DatabaseInit(error.to_string()))?
        .join()
        .map_err(|_| CliError::DatabaseInit("sync initialization thread panicked".into()))??;

    Ok(db)
}

/// Entry text from arguments, falling back to piped stdin.
pub fn resolve_entry_text(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }
    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }
    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn normalize_entry_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyEntryId)
    } else {
        Ok(trimmed.to_ascii_lowercase())
    }
}

pub fn parse_day(date: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::InvalidDate(date.trim().to_string()))
}

/// Find an entry by full id or unique prefix, paging through the journal
/// until it is loaded.
pub async fn resolve_entry(coordinator: &SyncCoordinator, query: &str) -> Result<Entry, CliError> {
    let query = normalize_entry_identifier(query)?;
    loop {
        let entries = coordinator.entries().await;
        if let Some(entry) = entries.iter().find(|entry| entry.id.to_string() == query) {
            return Ok(entry.clone());
        }
        if !coordinator.has_more().await || coordinator.load_more().await? == 0 {
            break;
        }
    }
    match_entry_prefix(&coordinator.entries().await, &query)
}

pub fn match_entry_prefix(entries: &[Entry], query: &str) -> Result<Entry, CliError> {
    let matches: Vec<&Entry> = entries
        .iter()
        .filter(|entry| entry.id.to_string().starts_with(query))
        .collect();

    match matches.as_slice() {
        [] => Err(CliError::EntryNotFound(query.to_string())),
        [entry] => Ok((*entry).clone()),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|entry| short_id(entry))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousEntryId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(entry: &Entry) -> String {
    entry.id.to_string().chars().take(13).collect()
}

pub fn entry_preview(entry: &Entry, max_chars: usize) -> String {
    let first_line = entry.text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut truncated = collapsed
        .chars()
        .take(max_chars.saturating_sub(3))
        .collect::<String>();
    truncated.push_str("...");
    truncated
}

pub fn format_local_time(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

pub fn format_entry_lines(entries: &[Entry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let marker = if entry.is_favorite { '*' } else { ' ' };
            format!(
                "{:<13}  {}  {marker} {}",
                short_id(entry),
                format_local_time(entry.created_at),
                entry_preview(entry, 50)
            )
        })
        .collect()
}

pub fn entry_to_list_item(entry: &Entry) -> EntryListItem {
    EntryListItem {
        id: entry.id.to_string(),
        preview: entry_preview(entry, 80),
        text: entry.text.clone(),
        is_favorite: entry.is_favorite,
        created_at: entry.created_at,
        created_at_local: format_local_time(entry.created_at),
    }
}

/// Print entries as text lines or pretty JSON.
pub fn print_entries(entries: &[Entry], as_json: bool) -> Result<(), CliError> {
    if as_json {
        let items = entries
            .iter()
            .map(entry_to_list_item)
            .collect::<Vec<EntryListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for line in format_entry_lines(entries) {
            println!("{line}");
        }
    }
    Ok(())
}
