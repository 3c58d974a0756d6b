use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use dayline_core::config::ClientConfig;
use dayline_core::db::{Database, LibSqlLocalStore, StoreRole};
use dayline_core::{Entry, EntryId, StreakState, SyncIdentity, UserId};
use pretty_assertions::assert_eq;

use crate::commands::common::{
    entry_preview, entry_to_list_item, format_entry_lines, match_entry_prefix, normalize_content,
    normalize_entry_identifier, parse_day, resolve_paths, AppPaths,
};
use crate::commands::config::{apply_config_updates, redacted, ConfigUpdates};
use crate::commands::session_cmd::{describe_identity, normalize_user_id};
use crate::commands::streak::StreakReport;
use crate::error::CliError;
use crate::session::{clear_identity, ensure_identity, load_identity, save_identity};

fn entry(text: &str) -> Entry {
    Entry {
        id: EntryId::new(),
        owner_id: UserId::new("user-1"),
        text: text.to_string(),
        is_favorite: false,
        created_at: 1_718_445_600_000,
        deleted_at: None,
    }
}

#[test]
fn test_normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn test_normalize_content_keeps_multiline_text() {
    assert_eq!(
        normalize_content("line 1\nline 2\n"),
        Some("line 1\nline 2".to_string())
    );
}

#[test]
fn test_entry_identifier_is_trimmed_and_lowercased() {
    assert_eq!(
        normalize_entry_identifier("  0190ABCD ").unwrap(),
        "0190abcd".to_string()
    );
    assert!(matches!(
        normalize_entry_identifier("   "),
        Err(CliError::EmptyEntryId)
    ));
}

#[test]
fn test_parse_day_accepts_iso_dates_only() {
    assert_eq!(
        parse_day(" 2024-06-15 ").unwrap(),
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    );
    assert!(matches!(parse_day("15/06/2024"), Err(CliError::InvalidDate(_))));
    assert!(matches!(parse_day("2024-02-30"), Err(CliError::InvalidDate(_))));
}

#[test]
fn test_prefix_match_resolves_unique_entries() {
    let first = entry("first");
    let second = entry("second");
    let entries = vec![first.clone(), second.clone()];

    let full = second.id.to_string();
    assert_eq!(match_entry_prefix(&entries, &full).unwrap(), second);
    assert!(matches!(
        match_entry_prefix(&entries, "ffffffff"),
        Err(CliError::EntryNotFound(_))
    ));
}

#[test]
fn test_prefix_match_reports_ambiguity() {
    let entries = vec![entry("first"), entry("second")];
    // uuid v7 ids created back to back share their timestamp prefix
    let shared = entries[0].id.to_string().chars().take(4).collect::<String>();
    assert!(matches!(
        match_entry_prefix(&entries, &shared),
        Err(CliError::AmbiguousEntryId(message)) if message.contains(&shared)
    ));
}

#[test]
fn test_entry_preview_collapses_and_truncates() {
    let long = entry(&format!("  {}  \nsecond line", "word ".repeat(30)));
    let preview = entry_preview(&long, 20);
    assert_eq!(preview.chars().count(), 20);
    assert!(preview.ends_with("..."));
    assert_eq!(entry_preview(&entry("a   b\tc"), 20), "a b c");
}

#[test]
fn test_favorites_are_marked_in_list_lines() {
    let mut starred = entry("starred");
    starred.is_favorite = true;
    let lines = format_entry_lines(&[starred.clone(), entry("plain")]);

    assert!(lines[0].starts_with(&starred.id.to_string()[..13]));
    assert!(lines[0].contains("* starred"));
    assert!(lines[1].contains("  plain"));
    assert!(!lines[1].contains('*'));
}

#[test]
fn test_list_item_carries_full_text() {
    let item = entry_to_list_item(&entry("full text"));
    assert_eq!(item.text, "full text");
    assert_eq!(item.preview, "full text");
    assert!(!item.is_favorite);
}

#[test]
fn test_explicit_paths_take_precedence() {
    let paths = resolve_paths(
        Some(PathBuf::from("/tmp/dayline-data")),
        Some(PathBuf::from("/tmp/dayline.json")),
    );
    assert_eq!(
        paths,
        AppPaths {
            data_dir: PathBuf::from("/tmp/dayline-data"),
            config_file: PathBuf::from("/tmp/dayline.json"),
        }
    );
    assert_eq!(paths.journal_db(), PathBuf::from("/tmp/dayline-data/journal.db"));
    assert_eq!(paths.cache_db(), PathBuf::from("/tmp/dayline-data/cache.db"));
}

#[test]
fn test_config_updates_are_validated() {
    let updated = apply_config_updates(
        ClientConfig::default(),
        ConfigUpdates {
            database_url: Some(" libsql://journal.turso.io ".to_string()),
            auth_token: Some("token".to_string()),
            page_size: Some(50),
            sync_interval_secs: Some(0),
        },
    )
    .unwrap();
    assert_eq!(updated.database_url.as_deref(), Some("libsql://journal.turso.io"));
    assert_eq!(updated.page_size, Some(50));
    assert_eq!(updated.replica_config().unwrap().sync_interval, None);

    let cleared = apply_config_updates(
        updated,
        ConfigUpdates {
            database_url: Some(String::new()),
            ..ConfigUpdates::default()
        },
    )
    .unwrap();
    assert_eq!(cleared.database_url, None);
    assert_eq!(cleared.auth_token.as_deref(), Some("token"));

    let rejected = apply_config_updates(
        ClientConfig::default(),
        ConfigUpdates {
            page_size: Some(0),
            ..ConfigUpdates::default()
        },
    );
    assert!(rejected.is_err());
}

#[test]
fn test_redacted_config_hides_the_token() {
    let config = ClientConfig {
        database_url: Some("libsql://journal.turso.io".to_string()),
        auth_token: Some("secret".to_string()),
        page_size: None,
        sync_interval_secs: None,
    };
    let shown = redacted(config);
    assert_eq!(shown.auth_token.as_deref(), Some("********"));
    assert_eq!(shown.database_url.as_deref(), Some("libsql://journal.turso.io"));
}

#[test]
fn test_user_id_must_not_be_empty() {
    assert_eq!(normalize_user_id(" alice ").unwrap(), "alice");
    assert!(matches!(normalize_user_id("  "), Err(CliError::EmptyUserId)));
}

#[test]
fn test_identity_description_names_the_kind() {
    assert_eq!(
        describe_identity(&SyncIdentity::authenticated("alice")),
        "alice (signed in)"
    );
    assert!(describe_identity(&SyncIdentity::anonymous("anon-1")).ends_with("(anonymous)"));
}

#[test]
fn test_streak_report_lists_freeze_days() {
    let day = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
    let state = StreakState {
        streak: 16,
        is_frozen: false,
        frozen_dates: BTreeSet::from([day]),
    };
    let report = StreakReport::new(&state, 12, 15);

    assert_eq!(report.max_streak, 16);
    assert_eq!(report.frozen_dates, vec!["2024-06-14".to_string()]);
    assert_eq!(
        report.lines(),
        vec![
            "Streak: 16 days".to_string(),
            "Best: 16".to_string(),
            "Days written: 15".to_string(),
            "Freeze days: 2024-06-14".to_string(),
        ]
    );
}

#[test]
fn test_frozen_streak_report_mentions_the_freeze() {
    let state = StreakState {
        streak: 1,
        is_frozen: true,
        frozen_dates: BTreeSet::new(),
    };
    let lines = StreakReport::new(&state, 20, 1).lines();
    assert_eq!(lines[0], "Streak: 1 day");
    assert!(lines[1].contains("freeze"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_identity_is_created_once_and_persisted() {
    let db = Database::open_in_memory(StoreRole::Cache).await.unwrap();
    let store = LibSqlLocalStore::new(Arc::new(db));
    assert_eq!(load_identity(&store).await.unwrap(), None);

    let created = ensure_identity(&store).await.unwrap();
    assert!(created.is_anonymous);
    assert!(created.user_id.as_str().starts_with("anon-"));
    assert_eq!(ensure_identity(&store).await.unwrap(), created);

    let signed_in = SyncIdentity::authenticated("alice");
    save_identity(&store, &signed_in).await.unwrap();
    assert_eq!(load_identity(&store).await.unwrap(), Some(signed_in));

    clear_identity(&store).await.unwrap();
    assert_eq!(load_identity(&store).await.unwrap(), None);
}
