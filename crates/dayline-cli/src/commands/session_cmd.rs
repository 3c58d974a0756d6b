use dayline_core::cache::MergeMarkerStore;
use dayline_core::SyncIdentity;

use crate::commands::common::{App, AppPaths};
use crate::error::CliError;
use crate::session::{clear_identity, load_identity, save_identity};

pub async fn run_whoami(paths: &AppPaths) -> Result<(), CliError> {
    let app = App::open(paths).await?;
    let identity = load_identity(&app.store).await?;
    let pending = app.store.load_marker().await?;

    match identity {
        Some(identity) => println!("{}", describe_identity(&identity)),
        None => println!("No identity yet; one is created on the first entry."),
    }
    if let Some(marker) = pending {
        println!("Pending merge from {}", marker.source_user_id);
    }
    Ok(())
}

pub async fn run_login(user_id: &str, paths: &AppPaths) -> Result<(), CliError> {
    let user_id = normalize_user_id(user_id)?;
    let app = App::open(paths).await?;
    let target = SyncIdentity::authenticated(user_id);

    if let Some(current) = load_identity(&app.store).await? {
        if current == target {
            return Err(CliError::AlreadySignedIn(current.user_id.to_string()));
        }
        if current.is_anonymous {
            app.coordinator.bind_session(Some(current)).await;
            app.coordinator.prepare_identity_upgrade().await?;
        }
    }

    save_identity(&app.store, &target).await?;
    app.coordinator.bind_session(Some(target.clone())).await;
    let pending = app.store.load_marker().await?;
    app.finish().await;

    println!("Signed in as {}", target.user_id);
    if pending.is_some_and(|marker| marker.applies_to(&target)) {
        eprintln!("Anonymous entries are not merged yet; run `dayline sync` to retry.");
    }
    Ok(())
}

pub async fn run_logout(paths: &AppPaths) -> Result<(), CliError> {
    let app = App::open(paths).await?;
    clear_identity(&app.store).await?;
    app.coordinator.bind_session(None).await;
    app.finish().await;

    println!("Signed out");
    Ok(())
}

pub fn describe_identity(identity: &SyncIdentity) -> String {
    if identity.is_anonymous {
        format!("{} (anonymous)", identity.user_id)
    } else {
        format!("{} (signed in)", identity.user_id)
    }
}

pub fn normalize_user_id(user_id: &str) -> Result<String, CliError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyUserId)
    } else {
        Ok(trimmed.to_string())
    }
}
