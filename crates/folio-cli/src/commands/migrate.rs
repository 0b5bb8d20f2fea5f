//! Migration and restore command handlers

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use folio_core::{restore_from_backup, BlogAdapter, DirectorySink, Migrator};

use crate::output::Output;
use crate::prompt::approve;

/// Copy local posts into the remote table
pub async fn migrate(
    adapter: &BlogAdapter,
    backup_dir: PathBuf,
    clear_local: bool,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let remote = adapter.remote().ok_or_else(|| {
        anyhow!(
            "Remote store is not configured.\n\
             Set it with: folio config set remote_url <URL> and folio config set remote_key <KEY>"
        )
    })?;
    let caller = adapter
        .authorize("migrate")
        .await
        .context("Migration requires a signed-in caller")?;
    info!(caller = %caller.id, remote = %remote.describe(), "Starting migration");

    let sink = DirectorySink::new(backup_dir);
    let mut migrator = Migrator::new(adapter.local(), remote).with_sink(&sink);
    let report = migrator.run().await;
    output.print_report(&report);

    if !report.success {
        bail!("Migration did not complete. Local posts were left untouched.");
    }

    if clear_local {
        let prompt = "Remove the local posts now that they are in the remote store?";
        if approve(prompt, yes, output)? {
            migrator.clear_local(&report)?;
            output.success("Cleared local posts. The backup was kept.");
        } else {
            output.message("Local posts kept.");
        }
    }

    Ok(())
}

/// Replace the local posts with a backup
///
/// Without a file, the backup stored by the last migration is used.
pub async fn restore(
    adapter: &BlogAdapter,
    file: Option<PathBuf>,
    yes: bool,
    output: &Output,
) -> Result<()> {
    adapter.authorize("restore").await?;

    let json = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read backup file: {:?}", path))?,
        None => adapter
            .local()
            .try_load_backup()
            .context("Failed to read the stored backup")?
            .ok_or_else(|| anyhow!("No stored backup found. Pass a backup file."))?,
    };

    if !approve("Replace every local post with the backup?", yes, output)? {
        output.message("Cancelled.");
        return Ok(());
    }

    let restored = restore_from_backup(adapter.local(), &json)?;
    output.success(&format!("Restored {} post(s) from backup", restored));

    Ok(())
}
