//! Export, import and clear command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use folio_core::BlogAdapter;

use crate::output::Output;
use crate::prompt::approve;

/// Export all posts as a JSON array
pub async fn export(adapter: &BlogAdapter, out: Option<PathBuf>, output: &Output) -> Result<()> {
    let json = adapter.export().await;

    match out {
        Some(path) => {
            std::fs::write(&path, &json)
                .with_context(|| format!("Failed to write export file: {:?}", path))?;
            output.success(&format!("Exported posts to {}", path.display()));
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Import posts from an exported JSON array
pub async fn import(adapter: &BlogAdapter, file: PathBuf, output: &Output) -> Result<()> {
    let json = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read import file: {:?}", file))?;

    let imported = adapter.import(&json).await.context("Failed to import posts")?;

    if output.is_json() {
        println!("{}", serde_json::json!({ "imported": imported }));
    } else if output.is_quiet() {
        println!("{}", imported);
    } else {
        output.success(&format!("Imported {} post(s)", imported));
    }

    Ok(())
}

/// Delete every post in the active backend
pub async fn clear(adapter: &BlogAdapter, yes: bool, output: &Output) -> Result<()> {
    let prompt = format!("Delete every post in the {} store?", adapter.backend());
    if !approve(&prompt, yes, output)? {
        output.message("Cancelled.");
        return Ok(());
    }

    adapter.clear_all().await.context("Failed to clear posts")?;
    output.success(&format!("Cleared the {} store", adapter.backend()));

    Ok(())
}
