//! Status command handler

use anyhow::Result;

use folio_core::{BlogAdapter, Config, Migrator, SCHEMA_VERSION};

use crate::output::{Output, OutputFormat};

/// Show backend and store status
pub async fn show(adapter: &BlogAdapter, config: &Config, output: &Output) -> Result<()> {
    let info = adapter.backend_info();
    let caller = adapter.caller().await;
    let local_posts = adapter.local().load().len();
    let stats = adapter.stats().await;

    // None when the remote store is not configured or unreachable
    let needs_migration = match adapter.remote() {
        Some(remote) => Migrator::new(adapter.local(), remote)
            .needs_migration()
            .await
            .ok(),
        None => None,
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "backend": info.backend,
                    "remote_configured": info.remote_configured,
                    "fallback_enabled": info.fallback_enabled,
                    "schema_version": SCHEMA_VERSION,
                    "caller": caller.as_ref().map(|c| &c.id),
                    "local": {
                        "location": adapter.local().describe(),
                        "posts": local_posts
                    },
                    "remote": adapter.remote().map(|r| r.describe()),
                    "stats": stats,
                    "needs_migration": needs_migration
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", info.backend);
        }
        OutputFormat::Human => {
            println!("Folio Status");
            println!("============");
            println!();
            println!("Backend:");
            println!("  Active:   {}", info.backend);
            println!(
                "  Remote:   {}",
                adapter
                    .remote()
                    .map(|r| r.describe())
                    .unwrap_or_else(|| "(not configured)".to_string())
            );
            println!(
                "  Fallback: {}",
                if info.fallback_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!();
            println!("Local store:");
            println!("  Location: {}", adapter.local().describe());
            println!("  Schema:   {}", SCHEMA_VERSION);
            println!("  Posts:    {}", local_posts);
            println!();
            println!("Caller:");
            match caller {
                Some(ref caller) => match caller.email {
                    Some(ref email) => println!("  Signed in as {} ({})", caller.id, email),
                    None => println!("  Signed in as {}", caller.id),
                },
                None => println!("  Not signed in (writes are rejected)"),
            }
            println!();
            println!("Contents ({}):", info.backend);
            println!("  Total:     {}", stats.total);
            println!("  Published: {}", stats.published);
            println!("  Drafts:    {}", stats.drafts);
            if let Some(true) = needs_migration {
                println!();
                println!("Local store has posts the remote table is missing.");
                println!("Run `folio migrate` to copy them.");
            }
            println!();
            println!("Data directory: {}", config.data_dir.display());
        }
    }

    Ok(())
}
