//! Folio CLI
//!
//! Command-line interface for Folio - blog post management over a local
//! store or a remote post table, plus migration between the two.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use folio_core::{BlogAdapter, Config};

mod commands;
mod output;
mod prompt;

use commands::posts::{NewPost, PostChanges};
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Folio - blog posts in a local store or a remote table")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use a specific config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List posts, newest first
    List {
        /// Only published posts
        #[arg(long)]
        published: bool,
        /// Only published posts in this category ("Todos" for all)
        #[arg(long, conflicts_with = "published")]
        category: Option<String>,
    },
    /// Show a post by id or slug
    Show {
        /// Numeric id or slug
        post: String,
    },
    /// Create a new post
    Add {
        #[arg(long)]
        title: String,
        /// Post body (HTML)
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,
        /// Read the post body from a file
        #[arg(long, value_name = "PATH")]
        content_file: Option<PathBuf>,
        #[arg(long, default_value = "")]
        excerpt: String,
        #[arg(long, default_value = "")]
        image: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value = "")]
        author: String,
        /// Read time label; estimated from the content when omitted
        #[arg(long)]
        read_time: Option<String>,
        /// Publication date (YYYY-MM-DD); today when omitted
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Publish immediately
        #[arg(long)]
        publish: bool,
    },
    /// Change fields of an existing post
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,
        #[arg(long, value_name = "PATH")]
        content_file: Option<PathBuf>,
        #[arg(long)]
        excerpt: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        read_time: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, conflicts_with = "unpublish")]
        publish: bool,
        #[arg(long)]
        unpublish: bool,
    },
    /// Delete a post
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Search published posts
    Search {
        /// Search term (empty lists all published posts)
        #[arg(default_value = "")]
        term: String,
    },
    /// Show post counts
    Stats,
    /// Export all posts as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Import posts from a JSON array
    Import {
        /// File containing the exported posts
        file: PathBuf,
    },
    /// Delete every post in the active backend
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show backend and store status
    Status,
    /// Copy local posts into the remote table
    Migrate {
        /// Directory for the backup file
        #[arg(long, value_name = "DIR")]
        backup_dir: Option<PathBuf>,
        /// Clear the local store after a successful migration
        #[arg(long)]
        clear_local: bool,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Replace local posts with the contents of a backup
    Restore {
        /// Backup file; the backup stored by the last migration when omitted
        file: Option<PathBuf>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands don't need the stores
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config.log_level);

    let adapter = BlogAdapter::from_config(&config).context("Failed to open post store")?;
    debug!("Active backend: {}", adapter.backend());

    match cli.command {
        Commands::List {
            published,
            category,
        } => commands::posts::list(&adapter, published, category, &output).await,
        Commands::Show { post } => commands::posts::show(&adapter, &post, &output).await,
        Commands::Add {
            title,
            content,
            content_file,
            excerpt,
            image,
            category,
            author,
            read_time,
            date,
            publish,
        } => {
            let post = NewPost {
                title,
                content: read_content(content, content_file)?.unwrap_or_default(),
                excerpt,
                image,
                category,
                author,
                read_time,
                date,
                publish,
            };
            commands::posts::add(&adapter, post, &output).await
        }
        Commands::Update {
            id,
            title,
            content,
            content_file,
            excerpt,
            image,
            category,
            author,
            read_time,
            date,
            publish,
            unpublish,
        } => {
            let changes = PostChanges {
                title,
                content: read_content(content, content_file)?,
                excerpt,
                image,
                category,
                author,
                read_time,
                date,
                published: match (publish, unpublish) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
            };
            commands::posts::update(&adapter, id, changes, &output).await
        }
        Commands::Delete { id, yes } => commands::posts::delete(&adapter, id, yes, &output).await,
        Commands::Search { term } => commands::posts::search(&adapter, &term, &output).await,
        Commands::Stats => commands::posts::stats(&adapter, &output).await,
        Commands::Export { out } => commands::transfer::export(&adapter, out, &output).await,
        Commands::Import { file } => commands::transfer::import(&adapter, file, &output).await,
        Commands::Clear { yes } => commands::transfer::clear(&adapter, yes, &output).await,
        Commands::Status => commands::status::show(&adapter, &config, &output).await,
        Commands::Migrate {
            backup_dir,
            clear_local,
            yes,
        } => {
            let backup_dir = backup_dir.unwrap_or_else(|| config.backup_dir());
            commands::migrate::migrate(&adapter, backup_dir, clear_local, yes, &output).await
        }
        Commands::Restore { file, yes } => {
            commands::migrate::restore(&adapter, file, yes, &output).await
        }
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Post body from `--content` or `--content-file`
fn read_content(content: Option<String>, file: Option<PathBuf>) -> Result<Option<String>> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .map(Some)
            .with_context(|| format!("Failed to read content file: {:?}", path)),
        None => Ok(content),
    }
}

/// Log to stderr so stdout stays clean for --json and --quiet
///
/// RUST_LOG takes precedence over the configured level.
fn init_logging(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("folio_core={},folio_cli={}", log_level, log_level))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init();
}
