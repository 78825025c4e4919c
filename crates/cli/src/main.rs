//! feedcache command-line entry point.
//!
//! Opens the cache described by the layered configuration and runs one
//! maintenance or inspection command against it. Results are printed to
//! stdout as JSON; logging goes to stderr.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use feedcache_core::{CacheConfig, FeedCache, ReplayAction};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "feedcache", about = "Inspect and maintain a feed reader cache")]
struct Cli {
    /// Cache file to open, overriding the configured db-path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Feed URLs, unread count and schema version
    Stats,
    /// Search item titles and descriptions
    Search {
        query: String,
        /// Only search this feed
        #[arg(long)]
        feed: Option<String>,
    },
    /// Mark items read, either one feed or everything
    Catchup {
        #[arg(long)]
        feed: Option<String>,
    },
    /// Print the GUIDs of all read items
    ReadGuids,
    /// Mark items read by GUID
    MarkRead {
        #[arg(required = true)]
        guids: Vec<String>,
    },
    /// Delete items older than the configured keep-articles-days
    CleanOld,
    /// Compact the database file
    Vacuum,
    /// Show stored conditional-fetch validators for a URI
    Lastmodified { uri: String },
    /// Inspect or edit the pending replay queue
    #[command(subcommand)]
    Replay(ReplayCommand),
}

#[derive(Subcommand, Debug, PartialEq)]
enum ReplayCommand {
    /// List queued actions, oldest first
    List,
    /// Queue an action for a GUID
    Record {
        guid: String,
        #[arg(long)]
        unread: bool,
    },
    /// Drop queued actions for these GUIDs
    Clear {
        #[arg(required = true)]
        guids: Vec<String>,
    },
}

fn run(cache: &FeedCache, command: Command) -> Result<String> {
    let output = match command {
        Command::Stats => commands::stats(cache)?,
        Command::Search { query, feed } => commands::search(cache, &query, feed.as_deref())?,
        Command::Catchup { feed } => commands::catchup(cache, feed.as_deref())?,
        Command::ReadGuids => commands::read_guids(cache)?,
        Command::MarkRead { guids } => commands::mark_read(cache, &guids)?,
        Command::CleanOld => commands::clean_old(cache)?,
        Command::Vacuum => commands::vacuum(cache)?,
        Command::Lastmodified { uri } => commands::lastmodified(cache, &uri)?,
        Command::Replay(ReplayCommand::List) => commands::replay_list(cache)?,
        Command::Replay(ReplayCommand::Record { guid, unread }) => {
            let action = if unread { ReplayAction::MarkUnread } else { ReplayAction::MarkRead };
            commands::replay_record(cache, &guid, action)?
        }
        Command::Replay(ReplayCommand::Clear { guids }) => commands::replay_clear(cache, &guids)?,
    };
    Ok(output)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = CacheConfig::load()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    tracing::info!(db_path = %config.db_path.display(), "Opening feed cache");
    let cache = FeedCache::from_config(config)?;

    println!("{}", run(&cache, cli.command)?);
    Ok(())
}
