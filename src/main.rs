//! Binary entrypoint for the playerdoc CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml`
//! - `list` - list stored player identities
//! - `show <uuid>` - dump a stored player document as JSON
//! - `check <uuid>` - hydrate a player and print every diagnostic raised
//! - `login <uuid> --username <name> [--ip <addr>]` - record a login and save
//! - `delete <uuid>` - remove a stored player document
//!
//! See the library crate docs for module-level details: `playerdoc::`.
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::info;
use uuid::Uuid;

use playerdoc::asset::builtin::register_builtin;
use playerdoc::asset::{AssetLoader, AssetRegistry};
use playerdoc::config::Config;
use playerdoc::diagnostics::{CollectingDiagnostics, DiagnosticsSink, LogDiagnostics};
use playerdoc::document::{DocumentKey, ValueTree};
use playerdoc::player::{PlayerManager, PlayerRecord};
use playerdoc::store::SledPlayerStoreBuilder;
use playerdoc::{logutil, metrics};

#[derive(Parser)]
#[command(name = "playerdoc")]
#[command(about = "Inspect and maintain stored player profiles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// List stored player identities
    List,
    /// Print a stored player document as JSON
    Show { id: Uuid },
    /// Load a player and report every recoverable problem in its document
    Check { id: Uuid },
    /// Record a login for a player and save the record
    Login {
        id: Uuid,
        #[arg(short, long)]
        username: String,
        #[arg(long)]
        ip: Option<String>,
    },
    /// Delete a stored player document
    Delete { id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Init) {
        init_logging(&None, cli.verbose);
        Config::create_default(&cli.config).await?;
        println!("Wrote default configuration to {}", cli.config);
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    init_logging(&Some(config.clone()), cli.verbose);

    let mut registry = AssetRegistry::new();
    register_builtin(&mut registry, &config.assets.disabled);
    let registry = Arc::new(registry);
    info!("registered asset types: {:?}", registry.descriptors());

    let store = SledPlayerStoreBuilder::new(config.db_path())
        .flush_on_persist(config.storage.flush_on_persist)
        .open()?;

    match cli.command {
        // Handled before the config was loaded
        Commands::Init => {}
        Commands::List => {
            for id in store.list_player_ids()? {
                println!("{}", id);
            }
        }
        Commands::Show { id } => {
            let document = store
                .fetch_document(&id)?
                .ok_or_else(|| anyhow!("no stored document for {}", id))?;
            let json = to_json(&ValueTree::Map(document));
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Check { id } => {
            let sink = Arc::new(CollectingDiagnostics::new());
            let loader = AssetLoader::new(registry, sink.clone());
            let document = store
                .fetch_document(&id)?
                .ok_or_else(|| anyhow!("no stored document for {}", id))?;
            let record = PlayerRecord::from_document(id, &document, &loader);
            print_summary(&record);
            let unknown = DocumentKey::unknown_player_fields(&document);
            if !unknown.is_empty() {
                println!("Unrecognised top-level keys (kept on disk, ignored on load):");
                for key in unknown {
                    println!("  - {}", logutil::escape_log(key));
                }
            }
            let diagnostics = sink.entries();
            if diagnostics.is_empty() {
                println!("No problems found.");
            } else {
                println!("{} problem(s):", diagnostics.len());
                for d in diagnostics {
                    println!("  - {}", d);
                }
            }
            let snapshot = metrics::snapshot();
            info!(
                "assets resolved={} skipped={}",
                snapshot.assets_resolved, snapshot.assets_skipped
            );
        }
        Commands::Login { id, username, ip } => {
            let sink: Arc<dyn DiagnosticsSink> = Arc::new(LogDiagnostics);
            let loader = AssetLoader::new(registry, sink);
            let document = store.fetch_document(&id)?;
            let mut record = PlayerRecord::construct(id, document.as_ref(), &loader);
            record.note_login(&username, ip.as_deref(), chrono::Utc::now());
            let storage_id = record.persist(&store)?;
            println!("Saved {} ({})", record.unique_id(), storage_id);
        }
        Commands::Delete { id } => {
            if store.delete_player(&id)? {
                println!("Deleted {}", id);
            } else {
                println!("No stored document for {}", id);
            }
        }
    }

    Ok(())
}

fn print_summary(record: &PlayerRecord) {
    println!("Player {}", record.unique_id());
    match record.storage_id() {
        Some(handle) => println!("  handle:      {}", handle),
        None => println!("  handle:      (unbound)"),
    }
    println!(
        "  username:    {}",
        logutil::escape_log(record.last_known_username().unwrap_or("-"))
    );
    println!("  usernames:   {}", record.known_usernames().len());
    println!("  ips:         {}", record.known_ip_addresses().len());
    println!("  online ms:   {}", record.milliseconds_online());
    println!("  settings:    {}", record.settings().len());
    for (key, value) in record.settings().iter() {
        println!("    {} = {}", logutil::escape_log(key), logutil::preview_value(value));
    }
    println!("  assets:      {}", record.assets().len());
    for asset in record.assets() {
        println!("    {}", logutil::escape_log(asset.descriptor()));
    }
}

fn to_json(value: &ValueTree) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        ValueTree::Null => Json::Null,
        ValueTree::Boolean(b) => Json::Bool(*b),
        ValueTree::Integer(i) => Json::from(*i),
        ValueTree::Float(f) => Json::from(*f),
        ValueTree::Text(s) => Json::String(s.clone()),
        ValueTree::Timestamp(t) => Json::String(t.to_rfc3339()),
        ValueTree::List(items) => Json::Array(items.iter().map(to_json).collect()),
        ValueTree::Map(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides config
    let base_level = match (verbosity, config) {
        (0, Some(cfg)) => cfg.logging.level_filter(),
        (0, None) => log::LevelFilter::Info,
        (1, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stderr);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
