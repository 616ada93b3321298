// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! LeafLens: photograph a plant, find out what it is
//!
//! Command-line front end over the identification client and the local
//! plant and history stores.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use leaflens::config::AppConfig;
use leaflens::facts::{FactLookup, FactSheet};
use leaflens::photo::PhotoRef;
use leaflens::plant_id::PlantIdClient;
use leaflens::scan::{
    self, care_badge, edible_badge, flowering_badge, percent, CancelFlag, IdentifyOutcome, ScanSession,
};
use leaflens::store::{FileStorage, HistoryStore, PlantsStore, Storage};
use leaflens::{LeafLensError, Result};

/// LeafLens CLI - plant identification
#[derive(Parser, Debug)]
#[command(name = "leaflens")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Identify plants from photos and keep track of them", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Identify the plant in a photo
    Identify {
        /// Photo path or file:// URI
        photo: String,

        /// Add the selected match to My Plants
        #[arg(long)]
        save: bool,

        /// Select this candidate instead of the top match
        #[arg(long)]
        pick: Option<String>,

        /// Skip the quick facts lookup
        #[arg(long)]
        no_facts: bool,
    },

    /// Saved plants
    Plants {
        #[command(subcommand)]
        action: PlantsCommands,
    },

    /// Recent scans
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Look up quick facts for a plant name
    Facts {
        /// Scientific or common name
        query: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Create a default configuration and data directory
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PlantsCommands {
    /// List saved plants
    List,

    /// Show a saved plant
    Show {
        id: String,

        /// Fetch fresh facts instead of the ones saved with the plant
        #[arg(long)]
        refresh_facts: bool,
    },

    /// Remove a saved plant
    Remove { id: String },

    /// Remove all saved plants
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent scans
    List {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,
    },

    /// Remove one scan from history
    Remove { id: String },

    /// Clear all history
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = AppConfig::load(&cli.config)?;
    let json = cli.format == "json";

    match cli.command {
        Commands::Identify { photo, save, pick, no_facts } => {
            run_identify(&config, &photo, save, pick.as_deref(), no_facts, json).await
        }
        Commands::Plants { action } => run_plants_command(&config, action, json).await,
        Commands::History { action } => run_history_command(&config, action, json).await,
        Commands::Facts { query } => run_facts(&config, &query, json).await,
        Commands::Config { action } => run_config_command(config, action, &cli.config),
        Commands::Init { dir, force } => run_init(dir, force),
    }
}

fn storage(config: &AppConfig) -> Arc<dyn Storage> {
    Arc::new(FileStorage::new(config.data_dir()))
}

async fn open_history(config: &AppConfig) -> HistoryStore {
    let mut history = HistoryStore::with_limits(
        storage(config),
        config.display.history_cap,
        config.display.history_dedup_window,
    );
    history.load().await;
    history
}

/// Cancel the flag on Ctrl+C so late results are not committed
fn cancel_on_ctrl_c(cancel: &CancelFlag) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, discarding pending results");
            cancel.cancel();
        }
    });
}

/// Run an identification and print the result
async fn run_identify(
    config: &AppConfig,
    photo: &str,
    save: bool,
    pick: Option<&str>,
    no_facts: bool,
    json: bool,
) -> Result<()> {
    let photo = PhotoRef::parse(photo)?;
    let client = PlantIdClient::from_config(&config.plant_id)?;
    let mut history = open_history(config).await;

    let outcome = scan::identify_photo(&client, &mut history, &photo, config.display.max_alternatives).await;

    let mut session = match outcome {
        Ok(IdentifyOutcome::Matches(session)) => session,
        Ok(IdentifyOutcome::NoMatches) => {
            println!("No matches. Try a closer, well-lit photo of a single leaf or flower.");
            return Ok(());
        }
        Err(e) => {
            eprintln!("Identification failed: {}", e.user_message());
            std::process::exit(1);
        }
    };

    if let Some(label) = pick {
        if !session.promote(label) {
            warn!("No candidate labelled {:?}, keeping the top match", label);
        }
    }

    if !no_facts {
        load_facts(config, &mut session).await;
    }

    if save {
        let mut plants = PlantsStore::open(storage(config)).await;
        if scan::save_current(&mut plants, &session).await {
            println!("Saved: added to My Plants!");
        } else {
            println!("Already saved: this plant is already in My Plants.");
        }
    }

    print_session(&session, json)
}

async fn load_facts(config: &AppConfig, session: &mut ScanSession) {
    let lookup = match FactLookup::from_config(&config.facts) {
        Ok(lookup) => lookup,
        Err(e) => {
            warn!("Facts unavailable: {}", e);
            return;
        }
    };
    let cancel = CancelFlag::new();
    cancel_on_ctrl_c(&cancel);
    session.refresh_facts(&lookup, &cancel).await;
}

fn print_session(session: &ScanSession, json: bool) -> Result<()> {
    let Some(current) = session.current() else {
        return Ok(());
    };

    if json {
        let output = serde_json::json!({
            "current": current,
            "alternatives": session.ranking().alternatives(),
            "from_saved": session.is_from_saved(),
            "hero_image": session.hero_image(),
            "learn_more_url": session.learn_more_url(),
            "facts": session.facts(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", current.display_name());
    println!("  {}", current.scientific_name);
    if !session.is_from_saved() {
        println!("  Match: {}", percent(current.confidence));
    }
    let details = current.details.as_ref();
    println!(
        "  [{}] [{}] [{}]",
        care_badge(details),
        edible_badge(details),
        flowering_badge(details)
    );
    if let Some(image) = session.hero_image() {
        println!("  Image: {}", image);
    }
    if let Some(desc) = session.description() {
        println!("\n{}", desc);
    }
    if let Some(url) = session.learn_more_url() {
        println!("Learn more: {}", url);
    }

    if let Some(facts) = session.facts() {
        print_facts(facts);
    }

    let alternatives = session.ranking().alternatives();
    if !alternatives.is_empty() {
        println!("\nOther possibilities:");
        for alt in alternatives {
            println!("  {} ({})", alt.label, percent(alt.confidence));
        }
    }

    Ok(())
}

fn print_facts(facts: &FactSheet) {
    let rows = facts.rows();
    if rows.is_empty() {
        return;
    }
    println!("\nQuick facts:");
    for (label, value) in rows {
        println!("  {}: {}", label, value);
    }
}

/// Run saved plant commands
async fn run_plants_command(config: &AppConfig, action: PlantsCommands, json: bool) -> Result<()> {
    let mut plants = PlantsStore::open(storage(config)).await;

    match action {
        PlantsCommands::List => {
            if json {
                println!("{}", serde_json::to_string_pretty(plants.plants())?);
                return Ok(());
            }
            if plants.plants().is_empty() {
                println!("No saved plants yet.");
            }
            for plant in plants.plants() {
                println!("  {}  {} ({})  saved {}",
                    plant.id,
                    plant.name,
                    plant.scientific_name,
                    plant.saved_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        PlantsCommands::Show { id, refresh_facts } => {
            let plant = plants.get(&id)
                .ok_or_else(|| LeafLensError::InvalidInput(format!("No saved plant with id {}", id)))?;
            let mut session = ScanSession::from_saved(plant, config.display.max_alternatives);
            if refresh_facts || session.facts().is_none() {
                load_facts(config, &mut session).await;
            }
            print_session(&session, json)?;
        }
        PlantsCommands::Remove { id } => {
            plants.remove(&id).await;
            println!("Removed {}", id);
        }
        PlantsCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm removing all saved plants");
                return Ok(());
            }
            plants.clear().await;
            println!("My Plants cleared");
        }
    }

    Ok(())
}

/// Run history commands
async fn run_history_command(config: &AppConfig, action: HistoryCommands, json: bool) -> Result<()> {
    let mut history = open_history(config).await;

    match action {
        HistoryCommands::List { count } => {
            let entries: Vec<_> = history.entries().iter().take(count).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            println!("Recent scans ({} entries):", entries.len());
            for entry in entries {
                let confidence = entry.confidence
                    .filter(|c| *c > 0.0)
                    .map(|c| format!(" {}", percent(c)))
                    .unwrap_or_default();
                println!("  {}  {} {}  {} ({}){}",
                    entry.id,
                    entry.identified_at.format("%Y-%m-%d %H:%M"),
                    entry.image.as_deref().unwrap_or("-"),
                    entry.name,
                    entry.scientific_name,
                    confidence
                );
            }
        }
        HistoryCommands::Remove { id } => {
            history.remove(&id).await;
            println!("Removed {} from history", id);
        }
        HistoryCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing history");
                return Ok(());
            }
            history.clear().await;
            println!("History cleared");
        }
    }

    Ok(())
}

async fn run_facts(config: &AppConfig, query: &str, json: bool) -> Result<()> {
    let lookup = FactLookup::from_config(&config.facts)?;
    info!("Fact sources: {:?}", lookup.source_names());
    let facts = lookup.lookup(query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&facts)?);
    } else if facts.is_empty() {
        println!("No facts found for {:?}", query);
    } else {
        print_facts(&facts);
    }
    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Service: {}", config.plant_id.url);
            println!("  API key: {}", if config.plant_id.resolve_api_key().is_some() { "set" } else { "missing" });
            println!("  Data directory: {}", config.storage.data_dir);
        }
    }

    Ok(())
}

/// Initialize a new LeafLens directory
fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("config.json");

    if config_path.exists() && !force {
        return Err(LeafLensError::Config(
            "config.json already exists. Use --force to overwrite".to_string()
        ));
    }

    let data_dir = target.join("leaflens_data");
    std::fs::create_dir_all(&data_dir)?;

    let mut config = AppConfig::default();
    config.storage.data_dir = data_dir.to_string_lossy().to_string();
    config.save(&config_path)?;

    println!("LeafLens initialized in {:?}", target);
    println!("\nNext steps:");
    println!("  1. Add your plant.id key to config.json or set {}", leaflens::config::API_KEY_ENV);
    println!("  2. leaflens identify path/to/photo.jpg");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_identify_command() {
        let cli = Cli::try_parse_from([
            "leaflens", "identify", "file:///tmp/leaf.jpg", "--save", "--pick", "Curio repens"
        ]).unwrap();

        match cli.command {
            Commands::Identify { photo, save, pick, no_facts } => {
                assert_eq!(photo, "file:///tmp/leaf.jpg");
                assert!(save);
                assert!(!no_facts);
                assert_eq!(pick.as_deref(), Some("Curio repens"));
            }
            _ => panic!("Expected Identify command"),
        }
    }

    #[test]
    fn test_cli_history_list_default_count() {
        let cli = Cli::try_parse_from(["leaflens", "history", "list"]).unwrap();
        match cli.command {
            Commands::History { action: HistoryCommands::List { count } } => assert_eq!(count, 20),
            _ => panic!("Expected History List command"),
        }
    }

    #[test]
    fn test_cli_history_list_count_short_flag() {
        let cli = Cli::try_parse_from([
            "leaflens", "history", "list", "-n", "5", "-c", "alt.json"
        ]).unwrap();
        assert_eq!(cli.config, PathBuf::from("alt.json"));
        match cli.command {
            Commands::History { action: HistoryCommands::List { count } } => assert_eq!(count, 5),
            _ => panic!("Expected History List command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from([
            "leaflens", "plants", "list", "--format", "json", "-v"
        ]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, "json");
        assert!(matches!(cli.command, Commands::Plants { action: PlantsCommands::List }));
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["leaflens", "facts", "Aloe", "--format", "xml"]).is_err());
    }
}
