//! Main module for the Game Scout CLI application (`scout`).
//!
//! Handles tracing setup, configuration loading and command dispatch.
//!
//! # Examples
//!
//! ```sh
//! scout init
//! scout build
//! scout query relaxing life simulation with cute animals -k 3
//! scout show "Hollow Knight"
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (e.g. `RUST_LOG=game_scout=debug`).

use std::error::Error;
use std::path::Path;

use clap::Parser;
use crossterm::style::Stylize;
use once_cell::sync::OnceCell;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use game_scout::cache::EmbeddingCache;
use game_scout::catalog::{Catalog, GameRecord, UNKNOWN};
use game_scout::commands::{Cli, Commands};
use game_scout::config::{self, ScoutConfig};
use game_scout::{Recommender, default_config_path};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .init();
    });
    run(Cli::parse())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };

    if cli.command == Commands::Init {
        return init(&config_path);
    }

    let mut scout_config = config::load_or_default(&config_path)?;
    if let Some(catalog) = cli.catalog {
        scout_config.catalog_path = Some(catalog);
    }
    debug!("Config loaded: {:?}", scout_config);

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Build => {
            let rec = Recommender::from_config(&scout_config)?;
            println!(
                "Indexed {} games (cache key {})",
                rec.index_len(),
                rec.cache_key()
            );
        }
        Commands::Query { text, top_k } => {
            let text = text.join(" ");
            let top_k = top_k.unwrap_or(scout_config.default_top_k);
            let rec = Recommender::from_config(&scout_config)?;
            let hits = rec.query(&text, top_k)?;

            println!("{}", format!("Top {} for \"{}\"", hits.len(), text).bold());
            for (rank, hit) in hits.iter().enumerate() {
                let details = rec.get_record(&hit.title).map(summary).unwrap_or_default();
                println!(
                    "{:>2}. {} {} {}",
                    rank + 1,
                    hit.title.as_str().cyan().bold(),
                    format!("({:.3})", hit.score).dark_grey(),
                    details
                );
            }
        }
        Commands::Show { title } => {
            let title = title.join(" ");
            let catalog = Catalog::load(scout_config.catalog_path.as_deref())?;
            match catalog.get(&title) {
                Some(record) => print_record(record),
                None => return Err(format!("no game titled \"{title}\" in the catalog").into()),
            }
        }
        Commands::ClearCache => {
            let dir = scout_config.resolved_cache_dir()?;
            let removed = EmbeddingCache::new(&dir).clear()?;
            println!("Removed {removed} cached embedding file(s) from {}", dir.display());
        }
    }

    Ok(())
}

/// Writes a default `config.yaml`, leaving an existing one untouched.
fn init(config_path: &Path) -> Result<(), Box<dyn Error>> {
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }
    info!("Creating config file: {}", config_path.display());
    let written: ScoutConfig = config::write_default_config(config_path)?;
    println!(
        "Wrote {} (embedder: {:?}, model: {})",
        config_path.display(),
        written.embedder,
        written.model_id
    );
    Ok(())
}

fn money(v: Option<f32>) -> String {
    v.map(|p| format!("${p:.2}"))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn summary(record: &GameRecord) -> String {
    let rating = record
        .rating
        .map(|r| format!("{r:.1}/10"))
        .unwrap_or_else(|| UNKNOWN.to_string());
    format!("- {} | {} | {}", record.genre, rating, money(record.price))
}

fn print_record(record: &GameRecord) {
    println!("{}", record.title.as_str().cyan().bold());
    println!("  Genre:    {}", record.genre);
    println!("  Review:   {}", record.review);
    println!("  Age:      {}", record.age_rating);
    println!("  Graphics: {}", record.graphics);
    println!(
        "  Rating:   {}",
        record
            .rating
            .map(|r| format!("{r:.1}"))
            .unwrap_or_else(|| UNKNOWN.to_string())
    );
    println!("  Price:    {}", money(record.price));
}
