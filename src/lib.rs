//! # Game Scout (library root)
//!
//! Semantic game recommendations from free-text queries. The catalog is turned
//! into sentence embeddings once, indexed for exact inner-product search, and
//! every query is resolved into ranked `(title, score)` pairs.
//!
//! - Catalog loading with a built-in sample fallback (`catalog`).
//! - Review text normalization with optional lemmatization (`normalize`).
//! - One descriptive string per game (`combine`).
//! - Candle sentence embeddings or an offline hashing embedder (`embedder`).
//! - Exact top-k search (`index`) over a keyed on-disk cache (`cache`).
//! - The query context object (`recommender`).
//! - Configuration and CLI parsing (`config`, `commands`).
//!
//! ## Quick example
//! ```rust
//! use game_scout::catalog::Catalog;
//! use game_scout::embedder::HashingEmbedder;
//! use game_scout::normalize::TextNormalizer;
//! use game_scout::recommender::Recommender;
//!
//! let mut rec = Recommender::new(
//!     Catalog::sample(),
//!     TextNormalizer::Basic,
//!     Box::new(HashingEmbedder::new(384)),
//! );
//! rec.build(None)?;
//! for hit in rec.query("peaceful underwater exploration", 3)? {
//!     println!("{:.3}  {}", hit.score, hit.title);
//! }
//! # Ok::<(), game_scout::error::ScoutError>(())
//! ```
//!
//! ## Files
//! Configuration and cached embeddings live under the per-platform config
//! directory from [`config_dir`], e.g.:
//!
//! - macOS: `~/Library/Application Support/com.game-scout.scout/`
//! - Linux (XDG): `~/.config/scout/`
//! - Windows: `C:\Users\<you>\AppData\Roaming\game-scout\scout\config\`

use std::io;
use std::path::PathBuf;

use directories::ProjectDirs;

pub mod cache;
pub mod catalog;
pub mod combine;
pub mod commands;
pub mod config;
pub mod embedder;
pub mod error;
pub mod index;
pub mod normalize;
pub mod recommender;

pub use error::{Result, ScoutError};
pub use recommender::{Recommendation, Recommender};

/// Return the per-platform configuration directory used by Game Scout.
///
/// The directory is **not** created by this function.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be
/// determined (rare, but possible in heavily sandboxed environments).
pub fn config_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "game-scout", "scout").ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "Unable to determine config directory")
    })?;
    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Default location of `config.yaml`.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.yaml"))
}
