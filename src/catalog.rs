//! # Catalog
//!
//! Loading of the game catalog: the ordered list of [`GameRecord`]s that every
//! other stage works from. Row order is significant; the index, the embedding
//! cache and the title lookup all address records by their position here.
//!
//! ## Sources
//! - A CSV file with the columns of the public *video game reviews and ratings*
//!   dataset (extra columns are ignored):
//!
//! ```text
//! Game Title, Genre, User Review Text, Age Group Targeted,
//! Graphics Quality, User Rating, Price
//! ```
//!
//! - The embedded [`Catalog::sample`] set, used when no path is configured or the
//!   configured path does not exist.
//!
//! A path that exists but cannot be read or parsed is a hard error
//! ([`ScoutError::Catalog`]); there is no partial load.
//!
//! ## Example
//! ```rust
//! use game_scout::catalog::Catalog;
//!
//! let catalog = Catalog::load(None).unwrap();
//! assert_eq!(catalog.len(), 10);
//! assert!(catalog.get("Celeste").is_some());
//! ```

use std::fs::File;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, ScoutError};

/// Placeholder written into string fields that are empty in the source data.
pub const UNKNOWN: &str = "Unknown";

const REQUIRED_COLUMNS: [&str; 7] = [
    "Game Title",
    "Genre",
    "User Review Text",
    "Age Group Targeted",
    "Graphics Quality",
    "User Rating",
    "Price",
];

/// One game in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub title: String,
    pub genre: String,
    pub review: String,
    pub age_rating: String,
    pub graphics: String,
    /// User rating, usually on a 0–10 scale.
    pub rating: Option<f32>,
    pub price: Option<f32>,
}

impl GameRecord {
    pub fn new(
        title: &str,
        genre: &str,
        review: &str,
        age_rating: &str,
        graphics: &str,
        rating: f32,
        price: f32,
    ) -> Self {
        Self {
            title: title.to_string(),
            genre: genre.to_string(),
            review: review.to_string(),
            age_rating: age_rating.to_string(),
            graphics: graphics.to_string(),
            rating: Some(rating),
            price: Some(price),
        }
    }
}

/// Row shape of the CSV file. Empty cells come through as `None`.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Game Title")]
    title: Option<String>,
    #[serde(rename = "Genre")]
    genre: Option<String>,
    #[serde(rename = "User Review Text")]
    review: Option<String>,
    #[serde(rename = "Age Group Targeted")]
    age_rating: Option<String>,
    #[serde(rename = "Graphics Quality")]
    graphics: Option<String>,
    #[serde(rename = "User Rating")]
    rating: Option<f32>,
    #[serde(rename = "Price")]
    price: Option<f32>,
}

fn or_unknown(field: Option<String>) -> String {
    match field {
        Some(s) if !s.trim().is_empty() => s,
        _ => UNKNOWN.to_string(),
    }
}

impl From<CsvRow> for GameRecord {
    fn from(row: CsvRow) -> Self {
        Self {
            title: or_unknown(row.title),
            genre: or_unknown(row.genre),
            review: or_unknown(row.review),
            age_rating: or_unknown(row.age_rating),
            graphics: or_unknown(row.graphics),
            rating: row.rating,
            price: row.price,
        }
    }
}

/// The ordered, immutable set of games available for recommendation.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    records: Vec<GameRecord>,
}

impl Catalog {
    /// Load the catalog from `path`, or fall back to [`Catalog::sample`].
    ///
    /// The fallback applies only when `path` is `None` or names a file that
    /// does not exist.
    ///
    /// # Errors
    /// [`ScoutError::Catalog`] if the file exists but cannot be opened, lacks a
    /// required column, or contains a malformed row.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => {
                info!("Loading catalog from {}", p.display());
                let catalog = Self::from_csv_file(p)?;
                info!("Loaded {} game records", catalog.len());
                Ok(catalog)
            }
            Some(p) => {
                info!(
                    "Catalog file {} not found, using the sample catalog",
                    p.display()
                );
                Ok(Self::sample())
            }
            None => {
                info!("No catalog configured, using the sample catalog");
                Ok(Self::sample())
            }
        }
    }

    fn from_csv_file(path: &Path) -> Result<Self> {
        let fail = |reason: String| ScoutError::Catalog {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| fail(e.to_string()))?;
        Self::from_reader(file).map_err(fail)
    }

    /// Parse CSV data from any reader. Errors are returned as plain strings so
    /// the caller can attach the source location.
    fn from_reader<R: std::io::Read>(reader: R) -> std::result::Result<Self, String> {
        let mut rdr = csv::Reader::from_reader(reader);

        let headers = rdr.headers().map_err(|e| e.to_string())?.clone();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing required columns: {}", missing.join(", ")));
        }

        let mut records = Vec::new();
        for (line, row) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| format!("row {}: {}", line + 1, e))?;
            records.push(GameRecord::from(row));
        }
        debug!("Parsed {} CSV rows", records.len());

        Ok(Self { records })
    }

    pub fn from_records(records: Vec<GameRecord>) -> Self {
        Self { records }
    }

    /// The built-in demo catalog used for offline operation.
    pub fn sample() -> Self {
        let records = vec![
            GameRecord::new(
                "The Legend of Zelda: Breath of the Wild",
                "Adventure",
                "amazing open world adventure exploration puzzle solving",
                "Teen",
                "High",
                9.5,
                59.99,
            ),
            GameRecord::new(
                "Animal Crossing: New Horizons",
                "Simulation",
                "relaxing life simulation cute animals peaceful",
                "Everyone",
                "High",
                9.0,
                59.99,
            ),
            GameRecord::new(
                "Hollow Knight",
                "Metroidvania",
                "challenging metroidvania beautiful art platformer",
                "Teen",
                "High",
                9.2,
                14.99,
            ),
            GameRecord::new(
                "Celeste",
                "Platformer",
                "emotional platformer personal struggle challenging",
                "Teen",
                "High",
                8.8,
                19.99,
            ),
            GameRecord::new(
                "Stardew Valley",
                "Farming",
                "charming farming simulation social elements relaxing",
                "Everyone",
                "Medium",
                9.2,
                14.99,
            ),
            GameRecord::new(
                "Journey",
                "Adventure",
                "meditative adventure beautiful landscapes peaceful",
                "Everyone",
                "High",
                9.1,
                14.99,
            ),
            GameRecord::new(
                "Ori and the Blind Forest",
                "Platformer",
                "emotional platformer stunning visuals adventure",
                "Teen",
                "High",
                9.0,
                19.99,
            ),
            GameRecord::new(
                "Subnautica",
                "Survival",
                "underwater survival exploration adventure",
                "Teen",
                "High",
                8.7,
                29.99,
            ),
            GameRecord::new(
                "Spiritfarer",
                "Management",
                "beautiful game goodbye peace emotional",
                "Teen",
                "High",
                9.0,
                29.99,
            ),
            GameRecord::new(
                "What Remains of Edith Finch",
                "Adventure",
                "narrative exploration family stories emotional",
                "Mature",
                "High",
                8.9,
                19.99,
            ),
        ];
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    pub fn record_at(&self, row: usize) -> Option<&GameRecord> {
        self.records.get(row)
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.title.as_str())
    }

    /// Look up a record by exact title. With duplicate titles the first row wins.
    pub fn get(&self, title: &str) -> Option<&GameRecord> {
        self.records.iter().find(|r| r.title == title)
    }

    /// Digest over every field of every record, in row order.
    ///
    /// Any edit, insertion or reordering changes the hash, which in turn
    /// changes the embedding cache key.
    pub fn content_hash(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.records.len() as u64).to_le_bytes());
        for r in &self.records {
            for field in [&r.title, &r.genre, &r.review, &r.age_rating, &r.graphics] {
                hasher.update(&(field.len() as u64).to_le_bytes());
                hasher.update(field.as_bytes());
            }
            for num in [r.rating, r.price] {
                match num {
                    Some(v) => hasher.update(&[1]).update(&v.to_le_bytes()),
                    None => hasher.update(&[0]),
                };
            }
        }
        hasher.finalize()
    }
}
