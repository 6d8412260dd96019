//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands and their
//! options.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use game_scout::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! if let Commands::Query { text, top_k } = cli.command {
//!     println!("{} (top {:?})", text.join(" "), top_k);
//! }
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Configuration file. Defaults to `config.yaml` in the config directory.
    #[arg(long, global = true, env = "SCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Catalog CSV, overriding `catalog_path` from the configuration.
    #[arg(long, global = true, env = "SCOUT_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug, PartialEq)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Write a default configuration file.
    Init,

    /// Embed the catalog and refresh the embedding cache.
    #[clap(name = "build", alias = "b")]
    Build,

    /// Recommend games for a free-text request.
    ///
    /// Words are joined with spaces, so quoting is optional.
    #[clap(name = "query", alias = "q")]
    Query {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Number of recommendations. Defaults to `default_top_k`.
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
    },

    /// Show the catalog entry for one title.
    #[clap(name = "show", alias = "s")]
    Show {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Delete cached embeddings.
    #[clap(name = "clear-cache")]
    ClearCache,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_with_top_k() {
        let cli = Cli::try_parse_from(["scout", "query", "cozy", "farming", "-k", "3"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Query {
                text: vec!["cozy".into(), "farming".into()],
                top_k: Some(3),
            }
        );
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "scout",
            "show",
            "Hollow",
            "Knight",
            "--catalog",
            "games.csv",
        ])
        .unwrap();
        assert_eq!(cli.catalog, Some(PathBuf::from("games.csv")));
        assert_eq!(
            cli.command,
            Commands::Show {
                title: vec!["Hollow".into(), "Knight".into()]
            }
        );
    }

    #[test]
    fn test_query_requires_text() {
        assert!(Cli::try_parse_from(["scout", "query"]).is_err());
    }

    #[test]
    fn test_aliases() {
        let cli = Cli::try_parse_from(["scout", "q", "puzzle"]).unwrap();
        assert!(matches!(cli.command, Commands::Query { .. }));
        let cli = Cli::try_parse_from(["scout", "clear-cache"]).unwrap();
        assert_eq!(cli.command, Commands::ClearCache);
    }
}
