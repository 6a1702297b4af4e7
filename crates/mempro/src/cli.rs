//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mempro_sdk::{MemoryLevel, MemoryType};

/// memPro hierarchical memory CLI
///
/// Stores utterances as originals, episodes, facts and themes, and
/// retrieves facts with their context.
#[derive(Parser, Debug)]
#[command(name = "mempro")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: ~/.mempro/config.toml)
    #[arg(long, global = true, env = "MEMPRO_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store content through the full hierarchy
    Memorize {
        /// Content to remember
        content: String,

        /// Memory type: fact, preference, goal, constraint, event
        #[arg(short = 't', long = "type", default_value = "fact")]
        memory_type: MemoryType,

        /// Entity labels used for theme clustering
        #[arg(short, long = "entity", action = clap::ArgAction::Append)]
        entities: Vec<String>,

        /// Confidence score (0.0 - 1.0)
        #[arg(short, long, default_value = "0.5")]
        confidence: f64,

        /// Speaker tag for the original utterance
        #[arg(long)]
        speaker: Option<String>,

        /// Session id for the original utterance
        #[arg(long)]
        session: Option<String>,
    },

    /// Retrieve facts matching a query
    Retrieve {
        /// Text to search for
        query: String,

        /// Maximum number of facts
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show record counts per level
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one record as JSON
    Get {
        /// Record ID
        id: String,

        /// Level: original, episode, semantic, theme
        #[arg(short, long)]
        level: MemoryLevel,
    },

    /// Delete one record
    Delete {
        /// Record ID
        id: String,

        /// Level: original, episode, semantic, theme
        #[arg(short, long)]
        level: MemoryLevel,
    },

    /// Print agent tool descriptors as JSON
    Tools,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memorize() {
        let cli = Cli::try_parse_from([
            "mempro",
            "memorize",
            "User prefers dark mode",
            "-t",
            "preference",
            "-e",
            "User",
            "--entity",
            "dark mode",
            "-c",
            "0.9",
        ])
        .unwrap();

        match cli.command {
            Commands::Memorize {
                content,
                memory_type,
                entities,
                confidence,
                ..
            } => {
                assert_eq!(content, "User prefers dark mode");
                assert_eq!(memory_type, MemoryType::Preference);
                assert_eq!(entities, vec!["User".to_string(), "dark mode".to_string()]);
                assert_eq!(confidence, 0.9);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_level_and_global_config() {
        let cli = Cli::try_parse_from([
            "mempro", "get", "abc", "-l", "theme", "--config", "/tmp/m.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/m.toml")));
        assert!(matches!(
            cli.command,
            Commands::Get { level: MemoryLevel::Theme, .. }
        ));

        assert!(Cli::try_parse_from(["mempro", "delete", "abc", "-l", "tier"]).is_err());
    }
}
