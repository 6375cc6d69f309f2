//! CLI command definitions.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a single secret
    Get {
        /// Secret key name
        key: String,

        /// Cache TTL for this lookup, in milliseconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..), conflicts_with = "fallback")]
        ttl_ms: Option<u64>,

        /// Value to use when no source has the key
        #[arg(long)]
        fallback: Option<String>,

        /// Print the plaintext value
        #[arg(long)]
        reveal: bool,
    },

    /// Check that every key resolves
    Check {
        /// Secret key names
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Print the hash a key appears under in logs and metrics
    Hash {
        /// Secret key name
        key: String,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Set a CLI configuration value
    Set {
        /// Key
        key: String,

        /// Value
        value: String,
    },
}
