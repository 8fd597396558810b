use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "couchbucket")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative Couchbase bucket management", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Bucket manifest (default: ~/.config/couchbucket/buckets.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub manifest: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Cluster connection overrides. Unset flags fall back to the defaults file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Admin REST host
    #[arg(long, env = "CB_REST_HOST", global = true)]
    pub host: Option<String>,

    /// Admin REST port
    #[arg(long, env = "CB_REST_PORT", global = true)]
    pub port: Option<u16>,

    /// Admin username
    #[arg(long, env = "CB_REST_USERNAME", global = true)]
    pub username: Option<String>,

    /// Admin password
    #[arg(long, env = "CB_REST_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Connection defaults file
    #[arg(long, global = true, value_name = "PATH", default_value = cbadmin::config::DEFAULTS_FILE)]
    pub defaults_file: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Make the cluster's buckets match the manifest
    Apply(ApplyArgs),

    /// Preview what apply would change
    Diff(DiffArgs),

    /// Show declared buckets next to their observed state
    Status,

    /// List every bucket on the cluster
    List(ListArgs),

    /// Check the manifest without contacting the cluster
    Validate,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Only apply a specific target: "bucket", "bucket.<name>" or "<name>"
    pub target: Option<String>,

    /// Show what would change without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of buckets to reconcile in parallel
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..=32))]
    pub jobs: u16,

    /// Delete buckets that exist on the cluster but are not declared
    #[arg(long)]
    pub purge: bool,
}

#[derive(Parser)]
pub struct DiffArgs {
    /// Only diff a specific target: "bucket", "bucket.<name>" or "<name>"
    pub target: Option<String>,

    /// Include undeclared buckets as removals
    #[arg(long)]
    pub purge: bool,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}
