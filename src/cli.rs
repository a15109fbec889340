use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

fn is_false(b: &bool) -> bool {
    !b
}

/// Command line flags. Only the flags actually given end up overriding the
/// other configuration sources.
#[derive(Debug, Default, Parser, Serialize)]
#[command(name = "pos", about = "Proof of Stars rank cache")]
pub struct Cli {
    /// Optional yaml file with settings, read before the environment
    #[arg(long, default_value = ".env.local.yaml")]
    #[serde(skip)]
    pub config: PathBuf,
    /// Directory of the on-disk rankings database
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Keep the cache in memory only
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub ephemeral: bool,
    /// Request a refresh right after startup (cooldown still applies)
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub refresh_on_start: bool,
    /// TRACE, DEBUG, INFO, WARN or ERROR
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_level: Option<String>,
}
