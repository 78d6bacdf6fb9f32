use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vram",
    about = "VRAM resource store: compressed, versioned, integrity-checked blobs",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Resources directory (overrides config file and VRAM_RESOURCES_DIR)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// TOML config file with a [store] section
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a file as a resource
    Store(StoreArgs),
    /// Retrieve a resource (verifies its digest)
    Get(GetArgs),
    /// Show resource metadata without reading the payload
    Info(IdArgs),
    /// Show the current version of a resource
    Version(IdArgs),
    /// List resources, most recently accessed first
    List(ListArgs),
    /// Delete a resource
    Delete(IdArgs),
    /// Show storage statistics
    Stats,
    /// Check stored payloads against their digests
    Verify(VerifyArgs),
    /// Remove payload files not listed in the metadata
    Prune,
}

#[derive(Args)]
pub struct StoreArgs {
    pub id: String,
    /// File to read the payload from
    pub file: PathBuf,
    #[arg(long = "type", default_value = "generic")]
    pub resource_type: String,
    #[arg(long, default_value_t = 1)]
    pub priority: i64,
    /// Store the payload uncompressed
    #[arg(long)]
    pub no_compress: bool,
}

#[derive(Args)]
pub struct GetArgs {
    pub id: String,
    /// Write the payload here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only list resources of this type
    #[arg(long = "type")]
    pub resource_type: Option<String>,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Check a single resource instead of all
    pub id: Option<String>,
}
