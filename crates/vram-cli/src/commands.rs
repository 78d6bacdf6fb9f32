use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use colored::Colorize;
use tracing::debug;
use vram_protocol::{encode_payload, ApiResponse, ResponseBody, PAYLOAD_ENCODING};
use vram_store::{ResourceManager, ResourceStore, StorageStats, StoreConfig, StoreOptions};
use vram_types::ResourceId;

use crate::cli::*;

/// Resolve configuration: defaults, then config file, then environment,
/// then `--root`.
fn load_config(config_file: Option<PathBuf>, root: Option<PathBuf>) -> anyhow::Result<StoreConfig> {
    let config = match config_file {
        Some(path) => StoreConfig::from_file(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    let mut config = config.apply_env()?;
    if let Some(root) = root {
        config.resources_dir = root;
    }
    Ok(config)
}

fn parse_id(id: &str) -> anyhow::Result<ResourceId> {
    ResourceId::new(id).with_context(|| format!("invalid resource id {id:?}"))
}

fn print_json(body: ResponseBody) -> anyhow::Result<()> {
    let json = ApiResponse::success(body).to_json();
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config, cli.root)?;
    debug!(dir = %config.resources_dir.display(), codec = %config.compression.codec, "resolved configuration");
    let store = ResourceManager::open(config).context("failed to open resource store")?;
    if store.recovery()?.is_some() {
        eprintln!(
            "{} metadata was unreadable and has been reset; run `vram prune` to clear stale payloads",
            "warning:".yellow().bold()
        );
    }
    let format = cli.format;

    match cli.command {
        Command::Store(args) => cmd_store(&store, args, format),
        Command::Get(args) => cmd_get(&store, args, format),
        Command::Info(args) => cmd_info(&store, args, format),
        Command::Version(args) => cmd_version(&store, args, format),
        Command::List(args) => cmd_list(&store, args, format),
        Command::Delete(args) => cmd_delete(&store, args, format),
        Command::Stats => cmd_stats(&store, format),
        Command::Verify(args) => cmd_verify(&store, args),
        Command::Prune => cmd_prune(&store),
    }
}

fn cmd_store(store: &ResourceManager, args: StoreArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let data = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let options = StoreOptions {
        resource_type: args.resource_type,
        priority: args.priority,
        compress: !args.no_compress,
    };
    let receipt = store.store(&id, &data, &options)?;

    if format == OutputFormat::Json {
        return print_json(ResponseBody::Stored {
            resource_id: receipt.resource_id,
            size: receipt.size,
            compressed_size: receipt.compressed_size,
            version: receipt.version,
            hash: receipt.hash,
        });
    }
    println!(
        "{} Stored {} (version {})",
        "✓".green().bold(),
        receipt.resource_id.to_string().bold(),
        receipt.version.to_string().yellow()
    );
    println!("  size:       {} bytes", receipt.size);
    println!("  on disk:    {} bytes", receipt.compressed_size);
    println!("  sha256:     {}", receipt.hash.to_string().cyan());
    Ok(())
}

fn cmd_get(store: &ResourceManager, args: GetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let fetched = store.get(&parse_id(&args.id)?)?;

    if let Some(path) = args.output {
        std::fs::write(&path, &fetched.data)
            .with_context(|| format!("failed to write {}", path.display()))?;
        if format == OutputFormat::Text {
            println!(
                "{} Wrote {} bytes to {}",
                "✓".green().bold(),
                fetched.data.len(),
                path.display()
            );
        }
        return Ok(());
    }

    if format == OutputFormat::Json {
        return print_json(ResponseBody::Inline {
            data: encode_payload(&fetched.data),
            encoding: PAYLOAD_ENCODING,
            metadata: fetched.record,
            resource_id: fetched.id,
        });
    }
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&fetched.data)?;
    stdout.flush()?;
    Ok(())
}

fn cmd_info(store: &ResourceManager, args: IdArgs, format: OutputFormat) -> anyhow::Result<()> {
    let info = store.info(&parse_id(&args.id)?)?;
    if format == OutputFormat::Json {
        return print_json(ResponseBody::Info {
            resource_id: info.resource_id,
            metadata: info.metadata,
            version: info.version,
        });
    }
    let m = &info.metadata;
    println!("{} {}", "Resource".bold(), info.resource_id.to_string().yellow());
    println!("  type:          {}", m.resource_type);
    println!("  version:       {}", info.version);
    println!("  size:          {} bytes", m.size);
    println!("  on disk:       {} bytes{}", m.compressed_size, if m.compressed { " (compressed)" } else { "" });
    println!("  priority:      {}", m.priority);
    println!("  sha256:        {}", m.hash.to_string().cyan());
    println!("  created:       {}", m.created.to_rfc3339());
    println!("  last accessed: {}", m.last_accessed.to_rfc3339());
    println!("  accesses:      {}", m.access_count);
    Ok(())
}

fn cmd_version(store: &ResourceManager, args: IdArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let version = store.check_version(&id)?;
    if format == OutputFormat::Json {
        return print_json(ResponseBody::Version {
            resource_id: id,
            version,
        });
    }
    println!("{version}");
    Ok(())
}

fn cmd_list(store: &ResourceManager, args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let resources = store.list(args.resource_type.as_deref())?;
    if format == OutputFormat::Json {
        return print_json(ResponseBody::List {
            count: resources.len(),
            resources,
        });
    }
    if resources.is_empty() {
        println!("No resources.");
        return Ok(());
    }
    for r in &resources {
        println!(
            "{:<24} {:<10} v{:<4} {:>10} B  {:>10} B  {:>5} reads  {}",
            r.id.to_string().bold(),
            r.resource_type,
            r.version,
            r.size,
            r.compressed_size,
            r.access_count,
            r.last_accessed.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    println!("{} resource(s)", resources.len());
    Ok(())
}

fn cmd_delete(store: &ResourceManager, args: IdArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    if !store.delete(&id)? {
        anyhow::bail!("resource not found: {id}");
    }
    if format == OutputFormat::Json {
        return print_json(ResponseBody::Deleted {
            message: format!("Resource {id} deleted"),
            deleted: true,
            resource_id: id,
        });
    }
    println!("{} Deleted {}", "✓".green().bold(), id.to_string().bold());
    Ok(())
}

fn cmd_stats(store: &ResourceManager, format: OutputFormat) -> anyhow::Result<()> {
    let stats = store.stats()?;
    if format == OutputFormat::Json {
        return print_json(stats_body(stats));
    }
    println!("{}", "Storage".bold());
    println!("  resources:         {}", stats.resource_count);
    println!("  total size:        {} bytes", stats.total_size);
    println!("  compressed size:   {} bytes", stats.total_compressed_size);
    println!("  compression ratio: {:.3}", stats.compression_ratio);
    println!("  disk usage:        {:.2} MB", stats.disk_usage_mb);
    Ok(())
}

fn stats_body(stats: StorageStats) -> ResponseBody {
    ResponseBody::Stats {
        stats,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

fn cmd_verify(store: &ResourceManager, args: VerifyArgs) -> anyhow::Result<()> {
    if let Some(id) = args.id {
        let id = parse_id(&id)?;
        store.verify(&id)?;
        println!("{} {} verified", "✓".green().bold(), id.to_string().bold());
        return Ok(());
    }

    let report = store.verify_all()?;
    for id in &report.missing {
        println!("  {} {}", "missing:".red(), id);
    }
    for id in &report.corrupt {
        println!("  {} {}", "corrupt:".red(), id);
    }
    if !report.is_clean() {
        anyhow::bail!(
            "{} of {} resource(s) failed verification",
            report.missing.len() + report.corrupt.len(),
            report.checked()
        );
    }
    println!("{} {} resource(s) verified", "✓".green().bold(), report.checked());
    Ok(())
}

fn cmd_prune(store: &ResourceManager) -> anyhow::Result<()> {
    let removed = store.prune_orphans()?;
    for path in &removed {
        println!("  {} {}", "removed:".yellow(), path.display());
    }
    println!("{} Prune: {} file(s) removed.", "✓".green(), removed.len());
    Ok(())
}
