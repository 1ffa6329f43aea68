use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use blobkeep_sdk::{AssetKind, AssetSummary, Blobkeep, BlobkeepConfig, IncomingFile, SettingChange};
use colored::Colorize;
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.data_dir)?;
    let runtime = tokio::runtime::Runtime::new().context("cannot start async runtime")?;
    runtime.block_on(async {
        let app = Blobkeep::open(config).await?;
        let result = dispatch(&app, cli.command, cli.format).await;
        let closed = app.shutdown().await;
        result?;
        closed?;
        Ok::<(), anyhow::Error>(())
    })
}

fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> anyhow::Result<BlobkeepConfig> {
    let mut config = match path {
        Some(path) => BlobkeepConfig::load(path)?,
        None => BlobkeepConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    Ok(config)
}

async fn dispatch(app: &Blobkeep, command: Command, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Command::Add(args) => cmd_add(app, args, format).await,
        Command::List(args) => cmd_list(app, args, format).await,
        Command::Show(args) => cmd_show(app, args).await,
        Command::Rm(args) => cmd_rm(app, args, format).await,
        Command::Settings(args) => cmd_settings(app, args.action, format).await,
        Command::Background(args) => cmd_background(app, args.action, format).await,
        Command::Sweep(args) => cmd_sweep(app, args, format).await,
        Command::Stats => cmd_stats(app, format).await,
        Command::Prune => cmd_prune(app, format).await,
        Command::Compact => cmd_compact(app, format).await,
        Command::Clear(args) => cmd_clear(app, args).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_upload(path: &Path, mime: Option<&str>) -> anyhow::Result<IncomingFile> {
    let bytes = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime = mime.map(str::to_string).unwrap_or_else(|| guess_mime(path).to_string());
    Ok(IncomingFile::bytes(name, mime, bytes))
}

/// MIME type for the extensions the default gate accepts.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "mp4" => "audio/mp4",
        "m4a" => "audio/x-m4a",
        _ => "application/octet-stream",
    }
}

/// Bytes as megabytes with two decimals.
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

async fn cmd_add(app: &Blobkeep, args: AddArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut files = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        files.push(read_upload(path, args.mime.as_deref())?);
    }
    let total = files.len();
    let report = app.admit_many(args.kind, files).await;

    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Failure<'a> {
                name: &'a str,
                reason: &'a str,
            }
            #[derive(Serialize)]
            struct Admitted<'a> {
                name: &'a str,
                id: &'a str,
            }
            let admitted: Vec<_> = report
                .admitted
                .iter()
                .map(|(name, id)| Admitted { name, id: id.as_str() })
                .collect();
            let failed: Vec<_> = report
                .failed
                .iter()
                .map(|(name, reason)| Failure { name, reason })
                .collect();
            print_json(&serde_json::json!({ "admitted": admitted, "failed": failed }))?;
        }
        OutputFormat::Text => {
            for (name, id) in &report.admitted {
                println!("{} {} {}", "✓".green().bold(), name, id.as_str().cyan());
            }
            for (name, reason) in &report.failed {
                println!("{} {} {}", "✗".red().bold(), name, reason.red());
            }
        }
    }

    if !report.is_complete() {
        bail!("{} of {} uploads failed", report.failed.len(), total);
    }
    Ok(())
}

fn print_summaries(kind: AssetKind, summaries: &[AssetSummary]) {
    if summaries.is_empty() {
        println!("No {kind} assets.");
        return;
    }
    for summary in summaries {
        println!(
            "{}  {:>10}  {}  {}",
            summary.id.as_str().cyan(),
            format_size(summary.size),
            summary.mime_type.dimmed(),
            summary.name
        );
    }
}

async fn cmd_list(app: &Blobkeep, args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let summaries = app.list(args.kind).await?;
    match format {
        OutputFormat::Json => print_json(&summaries)?,
        OutputFormat::Text => print_summaries(args.kind, &summaries),
    }
    Ok(())
}

async fn cmd_show(app: &Blobkeep, args: ShowArgs) -> anyhow::Result<()> {
    match args.out {
        Some(out) => {
            let Some(record) = app.fetch(args.kind, &args.id).await? else {
                bail!("no {} with id {}", args.kind, args.id);
            };
            fs::write(&out, &record.payload).with_context(|| format!("cannot write {}", out.display()))?;
            println!("{} Wrote {} to {}", "✓".green().bold(), format_size(record.payload.len() as u64), out.display());
        }
        None => {
            let Some(uri) = app.load_asset(args.kind, &args.id).await? else {
                bail!("no {} with id {}", args.kind, args.id);
            };
            println!("{uri}");
        }
    }
    Ok(())
}

async fn cmd_rm(app: &Blobkeep, args: RmArgs, format: OutputFormat) -> anyhow::Result<()> {
    let deleted = app.delete_many(args.kind, args.ids.as_slice()).await;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "deleted": deleted }))?,
        OutputFormat::Text => println!("{} Deleted {} of {} ids.", "✓".green(), deleted, args.ids.len()),
    }
    if deleted < args.ids.len() {
        bail!("{} deletes failed", args.ids.len() - deleted);
    }
    Ok(())
}

async fn cmd_settings(app: &Blobkeep, action: SettingsAction, format: OutputFormat) -> anyhow::Result<()> {
    match action {
        SettingsAction::Get { field } => {
            let mut value = serde_json::to_value(app.settings().await?)?;
            if let Some(field) = field {
                let Some(v) = value.get_mut(&field).map(serde_json::Value::take) else {
                    bail!("unknown setting: {field}");
                };
                let mut single = serde_json::Map::new();
                single.insert(field, v);
                value = serde_json::Value::Object(single);
            }
            match format {
                OutputFormat::Json => print_json(&value)?,
                OutputFormat::Text => {
                    if let Some(fields) = value.as_object() {
                        for (key, v) in fields {
                            println!("{} = {}", key.bold(), v);
                        }
                    }
                }
            }
        }
        SettingsAction::Set { field, value } => {
            let change = SettingChange::parse(&field, &value)?;
            let settings = app.set_setting(change).await?;
            match format {
                OutputFormat::Json => print_json(&settings)?,
                OutputFormat::Text => println!("Set {} = {}", field.bold(), value),
            }
        }
        SettingsAction::Export { out } => {
            let json = app.export_settings().await?;
            match out {
                Some(out) => {
                    fs::write(&out, json).with_context(|| format!("cannot write {}", out.display()))?;
                    println!("{} Exported settings to {}", "✓".green().bold(), out.display());
                }
                None => println!("{json}"),
            }
        }
        SettingsAction::Import { file } => {
            let json = fs::read_to_string(&file).with_context(|| format!("cannot read {}", file.display()))?;
            let settings = app.import_settings(&json).await?;
            match format {
                OutputFormat::Json => print_json(&settings)?,
                OutputFormat::Text => println!("{} Imported settings from {}", "✓".green().bold(), file.display()),
            }
        }
    }
    Ok(())
}

async fn cmd_background(app: &Blobkeep, action: BackgroundAction, format: OutputFormat) -> anyhow::Result<()> {
    match action {
        BackgroundAction::Set { path, mime } => {
            let file = read_upload(&path, mime.as_deref())?;
            let id = app.set_background(file).await?;
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({ "id": id }))?,
                OutputFormat::Text => println!("{} Background set to {}", "✓".green().bold(), id.as_str().cyan()),
            }
        }
    }
    Ok(())
}

async fn cmd_sweep(app: &Blobkeep, args: SweepArgs, format: OutputFormat) -> anyhow::Result<()> {
    let days = args.days.unwrap_or(app.config().retention_days);
    let report = app.sweep(days).await?;
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!("{} Deleted {} assets older than {} days.", "✓".green().bold(), report.total(), days);
            for kind in AssetKind::ALL {
                println!("  {kind}: {}", report.deleted_for(kind));
            }
        }
    }
    Ok(())
}

async fn cmd_stats(app: &Blobkeep, format: OutputFormat) -> anyhow::Result<()> {
    let stats = app.stats().await?;
    match format {
        OutputFormat::Json => {
            let total = stats.total();
            print_json(&serde_json::json!({ "kinds": &stats.kinds, "total": total }))?
        }
        OutputFormat::Text => {
            for kind in AssetKind::ALL {
                let k = stats.kind(kind);
                println!("{:<12} {:>5}  {}", kind.to_string().bold(), k.count, format_size(k.total_size_bytes));
            }
            let total = stats.total();
            println!("{:<12} {:>5}  {}", "total".bold(), total.count, format_size(total.total_size_bytes));
        }
    }
    Ok(())
}

async fn cmd_prune(app: &Blobkeep, format: OutputFormat) -> anyhow::Result<()> {
    let pruned = app.prune_dangling_references().await?;
    let slots: Vec<String> = pruned.iter().map(ToString::to_string).collect();
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "cleared": slots }))?,
        OutputFormat::Text if slots.is_empty() => println!("No dangling references."),
        OutputFormat::Text => {
            for slot in &slots {
                println!("  {} {}", "cleared:".yellow(), slot);
            }
        }
    }
    Ok(())
}

async fn cmd_compact(app: &Blobkeep, format: OutputFormat) -> anyhow::Result<()> {
    let Some(report) = app.compact().await? else {
        bail!("store is not durable");
    };
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => println!(
            "{} Compacted {} records: {} -> {} bytes",
            "✓".green().bold(),
            report.records,
            report.bytes_before,
            report.bytes_after
        ),
    }
    Ok(())
}

async fn cmd_clear(app: &Blobkeep, args: ClearArgs) -> anyhow::Result<()> {
    if !args.yes {
        bail!("refusing to delete all data without --yes");
    }
    app.clear_all().await?;
    println!("{} All assets and settings deleted.", "✓".green().bold());
    Ok(())
}
