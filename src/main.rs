//! hyperplane - tag-addressed file operations.
//!
//! Usage:
//!   hyp ls [//TAG//...]           List the home root or a tag intersection
//!   hyp tags                      List tags
//!   hyp cp SRC DST [--tags]       Copy in the background
//!   hyp mv SRC DST [--tags]       Move in the background
//!   hyp dup PATH                  Duplicate next to the original ("x (copy)")
//!   hyp rm PATH                   Permanently delete
//!   hyp check PARENT NAME         Validate a new name
//!   hyp trash PATH                Send to the desktop trash
//!   hyp trashed                   List trashed entries
//!   hyp restore ORIGINAL TIME     Restore a trashed entry
//!   hyp restore-name NAME         Restore a trashed entry by storage name
//!   hyp purge NAME                Permanently remove a trashed entry

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use humansize::{DECIMAL, format_size};
use tracing_subscriber::EnvFilter;

use hyperplane_core::{FileHandle, HyperplaneConfig, PathResolver, TagSet};
use hyperplane_ops::{
    EventBus, FsEvent, NameValidator, OperationResult, PendingOperation, TransferEngine,
    TrashIndex, ValidationMessage, next_available_name,
};
use hyperplane_tags::{Entry, TagProjector};

#[derive(Parser)]
#[command(
    name = "hyperplane",
    version,
    about = "Tag-addressed file operations",
    long_about = "hyperplane treats the directories directly below its home root as tags.\n\n\
                  Anything stored below a tag directory carries that tag, and tag paths \
                  such as //work//urgent// list everything carrying all of them."
)]
struct Cli {
    /// Home root (defaults to ~/Hyperplane)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Show hidden entries
    #[arg(short = 'a', long, global = true)]
    show_hidden: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the home root or the entries matching a tag path
    Ls {
        /// Tag path such as //work//urgent//
        tags: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List every tag
    Tags,

    /// Copy a file or directory
    Cp {
        src: PathBuf,
        dst: PathBuf,

        /// The destination spells tags; announce newly created tag locations
        #[arg(short, long)]
        tags: bool,
    },

    /// Move a file or directory
    Mv {
        src: PathBuf,
        dst: PathBuf,

        /// The destination spells tags; announce newly created tag locations
        #[arg(short, long)]
        tags: bool,
    },

    /// Duplicate an entry next to itself
    Dup { path: PathBuf },

    /// Permanently delete a file or directory
    Rm { path: PathBuf },

    /// Check whether a name can be used inside (or next to) a location
    Check {
        parent: PathBuf,
        name: String,

        /// Check a rename of PARENT itself instead of a new child
        #[arg(short, long)]
        rename: bool,
    },

    /// Send an entry to the desktop trash
    Trash { path: PathBuf },

    /// List trashed entries
    Trashed {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Restore a trashed entry by original path and deletion time
    Restore {
        original: PathBuf,

        /// Deletion time as a Unix timestamp
        time: i64,
    },

    /// Restore a trashed entry by its storage name
    RestoreName { name: String },

    /// Permanently remove a trashed entry by its storage name
    Purge { name: String },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let home = match cli.home {
        Some(home) => home,
        None => dirs::home_dir()
            .map(|home| home.join("Hyperplane"))
            .ok_or_else(|| color_eyre::eyre::eyre!("No home directory; pass --home"))?,
    };
    let mut config = HyperplaneConfig::from_env(home);
    config.show_hidden = cli.show_hidden;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli.command, config))
}

async fn run(command: Command, config: HyperplaneConfig) -> Result<()> {
    let bus = EventBus::new();
    let engine = TransferEngine::new(&config, Arc::new(bus.clone()));
    let mut events = bus.subscribe();

    match command {
        Command::Ls { tags, format } => run_ls(&config, tags.as_deref(), format)?,
        Command::Tags => {
            let projector = TagProjector::new(&config);
            for tag in projector.list_tags().context("Failed to list tags")? {
                if config.should_show(tag.as_str()) {
                    println!("{tag}");
                }
            }
        }
        Command::Cp { src, dst, tags } => {
            let pending = engine.copy(&src, &dst, tags).context("Copy refused")?;
            report(pending).await?;
        }
        Command::Mv { src, dst, tags } => {
            let pending = engine.move_to(&src, &dst, tags).context("Move refused")?;
            report(pending).await?;
        }
        Command::Dup { path } => {
            let dst = next_available_name(&path)?;
            let pending = engine.copy(&path, &dst, false).context("Copy refused")?;
            report(pending).await?;
        }
        Command::Rm { path } => report(engine.delete(&path)).await?,
        Command::Check {
            parent,
            name,
            rename,
        } => {
            let validator = NameValidator::new(PathResolver::new(&config));
            let result = validator.validate(&FileHandle::for_path(parent), &name, rename);
            match result.message {
                Some(ValidationMessage::Warning(text)) => println!("ok (warning: {text})"),
                Some(ValidationMessage::Error(text)) => bail!(text),
                None => println!("ok"),
            }
        }
        Command::Trash { path } => {
            trash::delete(&path).with_context(|| format!("Failed to trash {}", path.display()))?;
        }
        Command::Trashed { format } => run_trashed(&config, format)?,
        Command::Restore { original, time } => {
            let pending = engine
                .restore(&original, time)
                .context("No matching trash record")?;
            report(pending).await?;
        }
        Command::RestoreName { name } => {
            report(engine.restore_handle(FileHandle::for_trash_entry(&name))).await?;
        }
        Command::Purge { name } => {
            report(engine.purge(FileHandle::for_trash_entry(&name))).await?;
        }
    }

    while let Ok(event) = events.try_recv() {
        match event {
            FsEvent::TagLocationCreated { tags, location } => {
                eprintln!("New tag location {tags} at {}", location.display());
            }
            other => tracing::debug!(?other, "unhandled event"),
        }
    }

    Ok(())
}

/// Follow an operation to completion, printing progress to stderr.
async fn report(mut pending: PendingOperation) -> Result<()> {
    while let Some(message) = pending.recv().await {
        match message {
            OperationResult::Progress(progress) => {
                eprintln!(
                    "{} {:>5.1}% ({} files, {})",
                    progress.operation_type,
                    progress.percentage(),
                    progress.files_total,
                    format_size(progress.bytes_total, DECIMAL)
                );
            }
            OperationResult::Complete(result) => {
                let complete = result?;
                println!("{}", complete.summary());
                return Ok(());
            }
        }
    }

    bail!("Operation ended without reporting completion")
}

/// List the home root or a tag intersection.
fn run_ls(config: &HyperplaneConfig, tags: Option<&str>, format: OutputFormat) -> Result<()> {
    let projector = TagProjector::new(config);

    let entries: Vec<Entry> = match tags {
        Some(text) if TagSet::is_tag_path(text) => {
            let tags = projector.resolve_tag_path(text);
            if tags.is_empty() {
                bail!("No such tags");
            }
            eprintln!("{}", tags.title());
            projector.enumerate(&tags)?.collect()
        }
        Some(text) => bail!("Not a tag path: {text}"),
        None => projector.list_home().context("Failed to read home")?,
    };

    let visible = entries.into_iter().filter(|entry| match entry {
        Entry::Item(path) => path
            .file_name()
            .is_none_or(|name| config.should_show(&name.to_string_lossy())),
        Entry::Tag(tag) => config.should_show(tag.as_str()),
    });

    match format {
        OutputFormat::Text => {
            for entry in visible {
                match entry {
                    Entry::Item(path) => println!("{}", path.display()),
                    Entry::Tag(tag) => println!("//{tag}//"),
                }
            }
        }
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = visible.map(|entry| entry_json(&entry)).collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

/// JSON form of a listing entry. Paths are rendered lossily.
fn entry_json(entry: &Entry) -> serde_json::Value {
    match entry {
        Entry::Item(path) => serde_json::json!({ "item": path.to_string_lossy() }),
        Entry::Tag(tag) => serde_json::json!({ "tag": tag }),
    }
}

/// List trashed entries with their original paths.
fn run_trashed(config: &HyperplaneConfig, format: OutputFormat) -> Result<()> {
    let records = TrashIndex::new(config)
        .records()
        .context("Failed to read trash")?;

    match format {
        OutputFormat::Text => {
            for record in records {
                println!(
                    "{}\t{}\t{}",
                    record.deleted_at,
                    record.original_path.display(),
                    record.storage_path.display()
                );
            }
        }
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = records
                .iter()
                .map(|record| {
                    serde_json::json!({
                        "storage_path": record.storage_path.to_string_lossy(),
                        "original_path": record.original_path.to_string_lossy(),
                        "deleted_at": record.deleted_at,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}
