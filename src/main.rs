//! Main entry point for the streamzip CLI application.
//!
//! This binary archives files and folders into a ZIP file, either streaming
//! each file into the archive as it is read or building the whole archive in
//! memory first.

use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};

use streamzip::zip::archive_name;
use streamzip::{ByteSink, Cli, FileSink, FileSystem, LocalFs, ZipBuilder, ZipStreamWriter};

/// Application entry point.
///
/// Parses command-line arguments, sets up logging and dispatches to the
/// streaming or buffered archive builder.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let (entries, size) = if cli.buffered {
        build_buffered(&cli).await?
    } else {
        build_streaming(&cli).await?
    };

    if !cli.is_quiet() {
        eprintln!("\n{}: {} entries, {}", cli.archive, entries, format_size(size));
    }

    Ok(())
}

/// Stream every path into the archive file.
///
/// Returns the number of entries and the archive size.
async fn build_streaming(cli: &Cli) -> Result<(usize, u64)> {
    let sink = FileSink::create(Path::new(&cli.archive)).await?;
    // The archive may sit inside a folder being added; never read it back
    let archive = tokio::fs::canonicalize(&cli.archive).await?;
    let mut zip = ZipStreamWriter::new(sink, LocalFs::new())
        .with_compression(cli.compression())
        .with_exclude(archive);
    if let Some(dir) = &cli.directory {
        zip = zip.with_root(dir);
    }

    for path in &cli.paths {
        zip.add_path(Path::new(path)).await?;
    }
    zip.close().await?;

    Ok((zip.entries().len(), zip.bytes_written()))
}

/// Read every path into memory, then write the finished archive at once.
///
/// Folders are walked depth-first in path order, matching the streaming
/// writer's entry order.
async fn build_buffered(cli: &Cli) -> Result<(usize, u64)> {
    let fs = LocalFs::new();
    let mut zip = ZipBuilder::new().with_compression(cli.compression());
    let root = PathBuf::from(cli.directory.as_deref().unwrap_or(""));
    // A previous run's archive is about to be replaced, so leave it out
    let archive = tokio::fs::canonicalize(&cli.archive).await.ok();

    // Stack of paths still to visit, next one on top
    let mut pending: Vec<PathBuf> = cli.paths.iter().rev().map(|p| root.join(p)).collect();

    while let Some(path) = pending.pop() {
        if archive.is_some() && fs.canonicalize(&path).await.ok() == archive {
            continue;
        }
        let name = archive_name(path.strip_prefix(&root).unwrap_or(&path));

        if fs.metadata(&path).await?.is_dir {
            if !name.is_empty() {
                zip.add_folder(&name)?;
                info!("  adding: {}/", name);
            }
            let mut children = fs.read_dir(&path).await?;
            children.sort_by(|a, b| b.path.cmp(&a.path));
            pending.extend(children.into_iter().map(|child| child.path));
        } else {
            let content = tokio::fs::read(&path).await?;
            zip.add_file(&name, &content)?;
            info!("  adding: {}", name);
        }
    }

    let mut sink = FileSink::create(Path::new(&cli.archive)).await?;
    zip.finalize_into(&mut sink).await?;

    Ok((zip.entries().len(), sink.bytes_written()))
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
