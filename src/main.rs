mod cli;
mod error;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tankobon_config::Config;
use tankobon_library::{Archives, CacheStats, Library, PrefetchSnapshot, Settings, Transform};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.logging.level.as_str().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let library = Library::new(Arc::new(Archives), Settings::from(&config));
    let result = run(&library, &config, cli.command).await;
    library.shutdown().await;
    result
}

async fn run(library: &Library, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Pages { archive } => {
            let entries = library.list_entries(&config.resolve(archive)).await.or_raise(|| ErrorKind::Library)?;
            for entry in entries {
                println!("{}\t{}", entry.size, entry.name);
            }
        },
        Command::Page {
            archive,
            entry,
            width,
            height,
            quality,
            output,
        } => {
            let quality = quality.unwrap_or(config.performance.image_quality);
            let page = library
                .render_entry(&config.resolve(archive), &entry, Transform::new(width, height, quality))
                .await
                .or_raise(|| ErrorKind::Library)?;
            write_output(&output, &page.data).await?;
            tracing::info!(content_type = page.content_type, bytes = page.data.len(), "Page written");
        },
        Command::Thumbnail { archive, size, output } => {
            let page = library.thumbnail(&config.resolve(archive), size).await.or_raise(|| ErrorKind::Library)?;
            write_output(&output, &page.data).await?;
            tracing::info!(bytes = page.data.len(), "Thumbnail written");
        },
        Command::Prefetch { archive, entry } => {
            let archive = config.resolve(archive);
            let started = library.request_prefetch(&archive, &entry).await.or_raise(|| ErrorKind::Library)?;
            tracing::info!(snapshot = ?started.snapshot(), "Prefetch requested");
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Interrupted; stopping prefetch");
                        break;
                    },
                    () = tokio::time::sleep(POLL_INTERVAL) => {},
                }
                let status = library.prefetch_status(&archive).await.or_raise(|| ErrorKind::Library)?;
                if !status.in_progress {
                    break;
                }
                tracing::info!(prefetched = status.prefetched, total = status.total_images, "Prefetching");
            }
            // Status is re-read after shutdown so an interrupted job reports as stopped.
            library.shutdown().await;
            let status = library.prefetch_status(&archive).await.or_raise(|| ErrorKind::Library)?;
            print_json(&PrefetchReport {
                prefetch: status,
                cache: library.cache_stats().await,
            })?;
        },
    }
    Ok(())
}

async fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(path, data).await.or_raise(|| ErrorKind::Output(path.to_path_buf()))
}

#[derive(Serialize)]
struct PrefetchReport {
    prefetch: PrefetchSnapshot,
    cache: CacheStats,
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).or_raise(|| ErrorKind::Encode)?;
    println!("{json}");
    Ok(())
}
