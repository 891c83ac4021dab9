use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tankobon", version, about = "Read pages out of comic archives, with caching and read-ahead")]
pub struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the pages of a volume
    Pages {
        /// Archive path, relative to `library.source_path`
        archive: PathBuf,
    },
    /// Write one page to a file, optionally resized
    Page {
        archive: PathBuf,
        /// Entry name as stored in the archive
        entry: String,
        #[arg(long, default_value_t = 0)]
        width: u32,
        #[arg(long, default_value_t = 0)]
        height: u32,
        /// JPEG quality for resized pages (defaults to `performance.image_quality`)
        #[arg(long)]
        quality: Option<u8>,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Write a thumbnail of a volume's first page to a file
    Thumbnail {
        archive: PathBuf,
        #[arg(long, default_value_t = 200)]
        size: u32,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Read ahead from a page and report progress until done
    Prefetch {
        archive: PathBuf,
        /// Page the reader is currently on
        entry: String,
    },
}
