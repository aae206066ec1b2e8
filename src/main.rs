//! # Pressroom CLI (`press`)
//!
//! The `press` binary drives the snapshot pipeline: listing published
//! posts, batch-generating PDF snapshots, and serving print views plus the
//! snapshot read path.
//!
//! ## Usage
//!
//! ```bash
//! press --config ./config/press.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `press posts` | List published posts from the backend API |
//! | `press generate` | Render a PDF snapshot for every post |
//! | `press generate --slug <slug>` | Render a snapshot for one post |
//! | `press serve` | Start the print-view and snapshot HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pressroom::{backend, config, server, snapshot};

/// Pressroom — snapshot pipeline for published blog posts.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/press.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "press",
    about = "Pressroom — media resolution, PDF snapshots, and snapshot serving for published posts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/press.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List published posts known to the backend API.
    ///
    /// Useful for verifying connectivity and seeing which slugs a
    /// `generate` run would cover.
    Posts,

    /// Render PDF snapshots for published posts.
    ///
    /// Navigates a headless browser to each post's print view, waits for
    /// fonts and images to settle, and writes one single-page PDF per slug
    /// to the artifact directory, overwriting prior snapshots. One post's
    /// failure does not abort the batch; a per-slug summary is printed at
    /// the end.
    Generate {
        /// Only snapshot the post with this slug.
        #[arg(long)]
        slug: Option<String>,

        /// Show what would be rendered without launching a browser.
        #[arg(long)]
        dry_run: bool,
    },

    /// Start the HTTP server.
    ///
    /// Serves print views (consumed by the snapshot browser) and the
    /// snapshot read path: cached artifact bytes when present, otherwise a
    /// redirect to the backend's on-demand generation endpoint.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Posts => {
            backend::run_posts(&cfg).await?;
        }
        Commands::Generate { slug, dry_run } => {
            snapshot::run_generate(&cfg, slug, dry_run).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
