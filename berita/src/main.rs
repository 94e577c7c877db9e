use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;

mod cluster;
mod config;
mod corpus;
mod dates;
mod embedding;
mod error;
mod lda;
mod metrics;
mod models;
mod report;
mod runners;
mod scrape;
mod stopwords;
mod text;
mod viz;

use config::Settings;
use dates::DateNormalizer;
use scrape::page::page_source;
use scrape::{ContentDownloader, LinkScraper};

#[derive(Parser, Debug)]
#[command(version, about = "Indonesian news collection and topic modeling pipeline", long_about = None)]
struct Args {
    #[clap(short, long, global = true, env = "BERITA_CONFIG", help = "TOML settings file (defaults to ./berita.toml when present)")]
    config: Option<PathBuf>,
    #[clap(short, long, global = true, help = "Debug-level logging")]
    verbose: bool,
    #[clap(long, global = true, help = "Scrape date used to resolve relative dates (YYYY-MM-DD)")]
    reference_date: Option<NaiveDate>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect article links from news search, month by month
    Links {
        #[clap(short, long)]
        output: Option<PathBuf>,
        #[clap(long, env = "BROWSERLESS_URL", help = "Render pages through a Browserless endpoint")]
        browserless: Option<String>,
    },
    /// Download article bodies for every collected link
    Content {
        #[clap(short, long)]
        input: Option<PathBuf>,
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Rewrite date columns of CSV files to YYYY-MM-DD in place
    FixDates {
        #[clap(default_value = ".", help = "CSV files, or directories to search for dataset/lampiran CSVs")]
        paths: Vec<PathBuf>,
    },
    /// Clean article text for the embedding models
    Preprocess {
        #[clap(short, long)]
        input: Option<PathBuf>,
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Tune and report an LDA topic model
    Lda {
        #[clap(short, long)]
        input: Option<PathBuf>,
        #[clap(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Compare clustering topic models across embedders
    Embed {
        #[clap(short, long)]
        input: Option<PathBuf>,
        #[clap(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// LDA-guided clustering topic model
    Hybrid {
        #[clap(short, long)]
        input: Option<PathBuf>,
        #[clap(short, long)]
        output_dir: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "berita=debug" } else { "berita=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(date) = args.reference_date {
        settings.reference_date = date;
    }
    info!(reference_date = %settings.reference_date, "settings loaded");

    match args.command {
        Command::Links { output, browserless } => {
            if let Some(path) = output {
                settings.paths.links = path;
            }
            if browserless.is_some() {
                settings.scrape.browserless_url = browserless;
            }
            let token = std::env::var("BROWSERLESS_TOKEN").ok();
            let source = page_source(settings.scrape.browserless_url.as_deref(), token)?;
            let summary = LinkScraper::new(source, &settings.scrape, &settings.paths.links, settings.seed).run()?;
            println!(
                "🎉 Selesai: {} link baru, {} total ({} tugas dijalankan, {} dilewati)",
                summary.added, summary.total, summary.tasks_run, summary.tasks_skipped
            );
        }
        Command::Content { input, output } => {
            if let Some(path) = input {
                settings.paths.links = path;
            }
            if let Some(path) = output {
                settings.paths.content = path;
            }
            if !settings.paths.content.exists() && runners::input_missing(&settings.paths.links) {
                return Ok(());
            }
            let source = page_source(None, None)?;
            let summary = ContentDownloader::new(
                source,
                &settings.scrape,
                &settings.paths.links,
                &settings.paths.content,
                settings.seed,
            )
            .run()?;
            println!("✅ Data tersimpan di: {}", settings.paths.content.display());
            println!("📈 Statistik: Sukses: {} | Gagal: {}", summary.succeeded, summary.failed);
        }
        Command::FixDates { paths } => {
            runners::fix_dates::run(&paths, &DateNormalizer::new(settings.reference_date))?;
        }
        Command::Preprocess { input, output } => {
            if let Some(path) = input {
                settings.paths.content = path;
            }
            if let Some(path) = output {
                settings.paths.preprocessed = path;
            }
            runners::preprocess::run(&settings)?;
        }
        Command::Lda { input, output_dir } => {
            if let Some(path) = input {
                settings.paths.preprocessed = path;
            }
            if let Some(dir) = output_dir {
                settings.paths.lda_dir = dir;
            }
            runners::lda::run(&settings)?;
        }
        Command::Embed { input, output_dir } => {
            if let Some(path) = input {
                settings.paths.preprocessed = path;
            }
            if let Some(dir) = output_dir {
                settings.paths.embed_dir = dir;
            }
            runners::embed::run(&settings)?;
        }
        Command::Hybrid { input, output_dir } => {
            if let Some(path) = input {
                settings.paths.preprocessed = path;
            }
            if let Some(dir) = output_dir {
                settings.paths.hybrid_dir = dir;
            }
            runners::hybrid::run(&settings)?;
        }
    }
    Ok(())
}
