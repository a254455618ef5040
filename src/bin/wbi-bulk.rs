use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::path::{Path, PathBuf};
use wbi_bulk::{CatalogKind, DownloadReport, Downloader, DownloaderConfig, storage};

#[derive(Parser, Debug)]
#[command(
    name = "wbi-bulk",
    version,
    about = "Bulk-download World Bank indicators for every country, with retry and pacing"
)]
struct Cli {
    /// JSON config file (base_url, page sizes, pacing, retry policy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every code of a catalog, one per line.
    Catalog {
        #[arg(value_enum)]
        kind: Kind,
    },
    /// Download every indicator for every country.
    Download(OutArgs),
    /// Download every indicator for one country.
    Country {
        /// Country code (e.g., AUS)
        #[arg(short, long)]
        code: String,
        #[command(flatten)]
        out: OutArgs,
    },
    /// Retry the pairs recorded in a failures file and merge them into a store.
    Retry {
        /// Result store to update in place.
        #[arg(long)]
        store: PathBuf,
        /// Failures file; rewritten with whatever still fails.
        #[arg(long)]
        failures: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Countries,
    Indicators,
}

impl From<Kind> for CatalogKind {
    fn from(k: Kind) -> Self {
        match k {
            Kind::Countries => CatalogKind::Country,
            Kind::Indicators => CatalogKind::Indicator,
        }
    }
}

#[derive(Args, Debug)]
struct OutArgs {
    /// Save the result store as JSON.
    #[arg(long)]
    out: PathBuf,
    /// Save failed pairs as JSON (default: <out>.failures.json).
    #[arg(long)]
    failures: Option<PathBuf>,
    /// Also export tidy CSV rows.
    #[arg(long)]
    csv: Option<PathBuf>,
}

fn default_failures_path(out: &Path) -> PathBuf {
    out.with_extension("failures.json")
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(p) => DownloaderConfig::from_path(p)?,
        None => DownloaderConfig::default(),
    };
    let mut dl = Downloader::new(config)?;
    match cli.cmd {
        Command::Catalog { kind } => {
            for code in dl.resolve(kind.into())? {
                println!("{}", code);
            }
            Ok(())
        }
        Command::Download(out) => {
            let report = dl.download_all()?;
            write_report(&report, &out)
        }
        Command::Country { code, out } => {
            let report = dl.download_country(&code)?;
            write_report(&report, &out)
        }
        Command::Retry { store, failures } => cmd_retry(&mut dl, &store, &failures),
    }
}

fn write_report(report: &DownloadReport, args: &OutArgs) -> Result<()> {
    storage::save_json(&report.store, &args.out)?;
    info!("saved {} pairs to {}", report.store.len(), args.out.display());

    let failures_path = args
        .failures
        .clone()
        .unwrap_or_else(|| default_failures_path(&args.out));
    storage::save_failures(&report.failures, &failures_path)?;
    if report.is_complete() {
        info!("no failed pairs");
    } else {
        warn!(
            "{} pairs failed; rerun with: wbi-bulk retry --store {} --failures {}",
            report.failures.len(),
            args.out.display(),
            failures_path.display()
        );
    }

    if let Some(csv) = args.csv.as_ref() {
        storage::save_csv(&report.store, csv)?;
        info!("wrote csv to {}", csv.display());
    }
    Ok(())
}

fn cmd_retry(dl: &mut Downloader, store_path: &Path, failures_path: &Path) -> Result<()> {
    let mut store = storage::load_json(store_path)?;
    let failures = storage::load_failures(failures_path)?;
    if failures.is_empty() {
        info!("nothing to retry");
        return Ok(());
    }
    let report = dl.retry_failures(&failures);
    let recovered = report.store.len();
    let remaining = report.merge_into(&mut store);
    storage::save_json(&store, store_path)?;
    storage::save_failures(&remaining, failures_path)?;
    info!(
        "recovered {} pairs, {} still failing",
        recovered,
        remaining.len()
    );
    Ok(())
}
