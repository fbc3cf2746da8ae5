use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use citescout_acl::{
    AnthologyCorpus, FetchProgress, HttpDownloader, KeywordSets, ScanProgress, ScanSettings,
    Scanner,
};
use citescout_core::config_file::{DEFAULT_CONFIG_PATH, load_config};
use citescout_core::graph::SemanticScholar;
use citescout_core::{AggregatorConfig, CitationAggregator, ProgressEvent};
use citescout_pdf_mupdf::MupdfBackend;

mod output;

use output::ColorMode;

/// Research data collection: citation graphs from Semantic Scholar and
/// keyword scans over the ACL Anthology
#[derive(Parser, Debug)]
#[command(name = "citescout", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch citations and references for seed papers and write CSVs
    Citations {
        /// Run config (YAML, or TOML by extension)
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Semantic Scholar API key (overrides S2_API_KEY and the config file)
        #[arg(long)]
        s2_api_key: Option<String>,

        /// Directory for the CSVs (overrides the config file)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Scan the ACL Anthology for prompt/bias papers
    ScanAnthology {
        /// Anthology checkout, its data directory, or a directory of XML files
        corpus: PathBuf,

        /// Output file for qualifying papers
        #[arg(short, long, default_value = "file_list.txt")]
        output: PathBuf,

        /// Keyword overrides (YAML, or TOML by extension)
        #[arg(short, long)]
        keywords: Option<PathBuf>,

        /// Scratch directory for downloaded PDFs
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Directory for the extraction failure log
        #[arg(long, default_value = "logs")]
        log_dir: PathBuf,

        /// Per-download timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Download the anthology bibliography XML from GitHub
    FetchAnthology {
        /// Directory to unpack the XML files into
        dest: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Citations {
            config,
            s2_api_key,
            output_dir,
            no_color,
        } => citations(&config, s2_api_key, output_dir, no_color).await,
        Command::ScanAnthology {
            corpus,
            output,
            keywords,
            work_dir,
            log_dir,
            timeout_secs,
            no_color,
        } => {
            let settings = ScanSettings {
                output,
                work_dir: work_dir.unwrap_or_else(|| ScanSettings::default().work_dir),
                log_dir,
            };
            scan_anthology(
                &corpus,
                keywords.as_deref(),
                settings,
                Duration::from_secs(timeout_secs),
                no_color,
            )
            .await
        }
        Command::FetchAnthology { dest } => fetch_anthology(&dest).await,
    }
}

async fn citations(
    config_path: &Path,
    s2_api_key: Option<String>,
    output_dir: Option<PathBuf>,
    no_color: bool,
) -> anyhow::Result<()> {
    let color = ColorMode(!no_color);

    let file = load_config(config_path)
        .with_context(|| format!("could not load config {}", config_path.display()))?;
    let mut config = AggregatorConfig::resolve(file)?;

    // API key: CLI flag > env var > config file
    if let Some(key) = s2_api_key
        .or_else(|| std::env::var("S2_API_KEY").ok())
        .filter(|k| !k.trim().is_empty())
    {
        config.s2_api_key = Some(key);
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    tracing::debug!(?config, "resolved config");

    let mut stdout = std::io::stdout();
    output::print_run_header(&mut stdout, &config, color)?;

    let graph = SemanticScholar::new(
        reqwest::Client::new(),
        config.s2_api_key.clone(),
        config.timeout,
    );
    let mut aggregator = CitationAggregator::new(Arc::new(graph), &config);

    let bar_style = ProgressStyle::with_template(
        "{spinner:.cyan} [{pos}/{len}] {msg} [{bar:40.cyan/dim}] (eta {eta})",
    )?
    .progress_chars("=> ");
    let bar: RefCell<Option<ProgressBar>> = RefCell::new(None);

    let result = aggregator
        .run(&config.seed_paper_ids, |event| match event {
            ProgressEvent::SeedStarted {
                index,
                total,
                label,
                citations,
                references,
            } => {
                let pb = ProgressBar::new((citations + references) as u64);
                pb.set_style(bar_style.clone());
                pb.set_prefix(label.clone());
                pb.set_message(format!("seed {}/{}: {}", index + 1, total, label));
                pb.enable_steady_tick(Duration::from_millis(120));
                *bar.borrow_mut() = Some(pb);
            }
            ProgressEvent::RelationProcessed { .. } => {
                if let Some(pb) = bar.borrow().as_ref() {
                    pb.inc(1);
                }
            }
            ProgressEvent::Throttled { pause } => {
                if let Some(pb) = bar.borrow().as_ref() {
                    pb.set_message(format!("call limit reached, pausing {}s", pause.as_secs()));
                }
            }
            ProgressEvent::SeedWritten {
                label,
                citations,
                references,
            } => {
                if let Some(pb) = bar.borrow_mut().take() {
                    pb.finish_and_clear();
                }
                let _ = output::print_seed_written(
                    &mut std::io::stdout(),
                    &label,
                    citations,
                    references,
                    color,
                );
            }
            ProgressEvent::UnionWritten { rows } => {
                tracing::debug!(rows, "union written");
            }
        })
        .await;

    if let Some(pb) = bar.borrow_mut().take() {
        pb.abandon();
    }

    let out = result.context("citation aggregation aborted")?;
    output::print_aggregate_summary(&mut stdout, &out, color)?;
    stdout.flush()?;
    Ok(())
}

async fn scan_anthology(
    corpus_dir: &Path,
    keywords: Option<&Path>,
    settings: ScanSettings,
    timeout: Duration,
    no_color: bool,
) -> anyhow::Result<()> {
    let color = ColorMode(!no_color);

    let keywords = match keywords {
        Some(path) => KeywordSets::load(path)?,
        None => KeywordSets::default(),
    };
    let corpus = AnthologyCorpus::open(corpus_dir)
        .with_context(|| format!("could not open corpus at {}", corpus_dir.display()))?;

    let output_path = settings.output.clone();
    let scanner = Scanner::new(
        Arc::new(HttpDownloader::new(timeout)?),
        Arc::new(MupdfBackend::new()),
        keywords,
        settings,
    );

    let bar = ProgressBar::new_spinner();
    bar.set_message("Reading corpus...");
    bar.enable_steady_tick(Duration::from_millis(120));
    let bar_style = ProgressStyle::with_template(
        "{spinner:.green} [{pos}/{len}] {msg} [{bar:40.green/dim}] (eta {eta})",
    )?
    .progress_chars("=> ");

    let summary = scanner
        .run(&corpus, |event| match event {
            ScanProgress::Candidates {
                scanned,
                candidates,
            } => {
                bar.set_length(candidates as u64);
                bar.set_style(bar_style.clone());
                bar.set_message(format!("{candidates} of {scanned} abstracts match"));
            }
            ScanProgress::PaperStarted { index, id, .. } => {
                bar.set_position(index as u64);
                bar.set_message(id);
            }
            ScanProgress::RowWritten { .. } | ScanProgress::Skipped { .. } => {}
            // Failed papers are listed on stdout, one id per line.
            ScanProgress::Failed { id, .. } => bar.suspend(|| println!("{id}")),
        })
        .await?;

    bar.finish_and_clear();
    output::print_scan_summary(&mut std::io::stdout(), &summary, &output_path, color)?;
    Ok(())
}

async fn fetch_anthology(dest: &Path) -> anyhow::Result<()> {
    let dl_bar_style = ProgressStyle::with_template(
        "{spinner:.cyan} {msg} [{bar:40.cyan/dim}] {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})",
    )?
    .progress_chars("=> ");
    let dl_unknown_style =
        ProgressStyle::with_template("{spinner:.cyan} {msg} {bytes} ({bytes_per_sec})")?;

    let bar = ProgressBar::new(0);
    bar.set_style(dl_unknown_style);
    bar.set_message("Connecting to GitHub...");
    bar.enable_steady_tick(Duration::from_millis(120));

    let files = citescout_acl::fetch_anthology(dest, |event| match event {
        FetchProgress::Downloading {
            bytes_downloaded,
            total_bytes,
        } => {
            if let Some(total) = total_bytes
                && bar.length() == Some(0)
            {
                bar.set_length(total);
                bar.set_style(dl_bar_style.clone());
            }
            bar.set_position(bytes_downloaded);
            bar.set_message("acl-anthology.tar.gz");
        }
        FetchProgress::Extracting { files_extracted } => {
            bar.set_message(format!("Extracting XML files... ({files_extracted})"));
        }
        FetchProgress::Complete { .. } => {}
    })
    .await
    .context("anthology download failed")?;

    bar.finish_and_clear();
    println!("Extracted {} XML files into {}", files, dest.display());
    Ok(())
}
