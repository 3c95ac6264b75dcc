// lms-autoscan: discover and harvest graded quiz reviews on an LMS site.
//
// Launches Chrome on a persistent profile, takes the open site tabs as
// seeds, runs one scan session and prints its progress log.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lms_autoscan::backend::{BrowserTabSeeds, ChromiumBackend};
use lms_autoscan::browser_profile::{
    create_unique_profile, default_profile_dir, open_persistent_profile,
};
use lms_autoscan::browser_setup::launch_browser;
use lms_autoscan::config::ScanConfig;
use lms_autoscan::crawl_engine::{AutoScanner, CleanupResult, shutdown_browser};
use lms_autoscan::crawl_events::{EventBusError, ScanEvent, recv_event};
use lms_autoscan::harvest::{AnswerArchive, HarvestingBackend};
use lms_autoscan::utils::is_valid_url;

#[derive(Parser, Debug)]
#[command(name = "lms-autoscan")]
#[command(version)]
#[command(about = "Discover attempted quizzes on an LMS and harvest their review pages", long_about = None)]
struct Args {
    /// Base URL of the LMS, e.g. https://lms.example.edu
    #[arg(short, long)]
    site: Option<String>,

    /// Page to open as a discovery seed (repeatable); defaults to the dashboard
    #[arg(long = "seed")]
    seeds: Vec<String>,

    /// JSON file with a serialized ScanConfig; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the answer records are written to
    #[arg(short, long, default_value = "answers")]
    records_dir: PathBuf,

    /// Chrome profile to reuse so the LMS login persists
    #[arg(long)]
    profile_dir: Option<PathBuf>,

    /// Use a throwaway Chrome profile instead
    #[arg(long, conflicts_with = "profile_dir")]
    temp_profile: bool,

    #[arg(long)]
    headless: bool,

    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Seconds to wait for a page load; 0 waits forever
    #[arg(long)]
    load_timeout: Option<u64>,

    /// Pause after opening the seed tabs until Enter is pressed
    #[arg(long)]
    wait_for_login: bool,
}

fn build_config(args: &Args) -> Result<ScanConfig> {
    let builder = match (&args.config, &args.site) {
        (Some(path), site) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let file_config: ScanConfig = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid config {}", path.display()))?;
            let builder = ScanConfig::builder_from(file_config);
            match site {
                Some(site) => builder.site_url(site.clone()),
                None => builder,
            }
        }
        (None, Some(site)) => ScanConfig::builder().site_url(site.clone()),
        (None, None) => anyhow::bail!("Either --site or --config is required"),
    };

    let mut builder = builder;
    if args.headless {
        builder = builder.headless(true);
    }
    if let Some(max) = args.max_concurrent {
        builder = builder.max_concurrent_contexts(max);
    }
    if let Some(secs) = args.load_timeout {
        builder = builder.load_timeout_secs((secs > 0).then_some(secs));
    }
    if args.profile_dir.is_some() {
        builder = builder.chrome_data_dir(args.profile_dir.clone());
    }
    builder.build()
}

async fn wait_for_enter() -> Result<()> {
    println!("Log into the LMS in the browser window, then press Enter to start scanning.");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read from stdin")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let site = config.site()?;

    let profile = if args.temp_profile {
        create_unique_profile()?
    } else {
        let dir = match config.chrome_data_dir() {
            Some(dir) => dir.clone(),
            None => default_profile_dir()?,
        };
        open_persistent_profile(&dir)?
    };

    let (browser, handler) = launch_browser(config.headless(), profile.path()).await?;
    let browser = Arc::new(browser);

    let seed_urls = if args.seeds.is_empty() {
        vec![site.join("my/")?.to_string()]
    } else {
        args.seeds.clone()
    };
    for url in &seed_urls {
        if !is_valid_url(url) {
            warn!("Skipping invalid seed URL: {}", url);
            continue;
        }
        if let Err(e) = browser.new_page(url.as_str()).await {
            warn!("Failed to open seed tab {}: {}", url, e);
        }
    }
    if args.wait_for_login {
        wait_for_enter().await?;
    }

    let archive = Arc::new(AnswerArchive::open(&args.records_dir, config.record_prefix()).await?);
    let chromium = Arc::new(ChromiumBackend::new(Arc::clone(&browser)));
    let backend = Arc::new(HarvestingBackend::new(Arc::clone(&chromium), Arc::clone(&archive)));
    let seeds = Arc::new(BrowserTabSeeds::new(Arc::clone(&browser), site));

    let scanner = Arc::new(AutoScanner::new(config, backend, archive, seeds));

    let mut events = scanner.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match recv_event(&mut events).await {
                Ok(ScanEvent::Log(entry)) => println!("{entry}"),
                Ok(event) if event.is_terminal() => break,
                Ok(_) => {}
                Err(EventBusError::ReceiverLagged(missed)) => {
                    warn!("Progress display skipped {} events", missed);
                }
                Err(_) => break,
            }
        }
    });

    let stopper = {
        let scanner = Arc::clone(&scanner);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                scanner.stop();
            }
        })
    };

    let result = scanner.start().await;
    stopper.abort();
    let _ = stopper.await;
    let _ = printer.await;

    match &result {
        Ok(summary) => {
            println!(
                "\n{}: {} courses, {} quizzes, {} review pages; scanned {}, questions {}, saved {} ({:.1}s)",
                summary.state,
                summary.courses,
                summary.quizzes,
                summary.reviews,
                summary.counters.scanned,
                summary.counters.found,
                summary.counters.saved,
                summary.duration.as_secs_f64()
            );
        }
        Err(e) => eprintln!("\nScan failed: {e}"),
    }

    drop(scanner);
    match shutdown_browser(chromium, browser, handler).await? {
        CleanupResult::Success => info!("Browser closed"),
        CleanupResult::PartialFailure(errors) => warn!("Browser cleanup incomplete: {:?}", errors),
    }
    drop(profile);

    result.map(|_| ()).map_err(anyhow::Error::from)
}
