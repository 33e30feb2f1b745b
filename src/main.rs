use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use subdl::SubdlError;
use subdl::archive::{ArchivePipeline, BatchReport, HttpFetcher, RetryPolicy};
use subdl::config::{Config, default_config_path};
use subdl::index::AnimeToshoIndex;
use subdl::library::{list_series, scan_videos};
use subdl::matcher::{MatchReport, RenameMatcher};
use subdl::metadata::AniListClient;
use subdl::prompt::LineChooser;
use subdl::query::QueryBuilder;
use subdl::rename_engine::{RenameOutcome, RenameResult, apply_mapping};
use subdl::resolver::TitleResolver;
use subdl::select::{
    Chooser, exclude_duplicates, pick_release, select_candidate, select_directory, select_episodes,
};
use subdl::tui::TuiChooser;

/// Download Anime Tosho subtitles for a local series and rename them to
/// match the video files.
#[derive(Debug, Parser)]
#[command(name = "subdl", version, about)]
struct Cli {
    /// Directory holding one folder per series
    anime_dir: Option<PathBuf>,

    /// Series folder to use instead of asking
    #[arg(long)]
    series: Option<String>,

    /// Configuration file
    #[arg(long, env = "SUBDL_CONFIG")]
    config: Option<PathBuf>,

    /// Use line prompts instead of the terminal UI
    #[arg(long)]
    plain: bool,

    /// Concurrent downloads (1-4)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Stop after extracting the subtitles
    #[arg(long)]
    no_rename: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

enum Outcome {
    Complete,
    Partial,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = if cli.plain || !io::stdin().is_terminal() {
        let mut chooser = LineChooser::new(BufReader::new(io::stdin()), io::stdout());
        run(&cli, &mut chooser).await
    } else {
        run(&cli, &mut TuiChooser::new()).await
    };

    match result {
        Ok(Outcome::Complete) => ExitCode::SUCCESS,
        Ok(Outcome::Partial) => ExitCode::from(2),
        Err(e) if matches!(e.downcast_ref::<SubdlError>(), Some(SubdlError::Cancelled)) => {
            println!("Cancelled.");
            ExitCode::from(1)
        }
        Err(e) => {
            error!("Fatal error: {e:#}");
            eprintln!("\nError: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "subdl=debug" } else { "subdl=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run<C: Chooser>(cli: &Cli, chooser: &mut C) -> Result<Outcome> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    info!("Loading configuration from {:?}", config_path);
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    if let Some(concurrency) = cli.concurrency {
        config.download.concurrency = concurrency;
        config.validate()?;
    }

    let root = match (&cli.anime_dir, config.remembered_root()) {
        (Some(dir), _) => dir.clone(),
        (None, Some(saved)) => {
            println!("Loaded anime directory from config: {}", saved.display());
            saved.to_path_buf()
        }
        (None, None) => PathBuf::from(chooser.ask("Please enter the path to your anime directory:")?),
    };
    if !root.is_dir() {
        bail!("The path '{}' is not a valid directory", root.display());
    }

    config.anime_root = Some(root.clone());
    if let Err(e) = config.save(&config_path) {
        warn!(error = %e, "could not save anime directory to config");
    }

    let series = list_series(&root)?;
    let directory = match &cli.series {
        Some(name) => series
            .into_iter()
            .find(|d| d.derived_name.eq_ignore_ascii_case(name))
            .with_context(|| format!("No series folder named {name:?} in {}", root.display()))?,
        None => select_directory(series, chooser)?,
    };
    println!("\nYou selected: {}", directory.derived_name);

    let timeout = config.download.timeout();
    let queries = QueryBuilder::new()?;
    let index = AnimeToshoIndex::new(&config.index, timeout)?;
    let metadata = AniListClient::new(&config.metadata, timeout)?;
    let resolver = TitleResolver::new(&index, &metadata, &queries);

    let resolution = resolver.resolve(&queries.build(&directory.derived_name)).await?;
    if let Some(canonical) = &resolution.canonical {
        println!("Found via AniList: {}", canonical.romaji_title);
    }

    let entry = select_candidate(resolution.entries, chooser)?;
    let series_title = entry.series_title.clone();
    let mut group = pick_release(entry, chooser)?;
    println!("\nYou selected group: {}", group.name);

    if config.index.refine_release_search {
        match resolver.expand_release(&series_title, group.clone()).await {
            Ok(expanded) => group = expanded,
            Err(e) => warn!(error = %e, "release refinement failed, using first listing"),
        }
    }

    let (group, excluded) = exclude_duplicates(group);
    for err in &excluded {
        println!("  ✗ {err}");
    }
    let listed = if excluded.is_empty() {
        Outcome::Complete
    } else {
        Outcome::Partial
    };
    if group.episodes.is_empty() {
        println!("No unambiguous episodes left to download.");
        return Ok(listed);
    }

    let episodes = select_episodes(&group, chooser)?;
    if episodes.is_empty() {
        println!("No episodes selected.");
        return Ok(listed);
    }

    let pipeline = ArchivePipeline::new(
        HttpFetcher::new(timeout)?,
        RetryPolicy::from(&config.download),
        directory.path.clone(),
        config.download.concurrency,
    );
    println!("\nDownloading {} subtitle file(s)...", episodes.len());
    let mut batch = pipeline.fetch_batch(&series_title, episodes).await;
    print_batch(&batch);

    if let Some(fatal) = batch.fatal.take() {
        return Err(fatal.into());
    }
    let mut outcome = if batch.failures.is_empty() {
        listed
    } else {
        Outcome::Partial
    };

    if cli.no_rename || batch.extracted.is_empty() {
        return Ok(outcome);
    }

    println!("\n--- Subtitle Renaming ---");
    let videos = scan_videos(&directory.path)?;
    if videos.is_empty() {
        println!("No video files found in the directory. Skipping renaming.");
        return Ok(outcome);
    }

    let report = RenameMatcher::new()?.match_files(batch.extracted, &videos);
    print_match(&report);
    if report.mapping.is_empty() {
        println!("Could not find any matching video files for the downloaded subtitles.");
        return Ok(outcome);
    }

    if !chooser.confirm("Do you want to apply these renames?", &report.mapping.describe())? {
        println!("Renaming cancelled.");
        return Ok(outcome);
    }

    let results = apply_mapping(&report.mapping);
    print_renames(&results);
    if results.iter().any(|r| !r.result.is_success()) {
        outcome = Outcome::Partial;
    }
    Ok(outcome)
}

fn print_batch(batch: &BatchReport) {
    println!("Extracted {} subtitle file(s).", batch.extracted.len());
    for failure in &batch.failures {
        println!("  ✗ {failure}");
    }
    if !batch.skipped.is_empty() {
        let skipped: Vec<String> = batch.skipped.iter().map(|e| e.to_string()).collect();
        println!("  Skipped episodes: {}", skipped.join(", "));
    }
    if let Some(fatal) = &batch.fatal {
        println!("  ✗ {fatal}");
    }
}

fn print_match(report: &MatchReport) {
    for conflict in &report.conflicts {
        println!("  ⚠ {conflict}");
    }
    for subtitle in &report.unmatched_subtitles {
        println!("  No video for episode {} ({})", subtitle.episode, subtitle.local_path.display());
    }
    for video in &report.unmatched_videos {
        println!("  No subtitle for {}", video.local_path.display());
    }
    for path in &report.unparsed_videos {
        println!("  Could not determine episode number for: {}", path.display());
    }
}

fn print_renames(results: &[RenameOutcome]) {
    for outcome in results {
        let name = outcome.operation.target.display();
        match &outcome.result {
            RenameResult::Success => println!("✓ Renamed to '{name}'"),
            RenameResult::Unchanged => println!("ℹ Already named '{name}'"),
            RenameResult::AlreadyExists => println!("✗ Target '{name}' already exists, skipped"),
            RenameResult::NoPermission => println!("✗ No permission to rename episode {}", outcome.episode),
            RenameResult::SourceNotFound => println!("✗ Subtitle for episode {} not found", outcome.episode),
            RenameResult::OtherError(msg) => println!("✗ Error renaming episode {}: {msg}", outcome.episode),
        }
    }
}
