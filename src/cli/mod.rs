//! # CLI Module
//!
//! Command-line interface for the media organizer.
//!
//! ## Usage
//! ```bash
//! # Analyze only (dry run)
//! media-organizer run --path /Volumes/Backup --library ~/Media
//!
//! # Analyze, review, then move files
//! media-organizer run --path /Volumes/Backup --library ~/Media --execute
//!
//! # Test on a subset (never prunes the cache)
//! media-organizer run --path /Volumes/Backup --limit 1000
//!
//! # JSON plan for scripting
//! media-organizer run --path /Volumes/Backup --output json
//!
//! # Drop cache rows for files that no longer exist
//! media-organizer prune --path /Volumes/Backup
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use media_organizer::config::OrganizerConfig;
use media_organizer::core::cache::{CacheBackend, SqliteCache};
use media_organizer::core::organize::{DisabledSuggester, ExecutionSummary};
use media_organizer::core::pipeline::{OrganizationPlan, PipelineBuilder};
use media_organizer::error::Result;
use media_organizer::events::{Event, EventChannel, EventSender, PipelineEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::warn;

/// Media Organizer - Deduplicate and file a media collection into albums
#[derive(Parser, Debug)]
#[command(name = "media-organizer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a folder and optionally organize it
    Run {
        #[command(flatten)]
        roots: Roots,

        /// Duplicate trash folder [default: <path>/.duplicates-trash]
        #[arg(long)]
        trash: Option<PathBuf>,

        /// Model used for album name suggestions
        #[arg(long)]
        model: Option<String>,

        /// Base URL of the naming service
        #[arg(long)]
        endpoint: Option<String>,

        /// Skip the naming service and use folder-derived names
        #[arg(long)]
        no_ai: bool,

        /// Worker threads per stage [default: half the cores]
        #[arg(short, long)]
        workers: Option<usize>,

        /// Only process the first N files (never prunes the cache)
        #[arg(long)]
        limit: Option<usize>,

        /// Do not prune stale cache entries
        #[arg(long)]
        no_prune: bool,

        /// Move files after review (default is a dry run)
        #[arg(long)]
        execute: bool,

        /// Skip the confirmation prompt before moving files
        #[arg(short, long)]
        yes: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// List every planned file
        #[arg(short, long)]
        verbose: bool,
    },

    /// Scan the whole folder and prune cache rows for vanished files
    Prune {
        #[command(flatten)]
        roots: Roots,
    },

    /// Show cache statistics
    Stats {
        /// Library root [default: home directory]
        #[arg(long)]
        library: Option<PathBuf>,

        /// Cache database [default: <library>/.media-organizer-cache/cache.db]
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct Roots {
    /// Folder to scan
    #[arg(short, long)]
    path: PathBuf,

    /// Library root [default: home directory]
    #[arg(long)]
    library: Option<PathBuf>,

    /// Cache database [default: <library>/.media-organizer-cache/cache.db]
    #[arg(long)]
    cache: Option<PathBuf>,
}

impl Roots {
    fn into_config(self) -> OrganizerConfig {
        let mut config = OrganizerConfig::new(self.path);
        if let Some(library) = self.library {
            config.library_root = library;
        }
        config.cache_path = self.cache;
        config
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            roots,
            trash,
            model,
            endpoint,
            no_ai,
            workers,
            limit,
            no_prune,
            execute,
            yes,
            output,
            verbose,
        } => {
            let mut config = roots.into_config();
            config.trash_root = trash;
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(endpoint) = endpoint {
                config.endpoint = endpoint;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            config.file_limit = limit;
            config.prune = !no_prune;
            config.dry_run = !execute;

            run_organize(config, no_ai, yes, output, verbose)
        }
        Commands::Prune { roots } => run_prune(roots.into_config()),
        Commands::Stats { library, cache } => {
            let mut config = OrganizerConfig::default();
            if let Some(library) = library {
                config.library_root = library;
            }
            config.cache_path = cache;
            run_stats(&config)
        }
    }
}

fn run_organize(
    config: OrganizerConfig,
    no_ai: bool,
    yes: bool,
    output: OutputFormat,
    verbose: bool,
) -> Result<()> {
    config.validate()?;
    let term = Term::stderr();
    let pretty = matches!(output, OutputFormat::Pretty);

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Media Organizer").bold().cyan(),
            style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line(&format!("  scanning {}", config.scan_root.display()))
            .ok();
        if config.is_capped() {
            term.write_line(&format!(
                "  {}",
                style("file limit set: the cache will not be pruned").yellow()
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    let dry_run = config.dry_run;
    let mut builder = build_pipeline(config);
    if no_ai {
        builder = builder.suggester(Box::new(DisabledSuggester));
    }
    let pipeline = builder.build()?;

    let mut plan = with_progress(pretty, |events| pipeline.analyze(events))?;

    match output {
        OutputFormat::Pretty => print_plan(&term, &plan, verbose),
        OutputFormat::Json => print_json(&plan),
    }

    if dry_run {
        if pretty {
            term.write_line(&format!(
                "{}",
                style("Dry run: no files were moved. Re-run with --execute to organize.").dim()
            ))
            .ok();
        }
        return Ok(());
    }

    if plan.is_empty() {
        if pretty {
            term.write_line("Nothing to do.").ok();
        }
        return Ok(());
    }

    if !yes && !confirm(&term) {
        term.write_line("Aborted, no files were moved.").ok();
        return Ok(());
    }

    let summary = with_progress(pretty, |events| pipeline.execute(&mut plan, events));
    match output {
        OutputFormat::Pretty => print_summary(&term, &summary),
        OutputFormat::Json => print_json(&summary),
    }
    Ok(())
}

fn run_prune(config: OrganizerConfig) -> Result<()> {
    config.validate()?;
    let term = Term::stderr();
    let pipeline = build_pipeline(config).build()?;

    if pipeline.cache().is_none() {
        term.write_line("No cache available, nothing to prune.").ok();
        return Ok(());
    }

    let pruned = with_progress(true, |events| pipeline.prune(events))?;
    term.write_line(&format!(
        "{} Pruned {} stale cache entries",
        style("✓").green().bold(),
        style(pruned.unwrap_or(0)).cyan()
    ))
    .ok();
    Ok(())
}

fn run_stats(config: &OrganizerConfig) -> Result<()> {
    let term = Term::stdout();
    let cache = SqliteCache::open(&config.cache_path())?;
    let stats = cache.stats()?;

    term.write_line(&format!("{}", style(cache.path().display()).bold())).ok();
    term.write_line(&format!("  {} files", style(stats.total_entries).cyan()))
        .ok();
    term.write_line(&format!("  {} with digest", style(stats.with_digest).cyan()))
        .ok();
    term.write_line(&format!(
        "  {} with camera metadata",
        style(stats.with_metadata).cyan()
    ))
    .ok();
    term.write_line(&format!(
        "  {} album name suggestions",
        style(stats.suggestions).cyan()
    ))
    .ok();

    cache.close();
    Ok(())
}

/// Pipeline for `config`, with the on-disk cache when it can be opened
fn build_pipeline(config: OrganizerConfig) -> PipelineBuilder {
    let cache = open_cache(&config.cache_path());
    let builder = PipelineBuilder::from_config(config);
    match cache {
        Some(cache) => builder.cache(cache),
        None => builder,
    }
}

fn open_cache(path: &Path) -> Option<Arc<dyn CacheBackend>> {
    match SqliteCache::open(path) {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            warn!("running without cache: {}", e);
            None
        }
    }
}

/// Run `work` while a progress bar follows its events
fn with_progress<T>(enabled: bool, work: impl FnOnce(&EventSender) -> T) -> T {
    let (sender, receiver) = EventChannel::new();

    let progress = enabled.then(|| {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb
    });

    let progress_clone = progress.clone();
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            for _ in receiver.iter() {}
            return;
        };
        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_position(0);
                    pb.set_message(phase.to_string());
                }
                Event::Progress(p) => {
                    pb.set_length(p.total as u64);
                    pb.set_position(p.processed as u64);
                }
                Event::Status(line) => pb.set_message(line.message),
                _ => {}
            }
        }
    });

    let result = work(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    result
}

fn confirm(term: &Term) -> bool {
    term.write_str("Move these files now? [y/N] ").ok();
    match term.read_line() {
        Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn print_plan(term: &Term, plan: &OrganizationPlan, verbose: bool) {
    let report = &plan.report;

    term.write_line(&format!("{} Analysis Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();
    term.write_line(&format!(
        "  {} files ({} photos, {} videos, {} music) in {:.1}s",
        style(report.total_files()).cyan(),
        report.photos,
        report.videos,
        report.music,
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} new, {} metadata and {} digests from cache",
        style(report.new_files).cyan(),
        report.metadata.cache_hits,
        report.hashing.cache_hits
    ))
    .ok();
    if let Some(pruned) = report.pruned {
        term.write_line(&format!("  {} stale cache entries pruned", pruned))
            .ok();
    }
    term.write_line(&format!(
        "  {} duplicate groups, {} files to trash ({})",
        style(report.duplicate_groups).cyan(),
        report.redundant_files,
        style(format_bytes(report.reclaimable_bytes)).yellow()
    ))
    .ok();
    term.write_line(&format!(
        "  {} albums, {} files to move",
        style(report.albums).cyan(),
        report.files_to_move
    ))
    .ok();
    term.write_line("").ok();

    if !plan.albums.is_empty() {
        term.write_line(&format!("{}", style("Albums:").bold().underlined()))
            .ok();
        for album in &plan.albums {
            term.write_line(&format!(
                "  {} ({} files, {})",
                style(&album.name).bold(),
                album.files.len(),
                format_bytes(album.total_bytes())
            ))
            .ok();
            term.write_line(&format!(
                "    {} {}",
                style("→").dim(),
                display_path(&album.destination)
            ))
            .ok();
            if verbose {
                for record in &album.files {
                    term.write_line(&format!("      {}", display_path(&record.path)))
                        .ok();
                }
            }
        }
        term.write_line("").ok();
    }

    if verbose && !plan.duplicates.is_empty() {
        term.write_line(&format!("{}", style("Duplicates:").bold().underlined()))
            .ok();
        for group in &plan.duplicates {
            for path in &group.files {
                let marker = if path == &group.best {
                    style("★").green().to_string()
                } else {
                    style("○").dim().to_string()
                };
                term.write_line(&format!("  {} {}", marker, display_path(path)))
                    .ok();
            }
            term.write_line("").ok();
        }
    }
}

fn print_summary(term: &Term, summary: &ExecutionSummary) {
    term.write_line("").ok();
    term.write_line(&format!("{} Organize Complete", style("✓").green().bold()))
        .ok();
    term.write_line(&format!(
        "  {} moved ({}), {} trashed, {} folders created",
        style(summary.moved).cyan(),
        format_bytes(summary.bytes_moved),
        style(summary.trashed).cyan(),
        summary.folders_created
    ))
    .ok();

    if summary.failed > 0 {
        term.write_line(&format!(
            "  {} files could not be moved:",
            style(summary.failed).red().bold()
        ))
        .ok();
        for error in &summary.errors {
            term.write_line(&format!("    {}", error)).ok();
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => warn!("could not serialize output: {}", e),
    }
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
