use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tokio::runtime::Runtime;

use r2_uploader::batch::BatchUploader;
use r2_uploader::cli::{Args, Commands, ProfileAddOpts, ProfileCommands, UploadOpts};
use r2_uploader::cloud::engine::TransferEngine;
use r2_uploader::cloud::links::LinkIssuer;
use r2_uploader::cloud::memory::MemoryStore;
use r2_uploader::cloud::progress::LogObserver;
use r2_uploader::cloud::r2::R2Store;
use r2_uploader::cloud::store::ObjectStore;
use r2_uploader::config::{ProfileStore, StorageConfig, TransferConfig};
use r2_uploader::constants::{ERROR_FAILED_TO_ENUMERATE, ERROR_FAILED_TO_UPLOAD};
use r2_uploader::files::enumerator::{
    base_directory, enumerate, file_listing, format_mb, normalize_path, summarize,
};
use r2_uploader::files::key_resolver::{KeyLayout, KeyResolver};
use r2_uploader::models::BatchReport;

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    initialize_logging(args.verbose)?;

    match &args.command {
        Commands::Upload(opts) => handle_upload(opts),
        Commands::Profile { action } => handle_profile(action),
    }
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ).context("Failed to initialize logger")?;
    Ok(())
}

/// Credentials from the named profile, or from the inline flags
fn resolve_storage(opts: &UploadOpts) -> Result<StorageConfig> {
    match &opts.profile {
        Some(name) => {
            let store = ProfileStore::open_default()?;
            let profile = store
                .get(name)
                .ok_or_else(|| anyhow!("profile '{}' not found in {}", name, store.path().display()))?;
            info!("Using profile '{}'", profile.name);
            Ok(profile.credentials.clone())
        }
        None => opts.storage.to_config(),
    }
}

fn handle_upload(opts: &UploadOpts) -> Result<()> {
    let storage = resolve_storage(opts)?;
    let config = TransferConfig::from_mb(opts.part_size_mb, opts.concurrency, opts.max_attempts)?;

    let input = opts.input_path();
    let normalized = normalize_path(&input);
    let files = enumerate(&normalized.path).context(ERROR_FAILED_TO_ENUMERATE)?;
    if files.is_empty() {
        bail!("no files found under {}", input.display());
    }

    let summary = summarize(&files);
    println!("\nFound {} file(s) in {}:", summary.count, input.display());
    for line in file_listing(&files) {
        println!("{}", line);
    }
    println!("Total size: {}", format_mb(summary.total_bytes));

    if !opts.yes && !confirm("Do you want to proceed with the upload? (Y/n): ")? {
        println!("Upload cancelled.");
        return Ok(());
    }

    let layout = if opts.preserve_tree { KeyLayout::Tree } else { KeyLayout::Flat };
    let resolver = KeyResolver::new(base_directory(&input, &normalized), layout).with_root(&normalized.path);

    let store: Arc<dyn ObjectStore> = if opts.dry_run {
        info!("Dry run: files are uploaded to an in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(R2Store::new(&storage, config.max_attempts)?)
    };
    let link_expiry = config.link_expiry;
    let signer = LinkIssuer::for_storage(&storage, link_expiry)?;
    let engine = TransferEngine::new(store, config)?;
    let batch = BatchUploader::new(engine, Arc::new(signer));
    let jobs = batch.plan(&files, &resolver, &storage.bucket);

    let rt = Runtime::new().context("Failed to create Tokio runtime")?;
    let report = rt
        .block_on(batch.run(&jobs, Arc::new(LogObserver)))
        .context(ERROR_FAILED_TO_UPLOAD)?;

    print_report(&report, link_expiry);
    Ok(())
}

fn print_report(report: &BatchReport, link_expiry: Duration) {
    let secs = link_expiry.as_secs();
    let validity = if secs % 3600 == 0 {
        format!("{} hours", secs / 3600)
    } else {
        format!("{} seconds", secs)
    };

    println!("\nUpload complete. Presigned URLs (valid for {}):", validity);
    for line in report.link_lines() {
        println!("{}", line);
    }
}

/// Ask a yes/no question; an empty answer means yes
fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer.is_empty() || answer == "y" || answer == "yes")
}

fn handle_profile(action: &ProfileCommands) -> Result<()> {
    let mut store = ProfileStore::open_default()?;

    match action {
        ProfileCommands::Add(opts) => add_profile(&mut store, opts),
        ProfileCommands::List => {
            if store.list().is_empty() {
                println!("No profiles saved in {}", store.path().display());
                return Ok(());
            }
            for profile in store.list() {
                println!(
                    "{}\t{}/{}",
                    profile.name,
                    profile.credentials.endpoint(),
                    profile.credentials.bucket
                );
            }
            Ok(())
        }
        ProfileCommands::Remove { name } => {
            store.remove(name)?;
            println!("Profile '{}' removed", name);
            Ok(())
        }
    }
}

fn add_profile(store: &mut ProfileStore, opts: &ProfileAddOpts) -> Result<()> {
    let mut credentials = opts.storage.to_config()?;
    credentials.api_token = opts.api_token.clone();
    credentials.validate()?;

    store.add(&opts.name, credentials)?;
    println!("Profile '{}' saved to {}", opts.name, store.path().display());
    Ok(())
}
