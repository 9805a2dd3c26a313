mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{CleanArgs, Cli, CollisionArg, Commands, CopyArgs, DupesArgs, ListArgs, RenameArgs};
use dotenv::dotenv;
use progress::{print_size_line, CliReporter, CopyRenderer};
use tracing::{error, info, warn};

use romantics_core::copier::{plan_collisions, CollisionPolicy, CopyOptions, CopyOutcome, CopyTask};
use romantics_core::duplicates::actions::{move_files, remove_files, select_redundant, ActionReport};
use romantics_core::duplicates::{DuplicateFinder, ScanOptions};
use romantics_core::rename::{apply_renames, plan_clean, plan_pattern_rename, plan_renames, RenamePlan};
use romantics_core::scanner::walk::collect_files;
use romantics_core::scanner::{list_files, total_size, ExtensionFilter, FileEntry, ListOptions};
use romantics_core::space::free_space;
use romantics_core::units::format_size;
use romantics_core::{clean_filename, start_copy, strip_annotations, AppConfig, SystemSpaceProbe};

fn main() {
    dotenv().ok();

    let args = Cli::parse();
    let guard = logging::init_logger(args.verbose);

    let config = match romantics_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            drop(guard);
            process::exit(1);
        }
    };

    let result = match args.command {
        Some(Commands::List(list)) => run_list(&config, list),
        Some(Commands::Space { dir }) => run_space(&config, dir),
        Some(Commands::Dupes(dupes)) => run_dupes(&config, dupes),
        Some(Commands::Copy(copy)) => run_copy(&config, copy),
        Some(Commands::Clean(clean)) => run_clean(&config, clean),
        Some(Commands::Rename(rename)) => run_rename(&config, rename),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        drop(guard);
        process::exit(1);
    }
}

fn pick_dir(arg: Option<PathBuf>, configured: &Option<PathBuf>, what: &str) -> anyhow::Result<PathBuf> {
    arg.or_else(|| configured.clone())
        .ok_or_else(|| anyhow!("no {} directory given and none configured", what))
}

fn list_options(config: &AppConfig, filter: ExtensionFilter) -> ListOptions {
    ListOptions::new(filter).ignoring(&config.ignore_patterns)
}

fn run_list(config: &AppConfig, args: ListArgs) -> anyhow::Result<()> {
    let dir = pick_dir(args.dir, &config.source_dir, "source")?;
    let options = list_options(config, ExtensionFilter::parse(&args.ext)).sort_by(args.sort.into());
    let files = list_files(&dir, &options)?;

    for file in &files {
        print_size_line(&file.name, file.size);
    }
    let total = total_size(&files);
    println!();
    println!(
        "{} files, {} total",
        files.len().to_string().green(),
        format_size(total).green()
    );
    info!("Listed {} files ({} bytes) in {}", files.len(), total, dir.display());
    Ok(())
}

fn run_space(config: &AppConfig, dir: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = pick_dir(dir, &config.dest_dir, "destination")?;
    let available = free_space(&dir).with_context(|| format!("checking free space of {}", dir.display()))?;
    print_size_line(&format!("free in {}", dir.display()), available);
    Ok(())
}

fn run_dupes(config: &AppConfig, args: DupesArgs) -> anyhow::Result<()> {
    let roots: Vec<PathBuf> = if args.dirs.is_empty() {
        [&config.source_dir, &config.dest_dir]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    } else {
        args.dirs
    };
    if roots.is_empty() {
        bail!("no directories given and none configured");
    }

    let files = collect_files(&roots, &list_options(config, ExtensionFilter::All), args.recursive)?;
    let paths: Vec<PathBuf> = files.into_iter().map(|f| f.path).collect();

    let finder = DuplicateFinder::new(ScanOptions {
        verify: config.verify_duplicates && !args.no_verify,
        cancelled_scan: config.cancelled_scan,
    });
    install_cancel_handler(finder.cancel_token())?;
    let report = finder.find(&paths, &CliReporter::new());

    for error in &report.errors {
        warn!("{}", error);
    }
    for group in &report.groups {
        println!(
            "{} {} x{}{}",
            group.fingerprint.to_hex()[..12].dimmed(),
            format_size(group.size).cyan(),
            group.members.len(),
            if group.verified { "" } else { " (unverified)" }
        );
        for path in group.paths() {
            println!("    {}", path.display());
        }
    }
    println!();
    println!(
        "{} files scanned, {} duplicate groups, {} files in groups, {} wasted",
        report.files_scanned,
        report.groups.len().to_string().red(),
        report.duplicate_files().to_string().red(),
        format_size(report.wasted_bytes()).red(),
    );
    info!(
        "Duplicate scan: {} files, {} groups, {} wasted bytes",
        report.files_scanned,
        report.groups.len(),
        report.wasted_bytes()
    );

    if !args.remove && args.move_to.is_none() {
        return Ok(());
    }
    if report.cancelled {
        warn!("Scan was cancelled; not touching any files");
        return Ok(());
    }

    let redundant: Vec<PathBuf> = report
        .groups
        .iter()
        .flat_map(|group| select_redundant(group, args.keep.into()))
        .collect();
    if redundant.is_empty() {
        return Ok(());
    }

    let action = match &args.move_to {
        Some(dest) => format!("Move {} files to {}?", redundant.len(), dest.display()),
        None => format!("Delete {} files?", redundant.len()),
    };
    if !args.yes && !prompt_confirm(&action, Some(false))? {
        return Ok(());
    }

    let outcome = match &args.move_to {
        Some(dest) => move_files(&redundant, dest)?,
        None => remove_files(&redundant),
    };
    print_action_report(&outcome);
    Ok(())
}

fn print_action_report(report: &ActionReport) {
    for failure in &report.failed {
        error!("{}", failure);
    }
    println!(
        "{} done, {} already gone, {} failed",
        report.succeeded.len().to_string().green(),
        report.missing.len(),
        report.failed.len().to_string().red(),
    );
    info!(
        "{} done, {} already gone, {} failed",
        report.succeeded.len(),
        report.missing.len(),
        report.failed.len()
    );
}

fn gather_tasks(config: &AppConfig, sources: &[PathBuf], filter: &ExtensionFilter) -> anyhow::Result<Vec<CopyTask>> {
    let mut tasks = Vec::new();
    for source in sources {
        if source.is_dir() {
            let files = list_files(source, &list_options(config, filter.clone()))?;
            tasks.extend(files.into_iter().map(|f| CopyTask::new(f.path, f.size)));
        } else {
            tasks.push(CopyTask::from_path(source)?);
        }
    }
    Ok(tasks)
}

fn run_copy(config: &AppConfig, args: CopyArgs) -> anyhow::Result<()> {
    let sources = if args.sources.is_empty() {
        vec![pick_dir(None, &config.source_dir, "source")?]
    } else {
        args.sources
    };
    let dest = pick_dir(args.to, &config.dest_dir, "destination")?;
    let mut tasks = gather_tasks(config, &sources, &ExtensionFilter::parse(&args.ext))?;
    if tasks.is_empty() {
        info!("Nothing to copy");
        return Ok(());
    }

    let mut options = CopyOptions::from(config);
    options.check_space = !args.no_space_check;
    if let Some(policy) = args.on_collision.and_then(CollisionArg::policy) {
        options.collision = policy;
    }

    let collisions = plan_collisions(&tasks, &dest);
    let total: u64 = tasks.iter().map(|t| t.size).sum();

    if args.dry_run {
        for task in &tasks {
            print_size_line(&task.source.display().to_string(), task.size);
        }
        for collision in &collisions {
            println!("  {} {} exists", "!".yellow(), collision.existing.display());
        }
        println!();
        println!(
            "{} files, {} to copy into {}",
            tasks.len(),
            format_size(total).green(),
            dest.display()
        );
        return Ok(());
    }

    if args.on_collision == Some(CollisionArg::Ask) {
        for collision in &collisions {
            let prompt = format!("{} already exists. Replace it?", collision.existing.display());
            let policy = if prompt_confirm(&prompt, Some(false))? {
                CollisionPolicy::Overwrite
            } else {
                CollisionPolicy::Skip
            };
            tasks[collision.index].on_collision = Some(policy);
        }
    }

    let job = start_copy(tasks, dest.clone(), options, Arc::new(SystemSpaceProbe))?;
    install_cancel_handler(job.cancel_token())?;
    let renderer = CopyRenderer::new();
    for event in job.events().iter() {
        renderer.handle(&event);
    }

    match job.wait() {
        CopyOutcome::Completed(summary) => {
            println!(
                "Copied {} files ({}), {} skipped",
                summary.files_copied().to_string().green(),
                format_size(summary.bytes_copied).green(),
                summary.skipped.len()
            );
            info!(
                "Copied {} files ({} bytes) into {}, {} skipped",
                summary.files_copied(),
                summary.bytes_copied,
                dest.display(),
                summary.skipped.len()
            );
            Ok(())
        }
        CopyOutcome::Cancelled(summary) => {
            warn!("Copy cancelled after {} files", summary.files_copied());
            Ok(())
        }
        CopyOutcome::Failed { error, summary } => {
            if summary.files_copied() > 0 {
                info!("{} files were copied before the failure", summary.files_copied());
            }
            Err(error.into())
        }
    }
}

fn preview_renames(plans: &[RenamePlan]) {
    for plan in plans {
        println!("  {} {} {}", plan.old_name, "->".dimmed(), plan.new_name.green());
    }
}

fn apply_with_confirmation(plans: &[RenamePlan], apply: bool, yes: bool) -> anyhow::Result<()> {
    preview_renames(plans);
    if plans.is_empty() {
        info!("All names are already clean");
        return Ok(());
    }
    if !apply {
        info!("{} files would be renamed; pass --apply to rename them", plans.len());
        return Ok(());
    }
    if !yes && !prompt_confirm(&format!("Rename {} files?", plans.len()), Some(false))? {
        return Ok(());
    }

    let report = apply_renames(plans);
    for failure in &report.failed {
        error!("{}", failure);
    }
    println!(
        "Renamed {} files, {} failed",
        report.renamed.len().to_string().green(),
        report.failed.len().to_string().red()
    );
    Ok(())
}

fn source_entries(config: &AppConfig, dir: Option<PathBuf>) -> anyhow::Result<Vec<FileEntry>> {
    let dir = pick_dir(dir, &config.source_dir, "source")?;
    Ok(list_files(&dir, &list_options(config, ExtensionFilter::All))?)
}

fn run_clean(config: &AppConfig, args: CleanArgs) -> anyhow::Result<()> {
    let entries = source_entries(config, args.dir)?;
    let plans = if args.strip_annotations {
        plan_renames(&entries, |name| clean_filename(&strip_annotations(name)))
    } else {
        plan_clean(&entries)
    };
    apply_with_confirmation(&plans, args.apply, args.yes)
}

fn run_rename(config: &AppConfig, args: RenameArgs) -> anyhow::Result<()> {
    let entries = source_entries(config, args.dir)?;
    let plans = plan_pattern_rename(&entries, &args.search, &args.replace)?;
    apply_with_confirmation(&plans, args.apply, args.yes)
}

/// The first Ctrl-C sets `token` so the running operation stops at its next
/// check and cleans up. A second one exits at once.
fn install_cancel_handler(token: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        if token.swap(true, Ordering::SeqCst) {
            process::exit(130);
        }
        eprintln!("{}", "Cancelling... press Ctrl-C again to quit now".yellow());
    })
    .context("installing the Ctrl-C handler")
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            // stdin closed
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
