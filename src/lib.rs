// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod output;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_from_cli, ConfigFile};
use crate::engine::{shutdown_signal, Supervisor, Task};
use crate::exec::process::run_to_completion;
use crate::exec::LifecycleController;
use crate::fs::{FileSystem, RealFileSystem};
use crate::output::OutletFactory;

/// Outlet name of the global on-start command.
const GLOBAL_ON_START: &str = "onstart";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (flags or TOML file)
/// - the shared output sink
/// - the global on-start command
/// - one task loop + process controller per task
/// - Ctrl-C / SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_from_cli(&args)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let outlets = OutletFactory::stdout();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    // Outlets are created before anything prints so padding covers every name.
    let controllers: Vec<Arc<LifecycleController>> = cfg
        .tasks()
        .iter()
        .enumerate()
        .map(|(index, task)| {
            Arc::new(LifecycleController::new(task, &outlets, index, Arc::clone(&fs)))
        })
        .collect();

    run_global_on_start(&cfg, &outlets).await;

    let tasks: Vec<Task<Arc<LifecycleController>>> = cfg
        .into_tasks()
        .into_iter()
        .zip(controllers)
        .map(|(task, controller)| Task::new(task, controller, Arc::clone(&fs)))
        .collect();

    info!(tasks = tasks.len(), "supervising");
    Supervisor::new(tasks).run(shutdown_signal()).await?;
    info!("all tasks stopped");
    Ok(())
}

/// Run the main section's `onstart` (multi-task configs only) to completion.
///
/// Failures are logged; the tasks start regardless.
async fn run_global_on_start(cfg: &ConfigFile, outlets: &OutletFactory) {
    let Some(spec) = cfg.on_start() else {
        return;
    };
    let spec = spec.expanded();
    let index = cfg.tasks().len();
    let stdout = outlets.outlet(GLOBAL_ON_START, index, false);
    let stderr = outlets.outlet(GLOBAL_ON_START, index, true);

    info!(cmd = %spec, cwd = ?cfg.cwd(), "running global on-start command");
    match run_to_completion(&spec, cfg.cwd(), &stdout, &stderr).await {
        Ok(status) if status.success() => {}
        Ok(status) => warn!(code = ?status.code(), "global on-start command failed"),
        Err(e) => error!(error = %e, "global on-start command could not run"),
    }
}

/// Print the resolved tasks without running anything.
fn print_dry_run(cfg: &ConfigFile) {
    println!("wwatch dry-run");
    if let Some(on_start) = cfg.on_start() {
        println!("  onstart: {on_start}");
        println!("  cwd: {}", cfg.cwd().display());
    }
    println!();

    println!("tasks ({}):", cfg.tasks().len());
    for task in cfg.tasks() {
        println!("  - {}", task.name);
        println!("      cmd: {}", task.command);
        println!("      dir: {}", task.root.display());
        println!("      cwd: {}", task.cwd.display());
        println!("      match: {}", task.match_pattern.as_str());
        if let Some(ignore) = &task.ignore_pattern {
            println!("      ignore: {}", ignore.as_str());
        }
        println!("      delay: {:?}", task.delay);
        if let Some(on_start) = &task.on_start {
            println!("      onstart: {on_start}");
        }
        if let Some(pid_file) = &task.pid_file {
            println!("      pidfile: {}", pid_file.display());
        }
        if task.recursive {
            println!("      recursive: true");
        }
        if task.dotfiles {
            println!("      dotfiles: true");
        }
        if task.after {
            println!("      after: true");
        }
    }

    debug!("dry-run complete (no execution)");
}
