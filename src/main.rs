use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use ksu_integrator::kernel::git::GitError;
use ksu_integrator::{
    apply_toggle, ConsoleCollector, HookRegistry, Orchestrator, OrchestratorOptions, PatchApplier,
    PatchOutcome, RemovalScope,
};

/// KernelSU hook integration for kernels without kprobes.
#[derive(Parser)]
#[command(name = "ksu_integrator")]
#[command(about = "Inject or strip guarded KernelSU hooks in a kernel tree", long_about = None)]
struct Cli {
    /// Defconfig path, or a defconfig file name to look up under arch/arm64/configs
    defconfig: PathBuf,

    /// Disable KernelSU: set CONFIG_KSU=n and strip injected hooks
    #[arg(long)]
    disable_ksu: bool,

    /// Only patch core files (exec.c, open.c, read_write.c, stat.c)
    #[arg(long)]
    disable_external_mods: bool,

    /// Patch file to apply after resetting the tree
    #[arg(long)]
    patch: Option<PathBuf>,

    /// Kernel source root
    #[arg(long, default_value = ".")]
    kernel_dir: PathBuf,

    /// TOML hook registry (defaults to the built-in KernelSU table)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// When disabling, remove every `#ifdef <guard>` region instead of marked blocks only
    #[arg(long)]
    strip_all_guards: bool,

    /// Report what would change without writing files
    #[arg(long)]
    dry_run: bool,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(e) = ConsoleCollector::init(level) {
        eprintln!("[Main] WARNING: Failed to set ConsoleCollector as global logger: {}", e);
    }

    let registry = match &cli.registry {
        Some(path) => HookRegistry::load(path)
            .with_context(|| format!("Failed to load registry {}", path.display()))?,
        None => HookRegistry::builtin(),
    };

    if let Some(patch) = &cli.patch {
        run_patch_step(&cli.kernel_dir, patch)?;
    }

    let enable = !cli.disable_ksu;
    if let Err(e) = apply_toggle(&cli.defconfig, &cli.kernel_dir, &registry.toggle, enable, cli.dry_run) {
        log::error!("[Main] Configuration step failed, no source files were touched: {}", e);
        return Err(e).context("Configuration precondition failed");
    }

    let options = OrchestratorOptions {
        enable,
        disable_external_mods: cli.disable_external_mods,
        scope: if cli.strip_all_guards { RemovalScope::AllGuards } else { RemovalScope::Marked },
        dry_run: cli.dry_run,
    };
    let report = Orchestrator::new(&registry, &cli.kernel_dir, options).run();

    if report.failures() > 0 {
        log::warn!(
            "[Main] {} of {} file(s) could not be processed",
            report.failures(),
            report.files.len()
        );
    }
    Ok(())
}

/// Reset the tree and apply `patch`. Only an unreadable patch file is fatal.
fn run_patch_step(kernel_dir: &Path, patch: &Path) -> Result<()> {
    let result = PatchApplier::new(kernel_dir).and_then(|applier| applier.apply_patch(patch));
    match result {
        Ok(PatchOutcome::Applied) => {}
        Ok(PatchOutcome::CheckFailed(diagnostic)) => {
            log::warn!("[Main] Patch {} does not apply cleanly:\n{}", patch.display(), diagnostic);
        }
        Err(e @ GitError::PatchNotFound(_)) => {
            return Err(e).context("Patch step failed");
        }
        Err(e) => {
            log::error!("[Main] An error occurred while applying the patch: {}", e);
        }
    }
    Ok(())
}
