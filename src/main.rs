use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use simplelog::{ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger};

use mac_triage::cli::{Args, Commands};
use mac_triage::config::{load_or_default, CollectionOptions};
use mac_triage::identity::{detect_os_version, generate_run_id, RunIdentity};
use mac_triage::interrupt;
use mac_triage::models::RunContext;
use mac_triage::orchestrator::{plan, plan_excluding, Orchestrator, RunPlan, UnitOutcome};
use mac_triage::output::ArchiveBuilder;
use mac_triage::privileges::{check_privileges, lower_priority};
use mac_triage::units::UnitRegistry;

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Handle subcommands
    if let Some(cmd) = &args.command {
        initialize_logging(&args, None)?;
        return handle_subcommand(cmd);
    }

    // Load configuration, command-line flags win
    let mut options = load_or_default(args.config.as_deref())?;
    args.apply_to(&mut options);

    let registry = UnitRegistry::with_builtin_units()
        .map_err(|e| anyhow!("Invalid unit catalog: {}", e))?;

    if args.list_modules {
        list_units(&registry);
        return Ok(());
    }

    if options.include_units.is_empty() && options.exclude_units.is_empty() {
        return Err(anyhow!(
            "No units selected. Pass -m/--include-modules (e.g. 'all' or 'live') or -x/--exclude-modules."
        ));
    }

    fs::create_dir_all(&options.output_dir)
        .context(format!("Failed to create output directory {}", options.output_dir.display()))?;

    let start_time = Utc::now();
    let run_id = generate_run_id(options.archiving());

    let log_path = (!options.no_logfile)
        .then(|| options.output_dir.join(format!("runtime{}.log", run_id)));
    initialize_logging(&args, log_path.as_deref())?;

    info!("Starting mac-triage v{}", env!("CARGO_PKG_VERSION"));

    // Preflight
    check_privileges(args.force)?;
    options.check_forensic_mount()?;
    if options.low_priority {
        lower_priority();
    }
    interrupt::install_handler()?;

    // Identity
    let identity = RunIdentity::resolve(run_id.clone(), start_time, &options);
    if let Some(path) = &log_path {
        rename_log(path, &options.output_dir, &identity)?;
    }

    let os_version = detect_os_version(&options.input_dir, options.input_sys_dir.as_deref(), options.is_live());
    match &os_version {
        Some(version) => info!("Input root OS version: {}", version),
        None => warn!("Could not determine the OS version of the input root"),
    }

    let archive = options
        .archiving()
        .then(|| ArchiveBuilder::new(&options.output_dir, &identity.prefix, &run_id));
    let parallel = options.parallel;
    let ctx = Arc::new(RunContext::new(options, identity, os_version));

    // Plan
    let run_plan = build_plan(&ctx.options, &registry);
    if run_plan.is_empty() {
        warn!("No valid units to run");
    } else {
        info!("Planned units: {}", run_plan.units.join(", "));
    }

    // Execute
    let orchestrator = Orchestrator::new(Arc::clone(&ctx), &registry, archive);
    let reports = orchestrator.execute(&run_plan, parallel)?;

    let failed: Vec<&str> = reports
        .iter()
        .filter(|r| r.outcome != UnitOutcome::Completed)
        .map(|r| r.name.as_str())
        .collect();
    if !failed.is_empty() {
        error!("Units that did not complete: {}", failed.join(", "));
    }

    match orchestrator.finish(&run_plan, &reports)? {
        Some(path) => info!("Collection archive: {}", path.display()),
        None => info!("Outputs left in {}", ctx.output_dir().display()),
    }

    info!("mac-triage completed");
    Ok(())
}

/// Initialize terminal logging and, when a path is given, the runtime log file
fn initialize_logging(args: &Args, log_file: Option<&Path>) -> Result<()> {
    let term_level = if args.debug {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        term_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file {
        let file = File::create(path)
            .context(format!("Failed to create log file {}", path.display()))?;
        loggers.push(WriteLogger::new(LevelFilter::Debug, Config::default(), file));
    }

    CombinedLogger::init(loggers).context("Failed to initialize logger")?;
    Ok(())
}

/// Give the runtime log its final `{prefix},runtime{run_id}.log` name.
///
/// The open handle keeps writing to the renamed file.
fn rename_log(path: &Path, output_dir: &Path, identity: &RunIdentity) -> Result<PathBuf> {
    let target = output_dir.join(format!("{},runtime{}.log", identity.prefix, identity.run_id));
    fs::rename(path, &target)
        .context(format!("Failed to rename log file to {}", target.display()))?;
    Ok(target)
}

/// Handle subcommands (init-config)
fn handle_subcommand(cmd: &Commands) -> Result<()> {
    match cmd {
        Commands::InitConfig { path } => {
            info!("Creating default configuration file at {}", path.display());
            CollectionOptions::create_default_config_file(path)?;
            info!("Configuration created successfully");
            Ok(())
        }
    }
}

/// Print every registered unit, live units first
fn list_units(registry: &UnitRegistry) {
    println!("Available units ({}):", registry.len());
    for unit in registry.all() {
        let live = if unit.live_only { " [live only]" } else { "" };
        println!("  {} (v{}){} - {}", unit.name, unit.version, live, unit.description);
    }
}

/// Include tokens take precedence; otherwise plan everything but the excluded units
fn build_plan(options: &CollectionOptions, registry: &UnitRegistry) -> RunPlan {
    let available = registry.all();
    if !options.include_units.is_empty() {
        if !options.exclude_units.is_empty() {
            warn!("Both include and exclude lists given, ignoring the exclude list");
        }
        plan(&options.include_units, &available)
    } else {
        plan_excluding(&options.exclude_units, &available)
    }
}
