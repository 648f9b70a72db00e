use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use log::{error, info, warn};

use setupkit::adapters::{FileLockManager, LocalEnv, TargetEnv};
use setupkit::api::errors::{exit_code_for, ErrorId};
use setupkit::constants::{LOCK_FILE_NAME, RECORDS_DIR, UNINSTALL_LOG_EXT};
use setupkit::fs::file_stem_for;
use setupkit::journal::UninstallLog;
use setupkit::logging::JsonlSink;
use setupkit::manifest::Manifest;
use setupkit::policy::Policy;
use setupkit::types::{ApplyMode, UninstallRecord};
use setupkit::{CancelToken, Installer, InstallerBuilder, RunFlags, RunOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "setupkit",
    version,
    about = "Install and uninstall applications from a setup manifest"
)]
struct Cli {
    /// Lay every install location out below this directory instead of the user's own
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Append structured facts as JSON lines to this file
    #[arg(long, global = true, value_name = "FILE")]
    facts: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a manifest without installing anything
    Validate { manifest: PathBuf },
    /// Print the ordered install steps as JSON
    Plan { manifest: PathBuf },
    /// Install the application described by a manifest
    Install {
        manifest: PathBuf,
        /// No prompts; honors skipifsilent
        #[arg(long)]
        silent: bool,
        /// Report what would happen without touching anything
        #[arg(long)]
        dry_run: bool,
        /// Never start post-install programs
        #[arg(long)]
        no_launch: bool,
    },
    /// Remove an installed application using its uninstall log
    Uninstall {
        /// Path of the uninstall log to replay
        #[arg(long, conflicts_with = "app", value_name = "FILE")]
        log: Option<PathBuf>,
        /// Name of the installed application
        #[arg(long)]
        app: Option<String>,
        /// No confirmation prompt
        #[arg(long)]
        silent: bool,
    },
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn target_env(root: Option<&Path>, policy: &Policy) -> Result<LocalEnv, String> {
    let env = match root {
        Some(r) => LocalEnv::rooted(r),
        None => LocalEnv::for_current_user().map_err(|e| e.to_string())?,
    };
    Ok(env.with_backup_tag(policy.backup.tag.clone()))
}

fn facts_sink(path: Option<&Path>) -> Result<JsonlSink, String> {
    match path {
        Some(p) => JsonlSink::to_file(p)
            .map_err(|e| format!("cannot open facts file {}: {e}", p.display())),
        None => Ok(JsonlSink::default()),
    }
}

fn installer(
    cli: &Cli,
    policy: Policy,
    cancel: CancelToken,
) -> Result<Installer<JsonlSink, JsonlSink>, String> {
    let env = target_env(cli.root.as_deref(), &policy)?;
    let lock_path = env.resolve_state_dir().join(LOCK_FILE_NAME);
    Ok(InstallerBuilder::new(
        facts_sink(cli.facts.as_deref())?,
        JsonlSink::default(),
        policy,
        Box::new(env),
    )
    .lock_manager(Some(Box::new(FileLockManager::new(lock_path))))
    .cancel_token(cancel)
    .build())
}

fn ask(prompt: &str) -> bool {
    if !std::io::stdin().is_terminal() {
        return false;
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(true)
        .interact()
        .unwrap_or(false)
}

fn load(manifest: &Path) -> Result<Manifest, i32> {
    Manifest::load(manifest).map_err(|e| {
        error!("{e}");
        eprintln!("invalid manifest {}: {e}", manifest.display());
        exit_code_for(ErrorId::E_VALIDATION)
    })
}

fn cmd_install(
    cli: &Cli,
    manifest: &Path,
    silent: bool,
    dry_run: bool,
    no_launch: bool,
    cancel: CancelToken,
) -> i32 {
    let m = match load(manifest) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let mut policy = Policy::production_preset();
    policy.launch.enabled = !no_launch;
    let api = match installer(cli, policy, cancel) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            return exit_code_for(ErrorId::E_GENERIC);
        }
    };
    let plan = match api.plan(&m) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("cannot plan install: {e}");
            return exit_code_for(ErrorId::E_GENERIC);
        }
    };
    let mut log = match UninstallLog::open_append(&plan.app.log_path) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("cannot open uninstall log {}: {e}", plan.app.log_path.display());
            return exit_code_for(ErrorId::E_GENERIC);
        }
    };
    let mode = if dry_run { ApplyMode::DryRun } else { ApplyMode::Commit };
    let result = api.execute(&plan, &mut log, mode);
    match &result {
        Ok(r) => println!(
            "{} {}: {} steps {} ({} files copied, {} unchanged)",
            plan.app.name,
            plan.app.version,
            r.applied_count,
            if dry_run { "planned" } else { "applied" },
            r.files_changed,
            r.files_skipped
        ),
        Err(e) => eprintln!("{e}"),
    }

    for run in &plan.runs {
        let wants_prompt = result.as_ref().is_ok_and(|r| !r.dry_run)
            && api.policy().launch.enabled
            && run.flags.postinstall
            && !silent
            && !run.flags.skip_if_not_silent;
        let consent = wants_prompt && ask(&format!("{}?", run.description));
        match api.maybe_run(run, &result, &RunFlags { silent, consent }) {
            RunOutcome::Launched { pid } => info!("launched {} (pid {pid})", run.program.display()),
            RunOutcome::Skipped(reason) => {
                info!("not launching {}: {reason:?}", run.program.display());
            }
            RunOutcome::Failed(w) => warn!("{w}"),
        }
    }

    match result {
        Ok(_) => 0,
        Err(e) => exit_code_for(e.error_id()),
    }
}

/// Find the uninstall log for `app`: through its record when present, else by naming convention.
fn log_for_app(env: &dyn TargetEnv, app: &str) -> PathBuf {
    let state = env.resolve_state_dir();
    let stem = file_stem_for(app);
    let record = state.join(RECORDS_DIR).join(format!("{stem}.json"));
    std::fs::read(&record)
        .ok()
        .and_then(|b| serde_json::from_slice::<UninstallRecord>(&b).ok())
        .map_or_else(|| state.join(format!("{stem}.{UNINSTALL_LOG_EXT}")), |r| r.log_path)
}

fn cmd_uninstall(
    cli: &Cli,
    log_path: Option<&Path>,
    app: Option<&str>,
    silent: bool,
    cancel: CancelToken,
) -> i32 {
    let api = match installer(cli, Policy::production_preset(), cancel) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            return exit_code_for(ErrorId::E_GENERIC);
        }
    };
    let path = match (log_path, app) {
        (Some(p), _) => p.to_path_buf(),
        (None, Some(a)) => log_for_app(api.env(), a),
        (None, None) => {
            eprintln!("uninstall needs --log <FILE> or --app <NAME>");
            return exit_code_for(ErrorId::E_GENERIC);
        }
    };
    let mut log = match UninstallLog::open(&path) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("cannot read uninstall log {}: {e}", path.display());
            return exit_code_for(ErrorId::E_GENERIC);
        }
    };
    if !silent && !ask(&format!("Remove everything recorded in {}?", path.display())) {
        println!("uninstall cancelled");
        return 0;
    }
    match api.uninstall(&mut log) {
        Ok(r) => {
            println!("removed {} entries ({} skipped)", r.reversed, r.skipped.len());
            for s in &r.skipped {
                info!("skipped {} ({:?})", s.path.display(), s.reason);
            }
            0
        }
        Err(e) => {
            eprintln!("{e}");
            exit_code_for(e.error_id())
        }
    }
}

fn run(cli: &Cli) -> i32 {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!("cannot install Ctrl-C handler: {e}");
    }
    match &cli.command {
        Command::Validate { manifest } => match load(manifest) {
            Ok(m) => {
                println!(
                    "{} {}: {} files, {} shortcuts, {} run entries",
                    m.app().name,
                    m.app().version,
                    m.files().len(),
                    m.shortcuts().len(),
                    m.runs().len()
                );
                0
            }
            Err(code) => code,
        },
        Command::Plan { manifest } => {
            let m = match load(manifest) {
                Ok(m) => m,
                Err(code) => return code,
            };
            let api = match installer(cli, Policy::default(), cancel) {
                Ok(a) => a,
                Err(e) => {
                    eprintln!("{e}");
                    return exit_code_for(ErrorId::E_GENERIC);
                }
            };
            match api.plan(&m).map(|p| serde_json::to_string_pretty(&p)) {
                Ok(Ok(json)) => {
                    println!("{json}");
                    0
                }
                Ok(Err(e)) => {
                    eprintln!("cannot render plan: {e}");
                    exit_code_for(ErrorId::E_GENERIC)
                }
                Err(e) => {
                    eprintln!("cannot plan install: {e}");
                    exit_code_for(ErrorId::E_GENERIC)
                }
            }
        }
        Command::Install {
            manifest,
            silent,
            dry_run,
            no_launch,
        } => cmd_install(cli, manifest, *silent, *dry_run, *no_launch, cancel),
        Command::Uninstall { log, app, silent } => {
            cmd_uninstall(cli, log.as_deref(), app.as_deref(), *silent, cancel)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    let code = run(&cli);
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
