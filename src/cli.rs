use crate::config::{self, FileConfig};
use crate::model::{ControlMode, RunConfig, ToggleOutcome, ToggleState};
use crate::orchestrator::Toggler;
use crate::process::{ConfirmingController, ProcTable, ProcessController, SignalController};
use crate::state::FlagFileStore;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Layout {
    Launcher,
    Panel,
}

impl From<Layout> for ToggleState {
    fn from(l: Layout) -> Self {
        match l {
            Layout::Launcher => ToggleState::LauncherFocused,
            Layout::Panel => ToggleState::PanelFocused,
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "panel-toggle",
    version,
    about = "Switch the desktop between launcher-focused and panel-focused layouts"
)]
pub struct Cli {
    /// Print the current layout and exit without changing anything
    #[arg(long, conflicts_with = "to")]
    pub status: bool,

    /// Switch to this layout instead of flipping
    #[arg(long, value_enum)]
    pub to: Option<Layout>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Print a line per process action
    #[arg(short, long)]
    pub verbose: bool,

    /// Wait until each stop/start is visible in the process table
    #[arg(long)]
    pub confirm: bool,

    /// How long --confirm waits for each process (e.g. 500ms, 3s)
    #[arg(long)]
    pub confirm_timeout: Option<humantime::Duration>,

    /// Do not take the advisory lock around the flag file
    #[arg(long)]
    pub no_lock: bool,

    /// Marker file whose presence selects the launcher layout
    #[arg(long)]
    pub flag_file: Option<PathBuf>,

    /// Config file (default: <config dir>/panel-toggle/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Merge the config file with CLI overrides. CLI wins.
pub fn build_config(args: &Cli, file: FileConfig) -> Result<RunConfig> {
    let home = dirs::home_dir();
    let flag_file = match args.flag_file.clone().or(file.flag_file) {
        Some(p) => config::expand_home(&p, home.as_deref()),
        None => home
            .as_deref()
            .context("cannot determine home directory for the flag file")?
            .join(config::FLAG_FILE_NAME),
    };

    let lock_file = if args.no_lock || file.lock == Some(false) {
        None
    } else {
        Some(
            file.lock_file
                .map(|p| config::expand_home(&p, home.as_deref()))
                .unwrap_or_else(|| config::default_lock_path(&flag_file)),
        )
    };

    let control = if args.confirm {
        ControlMode::Confirm
    } else {
        file.control.unwrap_or_default()
    };

    Ok(RunConfig {
        flag_file,
        lock_file,
        helper: file.helper.unwrap_or_else(config::default_helper),
        panel: file.panel.unwrap_or_else(config::default_panel),
        duplicates: file.duplicates.unwrap_or_default(),
        control,
        confirm_timeout: args
            .confirm_timeout
            .map(Duration::from)
            .or(file.confirm_timeout)
            .unwrap_or(config::DEFAULT_CONFIRM_TIMEOUT),
    })
}

pub async fn run(args: Cli) -> Result<()> {
    let file = config::load(args.config.as_deref())?;
    let cfg = build_config(&args, file)?;
    tracing::debug!(control = ?cfg.control, duplicates = ?cfg.duplicates, "resolved config");

    let table = ProcTable::default();
    match cfg.control {
        ControlMode::BestEffort => {
            let ctl = SignalController::new(table, cfg.duplicates);
            run_with(&args, cfg, ctl).await
        }
        ControlMode::Confirm => {
            let ctl = ConfirmingController::new(table, cfg.duplicates, cfg.confirm_timeout);
            run_with(&args, cfg, ctl).await
        }
    }
}

async fn run_with<P: ProcessController>(args: &Cli, cfg: RunConfig, processes: P) -> Result<()> {
    let store = FlagFileStore::new(cfg.flag_file, cfg.lock_file);
    tracing::debug!(flag_file = %store.path().display(), "flag file");
    let toggler = Toggler::new(store, processes, cfg.helper, cfg.panel);

    if args.status {
        let state = toggler.status()?;
        if args.json {
            println!("{}", serde_json::json!({ "state": state }));
        } else {
            println!("{}", state.as_str());
        }
        return Ok(());
    }

    let outcome = match args.to {
        Some(layout) => toggler.apply(layout.into()).await?,
        None => toggler.toggle().await?,
    };
    report(args, &outcome)
}

/// Process failures never change the exit status; they are already logged as warnings.
fn report(args: &Cli, outcome: &ToggleOutcome) -> Result<()> {
    let failed = outcome.failed_actions();
    if failed > 0 {
        tracing::debug!(failed, "some process actions failed");
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else if args.verbose {
        for line in crate::text_summary::build_text_summary(outcome).lines {
            println!("{line}");
        }
    }
    Ok(())
}
