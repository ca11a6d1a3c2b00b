//! fido2-setup - main entry point

use std::path::PathBuf;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use fido2_setup::cli::{Cli, Commands};
use fido2_setup::logic::{Procedure, Session, login, unlock};
use fido2_setup::{SetupConfig, SystemRunner, TerminalPrompter, sanity};

/// Initialize tracing; `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Interrupts abort the whole procedure; completed steps stay in place.
fn init_interrupt_handler() {
    let result = ctrlc::set_handler(|| {
        eprintln!();
        eprintln!("✗ Interrupted. Steps already completed were kept; re-running is safe.");
        std::process::exit(130);
    });
    if let Err(e) = result {
        tracing::warn!("Failed to install interrupt handler: {}", e);
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SetupConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            SetupConfig::load_from_file(path)?
        }
        None => SetupConfig::default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_ref())?;

    let procedure = match cli.command {
        Commands::ShowConfig => {
            println!("{}", config.to_json()?);
            return Ok(());
        }
        Commands::Login => Procedure::Login,
        Commands::Unlock => Procedure::Unlock,
    };

    let mut runner = SystemRunner::new();
    sanity::run_preflight_checks(&mut runner, procedure)?;

    let mut prompter = TerminalPrompter::stdio();
    let mut session = Session::new(&mut runner, &mut prompter, &config);

    match procedure {
        Procedure::Login => {
            let home = std::env::var_os("HOME").map(PathBuf::from);
            let keys_path = config.resolve_u2f_keys_path(home.as_deref())?;
            let report = login::run_login(&mut session, &keys_path)?;
            debug!("Login enrollment report: {:?}", report);
        }
        Procedure::Unlock => {
            let report = unlock::run_unlock(&mut session, unlock::is_block_device)?;
            debug!("Unlock enrollment report: {:?}", report);
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);
    init_interrupt_handler();
    info!("fido2-setup starting: {:?}", cli.command);

    if let Err(e) = run(cli) {
        debug!("run failed: {:?}", e);
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}
