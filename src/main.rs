mod domain;
mod infrastructure;
mod presentation;

use crate::domain::error::SetupError;
use crate::domain::settings::SettingsService;
use crate::domain::vehicle::Vehicle;
use crate::infrastructure::bluetooth::BluetoothService;
use crate::infrastructure::logging;
use crate::presentation::cli::{self, Cli, SetupRequest};
use crate::presentation::input::StdinLines;
use crate::presentation::shell::{Shell, ShellOptions};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings_service = match &cli.settings {
        Some(path) => SettingsService::with_path(path.clone()),
        None => SettingsService::new()?,
    };
    cli.apply_overrides(settings_service.get_mut());
    let settings = settings_service.get().clone();

    let _log_guard = logging::init_logger(&settings.log_settings, cli.log_level.as_deref())
        .context("Failed to initialize logging")?;
    info!(
        "Starting vehicle BLE shell (settings: {})",
        settings_service.path().display()
    );
    if let Some(reason) = settings_service.load_error() {
        debug!("Using default settings: {}", reason);
    }

    let options = ShellOptions {
        warn_on_unknown_command: settings.warn_on_unknown_command,
        help_text: cli::help_text(),
    };
    let mut shell = Shell::new(StdinLines::new(), std::io::stdout(), options);

    let open_link = || BluetoothService::new(&settings);
    let session = match shell.setup(open_link, SetupRequest::from(cli.command)) {
        Ok(session) => session,
        Err(e @ SetupError::BluetoothUnavailable(_)) => {
            return Err(anyhow::Error::new(e).context("Failed to open Bluetooth"));
        }
        Err(e) => {
            shell.report(&e)?;
            return Ok(());
        }
    };

    if let Some(vehicle) = session.as_ref().and_then(|session| session.vehicle()) {
        if let Err(e) = settings_service.record_paired_address(&vehicle.address()) {
            warn!("Could not save paired address: {:#}", e);
        }
    }

    shell.run(session)?;
    info!("Shell exited");
    Ok(())
}
