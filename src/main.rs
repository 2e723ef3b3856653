// Entrypoint for the CLI application.
// - Keeps `main` small: resolve settings, find the device and hand both to
//   the UI.
// - A cancelled prompt exits cleanly with status 0.

use anyhow::Result;
use op1mgr::archive::Archive;
use op1mgr::config::Settings;
use op1mgr::device::{self, SystemProbe};
use op1mgr::prompt::TerminalPrompter;
use op1mgr::ui::{self, main_menu};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(settings: Settings) -> Result<()> {
    let candidates = device::candidates(settings.device);
    let root = device::locate(candidates, &SystemProbe::new())?;
    println!("found op-1: {}", root.display());

    let archive = Archive::new(settings.projects_dir);
    tracing::info!("project archive at {}", archive.root().display());
    main_menu(&mut TerminalPrompter, &root, &archive)
}

fn main() -> ExitCode {
    let settings = Settings::from_args();
    init_logging(&settings);

    let result = run(settings);
    ExitCode::from(ui::report(&result))
}
