use std::process;

use clap::Parser;
use log::info;

use notedesk::{App, Cli, Config, NoteController, Result, SqliteStore};

/// Log filter used when RUST_LOG is not set.
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

pub fn initialize_logger(verbose: bool) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(verbose)),
    )
    .format_timestamp_secs()
    .format_module_path(true)
    .init();

    info!("Logger initialized");
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    let store = SqliteStore::open(&config)?;
    let controller = NoteController::new(store, config.attachments_dir.clone())?;

    let mut app = App::new(controller, cli.verbose);
    app.run(cli.command)
}

fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    info!("Application starting up");

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    info!("Application shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_filter() {
        assert_eq!(default_log_filter(false), "info");
        assert_eq!(default_log_filter(true), "debug");
    }
}
