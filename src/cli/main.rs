use std::path::PathBuf;

use clap::Parser;

use crate::{Commands, Config};

/// Main CLI application arguments and command structure
#[derive(Parser)]
#[clap(
    version,
    about = "Notes with tags, reminders and file attachments"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database file
    #[clap(long, value_parser)]
    pub db: Option<PathBuf>,

    /// Directory attachment files are copied into
    #[clap(long, value_parser)]
    pub attachments_dir: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the notedesk application
    #[clap(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Command-line flags win over the config file and environment.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(db) = &self.db {
            config.database_path = db.clone();
        }
        if let Some(dir) = &self.attachments_dir {
            config.attachments_dir = dir.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "notedesk",
            "--db",
            "/tmp/x.db",
            "--attachments-dir",
            "/tmp/files",
            "list",
        ]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.attachments_dir, PathBuf::from("/tmp/files"));
    }

    #[test]
    fn test_remind_requires_time_or_clear() {
        assert!(Cli::try_parse_from(["notedesk", "remind", "3"]).is_err());
        assert!(Cli::try_parse_from(["notedesk", "remind", "3", "--clear"]).is_ok());
        assert!(Cli::try_parse_from(["notedesk", "remind", "3", "2030-01-01 10:00"]).is_ok());
    }
}
