use std::{path::Path, process::Command};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use log::{debug, error};

use crate::{NoteError, Result};

const REMINDER_FORMAT: &str = "%Y-%m-%d %H:%M";

// Helper method for parsing tags
pub fn parse_tags(tags: Option<String>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Parses a local "YYYY-MM-DD HH:MM" reminder time into UTC.
pub fn parse_reminder(input: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), REMINDER_FORMAT).map_err(|e| {
        NoteError::validation(format!(
            "reminder '{}' is not in YYYY-MM-DD HH:MM form: {}",
            input, e
        ))
    })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| NoteError::validation(format!("reminder '{}' does not exist locally", input)))
}

/// Renders a reminder in the local zone, the way it is entered.
pub fn format_reminder(reminder: &DateTime<Utc>) -> String {
    reminder.with_timezone(&Local).format(REMINDER_FORMAT).to_string()
}

/// Human-readable size with a 1024 base, e.g. "1.2 MB".
pub fn format_bytes(bytes: i64) -> String {
    const UNIT: i64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let suffix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, suffix)
}

/// Name an attachment is stored under: note id, timestamp, original name.
pub fn stored_filename(note_id: i64, at: DateTime<Utc>, original: &str) -> String {
    format!("{}_{}_{}", note_id, at.format("%Y%m%d%H%M%S"), original)
}

/// Best-effort MIME type from the file extension.
pub fn guess_mime(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Launches the platform's default application for a file.
pub fn open_with_system(path: &Path) -> std::io::Result<()> {
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.args(["/c", "start", ""]);
        c
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };

    command.arg(path);
    debug!("Launching {:?}", command);
    command.spawn().map(|_| ()).map_err(|e| {
        error!("Failed to open {}: {}", path.display(), e);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags_skips_blanks() {
        assert_eq!(
            parse_tags(Some(" home, ,urgent ,".to_string())),
            vec!["home", "urgent"]
        );
        assert!(parse_tags(None).is_empty());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(42), "42 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_stored_filename_embeds_note_and_time() {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(stored_filename(9, at, "list.txt"), "9_20250304050607_list.txt");
    }

    #[test]
    fn test_guess_mime_defaults_to_binary() {
        assert_eq!(guess_mime("photo.png"), "image/png");
        assert_eq!(guess_mime("blob.zzzunknown"), "application/octet-stream");
        assert_eq!(guess_mime("README"), "application/octet-stream");
    }

    #[test]
    fn test_reminder_round_trip_through_local_time() {
        let parsed = parse_reminder("2030-01-15 09:30").unwrap();
        assert_eq!(format_reminder(&parsed), "2030-01-15 09:30");
        assert!(parse_reminder("tomorrow").is_err());
    }
}
