//! Shared types for the notedesk application.
//!
//! The crate-wide Result alias, controller reports, and the CLI command set.
use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};

use crate::{Attachment, NoteError};

/// A specialized Result type for notedesk operations.
pub type Result<T> = std::result::Result<T, NoteError>;

/// Orderings offered for the visible note list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    /// Most recently created first
    #[default]
    CreatedNewest,
    CreatedOldest,
    /// Most recently edited first
    UpdatedNewest,
    UpdatedOldest,
    /// Title A to Z, ignoring case
    TitleAsc,
    /// Title Z to A, ignoring case
    TitleDesc,
}

/// Summary of an import run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    /// Path to the file that was imported
    pub source: PathBuf,
    /// Total number of notes found in the file
    pub total_notes: usize,
    /// Notes whose id matched an existing note and were overwritten
    pub notes_updated: usize,
    /// Notes stored as new notes
    pub notes_created: usize,
    /// Attachment records re-linked because their file still exists
    pub attachments_linked: usize,
    /// Attachments skipped because the file is gone
    pub attachments_skipped: usize,
    /// Notes that could not be stored
    pub failed_notes: Vec<(String, String)>, // (note title, error_message)
}

impl ImportSummary {
    pub fn imported(&self) -> usize {
        self.notes_updated + self.notes_created
    }
}

/// Differences between the attachments directory and the attachment records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Files in the attachments directory that no record points to
    pub orphaned_files: Vec<PathBuf>,
    /// Orphaned files that were deleted (only when removal was requested)
    pub removed_files: Vec<PathBuf>,
    /// Records whose file is missing from disk
    pub dangling_attachments: Vec<Attachment>,
}

/// Available subcommands for the notedesk application
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    Create {
        /// Title of the note
        #[clap(short = 'T', long)]
        title: String,

        /// Content of the note
        #[clap(short, long)]
        content: Option<String>,

        /// Path to a file containing the note's content
        #[clap(short, long, conflicts_with = "content")]
        file: Option<PathBuf>,

        /// Tags to associate with the note (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// Reminder time, local "YYYY-MM-DD HH:MM"
        #[clap(short, long)]
        remind: Option<String>,
    },

    /// View a note by ID, including its attachments
    View {
        /// ID of the note to view
        id: i64,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// List notes with optional filtering and sorting
    List {
        /// Only show notes whose title, content or tags contain this text
        #[clap(short, long)]
        search: Option<String>,

        /// Sort order
        #[clap(long, value_enum, default_value_t = SortOrder::CreatedNewest)]
        sort: SortOrder,

        /// Limit the number of notes shown (0 means no limit)
        #[clap(short = 'n', long, default_value_t = 0)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,

        /// Show full content instead of a preview
        #[clap(short, long)]
        detailed: bool,
    },

    /// Edit an existing note
    Edit {
        /// ID of the note to edit
        id: i64,

        /// New title for the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New content for the note
        #[clap(short, long)]
        content: Option<String>,

        /// Path to a file containing the new note content
        #[clap(short, long, conflicts_with = "content")]
        file: Option<PathBuf>,

        /// Replace the tags (comma-separated, empty string clears them)
        #[clap(short = 't', long)]
        tags: Option<String>,
    },

    /// Delete a note by ID, along with its attachments
    Delete {
        /// ID of the note to delete
        id: i64,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Attach a file to a note
    Attach {
        /// ID of the note
        id: i64,

        /// File to copy into the attachments directory
        file: PathBuf,
    },

    /// Remove an attachment by its ID
    Detach {
        /// ID of the attachment
        attachment_id: i64,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Open an attachment with the system's default application
    Open {
        /// ID of the attachment
        attachment_id: i64,
    },

    /// Set or clear a note's reminder
    Remind {
        /// ID of the note
        id: i64,

        /// Reminder time, local "YYYY-MM-DD HH:MM"
        #[clap(required_unless_present = "clear")]
        at: Option<String>,

        /// Remove the reminder
        #[clap(long, conflicts_with = "at")]
        clear: bool,
    },

    /// Export notes to a JSON file
    Export {
        /// Path where the JSON file will be written
        output: PathBuf,

        /// Export only this note (default: all notes)
        #[clap(long)]
        id: Option<i64>,
    },

    /// Import notes from a JSON file produced by export
    Import {
        /// Path to the JSON file
        source: PathBuf,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Compare the attachments directory against the attachment records
    Reconcile {
        /// Delete files that no attachment record references
        #[clap(long)]
        remove_orphans: bool,
    },
}
