//! Core data structures for the notedesk application.
//!
//! Notes, their attachments, and the input shapes used to create or
//! update them.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned identifier
    #[serde(default)]
    pub id: i64,
    /// Note title, never empty once persisted
    pub title: String,
    /// Free-text content
    #[serde(default)]
    pub content: String,
    /// When the note was created (assigned by the store)
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    /// Last modification time
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    /// Optional reminder instant
    #[serde(default)]
    pub reminder_at: Option<DateTime<Utc>>,
    /// Tag names, alphabetical and deduplicated
    #[serde(default)]
    pub tags: Vec<String>,
    /// Attached files; left empty by bulk listings
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Note {
    /// The editable part of the note, ready to feed back into an update.
    pub fn to_draft(&self) -> NoteDraft {
        NoteDraft {
            title: self.title.clone(),
            content: self.content.clone(),
            tags: self.tags.clone(),
            reminder_at: self.reminder_at,
        }
    }
}

/// A reference to a physical file owned by one note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub note_id: i64,
    /// Original, user-facing filename
    pub filename: String,
    /// Where the file actually lives on disk
    pub filepath: String,
    pub mime_type: String,
    pub size_bytes: i64,
    #[serde(default)]
    pub uploaded_at: DateTime<Utc>,
}

/// User-editable note fields, used for both create and update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub reminder_at: Option<DateTime<Utc>>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reminder(mut self, reminder_at: Option<DateTime<Utc>>) -> Self {
        self.reminder_at = reminder_at;
        self
    }
}

/// Metadata for a file that has already been written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttachment {
    pub note_id: i64,
    pub filename: String,
    pub filepath: String,
    pub mime_type: String,
    pub size_bytes: i64,
}
