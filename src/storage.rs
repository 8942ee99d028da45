use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::Utc;
use log::{debug, error, info, trace, warn};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};

use crate::{
    persistence, Attachment, Config, Entity, FilesystemWarning, NewAttachment, Note, NoteDraft,
    NoteError, Result,
};

/// Note, tag and attachment persistence.
///
/// Multi-table writes (create, update and delete of a note) run inside a
/// single store transaction. Attachment metadata is written on its own,
/// after the caller has already put the physical file in place.
pub trait NoteStore {
    /// Creates a note together with its tag associations.
    fn create_note(&mut self, draft: &NoteDraft) -> Result<Note>;

    /// Reads a note with its tags and attachments.
    fn get_note(&self, id: i64) -> Result<Note>;

    /// Lists every note, newest first. Attachments are never populated here.
    fn get_all_notes(&self) -> Result<Vec<Note>>;

    /// Overwrites a note and resyncs its tags.
    fn update_note(&mut self, id: i64, draft: &NoteDraft) -> Result<Note>;

    /// Deletes a note, its tag associations and its attachment records,
    /// then removes the attachment files on a best-effort basis.
    fn delete_note(&mut self, id: i64) -> Result<CleanupReport>;

    /// Records metadata for an attachment file that already exists on disk.
    fn create_attachment(&mut self, attachment: &NewAttachment) -> Result<Attachment>;

    /// One attachment record by its id.
    fn get_attachment(&self, id: i64) -> Result<Attachment>;

    /// Attachments of one note, oldest upload first.
    fn get_attachments(&self, note_id: i64) -> Result<Vec<Attachment>>;

    /// Every attachment in the store, grouped by note.
    fn get_all_attachments(&self) -> Result<Vec<Attachment>>;

    /// Deletes one attachment record, then its file on a best-effort basis.
    fn delete_attachment(&mut self, id: i64) -> Result<CleanupReport>;
}

/// Outcome of the physical-file cleanup that follows a committed delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files that were removed from disk
    pub removed: Vec<PathBuf>,
    /// Files that could not be removed
    pub warnings: Vec<FilesystemWarning>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

const SCHEMA: &str = r#"
BEGIN;
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    reminder_at TEXT
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS note_tags (
    note_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (note_id, tag_id),
    FOREIGN KEY (note_id) REFERENCES notes(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS attachments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_id INTEGER NOT NULL,
    filename TEXT NOT NULL,
    filepath TEXT NOT NULL UNIQUE,
    mimetype TEXT NOT NULL DEFAULT 'application/octet-stream',
    size_bytes INTEGER NOT NULL DEFAULT 0,
    uploaded_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    FOREIGN KEY (note_id) REFERENCES notes(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_note_tags_tag ON note_tags(tag_id);
CREATE INDEX IF NOT EXISTS idx_attachments_note ON attachments(note_id);
COMMIT;
"#;

const NOTE_COLUMNS: &str = "id, title, content, created_at, updated_at, reminder_at";

const ATTACHMENT_COLUMNS: &str =
    "id, note_id, filename, filepath, mimetype, size_bytes, uploaded_at";

/// SQLite-backed implementation of [`NoteStore`].
///
/// Holds one connection for the lifetime of the process.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (creating if needed) the database file named in the config.
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the database path and busy timeout
    ///
    /// # Returns
    ///
    /// A migrated store ready for use, or an error
    pub fn open(config: &Config) -> Result<Self> {
        let db_path = &config.database_path;
        info!("Opening note database: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating database directory: {}", parent.display());
                fs::create_dir_all(parent).map_err(|e| {
                    error!("Failed to create directory {}: {}", parent.display(), e);
                    NoteError::DirectoryError {
                        path: parent.to_path_buf(),
                    }
                })?;
            }
        }

        let conn = Connection::open(db_path).map_err(persistence("open database"))?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(persistence("configure database"))?;
        Self::from_connection(conn)
    }

    /// A private, throwaway database. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(persistence("open database"))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(persistence("enable foreign keys"))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Creates the schema if it is missing. Safe to run repeatedly.
    pub fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .map_err(persistence("migrate schema"))?;
        debug!("Database schema is up to date");
        Ok(())
    }
}

impl NoteStore for SqliteStore {
    fn create_note(&mut self, draft: &NoteDraft) -> Result<Note> {
        validate_draft(draft)?;
        let tags = normalize_tags(&draft.tags);
        debug!("Creating note '{}' with {} tag(s)", draft.title, tags.len());

        let tx = self
            .conn
            .transaction()
            .map_err(persistence("begin transaction"))?;

        let (id, created_at, updated_at) = tx
            .query_row(
                "INSERT INTO notes (title, content, reminder_at) VALUES (?1, ?2, ?3)
                 RETURNING id, created_at, updated_at",
                params![draft.title, draft.content, draft.reminder_at],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(persistence("create note"))?;

        link_tags(&tx, id, &tags)?;

        tx.commit().map_err(persistence("commit note creation"))?;
        info!("Created note {} ('{}')", id, draft.title);

        Ok(Note {
            id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            created_at,
            updated_at,
            reminder_at: draft.reminder_at,
            tags,
            attachments: Vec::new(),
        })
    }

    fn get_note(&self, id: i64) -> Result<Note> {
        trace!("Reading note {}", id);
        read_note(&self.conn, id)
    }

    fn get_all_notes(&self) -> Result<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT n.id, n.title, n.content, n.created_at, n.updated_at, n.reminder_at,
                        json_group_array(t.name) FILTER (WHERE t.name IS NOT NULL) AS tags
                 FROM notes n
                 LEFT JOIN note_tags nt ON nt.note_id = n.id
                 LEFT JOIN tags t ON t.id = nt.tag_id
                 GROUP BY n.id
                 ORDER BY n.created_at DESC, n.id DESC",
            )
            .map_err(persistence("list notes"))?;

        let notes = stmt
            .query_map([], |row| {
                let mut note = map_row_to_note(row)?;
                let tags_json: String = row.get("tags")?;
                let mut tags: Vec<String> = serde_json::from_str(&tags_json)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
                tags.sort();
                note.tags = tags;
                Ok(note)
            })
            .map_err(persistence("list notes"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(persistence("list notes"))?;

        debug!("Listed {} notes", notes.len());
        Ok(notes)
    }

    fn update_note(&mut self, id: i64, draft: &NoteDraft) -> Result<Note> {
        validate_draft(draft)?;
        let tags = normalize_tags(&draft.tags);
        let updated_at = Utc::now();

        let tx = self
            .conn
            .transaction()
            .map_err(persistence("begin transaction"))?;

        let rows_affected = tx
            .execute(
                "UPDATE notes SET title = ?1, content = ?2, reminder_at = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![draft.title, draft.content, draft.reminder_at, updated_at, id],
            )
            .map_err(persistence("update note"))?;

        if rows_affected == 0 {
            warn!("Cannot update note {}: Note not found", id);
            return Err(NoteError::not_found(Entity::Note, id));
        }

        // Full resync: the associations afterwards are exactly `tags`.
        tx.execute("DELETE FROM note_tags WHERE note_id = ?1", [id])
            .map_err(persistence("clear note tags"))?;
        link_tags(&tx, id, &tags)?;

        let note = read_note(&tx, id)?;
        tx.commit().map_err(persistence("commit note update"))?;

        info!("Updated note {} ('{}')", id, note.title);
        Ok(note)
    }

    fn delete_note(&mut self, id: i64) -> Result<CleanupReport> {
        info!("Deleting note: {}", id);

        let tx = self
            .conn
            .transaction()
            .map_err(persistence("begin transaction"))?;

        // Collected up front so the files can be removed after commit.
        let attachments = load_attachments(&tx, id)?;

        tx.execute("DELETE FROM note_tags WHERE note_id = ?1", [id])
            .map_err(persistence("delete note tags"))?;
        tx.execute("DELETE FROM attachments WHERE note_id = ?1", [id])
            .map_err(persistence("delete note attachments"))?;
        let rows_affected = tx
            .execute("DELETE FROM notes WHERE id = ?1", [id])
            .map_err(persistence("delete note"))?;

        if rows_affected == 0 {
            warn!("Cannot delete note {}: Note not found", id);
            return Err(NoteError::not_found(Entity::Note, id));
        }

        tx.commit().map_err(persistence("commit note deletion"))?;
        info!(
            "Note {} deleted, removing {} attachment file(s)",
            id,
            attachments.len()
        );

        Ok(remove_physical_files(
            attachments.iter().map(|a| Path::new(&a.filepath)),
        ))
    }

    fn create_attachment(&mut self, attachment: &NewAttachment) -> Result<Attachment> {
        let (id, uploaded_at) = self
            .conn
            .query_row(
                "INSERT INTO attachments (note_id, filename, filepath, mimetype, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id, uploaded_at",
                params![
                    attachment.note_id,
                    attachment.filename,
                    attachment.filepath,
                    attachment.mime_type,
                    attachment.size_bytes,
                ],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(persistence("create attachment"))?;

        info!(
            "Recorded attachment {} ('{}') for note {}",
            id, attachment.filename, attachment.note_id
        );

        Ok(Attachment {
            id,
            note_id: attachment.note_id,
            filename: attachment.filename.clone(),
            filepath: attachment.filepath.clone(),
            mime_type: attachment.mime_type.clone(),
            size_bytes: attachment.size_bytes,
            uploaded_at,
        })
    }

    fn get_attachment(&self, id: i64) -> Result<Attachment> {
        self.conn
            .prepare_cached(&format!(
                "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE id = ?1"
            ))
            .and_then(|mut stmt| stmt.query_row([id], map_row_to_attachment).optional())
            .map_err(persistence("read attachment"))?
            .ok_or_else(|| NoteError::not_found(Entity::Attachment, id))
    }

    fn get_attachments(&self, note_id: i64) -> Result<Vec<Attachment>> {
        load_attachments(&self.conn, note_id)
    }

    fn get_all_attachments(&self) -> Result<Vec<Attachment>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {ATTACHMENT_COLUMNS} FROM attachments
                 ORDER BY note_id ASC, uploaded_at ASC, id ASC"
            ))
            .map_err(persistence("list attachments"))?;

        let attachments = stmt
            .query_map([], map_row_to_attachment)
            .map_err(persistence("list attachments"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(persistence("list attachments"))?;
        Ok(attachments)
    }

    fn delete_attachment(&mut self, id: i64) -> Result<CleanupReport> {
        info!("Deleting attachment: {}", id);

        let filepath: Option<String> = self
            .conn
            .query_row(
                "DELETE FROM attachments WHERE id = ?1 RETURNING filepath",
                [id],
                |row| row.get(0),
            )
            .optional()
            .map_err(persistence("delete attachment"))?;

        let Some(filepath) = filepath else {
            warn!("Cannot delete attachment {}: Attachment not found", id);
            return Err(NoteError::not_found(Entity::Attachment, id));
        };

        Ok(remove_physical_files([Path::new(&filepath)]))
    }
}

/// Trims tag names, drops empty ones and removes duplicates.
///
/// The result is sorted, which is also the order tags are read back in.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut normalized: Vec<String> = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect();
    normalized.sort();
    normalized
}

fn validate_draft(draft: &NoteDraft) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(NoteError::validation("note title cannot be empty"));
    }
    Ok(())
}

/// Upserts each tag by name and associates it with the note.
fn link_tags(conn: &Connection, note_id: i64, tags: &[String]) -> Result<()> {
    let mut upsert = conn
        .prepare_cached(
            "INSERT INTO tags (name) VALUES (?1)
             ON CONFLICT (name) DO UPDATE SET name = excluded.name
             RETURNING id",
        )
        .map_err(persistence("create or fetch tag"))?;
    let mut link = conn
        .prepare_cached("INSERT OR IGNORE INTO note_tags (note_id, tag_id) VALUES (?1, ?2)")
        .map_err(persistence("link tag to note"))?;

    for name in tags {
        let tag_id: i64 = upsert
            .query_row([name], |row| row.get(0))
            .map_err(persistence("create or fetch tag"))?;
        link.execute(params![note_id, tag_id])
            .map_err(persistence("link tag to note"))?;
        trace!("Linked tag '{}' ({}) to note {}", name, tag_id, note_id);
    }
    Ok(())
}

fn read_note(conn: &Connection, id: i64) -> Result<Note> {
    let note = conn
        .query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
            [id],
            map_row_to_note,
        )
        .optional()
        .map_err(persistence("read note"))?;

    let Some(mut note) = note else {
        debug!("Note not found: {}", id);
        return Err(NoteError::not_found(Entity::Note, id));
    };

    note.tags = load_tags(conn, id)?;
    note.attachments = load_attachments(conn, id)?;
    Ok(note)
}

fn load_tags(conn: &Connection, note_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT t.name FROM tags t
             JOIN note_tags nt ON nt.tag_id = t.id
             WHERE nt.note_id = ?1
             ORDER BY t.name ASC",
        )
        .map_err(persistence("read note tags"))?;

    let tags = stmt
        .query_map([note_id], |row| row.get(0))
        .map_err(persistence("read note tags"))?
        .collect::<rusqlite::Result<Vec<String>>>()
        .map_err(persistence("read note tags"))?;
    Ok(tags)
}

fn load_attachments(conn: &Connection, note_id: i64) -> Result<Vec<Attachment>> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments
             WHERE note_id = ?1
             ORDER BY uploaded_at ASC, id ASC"
        ))
        .map_err(persistence("read attachments"))?;

    let attachments = stmt
        .query_map([note_id], map_row_to_attachment)
        .map_err(persistence("read attachments"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(persistence("read attachments"))?;
    Ok(attachments)
}

fn map_row_to_note(row: &Row) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get("id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        reminder_at: row.get("reminder_at")?,
        tags: Vec::new(),
        attachments: Vec::new(),
    })
}

fn map_row_to_attachment(row: &Row) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: row.get("id")?,
        note_id: row.get("note_id")?,
        filename: row.get("filename")?,
        filepath: row.get("filepath")?,
        mime_type: row.get("mimetype")?,
        size_bytes: row.get("size_bytes")?,
        uploaded_at: row.get("uploaded_at")?,
    })
}

/// Removes each file, carrying on past failures.
///
/// Every failure is logged and reported; none of them is an error.
pub fn remove_physical_files<'a, I>(paths: I) -> CleanupReport
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut report = CleanupReport::default();
    for path in paths {
        match fs::remove_file(path) {
            Ok(_) => {
                debug!("Attachment file removed: {}", path.display());
                report.removed.push(path.to_path_buf());
            }
            Err(e) => {
                warn!(
                    "Failed to remove attachment file {}: {}",
                    path.display(),
                    e
                );
                report.warnings.push(FilesystemWarning {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn draft(title: &str, tags: &[&str]) -> NoteDraft {
        NoteDraft::new(title, "body").with_tags(tags.iter().copied())
    }

    fn attachment_for(note_id: i64, path: &Path, size: i64) -> NewAttachment {
        NewAttachment {
            note_id,
            filename: path.file_name().unwrap().to_string_lossy().to_string(),
            filepath: path.to_string_lossy().to_string(),
            mime_type: "text/plain".to_string(),
            size_bytes: size,
        }
    }

    fn tag_count(store: &SqliteStore) -> i64 {
        store
            .conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .unwrap()
    }

    /// Makes every insert into note_tags fail.
    fn break_tag_links(store: &SqliteStore) {
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_links BEFORE INSERT ON note_tags
                 BEGIN SELECT RAISE(ABORT, 'links disabled'); END;",
            )
            .unwrap();
    }

    #[test]
    fn test_normalize_tags_trims_dedups_and_sorts() {
        let tags = vec![
            " work ".to_string(),
            "home".to_string(),
            "".to_string(),
            "work".to_string(),
            "   ".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["home", "work"]);
    }

    #[test]
    fn test_create_note_assigns_identity_and_timestamps() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let note = store.create_note(&draft("First", &["b", "a", "b"])).unwrap();

        assert!(note.id > 0);
        assert_eq!(note.tags, vec!["a", "b"]);
        assert!(note.attachments.is_empty());

        let read = store.get_note(note.id).unwrap();
        assert_eq!(read.title, "First");
        assert_eq!(read.tags, vec!["a", "b"]);
        assert_eq!(read.created_at, note.created_at);
    }

    #[test]
    fn test_empty_title_is_rejected_before_the_store() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let err = store.create_note(&draft("   ", &["x"])).unwrap_err();
        assert!(matches!(err, NoteError::Validation { .. }));
        assert!(store.get_all_notes().unwrap().is_empty());
        assert_eq!(tag_count(&store), 0);
    }

    #[test]
    fn test_get_missing_note_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.get_note(42).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_reminder_round_trips() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let reminder = Utc::now() + chrono::Duration::hours(3);
        let note = store
            .create_note(&draft("Call", &[]).with_reminder(Some(reminder)))
            .unwrap();
        assert_eq!(store.get_note(note.id).unwrap().reminder_at, Some(reminder));

        let cleared = store
            .update_note(note.id, &draft("Call", &[]).with_reminder(None))
            .unwrap();
        assert_eq!(cleared.reminder_at, None);
    }

    #[test]
    fn test_get_all_notes_newest_first_with_empty_tag_sets() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let a = store.create_note(&draft("a", &[])).unwrap();
        let b = store.create_note(&draft("b", &["z", "m"])).unwrap();

        let notes = store.get_all_notes().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, b.id);
        assert_eq!(notes[0].tags, vec!["m", "z"]);
        assert_eq!(notes[1].id, a.id);
        assert!(notes[1].tags.is_empty());
    }

    #[test]
    fn test_update_sets_update_time_and_keeps_creation_time() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let note = store.create_note(&draft("t", &[])).unwrap();
        let before = Utc::now();

        let updated = store.update_note(note.id, &draft("t", &[])).unwrap();
        assert_eq!(updated.created_at, note.created_at);
        assert!(updated.updated_at >= before);
    }

    #[test]
    fn test_update_missing_note_rolls_back() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.create_note(&draft("keep", &["one"])).unwrap();

        let err = store.update_note(999, &draft("x", &["two"])).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(tag_count(&store), 1);
    }

    #[test]
    fn test_delete_attachment_removes_record_and_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "hello").unwrap();

        let mut store = SqliteStore::open_in_memory().unwrap();
        let note = store.create_note(&draft("n", &[])).unwrap();
        let attachment = store
            .create_attachment(&attachment_for(note.id, &file, 5))
            .unwrap();

        let report = store.delete_attachment(attachment.id).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.removed, vec![file.clone()]);
        assert!(!file.exists());
        assert!(store.get_attachments(note.id).unwrap().is_empty());

        let err = store.delete_attachment(attachment.id).unwrap_err();
        assert!(matches!(
            err,
            NoteError::NotFound {
                entity: Entity::Attachment,
                ..
            }
        ));
    }

    #[test]
    fn test_delete_attachment_with_missing_file_still_succeeds() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("gone.bin");

        let mut store = SqliteStore::open_in_memory().unwrap();
        let note = store.create_note(&draft("n", &[])).unwrap();
        let attachment = store
            .create_attachment(&attachment_for(note.id, &file, 1))
            .unwrap();

        let report = store.delete_attachment(attachment.id).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].path, file);
        assert!(store.get_attachments(note.id).unwrap().is_empty());
    }

    #[test]
    fn test_attachment_for_unknown_note_is_a_persistence_error() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .create_attachment(&attachment_for(77, Path::new("/tmp/none.txt"), 1))
            .unwrap_err();
        assert!(matches!(err, NoteError::Persistence { .. }));
        assert!(err.to_string().starts_with("Failed to create attachment"));
    }

    #[test]
    fn test_attachments_are_listed_in_upload_order() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open_in_memory().unwrap();
        let note = store.create_note(&draft("n", &[])).unwrap();

        let first = store
            .create_attachment(&attachment_for(note.id, &dir.path().join("1.txt"), 1))
            .unwrap();
        let second = store
            .create_attachment(&attachment_for(note.id, &dir.path().join("2.txt"), 2))
            .unwrap();

        let ids: Vec<i64> = store
            .get_attachments(note.id)
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(store.get_all_attachments().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_tag_link_rolls_back_creation() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        break_tag_links(&store);

        let err = store.create_note(&draft("half", &["a", "b"])).unwrap_err();
        assert!(matches!(err, NoteError::Persistence { .. }));
        assert!(store.get_all_notes().unwrap().is_empty());
        assert_eq!(tag_count(&store), 0);
    }

    #[test]
    fn test_failed_tag_link_rolls_back_update() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let note = store.create_note(&draft("before", &["old"])).unwrap();
        break_tag_links(&store);

        let err = store
            .update_note(note.id, &draft("after", &["new"]))
            .unwrap_err();
        assert!(matches!(err, NoteError::Persistence { .. }));

        let unchanged = store.get_note(note.id).unwrap();
        assert_eq!(unchanged.title, "before");
        assert_eq!(unchanged.tags, vec!["old"]);
        assert_eq!(unchanged.updated_at, note.updated_at);
        assert_eq!(tag_count(&store), 1);
    }

    #[test]
    fn test_get_attachment_by_id() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open_in_memory().unwrap();
        let note = store.create_note(&draft("n", &[])).unwrap();
        let created = store
            .create_attachment(&attachment_for(note.id, &dir.path().join("x.pdf"), 9))
            .unwrap();

        assert_eq!(store.get_attachment(created.id).unwrap(), created);
        assert!(store.get_attachment(created.id + 1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_open_creates_database_file() {
        let dir = tempdir().unwrap();
        let config = Config {
            database_path: dir.path().join("nested").join("notes.db"),
            attachments_dir: dir.path().join("attachments"),
            busy_timeout_ms: 1000,
        };

        let mut store = SqliteStore::open(&config).unwrap();
        let note = store.create_note(&draft("persisted", &["disk"])).unwrap();
        drop(store);

        let reopened = SqliteStore::open(&config).unwrap();
        assert_eq!(reopened.get_note(note.id).unwrap().tags, vec!["disk"]);
    }
}
