//! The note controller: the working set of notes a front end displays, and
//! the user actions that go through the store.
//!
//! The controller owns the in-memory list explicitly; front ends hold a
//! controller and call its methods in response to user input.
use std::{
    collections::{HashMap, HashSet},
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use log::{debug, error, info, trace, warn};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::{
    guess_mime, open_with_system, remove_physical_files, stored_filename, Attachment,
    CleanupReport, FilesystemWarning, ImportSummary, NewAttachment, Note, NoteDraft,
    NoteError, NoteStore, ReconcileReport, Result, SortOrder,
};

pub struct NoteController<S: NoteStore> {
    /// The persistence layer
    store: S,

    /// Where attachment files are copied to
    attachments_dir: PathBuf,

    /// Every note from the last load, without attachments
    all_notes: Vec<Note>,

    /// `all_notes` after filtering and sorting
    visible: Vec<Note>,

    /// Current search text
    filter: String,

    /// Current ordering
    sort: SortOrder,
}

impl<S: NoteStore> NoteController<S> {
    /// Creates a controller, making sure the attachments directory exists.
    pub fn new(store: S, attachments_dir: PathBuf) -> Result<Self> {
        if !attachments_dir.exists() {
            debug!(
                "Attachments directory does not exist, creating: {}",
                attachments_dir.display()
            );
            fs::create_dir_all(&attachments_dir).map_err(|e| {
                error!("Failed to create attachments directory: {}", e);
                NoteError::DirectoryError {
                    path: attachments_dir.clone(),
                }
            })?;
        }
        // Stored attachment paths are built from this, so they stay absolute.
        let attachments_dir = fs::canonicalize(&attachments_dir).map_err(|e| {
            error!("Failed to resolve attachments directory: {}", e);
            NoteError::DirectoryError {
                path: attachments_dir.clone(),
            }
        })?;

        Ok(Self {
            store,
            attachments_dir,
            all_notes: Vec::new(),
            visible: Vec::new(),
            filter: String::new(),
            sort: SortOrder::default(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn attachments_dir(&self) -> &Path {
        &self.attachments_dir
    }

    /// Reloads every note from the store and re-applies filter and sort.
    ///
    /// # Returns
    ///
    /// The number of notes loaded
    pub fn load(&mut self) -> Result<usize> {
        self.all_notes = self.store.get_all_notes()?;
        self.refresh();
        info!("Loaded {} notes", self.all_notes.len());
        Ok(self.all_notes.len())
    }

    pub fn set_filter(&mut self, query: &str) {
        self.filter = query.to_string();
        self.refresh();
    }

    pub fn set_sort(&mut self, order: SortOrder) {
        self.sort = order;
        self.refresh();
    }

    /// The filtered, sorted notes.
    pub fn visible(&self) -> &[Note] {
        &self.visible
    }

    /// Every loaded note, in store order.
    pub fn notes(&self) -> &[Note] {
        &self.all_notes
    }

    /// A failed reload must not turn a committed write into an error.
    fn reload_after_write(&mut self) {
        if let Err(e) = self.load() {
            warn!("Change saved but the note list could not be reloaded: {}", e);
        }
    }

    fn refresh(&mut self) {
        self.visible = filter_notes(&self.all_notes, &self.filter);
        sort_notes(&mut self.visible, self.sort);
        trace!(
            "{} of {} notes visible",
            self.visible.len(),
            self.all_notes.len()
        );
    }

    /// Creates a note when `id` is None, otherwise overwrites that note.
    ///
    /// An empty title is rejected before any store call is made.
    pub fn save(&mut self, id: Option<i64>, draft: NoteDraft) -> Result<Note> {
        if draft.title.trim().is_empty() {
            return Err(NoteError::validation("note title cannot be empty"));
        }

        let note = match id {
            None => self.store.create_note(&draft)?,
            Some(id) => self.store.update_note(id, &draft)?,
        };
        info!("Saved note: {} (ID: {})", note.title, note.id);

        self.reload_after_write();
        Ok(note)
    }

    /// Full detail view of one note, attachments included.
    pub fn open(&self, id: i64) -> Result<Note> {
        self.store.get_note(id)
    }

    /// Deletes a note. Confirmation is the caller's job and happens first.
    pub fn delete(&mut self, id: i64) -> Result<CleanupReport> {
        let report = self.store.delete_note(id)?;
        for warning in &report.warnings {
            warn!("Note {} deleted but a file was left behind: {}", id, warning);
        }
        self.reload_after_write();
        Ok(report)
    }

    /// Copies a file into the attachments directory and records it.
    ///
    /// If recording fails the copy is removed again, so no unreferenced
    /// file is left behind.
    pub fn attach_file(&mut self, note_id: i64, source: &Path) -> Result<Attachment> {
        // Fails with NotFound before anything is copied.
        self.store.get_note(note_id)?;

        if !source.is_file() {
            return Err(NoteError::FileNotFound {
                file_path: source.display().to_string(),
            });
        }
        let original = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| NoteError::validation(format!("{} has no file name", source.display())))?;

        let dest = self.unique_destination(note_id, &original);
        debug!("Copying {} to {}", source.display(), dest.display());
        let size_bytes = fs::copy(source, &dest).map_err(|e| {
            error!("Failed to copy attachment to {}: {}", dest.display(), e);
            NoteError::Io(e)
        })?;

        let record = NewAttachment {
            note_id,
            filename: original.clone(),
            filepath: dest.to_string_lossy().to_string(),
            mime_type: guess_mime(&original),
            size_bytes: size_bytes as i64,
        };

        match self.store.create_attachment(&record) {
            Ok(attachment) => {
                info!(
                    "File '{}' attached to note {}, stored as '{}'",
                    original,
                    note_id,
                    dest.display()
                );
                Ok(attachment)
            }
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&dest) {
                    warn!(
                        "Failed to remove copied file '{}' after store error: {}",
                        dest.display(),
                        remove_err
                    );
                }
                Err(e)
            }
        }
    }

    fn unique_destination(&self, note_id: i64, original: &str) -> PathBuf {
        let now = Utc::now();
        let mut candidate = self.attachments_dir.join(stored_filename(note_id, now, original));
        let mut n = 1;
        while candidate.exists() {
            candidate = self
                .attachments_dir
                .join(stored_filename(note_id, now, &format!("{}_{}", n, original)));
            n += 1;
        }
        candidate
    }

    /// Deletes one attachment. Confirmation is the caller's job.
    pub fn remove_attachment(&mut self, attachment_id: i64) -> Result<CleanupReport> {
        self.store.delete_attachment(attachment_id)
    }

    /// Looks up one attachment record by its id.
    pub fn attachment(&self, attachment_id: i64) -> Result<Attachment> {
        self.store.get_attachment(attachment_id)
    }

    /// Hands an attachment to the system's default application.
    ///
    /// A file that is missing or cannot be opened comes back as a warning.
    pub fn open_attachment(&self, attachment_id: i64) -> Result<Option<FilesystemWarning>> {
        let attachment = self.attachment(attachment_id)?;
        let path = PathBuf::from(&attachment.filepath);

        let outcome = if !path.exists() {
            Err("file is missing".to_string())
        } else {
            open_with_system(&path).map_err(|e| e.to_string())
        };

        match outcome {
            Ok(()) => {
                info!("Opened attachment '{}' ({})", attachment.filename, path.display());
                Ok(None)
            }
            Err(message) => {
                warn!("Could not open attachment '{}': {}", attachment.filename, message);
                Ok(Some(FilesystemWarning { path, message }))
            }
        }
    }

    /// Writes notes to a pretty-printed JSON file.
    ///
    /// # Arguments
    ///
    /// * `path` - Destination file, replaced atomically
    /// * `only` - Export just this note instead of all of them
    ///
    /// # Returns
    ///
    /// The number of notes written
    pub fn export(&self, path: &Path, only: Option<i64>) -> Result<usize> {
        let notes = match only {
            Some(id) => vec![self.store.get_note(id)?],
            None => {
                let mut by_note: HashMap<i64, Vec<Attachment>> = HashMap::new();
                for attachment in self.store.get_all_attachments()? {
                    by_note.entry(attachment.note_id).or_default().push(attachment);
                }
                let mut notes = self.store.get_all_notes()?;
                for note in &mut notes {
                    note.attachments = by_note.remove(&note.id).unwrap_or_default();
                }
                notes
            }
        };

        let json = serde_json::to_string_pretty(&notes)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            NoteError::Io(e)
        })?;
        temp_file.write_all(json.as_bytes())?;
        temp_file.flush()?;
        temp_file.persist(path).map_err(|e| {
            error!("Failed to persist file {}: {}", path.display(), e.error);
            NoteError::Io(e.error)
        })?;

        info!("Exported {} note(s) to {}", notes.len(), path.display());
        Ok(notes.len())
    }

    /// Reads notes written by [`export`](Self::export) back into the store.
    ///
    /// Notes whose id already exists are overwritten; the rest are created
    /// fresh. Attachments are re-linked only when their file still exists.
    /// A note that fails is recorded in the summary and the rest carry on.
    pub fn import(&mut self, path: &Path) -> Result<ImportSummary> {
        if !path.is_file() {
            return Err(NoteError::FileNotFound {
                file_path: path.display().to_string(),
            });
        }
        let raw = fs::read_to_string(path)?;
        let notes: Vec<Note> = serde_json::from_str(&raw)?;

        let mut summary = ImportSummary {
            source: path.to_path_buf(),
            total_notes: notes.len(),
            ..Default::default()
        };

        for note in notes {
            let draft = note.to_draft();
            let stored = match self.store.get_note(note.id) {
                Ok(_) => self.store.update_note(note.id, &draft).map(|n| (n, true)),
                Err(e) if e.is_not_found() => self.store.create_note(&draft).map(|n| (n, false)),
                Err(e) => Err(e),
            };

            let stored_id = match stored {
                Ok((stored, updated)) => {
                    if updated {
                        summary.notes_updated += 1;
                    } else {
                        summary.notes_created += 1;
                    }
                    stored.id
                }
                Err(e) => {
                    warn!("Failed to import note '{}': {}", note.title, e);
                    summary.failed_notes.push((note.title.clone(), e.to_string()));
                    continue;
                }
            };

            self.relink_attachments(stored_id, &note.attachments, &mut summary);
        }

        info!(
            "Import complete: created {}, updated {}, failed {} notes from {}",
            summary.notes_created,
            summary.notes_updated,
            summary.failed_notes.len(),
            path.display()
        );

        self.reload_after_write();
        Ok(summary)
    }

    fn relink_attachments(
        &mut self,
        note_id: i64,
        attachments: &[Attachment],
        summary: &mut ImportSummary,
    ) {
        let already_linked: HashSet<String> = match self.store.get_attachments(note_id) {
            Ok(existing) => existing.into_iter().map(|a| a.filepath).collect(),
            Err(e) => {
                warn!("Failed to read attachments of note {}: {}", note_id, e);
                HashSet::new()
            }
        };

        for attachment in attachments {
            if already_linked.contains(&attachment.filepath) {
                trace!("Attachment '{}' already linked", attachment.filepath);
                summary.attachments_skipped += 1;
                continue;
            }
            if !Path::new(&attachment.filepath).exists() {
                warn!(
                    "Attachment file '{}' not found at '{}', record not imported",
                    attachment.filename, attachment.filepath
                );
                summary.attachments_skipped += 1;
                continue;
            }

            let record = NewAttachment {
                note_id,
                filename: attachment.filename.clone(),
                filepath: attachment.filepath.clone(),
                mime_type: attachment.mime_type.clone(),
                size_bytes: attachment.size_bytes,
            };
            match self.store.create_attachment(&record) {
                Ok(_) => summary.attachments_linked += 1,
                Err(e) => {
                    warn!(
                        "Failed to import attachment '{}' for note {}: {}",
                        attachment.filename, note_id, e
                    );
                    summary.attachments_skipped += 1;
                }
            }
        }
    }

    /// Compares the attachments directory with the attachment records.
    ///
    /// Reports files nobody references and records whose file is gone.
    /// With `remove_orphans`, unreferenced files are deleted (best effort).
    pub fn reconcile(&self, remove_orphans: bool) -> Result<ReconcileReport> {
        let records = self.store.get_all_attachments()?;
        let referenced: HashSet<PathBuf> = records
            .iter()
            .map(|a| resolved(Path::new(&a.filepath)))
            .collect();

        let mut report = ReconcileReport::default();

        for entry in WalkDir::new(&self.attachments_dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = resolved(entry.path());
            if !referenced.contains(&path) {
                debug!("Orphaned attachment file: {}", path.display());
                report.orphaned_files.push(path);
            }
        }

        report.dangling_attachments = records
            .into_iter()
            .filter(|a| !Path::new(&a.filepath).exists())
            .collect();

        if remove_orphans && !report.orphaned_files.is_empty() {
            let cleanup = remove_physical_files(report.orphaned_files.iter().map(PathBuf::as_path));
            report.removed_files = cleanup.removed;
        }

        info!(
            "Reconcile: {} orphaned file(s), {} removed, {} dangling record(s)",
            report.orphaned_files.len(),
            report.removed_files.len(),
            report.dangling_attachments.len()
        );
        Ok(report)
    }
}

/// The canonical form of a path, or the path itself if it cannot be resolved.
fn resolved(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Case-insensitive substring match over title, content and tags.
pub fn filter_notes(notes: &[Note], query: &str) -> Vec<Note> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return notes.to_vec();
    }

    notes
        .iter()
        .filter(|note| {
            note.title.to_lowercase().contains(&query)
                || note.content.to_lowercase().contains(&query)
                || note.tags.join(",").to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

/// Sort notes by specified criteria
pub fn sort_notes(notes: &mut [Note], order: SortOrder) {
    match order {
        SortOrder::CreatedNewest => notes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::CreatedOldest => notes.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortOrder::UpdatedNewest => notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        SortOrder::UpdatedOldest => notes.sort_by(|a, b| a.updated_at.cmp(&b.updated_at)),
        SortOrder::TitleAsc => {
            notes.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        }
        SortOrder::TitleDesc => {
            notes.sort_by(|a, b| b.title.to_lowercase().cmp(&a.title.to_lowercase()))
        }
    }
}
