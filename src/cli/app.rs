//! CLI module for the notedesk application
//!
//! This module turns parsed commands into note controller calls and prints
//! the results.
use std::{
    fs::read_to_string,
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::{
    format_bytes, format_reminder, parse_reminder, parse_tags, Attachment, CleanupReport,
    Commands, ImportSummary, Note, NoteController, NoteDraft, NoteError, NoteStore,
    ReconcileReport, Result, SortOrder,
};

/// CLI Application handler - processes CLI commands through a NoteController
pub struct App<S: NoteStore> {
    /// The controller holding the store and the working set
    controller: NoteController<S>,

    /// Whether to display verbose output
    verbose: bool,
}

impl<S: NoteStore> App<S> {
    pub fn new(controller: NoteController<S>, verbose: bool) -> Self {
        Self {
            controller,
            verbose,
        }
    }

    /// Run the CLI application with the given command
    pub fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Create {
                title,
                content,
                file,
                tags,
                remind,
            } => self.create_note(title, content, file, tags, remind)?,

            Commands::View { id, json } => self.view_note(id, json)?,

            Commands::List {
                search,
                sort,
                limit,
                json,
                detailed,
            } => self.list_notes(search, sort, limit, json, detailed)?,

            Commands::Edit {
                id,
                title,
                content,
                file,
                tags,
            } => self.handle_edit(id, title, content, file, tags)?,

            Commands::Delete { id, force } => self.handle_delete(id, force)?,

            Commands::Attach { id, file } => self.handle_attach(id, &file)?,

            Commands::Detach {
                attachment_id,
                force,
            } => self.handle_detach(attachment_id, force)?,

            Commands::Open { attachment_id } => self.handle_open(attachment_id)?,

            Commands::Remind { id, at, clear } => self.handle_remind(id, at, clear)?,

            Commands::Export { output, id } => self.handle_export(&output, id)?,

            Commands::Import { source, force } => self.handle_import(&source, force)?,

            Commands::Reconcile { remove_orphans } => self.handle_reconcile(remove_orphans)?,
        }

        Ok(())
    }

    fn create_note(
        &mut self,
        title: String,
        content: Option<String>,
        file: Option<PathBuf>,
        tags: Option<String>,
        remind: Option<String>,
    ) -> Result<()> {
        let note_content = match (content, file) {
            (Some(c), _) => c,
            (_, Some(file_path)) => self.read_content_from_file(&file_path)?,
            (None, None) => String::new(),
        };
        let reminder = remind.as_deref().map(parse_reminder).transpose()?;

        let draft = NoteDraft::new(title, note_content)
            .with_tags(parse_tags(tags))
            .with_reminder(reminder);
        let note = self.controller.save(None, draft)?;

        println!("Note created with ID: {}", note.id);
        Ok(())
    }

    fn read_content_from_file(&self, file_path: &Path) -> Result<String> {
        if !file_path.exists() {
            return Err(NoteError::FileNotFound {
                file_path: file_path.display().to_string(),
            });
        }
        debug!("Reading note content from {}", file_path.display());
        Ok(read_to_string(file_path)?)
    }

    fn view_note(&self, id: i64, json: bool) -> Result<()> {
        let note = self.controller.open(id)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&note)?);
            return Ok(());
        }

        println!("ID: {}", note.id);
        println!("Title: {}", console::style(&note.title).bold());
        println!("Created: {}", note.created_at.format("%Y-%m-%d %H:%M:%S"));
        println!("Updated: {}", note.updated_at.format("%Y-%m-%d %H:%M:%S"));
        if let Some(reminder) = &note.reminder_at {
            println!("Reminder: {}", console::style(format_reminder(reminder)).yellow());
        }
        if !note.tags.is_empty() {
            println!("Tags: {}", console::style(hashtags(&note.tags)).cyan());
        }
        if !note.content.is_empty() {
            println!("\n{}", note.content);
        }

        if !note.attachments.is_empty() {
            println!("\nAttachments:");
            for attachment in &note.attachments {
                println!("  {}", describe_attachment(attachment));
            }
        }

        Ok(())
    }

    fn list_notes(
        &mut self,
        search: Option<String>,
        sort: SortOrder,
        limit: usize,
        json: bool,
        detailed: bool,
    ) -> Result<()> {
        self.controller.load()?;
        self.controller.set_sort(sort);
        self.controller.set_filter(search.as_deref().unwrap_or(""));

        let visible = self.controller.visible();
        let notes = if limit > 0 && visible.len() > limit {
            &visible[..limit]
        } else {
            visible
        };

        self.display_notes(notes, json, detailed)
    }

    /// Display notes in the requested format
    fn display_notes(&self, notes: &[Note], json: bool, detailed: bool) -> Result<()> {
        if notes.is_empty() {
            println!("No notes found matching the criteria.");
            return Ok(());
        }

        if json {
            self.display_notes_json(notes, detailed)?;
            return Ok(());
        }
        self.display_notes_text(notes, detailed);

        // Print count at the end
        println!(
            "\nFound {} note{}",
            notes.len(),
            if notes.len() == 1 { "" } else { "s" }
        );

        Ok(())
    }

    fn display_notes_json(&self, notes: &[Note], detailed: bool) -> Result<()> {
        if detailed {
            println!("{}", serde_json::to_string_pretty(notes)?);
        } else {
            let simplified_notes: Vec<serde_json::Value> = notes
                .iter()
                .map(|note| {
                    serde_json::json!({
                        "id": note.id,
                        "title": note.title,
                        "created_at": note.created_at.to_rfc3339(),
                        "updated_at": note.updated_at.to_rfc3339(),
                        "reminder_at": note.reminder_at.map(|r| r.to_rfc3339()),
                        "tags": note.tags,
                    })
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&simplified_notes)?);
        }

        Ok(())
    }

    fn display_notes_text(&self, notes: &[Note], detailed: bool) {
        // Use terminal width for formatting if available
        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, note) in notes.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }

            let created_at = note.created_at.format("%Y-%m-%d %H:%M");
            println!("ID: {} | Created: {}", note.id, created_at);
            println!("Title: {}", console::style(&note.title).bold());

            if let Some(reminder) = &note.reminder_at {
                println!("Reminder: {}", console::style(format_reminder(reminder)).yellow());
            }
            if !note.tags.is_empty() {
                println!("Tags: {}", console::style(hashtags(&note.tags)).cyan());
            }

            if detailed {
                println!("\n{}", note.content);
            } else {
                let preview = content_preview(&note.content, term_width.min(100));
                if !preview.is_empty() {
                    println!("\n{}", preview);
                }
            }
        }
    }

    fn handle_edit(
        &mut self,
        id: i64,
        title: Option<String>,
        content: Option<String>,
        file: Option<PathBuf>,
        tags: Option<String>,
    ) -> Result<()> {
        let note = self.controller.open(id)?;
        let mut draft = note.to_draft();
        let mut changed = false;

        if let Some(title) = title {
            draft.title = title;
            changed = true;
        }
        if let Some(content) = content {
            draft.content = content;
            changed = true;
        } else if let Some(file_path) = file {
            draft.content = self.read_content_from_file(&file_path)?;
            changed = true;
        }
        if let Some(tags) = tags {
            draft.tags = parse_tags(Some(tags));
            changed = true;
        }

        if !changed {
            return Err(NoteError::validation(
                "nothing to change: pass --title, --content, --file or --tags",
            ));
        }

        let updated = self.controller.save(Some(id), draft)?;
        println!("Note '{}' ({}) updated.", updated.title, updated.id);
        Ok(())
    }

    fn handle_delete(&mut self, id: i64, force: bool) -> Result<()> {
        // Fetch first so a missing note fails before the prompt
        let note = self.controller.open(id)?;

        if !force {
            println!("You are about to delete the following note:");
            println!("ID:     {}", note.id);
            println!("Title:  {}", note.title);
            println!("Tags:   {}", note.tags.join(", "));
            println!("Created: {}", note.created_at.format("%Y-%m-%d %H:%M:%S"));
            if !note.attachments.is_empty() {
                println!(
                    "Attachments: {} (their files will be removed too)",
                    note.attachments.len()
                );
            }

            if !note.content.is_empty() {
                let preview = note.content.lines().take(2).collect::<Vec<_>>().join("\n");

                println!("\nContent preview:");
                println!(
                    "{}{}",
                    preview,
                    if note.content.lines().count() > 2 {
                        "..."
                    } else {
                        ""
                    }
                );
            }

            println!("\nThis action cannot be undone!");
            if !confirm("Are you sure you want to delete this note?")? {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        let report = self.controller.delete(id)?;

        println!(
            "Note '{}' ({}) has been permanently deleted.",
            note.title, note.id
        );
        self.print_cleanup(&report);
        Ok(())
    }

    fn handle_attach(&mut self, note_id: i64, file: &Path) -> Result<()> {
        let attachment = self.controller.attach_file(note_id, file)?;
        println!(
            "Attached '{}' to note {} as attachment {}",
            attachment.filename, note_id, attachment.id
        );
        if self.verbose {
            println!("Stored at: {}", attachment.filepath);
        }
        Ok(())
    }

    fn handle_detach(&mut self, attachment_id: i64, force: bool) -> Result<()> {
        let attachment = self.controller.attachment(attachment_id)?;

        if !force {
            println!("You are about to remove the following attachment:");
            println!("  {}", describe_attachment(&attachment));
            if !confirm("Are you sure you want to remove this attachment?")? {
                println!("Removal cancelled.");
                return Ok(());
            }
        }

        let report = self.controller.remove_attachment(attachment_id)?;
        println!(
            "Attachment '{}' ({}) removed from note {}.",
            attachment.filename, attachment.id, attachment.note_id
        );
        self.print_cleanup(&report);
        Ok(())
    }

    fn handle_open(&self, attachment_id: i64) -> Result<()> {
        match self.controller.open_attachment(attachment_id)? {
            None => println!("Opening attachment {}...", attachment_id),
            Some(warning) => println!(
                "{} could not open attachment: {}",
                console::style("Warning:").yellow(),
                warning
            ),
        }
        Ok(())
    }

    fn handle_remind(&mut self, id: i64, at: Option<String>, clear: bool) -> Result<()> {
        let note = self.controller.open(id)?;
        let reminder = if clear {
            None
        } else {
            at.as_deref().map(parse_reminder).transpose()?
        };

        let draft = note.to_draft().with_reminder(reminder);
        let updated = self.controller.save(Some(id), draft)?;

        match &updated.reminder_at {
            Some(reminder) => println!(
                "Reminder for '{}' set to {}",
                updated.title,
                format_reminder(reminder)
            ),
            None => println!("Reminder for '{}' cleared", updated.title),
        }
        Ok(())
    }

    fn handle_export(&self, output: &Path, id: Option<i64>) -> Result<()> {
        let count = self.controller.export(output, id)?;
        println!(
            "Exported {} note{} to {}",
            count,
            if count == 1 { "" } else { "s" },
            output.display()
        );
        Ok(())
    }

    fn handle_import(&mut self, source: &Path, force: bool) -> Result<()> {
        if !force {
            println!("Importing from {}", source.display());
            println!("Notes whose ID already exists will be overwritten.");
            if !confirm("Continue with the import?")? {
                println!("Import cancelled.");
                return Ok(());
            }
        }

        let summary = self.controller.import(source)?;
        self.print_import_summary(&summary);

        if summary.total_notes == 0 {
            println!("No notes found in {}", source.display());
        } else if summary.imported() == 0 {
            return Err(NoteError::validation(format!(
                "none of the {} notes in {} could be imported",
                summary.total_notes,
                source.display()
            )));
        }
        Ok(())
    }

    fn print_import_summary(&self, summary: &ImportSummary) {
        println!("\nImport summary:");
        println!("  Total notes in file: {}", summary.total_notes);
        println!("  Created: {}", summary.notes_created);
        println!("  Updated: {}", summary.notes_updated);
        println!("  Attachments linked: {}", summary.attachments_linked);
        println!("  Attachments skipped: {}", summary.attachments_skipped);
        println!("  Failed: {}", summary.failed_notes.len());
        for (title, message) in &summary.failed_notes {
            eprintln!("    {}: {}", title, message);
        }
    }

    fn handle_reconcile(&self, remove_orphans: bool) -> Result<()> {
        let report = self.controller.reconcile(remove_orphans)?;
        self.print_reconcile_report(&report, remove_orphans);
        Ok(())
    }

    fn print_reconcile_report(&self, report: &ReconcileReport, remove_orphans: bool) {
        if report.orphaned_files.is_empty() && report.dangling_attachments.is_empty() {
            println!("Attachments directory and records agree.");
            return;
        }

        if !report.orphaned_files.is_empty() {
            println!("Files without an attachment record:");
            for path in &report.orphaned_files {
                let marker = if report.removed_files.contains(path) {
                    " (removed)"
                } else {
                    ""
                };
                println!("  {}{}", path.display(), marker);
            }
            if !remove_orphans {
                println!("Run with --remove-orphans to delete them.");
            }
        }

        if !report.dangling_attachments.is_empty() {
            println!("Attachment records whose file is missing:");
            for attachment in &report.dangling_attachments {
                println!("  {}", describe_attachment(attachment));
            }
        }
    }

    /// File cleanup problems are informational: the records are already gone.
    fn print_cleanup(&self, report: &CleanupReport) {
        if self.verbose {
            for path in &report.removed {
                println!("Removed file: {}", path.display());
            }
        }
        for warning in &report.warnings {
            println!(
                "{} could not remove file {}",
                console::style("Note:").yellow(),
                warning
            );
        }
        if !report.is_clean() {
            info!("{} file(s) left behind", report.warnings.len());
        }
    }
}

/// Ask a yes/no question on stdin, defaulting to no.
fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N]: ", question);
    stdout().flush().map_err(NoteError::Io)?;

    let mut input = String::new();
    stdin().read_line(&mut input).map_err(NoteError::Io)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

fn hashtags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("#{}", tag))
        .collect::<Vec<_>>()
        .join(" ")
}

fn describe_attachment(attachment: &Attachment) -> String {
    format!(
        "[{}] {} ({}, {}) uploaded {}",
        attachment.id,
        attachment.filename,
        attachment.mime_type,
        format_bytes(attachment.size_bytes),
        attachment.uploaded_at.format("%Y-%m-%d %H:%M")
    )
}

/// First non-empty line, cut to `max_len` characters.
fn content_preview(content: &str, max_len: usize) -> String {
    let first_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    if first_line.chars().count() <= max_len {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_len).collect();
        format!("{}...", cut)
    }
}
