//! Note-taking library with tags, reminders and file attachments
//!
//! Notes, their tags and attachment records live in a SQLite store behind the
//! [`NoteStore`] trait. Attachment files are kept in an application-private
//! directory and cleaned up on a best-effort basis when their records go.

mod cli;
mod config;
mod controller;
mod errors;
mod helper;
mod note;
mod storage;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use controller::*;
pub use errors::*;
pub use helper::*;
pub use note::*;
pub use storage::*;
pub use types::*;
