//! # Document Store
//!
//! The controller never touches the filesystem directly. It talks to a
//! [`DocumentStore`], which lists documents, reads and writes their text, and
//! reports external modifications.
//!
//! ## Implementations
//!
//! - [`fs::FsStore`]: a vault directory on disk, walked recursively.
//! - [`memory::MemStore`]: an in-memory fake for tests.
//!
//! ## Change Notification
//!
//! Interested parties hand the store a [`Sender`] per document id through
//! [`DocumentStore::subscribe`]. Events are pushed as soon as the store sees
//! an edit: the in-memory store on [`memory::MemStore::edit_externally`], the
//! filesystem store from its `notify` watcher thread.
//! [`DocumentStore::poll_changes`] is the fallback for stores whose watcher
//! could not start; the watch loop calls it whenever it times out waiting.
//! Delivery is at-least-once with no ordering.
//!
//! All methods take `&self`. Bookkeeping only the caller's thread touches
//! lives in `RefCell`s; the subscriber table of [`fs::FsStore`] is shared with
//! the watcher thread behind a `Mutex`.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::sync::mpsc::Sender;

pub mod fs;
pub mod memory;

/// What the store knows about a document without reading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path relative to the store root, `/`-separated.
    pub id: String,
    /// File name without extension. Input blocks match against this.
    pub basename: String,
    /// Relative path of the containing folder. `None` at the root.
    pub parent_id: Option<String>,
    pub last_modified: DateTime<Utc>,
}

impl Document {
    /// Derives basename and parent from a `/`-separated id.
    pub fn from_id(id: &str, last_modified: DateTime<Utc>) -> Self {
        let (parent_id, file_name) = match id.rsplit_once('/') {
            Some((parent, name)) if !parent.is_empty() => (Some(parent.to_string()), name),
            Some((_, name)) => (None, name),
            None => (None, id),
        };
        let basename = match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => file_name,
        };
        Self {
            id: id.to_string(),
            basename: basename.to_string(),
            parent_id,
            last_modified,
        }
    }
}

/// Sent once per detected external modification of a subscribed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub id: String,
}

pub trait DocumentStore {
    /// All documents, in a stable store order.
    fn list_documents(&self) -> Result<Vec<Document>>;

    /// Full text of a document.
    fn read_text(&self, id: &str) -> Result<String>;

    /// Replaces a document's text. Fails with `Write` if the document is gone.
    fn write_text(&self, id: &str, text: &str) -> Result<()>;

    /// Registers `sender` for change notifications on `id`.
    fn subscribe(&self, id: &str, sender: Sender<ChangeEvent>);

    /// Checks subscribed documents for external modifications and notifies
    /// subscribers. Returns the number of events sent.
    fn poll_changes(&self) -> Result<usize>;
}

/// Sends `event` to every live sender, dropping the ones whose receiver is gone.
pub(crate) fn broadcast(senders: &mut Vec<Sender<ChangeEvent>>, event: &ChangeEvent) -> usize {
    senders.retain(|tx| tx.send(event.clone()).is_ok());
    senders.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_document_from_nested_id() {
        let doc = Document::from_id("Projects/Alpha/Alpha.md", Utc::now());
        assert_eq!(doc.basename, "Alpha");
        assert_eq!(doc.parent_id.as_deref(), Some("Projects/Alpha"));
    }

    #[test]
    fn test_document_from_root_id() {
        let doc = Document::from_id("notes.md", Utc::now());
        assert_eq!(doc.basename, "notes");
        assert_eq!(doc.parent_id, None);
    }

    #[test]
    fn test_document_dotted_names() {
        assert_eq!(Document::from_id("v1.2 plan.md", Utc::now()).basename, "v1.2 plan");
        assert_eq!(Document::from_id(".hidden", Utc::now()).basename, ".hidden");
        assert_eq!(Document::from_id("README", Utc::now()).basename, "README");
    }

    #[test]
    fn test_broadcast_drops_closed_receivers() {
        let (live_tx, live_rx) = mpsc::channel();
        let (dead_tx, dead_rx) = mpsc::channel();
        drop(dead_rx);
        let mut senders = vec![live_tx, dead_tx];
        let sent = broadcast(&mut senders, &ChangeEvent { id: "a.md".into() });
        assert_eq!(sent, 1);
        assert_eq!(senders.len(), 1);
        assert_eq!(live_rx.try_recv().unwrap().id, "a.md");
    }
}
