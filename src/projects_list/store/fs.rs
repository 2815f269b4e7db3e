use super::{broadcast, ChangeEvent, Document, DocumentStore};
use crate::error::{ProjectsListError, Result};
use chrono::{DateTime, Utc};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::cell::OnceCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;
use walkdir::{DirEntry, WalkDir};

/// A subscribed document. `snapshot` is the text last seen or written by
/// this store; only a different text counts as an external change.
struct Watch {
    path: PathBuf,
    snapshot: Option<String>,
    senders: Vec<Sender<ChangeEvent>>,
}

type Watches = Arc<Mutex<HashMap<String, Watch>>>;

/// A vault directory on disk.
///
/// Every file below the root whose name ends in one of the configured
/// extensions is a document. Hidden files and directories are skipped.
///
/// The first [`DocumentStore::subscribe`] starts a recursive `notify` watcher
/// on the root. Its callback compares each subscribed document against its
/// snapshot and sends a [`ChangeEvent`] when the text differs. If the watcher
/// cannot start, [`DocumentStore::poll_changes`] does the same check on demand.
pub struct FsStore {
    root: PathBuf,
    extensions: Vec<String>,
    watches: Watches,
    watcher: OnceCell<Option<RecommendedWatcher>>,
    use_watcher: bool,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        let extensions = extensions
            .iter()
            .map(|ext| {
                if ext.starts_with('.') {
                    ext.clone()
                } else {
                    format!(".{}", ext)
                }
            })
            .collect();
        Self {
            root: root.into(),
            extensions,
            watches: Arc::new(Mutex::new(HashMap::new())),
            watcher: OnceCell::new(),
            use_watcher: true,
        }
    }

    /// Disables the filesystem watcher. Changes are then only seen by
    /// [`DocumentStore::poll_changes`].
    pub fn polling_only(mut self) -> Self {
        self.use_watcher = false;
        self
    }

    /// Whether a filesystem watcher is delivering events.
    pub fn is_watching(&self) -> bool {
        matches!(self.watcher.get(), Some(Some(_)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for `id`. Ids that would escape the root resolve to nothing.
    pub fn path_of(&self, id: &str) -> Option<PathBuf> {
        let relative = Path::new(id);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if id.is_empty() || escapes {
            return None;
        }
        Some(self.root.join(relative))
    }

    fn has_extension(&self, name: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| name.len() > ext.len() && name.ends_with(ext.as_str()))
    }

    fn id_of(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    fn existing_path(&self, id: &str) -> Result<PathBuf> {
        self.path_of(id)
            .filter(|p| p.is_file())
            .ok_or_else(|| ProjectsListError::DocumentNotFound(id.to_string()))
    }

    fn ensure_watcher(&self) {
        if !self.use_watcher {
            return;
        }
        self.watcher.get_or_init(|| match self.start_watcher() {
            Ok(watcher) => {
                tracing::debug!(root = %self.root.display(), "Watching vault");
                Some(watcher)
            }
            Err(error) => {
                tracing::warn!(error = %error, "Could not watch vault; falling back to polling");
                None
            }
        });
    }

    fn start_watcher(&self) -> notify::Result<RecommendedWatcher> {
        let watches = Arc::clone(&self.watches);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) if is_content_change(&event.kind) => {
                    check_watches(&watches);
                }
                Ok(_) => {}
                Err(error) => tracing::warn!(error = %error, "File watcher error"),
            }
        })?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        Ok(watcher)
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn lock(watches: &Mutex<HashMap<String, Watch>>) -> MutexGuard<'_, HashMap<String, Watch>> {
    watches.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Re-reads every subscribed document and notifies on a changed text.
/// A document that disappears counts as changed.
fn check_watches(watches: &Mutex<HashMap<String, Watch>>) -> usize {
    let mut sent = 0;
    for (id, watch) in lock(watches).iter_mut() {
        let current = fs::read_to_string(&watch.path).ok();
        if current == watch.snapshot {
            continue;
        }
        watch.snapshot = current;
        tracing::debug!(id = %id, "Detected external change");
        sent += broadcast(&mut watch.senders, &ChangeEvent { id: id.clone() });
    }
    sent
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

impl DocumentStore for FsStore {
    fn list_documents(&self) -> Result<Vec<Document>> {
        if !self.root.is_dir() {
            return Err(ProjectsListError::Api(format!(
                "Vault directory not found: {}",
                self.root.display()
            )));
        }

        let mut documents = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    tracing::warn!(error = %error, "Skipping unreadable vault entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !self.has_extension(&name) {
                continue;
            }
            let Some(id) = self.id_of(entry.path()) else {
                continue;
            };
            let mtime = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(Utc::now);
            documents.push(Document::from_id(&id, mtime));
        }
        Ok(documents)
    }

    fn read_text(&self, id: &str) -> Result<String> {
        let path = self.existing_path(id)?;
        fs::read_to_string(path).map_err(ProjectsListError::Io)
    }

    fn write_text(&self, id: &str, text: &str) -> Result<()> {
        let write_error = |reason: String| ProjectsListError::Write {
            id: id.to_string(),
            reason,
        };
        let target = self
            .existing_path(id)
            .map_err(|_| write_error("document no longer exists".to_string()))?;
        let dir = target
            .parent()
            .ok_or_else(|| write_error("document has no parent directory".to_string()))?;

        // Held until the snapshot matches the new text, so the watcher thread
        // never reports this write as an external change.
        let mut watches = lock(&self.watches);
        let tmp_path = dir.join(format!(".projects-list-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_path, text).map_err(|e| write_error(e.to_string()))?;
        if let Err(e) = fs::rename(&tmp_path, &target) {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_error(e.to_string()));
        }
        if let Some(watch) = watches.get_mut(id) {
            watch.snapshot = Some(text.to_string());
        }
        drop(watches);
        tracing::debug!(id, "Wrote document");
        Ok(())
    }

    fn subscribe(&self, id: &str, sender: Sender<ChangeEvent>) {
        let Some(path) = self.path_of(id) else {
            tracing::warn!(id, "Not subscribing to a path outside the vault");
            return;
        };
        lock(&self.watches)
            .entry(id.to_string())
            .or_insert_with(|| Watch {
                snapshot: fs::read_to_string(&path).ok(),
                path,
                senders: Vec::new(),
            })
            .senders
            .push(sender);
        self.ensure_watcher();
    }

    fn poll_changes(&self) -> Result<usize> {
        Ok(check_watches(&self.watches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn md() -> Vec<String> {
        vec![".md".to_string()]
    }

    fn touch(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_lists_nested_documents() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "Projects/Alpha/Alpha.md", "");
        touch(dir.path(), "root.md", "");
        touch(dir.path(), "image.png", "");

        let store = FsStore::new(dir.path(), &md());
        let docs = store.list_documents().unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["Projects/Alpha/Alpha.md", "root.md"]);

        assert_eq!(docs[0].basename, "Alpha");
        assert_eq!(docs[0].parent_id.as_deref(), Some("Projects/Alpha"));
        assert_eq!(docs[1].parent_id, None);
    }

    #[test]
    fn test_skips_hidden_entries() {
        let dir = tempdir().unwrap();
        touch(dir.path(), ".obsidian/workspace.md", "");
        touch(dir.path(), ".draft.md", "");
        touch(dir.path(), "visible.md", "");

        let store = FsStore::new(dir.path(), &md());
        let docs = store.list_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "visible.md");
    }

    #[test]
    fn test_extension_without_dot() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.txt", "");
        touch(dir.path(), "b.md", "");
        let store = FsStore::new(dir.path(), &["txt".to_string()]);
        let docs = store.list_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "a.txt");
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path().join("nope"), &md());
        assert!(store.list_documents().is_err());
    }

    #[test]
    fn test_write_is_atomic_and_leaves_no_tmp() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.md", "old");
        let store = FsStore::new(dir.path(), &md());

        store.write_text("a.md", "new").unwrap();
        assert_eq!(store.read_text("a.md").unwrap(), "new");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_to_deleted_document_fails() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path(), &md());
        let err = store.write_text("gone.md", "x").unwrap_err();
        assert!(matches!(err, ProjectsListError::Write { .. }));
        assert!(!dir.path().join("gone.md").exists());
    }

    #[test]
    fn test_ids_cannot_escape_root() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path(), &md());
        assert!(store.path_of("../outside.md").is_none());
        assert!(store.path_of("/etc/passwd").is_none());
        assert!(store.path_of("").is_none());
        assert!(store.read_text("../outside.md").is_err());
    }

    #[test]
    fn test_poll_detects_external_change_only() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.md", "v1");
        let store = FsStore::new(dir.path(), &md()).polling_only();
        let (tx, rx) = mpsc::channel();
        store.subscribe("a.md", tx);
        assert!(!store.is_watching());

        assert_eq!(store.poll_changes().unwrap(), 0);

        store.write_text("a.md", "own").unwrap();
        assert_eq!(store.poll_changes().unwrap(), 0);

        fs::write(dir.path().join("a.md"), "external").unwrap();
        assert_eq!(store.poll_changes().unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap().id, "a.md");
        assert_eq!(store.poll_changes().unwrap(), 0);
    }

    #[test]
    fn test_back_to_back_edits_are_both_seen() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.md", "v1");
        let store = FsStore::new(dir.path(), &md()).polling_only();
        let (tx, rx) = mpsc::channel();
        store.subscribe("a.md", tx);

        fs::write(dir.path().join("a.md"), "v2").unwrap();
        assert_eq!(store.poll_changes().unwrap(), 1);
        fs::write(dir.path().join("a.md"), "v3").unwrap();
        assert_eq!(store.poll_changes().unwrap(), 1);
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_removed_document_notifies() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.md", "v1");
        let store = FsStore::new(dir.path(), &md()).polling_only();
        let (tx, rx) = mpsc::channel();
        store.subscribe("a.md", tx);

        fs::remove_file(dir.path().join("a.md")).unwrap();
        assert_eq!(store.poll_changes().unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap().id, "a.md");
    }

    #[test]
    fn test_watcher_pushes_external_change() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.md", "v1");
        let store = FsStore::new(dir.path(), &md());
        let (tx, rx) = mpsc::channel();
        store.subscribe("a.md", tx);
        if !store.is_watching() {
            // No inotify/FSEvents in this environment.
            return;
        }

        fs::write(dir.path().join("a.md"), "external").unwrap();
        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event.id, "a.md");

        // Let the watcher settle, then make sure our own write stays silent.
        std::thread::sleep(Duration::from_millis(300));
        rx.try_iter().for_each(drop);
        store.write_text("a.md", "own").unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
    }
}
