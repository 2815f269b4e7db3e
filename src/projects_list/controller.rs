//! # Table Controller
//!
//! Owns one rendered table: the documents it lists, the records extracted from
//! them and the [`ViewState`] persisted in the hosting document's header.
//!
//! ## Lifecycle
//!
//! ```text
//! Loading --load ok--> Ready --(click, page size, prev/next, doc changed)--> Ready
//!    \--empty input / no match / every document failed--> Error
//! ```
//!
//! A controller built [`TableController::with_input_block`] reads its names
//! from the host's fenced block on load, and again whenever the host itself
//! changes. Documents that join the table then are subscribed as well.
//!
//! Every transition returns a fresh [`PageView`] computed from in-memory state.
//! Transitions that change persisted fields then write the header back through
//! the store. A failed write is logged and dropped: the in-memory state is
//! already correct and is never rolled back.

use std::collections::HashSet;
use std::sync::mpsc::Sender;

use crate::error::{ProjectsListError, Result};
use crate::extract::extract;
use crate::header;
use crate::model::{Column, Record, SortDirection, ViewState};
use crate::source::{find_input_block, parse_names, select_documents};
use crate::store::{ChangeEvent, DocumentStore};
use crate::view::{self, PageView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Loading,
    Ready,
    Error,
}

pub struct TableController<S: DocumentStore> {
    store: S,
    host_id: String,
    names: Vec<String>,
    records: Vec<Record>,
    state: ViewState,
    status: Status,
    default_page_size: usize,
    input_block: Option<String>,
    listener: Option<Sender<ChangeEvent>>,
    subscribed: HashSet<String>,
}

impl<S: DocumentStore> TableController<S> {
    /// `host_id` is the document whose header carries the state; `names` are
    /// the basenames listed in its input block.
    pub fn new(store: S, host_id: impl Into<String>, names: Vec<String>) -> Self {
        Self {
            store,
            host_id: host_id.into(),
            names,
            records: Vec::new(),
            state: ViewState::default(),
            status: Status::Loading,
            default_page_size: ViewState::default().pagination.page_size,
            input_block: None,
            listener: None,
            subscribed: HashSet::new(),
        }
    }

    /// Takes the names from the host's input block tagged `language`
    /// instead of a fixed list.
    pub fn with_input_block(mut self, language: impl Into<String>) -> Self {
        self.input_block = Some(language.into());
        self
    }

    /// Page size used when the header has none.
    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        if page_size > 0 {
            self.default_page_size = page_size;
        }
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Replaces the listed names. Takes effect on the next load or change.
    pub fn set_names(&mut self, names: Vec<String>) {
        self.names = names;
    }

    /// Extracts every listed document and restores the persisted state.
    pub fn load(&mut self) -> Result<PageView> {
        self.status = Status::Loading;
        if let Err(error) = self.refresh_names() {
            self.status = Status::Error;
            return Err(error);
        }
        match self.load_records() {
            Ok(records) => self.records = records,
            Err(error) => {
                self.status = Status::Error;
                return Err(error);
            }
        }
        self.state = self.load_state();
        self.status = Status::Ready;
        self.subscribe_missing();
        Ok(self.view())
    }

    pub fn view(&self) -> PageView {
        view::apply(&self.records, &self.state)
    }

    /// Same column flips direction, another column sorts ascending. Back to page 1.
    pub fn click_column(&mut self, column: Column) -> PageView {
        let sort = &mut self.state.sort;
        if sort.column == column {
            sort.direction = sort.direction.flipped();
        } else {
            sort.column = column;
            sort.direction = SortDirection::Asc;
        }
        self.state.pagination.current_page = 1;
        self.save_state();
        self.view()
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<PageView> {
        if page_size == 0 {
            return Err(ProjectsListError::Api(
                "Page size must be a positive number".to_string(),
            ));
        }
        self.state.pagination.page_size = page_size;
        self.state.pagination.current_page = 1;
        self.save_state();
        Ok(self.view())
    }

    pub fn can_go_prev(&self) -> bool {
        self.state.pagination.current_page > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.state.pagination.current_page < self.total_pages()
    }

    /// `None` at the last page; nothing is persisted then.
    pub fn next_page(&mut self) -> Option<PageView> {
        if !self.can_go_next() {
            return None;
        }
        self.state.pagination.current_page += 1;
        self.save_state();
        Some(self.view())
    }

    /// `None` on the first page. A page left past the end by shrinking data
    /// steps back onto the last page.
    pub fn prev_page(&mut self) -> Option<PageView> {
        if !self.can_go_prev() {
            return None;
        }
        let last = self.total_pages().max(1);
        self.state.pagination.current_page = (self.state.pagination.current_page - 1).min(last);
        self.save_state();
        Some(self.view())
    }

    /// Re-extracts every record after `id` changed. Sort and page are kept.
    /// A change to the host also re-reads its input block.
    pub fn on_document_changed(&mut self, id: &str) -> Result<PageView> {
        tracing::debug!(id, host = %self.host_id, "Refreshing table");
        if id == self.host_id {
            if let Err(error) = self.refresh_names() {
                self.status = Status::Error;
                return Err(error);
            }
        }
        match self.load_records() {
            Ok(records) => {
                self.records = records;
                self.status = Status::Ready;
                self.subscribe_missing();
                Ok(self.view())
            }
            Err(error) => {
                self.status = Status::Error;
                Err(error)
            }
        }
    }

    /// Document id behind the 1-based `row` of the current page.
    pub fn path_of_row(&self, row: usize) -> Result<String> {
        let page = self.view();
        row.checked_sub(1)
            .and_then(|i| page.page_items.get(i))
            .map(|record| record.id.clone())
            .ok_or_else(|| ProjectsListError::Api(format!("No row {} on this page", row)))
    }

    /// Subscribes `sender` to the host and every listed document. Documents
    /// that join the table later are subscribed as they appear.
    pub fn subscribe(&mut self, sender: &Sender<ChangeEvent>) {
        self.listener = Some(sender.clone());
        self.subscribe_missing();
    }

    fn subscribe_missing(&mut self) {
        let Some(sender) = &self.listener else {
            return;
        };
        let ids = std::iter::once(&self.host_id).chain(self.records.iter().map(|r| &r.id));
        for id in ids {
            if self.subscribed.insert(id.clone()) {
                self.store.subscribe(id, sender.clone());
            }
        }
    }

    fn refresh_names(&mut self) -> Result<()> {
        let Some(language) = &self.input_block else {
            return Ok(());
        };
        let text = self.store.read_text(&self.host_id)?;
        self.names = find_input_block(&text, language)
            .map(|block| parse_names(&block))
            .unwrap_or_default();
        Ok(())
    }

    /// Writes the current state into the host header.
    pub fn persist(&self) -> Result<()> {
        let text = self.store.read_text(&self.host_id)?;
        let updated = header::write(&text, &self.state.to_fields())?;
        if updated == text {
            return Ok(());
        }
        self.store.write_text(&self.host_id, &updated)
    }

    /// Persists and deliberately drops the outcome: the table has already
    /// re-rendered from memory, and a write failure must not undo that.
    fn save_state(&self) {
        if let Err(error) = self.persist() {
            tracing::warn!(host = %self.host_id, error = %error, "Could not save table state");
        }
    }

    fn total_pages(&self) -> usize {
        view::total_pages(self.records.len(), self.state.pagination.page_size)
    }

    fn load_records(&self) -> Result<Vec<Record>> {
        if self.names.is_empty() {
            return Err(ProjectsListError::EmptyInput);
        }
        let documents = self.store.list_documents()?;
        let selected = select_documents(&documents, &self.names);
        if selected.is_empty() {
            return Err(ProjectsListError::NoMatch);
        }

        let mut records = Vec::with_capacity(selected.len());
        let mut first_failure = None;
        for doc in &selected {
            match self.store.read_text(&doc.id) {
                Ok(text) => records.push(extract(&text, doc)),
                Err(error) => {
                    tracing::warn!(id = %doc.id, error = %error, "Skipping unreadable document");
                    first_failure.get_or_insert_with(|| doc.id.clone());
                }
            }
        }

        match first_failure {
            Some(id) if records.is_empty() => Err(ProjectsListError::Extraction {
                id,
                reason: format!("none of the {} matched documents could be read", selected.len()),
            }),
            _ => Ok(records),
        }
    }

    fn load_state(&self) -> ViewState {
        let mut state = ViewState::with_page_size(self.default_page_size);
        let text = match self.store.read_text(&self.host_id) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(host = %self.host_id, error = %error, "Could not read host document; using default table state");
                return state;
            }
        };
        match header::read(&text) {
            Ok(Some(fields)) => state.apply_fields(&fields),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(host = %self.host_id, error = %error, "Ignoring malformed table state");
            }
        }
        state
    }
}
