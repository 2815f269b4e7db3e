//! # Domain Model
//!
//! The types every other module speaks: [`Record`] (one row of the table),
//! [`ViewState`] (how the table is currently sorted and paged) and
//! [`HeaderFields`] (the slice of that state persisted in the host document's
//! header).
//!
//! ## Records Are Derived, Never Stored
//!
//! A [`Record`] is recomputed from a document's text and its storage stat on
//! every load. Nothing in this crate writes a record anywhere; only the view
//! state round-trips through the header.
//!
//! ## Wire Names
//!
//! [`Column`] and [`SortDirection`] serialize to the exact strings found in
//! existing headers (`"Tasks Done"`, `"desc"`, ...). Changing a serde rename
//! here breaks every table that was ever saved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ProjectsListError;

/// Page sizes offered by the page-size selector. Any positive size is accepted.
pub const PAGE_SIZES: [usize; 4] = [25, 50, 100, 300];

pub const DEFAULT_PAGE_SIZE: usize = 25;

/// One table row, extracted from a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub group_name: String,
    pub group_path: String,
    pub flag: Option<u8>,
    pub priority: Option<u8>,
    pub is_draft: bool,
    pub tasks_done: usize,
    pub tasks_total: usize,
    pub tasks_groups_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// All tasks checked off, with at least one task present. Drafts never count as complete.
    pub fn is_completed(&self) -> bool {
        !self.is_draft && self.tasks_total > 0 && self.tasks_done == self.tasks_total
    }
}

/// The closed set of sortable table columns, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    #[serde(rename = "№")]
    Index,
    Flag,
    Name,
    Path,
    #[serde(rename = "Tasks Done")]
    TasksDone,
    #[serde(rename = "Tasks Total")]
    TasksTotal,
    #[serde(rename = "Tasks Groups Count")]
    TasksGroupsCount,
    Draft,
    Updated,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::Index,
        Column::Flag,
        Column::Name,
        Column::Path,
        Column::TasksDone,
        Column::TasksTotal,
        Column::TasksGroupsCount,
        Column::Draft,
        Column::Updated,
    ];

    /// Header label, identical to the serialized name.
    pub fn label(&self) -> &'static str {
        match self {
            Column::Index => "№",
            Column::Flag => "Flag",
            Column::Name => "Name",
            Column::Path => "Path",
            Column::TasksDone => "Tasks Done",
            Column::TasksTotal => "Tasks Total",
            Column::TasksGroupsCount => "Tasks Groups Count",
            Column::Draft => "Draft",
            Column::Updated => "Updated",
        }
    }

    /// Shell-friendly name, used by the CLI (`tasks-done`, `updated`, ...).
    pub fn slug(&self) -> &'static str {
        match self {
            Column::Index => "index",
            Column::Flag => "flag",
            Column::Name => "name",
            Column::Path => "path",
            Column::TasksDone => "tasks-done",
            Column::TasksTotal => "tasks-total",
            Column::TasksGroupsCount => "tasks-groups",
            Column::Draft => "draft",
            Column::Updated => "updated",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Column {
    type Err = ProjectsListError;

    /// Accepts the header label (`"Tasks Done"`), the slug (`tasks-done`) or `#` for the index column.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if wanted == "#" {
            return Ok(Column::Index);
        }
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(wanted) || c.slug().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ProjectsListError::Api(format!("Unknown column: {}", wanted)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Asc => "↑",
            SortDirection::Desc => "↓",
        }
    }
}

/// Persisted as `projects-list-sort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: Column,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            column: Column::Updated,
            direction: SortDirection::Desc,
        }
    }
}

/// Persisted as `projects-list-pagination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page_size: usize,
    pub current_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            current_page: 1,
        }
    }
}

/// The two reserved header fields. Either may be missing from a given header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderFields {
    pub sort: Option<SortState>,
    pub pagination: Option<Pagination>,
}

impl HeaderFields {
    pub fn is_empty(&self) -> bool {
        self.sort.is_none() && self.pagination.is_none()
    }
}

/// Sort and pagination state of one rendered table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewState {
    pub sort: SortState,
    pub pagination: Pagination,
}

impl ViewState {
    pub fn with_page_size(page_size: usize) -> Self {
        let mut state = Self::default();
        if page_size > 0 {
            state.pagination.page_size = page_size;
        }
        state
    }

    /// Overrides defaults with whatever the header carried.
    ///
    /// Zero page size or page number count as unset, as they did in headers
    /// written by hand.
    pub fn apply_fields(&mut self, fields: &HeaderFields) {
        if let Some(sort) = fields.sort {
            self.sort = sort;
        }
        if let Some(p) = fields.pagination {
            if p.page_size > 0 {
                self.pagination.page_size = p.page_size;
            }
            if p.current_page > 0 {
                self.pagination.current_page = p.current_page;
            }
        }
    }

    pub fn to_fields(&self) -> HeaderFields {
        HeaderFields {
            sort: Some(self.sort),
            pagination: Some(self.pagination),
        }
    }
}
