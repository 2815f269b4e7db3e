//! Sorting and pagination.
//!
//! [`apply`] is a pure function of the records and the view state. It sorts a
//! copy of the full collection and then slices out the requested page. The
//! sort is stable in both directions: descending reverses the comparator, not
//! the sorted output, so equal rows keep their input order either way.

use std::cmp::Ordering;

use feruca::Collator;

use crate::model::{Column, Record, SortDirection, ViewState};

/// One page of the table, plus what the footer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub page_items: Vec<Record>,
    pub total_items: usize,
    pub total_pages: usize,
    /// 0-based position of the first item of this page in the sorted collection.
    pub start_index: usize,
}

impl PageView {
    /// 1-based row number shown in the `№` column.
    pub fn row_number(&self, offset: usize) -> usize {
        self.start_index + offset + 1
    }
}

pub fn apply(records: &[Record], state: &ViewState) -> PageView {
    let mut sorted = records.to_vec();
    let column = state.sort.column;
    let mut collator = Collator::default();
    match state.sort.direction {
        SortDirection::Asc => sorted.sort_by(|a, b| compare(&mut collator, column, a, b)),
        SortDirection::Desc => {
            sorted.sort_by(|a, b| compare(&mut collator, column, a, b).reverse())
        }
    }

    let total_items = sorted.len();
    let page_size = state.pagination.page_size;
    let total_pages = total_pages(total_items, page_size);

    let (start, end) = page_bounds(total_items, page_size, state.pagination.current_page);
    PageView {
        page_items: sorted[start..end].to_vec(),
        total_items,
        total_pages,
        start_index: start,
    }
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_items.div_ceil(page_size)
}

/// `[(page - 1) * size, page * size)` clamped to `len`. Page 0 is empty.
fn page_bounds(len: usize, page_size: usize, page: usize) -> (usize, usize) {
    if page == 0 || page_size == 0 {
        return (0, 0);
    }
    let start = (page - 1).saturating_mul(page_size).min(len);
    let end = page.saturating_mul(page_size).min(len);
    (start, end)
}

/// Name and Path use Unicode collation (CLDR root order), so `école` sorts
/// before `fable` and `Єва` before `Жанна`.
pub fn compare(collator: &mut Collator, column: Column, a: &Record, b: &Record) -> Ordering {
    match column {
        Column::Index => Ordering::Equal,
        Column::Flag => a.flag.unwrap_or(0).cmp(&b.flag.unwrap_or(0)),
        Column::Name => collator.collate(&a.group_name, &b.group_name),
        Column::Path => collator.collate(&a.group_path, &b.group_path),
        Column::TasksDone => a.tasks_done.cmp(&b.tasks_done),
        Column::TasksTotal => a.tasks_total.cmp(&b.tasks_total),
        Column::TasksGroupsCount => a.tasks_groups_count.cmp(&b.tasks_groups_count),
        Column::Draft => a.is_draft.cmp(&b.is_draft),
        Column::Updated => a.updated_at.cmp(&b.updated_at),
    }
}
