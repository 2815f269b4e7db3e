//! # Rendering Module
//!
//! Turns a [`PageView`] into terminal text. Layout (widths, truncation,
//! padding) is Unicode-aware and computed before any color is applied, so
//! colored and plain output line up identically.
//!
//! Row styling follows the record: completed rows are green, rows with a
//! `#priorityN` marker take that priority's color, drafts show a pencil.

use chrono::{DateTime, Local, TimeZone, Utc};
use colored::{ColoredString, Colorize};
use projects_list::config::DateStyle;
use projects_list::model::{Column, Pagination, Record, SortState, ViewState};
use projects_list::view::PageView;
use serde::Serialize;
use std::fmt;
use unicode_width::UnicodeWidthStr;

pub const FLAG_ICONS: [&str; 5] = ["⚪", "🔵", "🟡", "🟠", "🔴"];
pub const DRAFT_ICON: &str = "✏️";
pub const DATE_FORMAT: &str = "%H:%M:%S %d.%m.%Y";
const MAX_TEXT_WIDTH: usize = 40;
const COLUMN_GAP: &str = "  ";

pub struct RenderOptions {
    pub date_style: DateStyle,
    pub use_color: bool,
}

/// Renders the header row, the page rows and, when the data spans more than
/// one page, the pagination footer.
pub fn render_table(view: &PageView, state: &ViewState, options: &RenderOptions) -> String {
    let headers: Vec<String> = Column::ALL
        .iter()
        .map(|column| header_label(*column, &state.sort))
        .collect();
    let rows: Vec<Vec<String>> = view
        .page_items
        .iter()
        .enumerate()
        .map(|(i, record)| row_cells(view.row_number(i), record, options.date_style))
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }

    let mut output = String::new();
    let header_line = join_padded(&headers, &widths);
    output.push_str(&paint(&header_line, options.use_color, |s| s.bold()));
    output.push('\n');

    if rows.is_empty() {
        output.push_str(&paint("No rows on this page.", options.use_color, |s| s.dimmed()));
        output.push('\n');
    }
    for (record, cells) in view.page_items.iter().zip(&rows) {
        let line = join_padded(cells, &widths);
        output.push_str(&style_row(&line, record, options.use_color));
        output.push('\n');
    }

    if let Some(footer) = pagination_footer(view, &state.pagination) {
        output.push('\n');
        output.push_str(&paint(&footer, options.use_color, |s| s.dimmed()));
        output.push('\n');
    }
    output
}

/// "Page X of Y (N total)", only when there is more than one page worth of rows.
pub fn pagination_footer(view: &PageView, pagination: &Pagination) -> Option<String> {
    if view.total_items <= pagination.page_size {
        return None;
    }
    Some(format!(
        "Page {} of {} ({} total)",
        pagination.current_page, view.total_pages, view.total_items
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageJson<'a> {
    sort: &'a SortState,
    pagination: &'a Pagination,
    total_items: usize,
    total_pages: usize,
    rows: &'a [Record],
}

pub fn render_json(view: &PageView, state: &ViewState) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&PageJson {
        sort: &state.sort,
        pagination: &state.pagination,
        total_items: view.total_items,
        total_pages: view.total_pages,
        rows: &view.page_items,
    })
}

pub fn print_info(message: &str) {
    println!("{}", message.dimmed());
}

fn header_label(column: Column, sort: &SortState) -> String {
    if sort.column == column {
        format!("{} {}", column.label(), sort.direction.arrow())
    } else {
        column.label().to_string()
    }
}

fn row_cells(row_number: usize, record: &Record, date_style: DateStyle) -> Vec<String> {
    Column::ALL
        .iter()
        .map(|column| match column {
            Column::Index => row_number.to_string(),
            Column::Flag => flag_icon(record.flag).to_string(),
            Column::Name => truncate_to_width(&record.group_name, MAX_TEXT_WIDTH),
            Column::Path => truncate_to_width(&record.group_path, MAX_TEXT_WIDTH),
            Column::TasksDone => record.tasks_done.to_string(),
            Column::TasksTotal => record.tasks_total.to_string(),
            Column::TasksGroupsCount => record.tasks_groups_count.to_string(),
            Column::Draft => {
                if record.is_draft {
                    DRAFT_ICON.to_string()
                } else {
                    String::new()
                }
            }
            Column::Updated => format_date(record.updated_at, date_style),
        })
        .collect()
}

pub fn flag_icon(flag: Option<u8>) -> &'static str {
    flag.and_then(|level| FLAG_ICONS.get(usize::from(level).checked_sub(1)?))
        .copied()
        .unwrap_or("")
}

fn style_row(line: &str, record: &Record, use_color: bool) -> String {
    if record.is_completed() {
        return paint(line, use_color, |s| s.green());
    }
    match record.priority {
        Some(1) => paint(line, use_color, |s| s.red().bold()),
        Some(2) => paint(line, use_color, |s| s.yellow().bold()),
        Some(3) => paint(line, use_color, |s| s.yellow()),
        Some(4) => paint(line, use_color, |s| s.blue()),
        Some(_) => paint(line, use_color, |s| s.cyan()),
        None => line.to_string(),
    }
}

fn paint(text: &str, use_color: bool, style: impl Fn(&str) -> ColoredString) -> String {
    if use_color {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

fn join_padded(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let padding = width.saturating_sub(cell.width());
            format!("{}{}", cell, " ".repeat(padding))
        })
        .collect();
    padded.join(COLUMN_GAP).trim_end().to_string()
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthChar;

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    let limit = max_width.saturating_sub(1);

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > limit {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}

pub fn format_date(timestamp: DateTime<Utc>, style: DateStyle) -> String {
    match style {
        DateStyle::Absolute => format_absolute_in(timestamp, &Local),
        DateStyle::Relative => format_time_ago(timestamp),
    }
}

fn format_absolute_in<Tz: TimeZone>(timestamp: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    timestamp.with_timezone(tz).format(DATE_FORMAT).to_string()
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    timeago::Formatter::new().convert(duration.to_std().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use projects_list::model::{SortDirection, ViewState};
    use projects_list::view::apply;

    fn record(name: &str, done: usize, total: usize) -> Record {
        Record {
            id: format!("{}/{}.md", name, name),
            group_name: name.to_string(),
            group_path: format!("Projects/{}", name),
            flag: None,
            priority: None,
            is_draft: false,
            tasks_done: done,
            tasks_total: total,
            tasks_groups_count: 1,
            updated_at: Utc.with_ymd_and_hms(2024, 5, 17, 9, 5, 3).unwrap(),
        }
    }

    fn plain() -> RenderOptions {
        RenderOptions {
            date_style: DateStyle::Absolute,
            use_color: false,
        }
    }

    #[test]
    fn test_header_shows_sort_arrow() {
        let state = ViewState::default();
        let view = apply(&[record("Alpha", 0, 1)], &state);
        let output = render_table(&view, &state, &plain());
        let header = output.lines().next().unwrap();
        assert!(header.contains("Updated ↓"));
        assert!(header.starts_with("№"));
        assert!(header.contains("Tasks Groups Count"));
    }

    #[test]
    fn test_row_contents() {
        let mut alpha = record("Alpha", 1, 3);
        alpha.flag = Some(5);
        alpha.is_draft = true;
        let state = ViewState::default();
        let view = apply(&[alpha], &state);
        let output = render_table(&view, &state, &plain());
        let row = output.lines().nth(1).unwrap();
        assert!(row.starts_with("1 "));
        assert!(row.contains("🔴"));
        assert!(row.contains("Projects/Alpha"));
        assert!(row.contains(DRAFT_ICON));
    }

    #[test]
    fn test_row_numbers_continue_across_pages() {
        let records: Vec<Record> = (0..30).map(|i| record(&format!("P{:02}", i), 0, 1)).collect();
        let mut state = ViewState::default();
        state.sort = SortState {
            column: Column::Name,
            direction: SortDirection::Asc,
        };
        state.pagination.current_page = 2;
        let view = apply(&records, &state);
        let output = render_table(&view, &state, &plain());
        let first_row = output.lines().nth(1).unwrap();
        assert!(first_row.starts_with("26"));
        assert!(first_row.contains("P25"));
        assert!(output.contains("Page 2 of 2 (30 total)"));
    }

    #[test]
    fn test_footer_hidden_for_single_page() {
        let state = ViewState::default();
        let records: Vec<Record> = (0..25).map(|i| record(&i.to_string(), 0, 0)).collect();
        let view = apply(&records, &state);
        assert_eq!(pagination_footer(&view, &state.pagination), None);
        assert!(!render_table(&view, &state, &plain()).contains("Page "));
    }

    #[test]
    fn test_empty_page_message() {
        let mut state = ViewState::default();
        state.pagination.current_page = 4;
        let view = apply(&[record("Alpha", 0, 0)], &state);
        assert!(render_table(&view, &state, &plain()).contains("No rows on this page."));
    }

    #[test]
    fn test_columns_align() {
        let state = ViewState::default();
        let view = apply(
            &[record("A", 0, 1), record("Much Longer Name", 10, 12)],
            &state,
        );
        let output = render_table(&view, &state, &plain());
        let lines: Vec<&str> = output.lines().collect();
        let path_col = lines[0].find("Path").unwrap();
        let header_prefix_width = lines[0][..path_col].width();
        for line in &lines[1..3] {
            let at = line.find("Projects/").unwrap();
            assert_eq!(line[..at].width(), header_prefix_width);
        }
    }

    #[test]
    fn test_flag_icons() {
        assert_eq!(flag_icon(Some(1)), "⚪");
        assert_eq!(flag_icon(Some(3)), "🟡");
        assert_eq!(flag_icon(Some(5)), "🔴");
        assert_eq!(flag_icon(None), "");
        assert_eq!(flag_icon(Some(0)), "");
        assert_eq!(flag_icon(Some(9)), "");
    }

    #[test]
    fn test_absolute_date_format() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 17, 9, 5, 3).unwrap();
        assert_eq!(format_absolute_in(ts, &Utc), "09:05:03 17.05.2024");
    }

    #[test]
    fn test_relative_date() {
        let ts = Utc::now() - Duration::hours(3);
        assert!(format_date(ts, DateStyle::Relative).contains("ago"));
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_to_width("this is too long", 8), "this is…");
    }

    #[test]
    fn test_json_output() {
        let state = ViewState::default();
        let view = apply(&[record("Alpha", 2, 2)], &state);
        let json: serde_json::Value = serde_json::from_str(&render_json(&view, &state).unwrap()).unwrap();
        assert_eq!(json["totalItems"], 1);
        assert_eq!(json["sort"]["column"], "Updated");
        assert_eq!(json["pagination"]["pageSize"], 25);
        assert_eq!(json["rows"][0]["groupName"], "Alpha");
        assert_eq!(json["rows"][0]["tasksDone"], 2);
    }
}
