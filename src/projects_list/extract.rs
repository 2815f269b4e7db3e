//! # Marker Extraction
//!
//! Turns a document's free text into a [`Record`]. Extraction is total: any
//! text, however malformed, yields a record, with missing markers mapped to
//! their neutral value.
//!
//! ## Markers
//!
//! | Marker        | Field       | Rule                                         |
//! |---------------|-------------|----------------------------------------------|
//! | `#flagN`      | `flag`      | First `#flag` directly followed by `1`..=`5` |
//! | `#priorityN`  | `priority`  | Same rule, independent of `flag`             |
//! | `#draft`      | `is_draft`  | Literal anywhere in the text                 |
//!
//! ## Task Lines
//!
//! A task line is any line containing a checkbox: `- [`, exactly one marker
//! character, `]`. The checkbox may sit anywhere in the line, so quoted and
//! callout tasks (`> - [x] ...`) count. The marker must be a space (open) or a
//! lowercase `x` (done). `- [X]`, `-[x]`, `- [xx]` and `- []` are plain text.
//! When a line holds several checkboxes, the first well-formed one decides.
//!
//! Lines are classified one at a time and folded through [`TaskTally`], a
//! two-state machine (inside a group / outside a group). Any non-task line,
//! blank lines included, closes the current group:
//!
//! ```text
//! - [x] a      <- group 1 opens
//! - [ ] b
//!              <- group 1 closes
//! - [x] c      <- group 2 opens
//! ```

use crate::model::Record;
use crate::store::Document;

const FLAG_TAG: &str = "#flag";
const PRIORITY_TAG: &str = "#priority";
const DRAFT_TAG: &str = "#draft";
const CHECKBOX_OPEN: &str = "- [";

/// Builds the record for `doc` from its text.
pub fn extract(text: &str, doc: &Document) -> Record {
    let tally = count_tasks(text);
    let group_path = doc.parent_id.clone().unwrap_or_default();
    let group_name = group_path
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    Record {
        id: doc.id.clone(),
        group_name,
        group_path,
        flag: first_level_marker(text, FLAG_TAG),
        priority: first_level_marker(text, PRIORITY_TAG),
        is_draft: text.contains(DRAFT_TAG),
        tasks_done: tally.done,
        tasks_total: tally.total,
        tasks_groups_count: tally.groups,
        updated_at: doc.last_modified,
    }
}

/// Value of the first `tag` occurrence directly followed by a digit in `1..=5`.
///
/// `#flag9 #flag3` yields 3: occurrences without a valid level are skipped.
pub fn first_level_marker(text: &str, tag: &str) -> Option<u8> {
    text.match_indices(tag)
        .find_map(|(pos, _)| match text.as_bytes().get(pos + tag.len()).copied() {
            Some(digit @ b'1'..=b'5') => Some(digit - b'0'),
            _ => None,
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Task { done: bool },
    Other,
}

/// Classifies a single line (without its `\n`).
pub fn classify_line(line: &str) -> LineKind {
    line.match_indices(CHECKBOX_OPEN)
        .find_map(|(pos, _)| {
            let marker = pos + CHECKBOX_OPEN.len();
            match line.as_bytes().get(marker..marker + 2) {
                Some(b" ]") => Some(LineKind::Task { done: false }),
                Some(b"x]") => Some(LineKind::Task { done: true }),
                _ => None,
            }
        })
        .unwrap_or(LineKind::Other)
}

/// Running task counts. `in_group` is the whole state of the grouping machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskTally {
    pub done: usize,
    pub total: usize,
    pub groups: usize,
    in_group: bool,
}

impl TaskTally {
    pub fn feed(&mut self, kind: LineKind) {
        match kind {
            LineKind::Task { done } => {
                self.total += 1;
                if done {
                    self.done += 1;
                }
                if !self.in_group {
                    self.groups += 1;
                    self.in_group = true;
                }
            }
            LineKind::Other => self.in_group = false,
        }
    }
}

pub fn count_tasks(text: &str) -> TaskTally {
    text.split('\n')
        .map(classify_line)
        .fold(TaskTally::default(), |mut tally, kind| {
            tally.feed(kind);
            tally
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn doc(id: &str, parent: Option<&str>) -> Document {
        Document {
            id: id.to_string(),
            basename: id.trim_end_matches(".md").to_string(),
            parent_id: parent.map(str::to_string),
            last_modified: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_tasks_with_blank_line_split_groups() {
        let tally = count_tasks("- [x]\n- [ ]\n\n- [x]");
        assert_eq!(tally.total, 3);
        assert_eq!(tally.done, 2);
        assert_eq!(tally.groups, 2);
    }

    #[test]
    fn test_first_flag_wins() {
        assert_eq!(first_level_marker("#flag3 then #flag1", FLAG_TAG), Some(3));
        assert_eq!(first_level_marker("#flag1 then #flag3", FLAG_TAG), Some(1));
    }

    #[test]
    fn test_flag_out_of_range_is_skipped() {
        assert_eq!(first_level_marker("#flag9 #flag0 #flag4", FLAG_TAG), Some(4));
        assert_eq!(first_level_marker("#flag", FLAG_TAG), None);
        assert_eq!(first_level_marker("#flagx", FLAG_TAG), None);
    }

    #[test]
    fn test_priority_independent_of_flag() {
        let record = extract("#priority2 #flag5", &doc("a.md", None));
        assert_eq!(record.flag, Some(5));
        assert_eq!(record.priority, Some(2));
    }

    #[test]
    fn test_draft_tag() {
        assert!(extract("wip #draft", &doc("a.md", None)).is_draft);
        assert!(!extract("no tags here", &doc("a.md", None)).is_draft);
    }

    #[test]
    fn test_malformed_checkboxes_do_not_count() {
        let text = "-[x] missing space\n- [xx] two chars\n- [X] uppercase\n- [] empty\n- [-] dash";
        let tally = count_tasks(text);
        assert_eq!(tally.total, 0);
        assert_eq!(tally.done, 0);
        assert_eq!(tally.groups, 0);
    }

    #[test]
    fn test_indented_and_crlf_task_lines() {
        let tally = count_tasks("  - [x] nested\r\n\t- [ ] tabbed\r\n");
        assert_eq!(tally.total, 2);
        assert_eq!(tally.done, 1);
        assert_eq!(tally.groups, 1);
    }

    #[test]
    fn test_single_task_is_own_group() {
        let tally = count_tasks("intro\n- [ ] one\noutro\n- [x] two");
        assert_eq!(tally.groups, 2);
        assert_eq!(tally.total, 2);
    }

    #[test]
    fn test_text_after_checkbox_is_allowed() {
        assert_eq!(classify_line("- [x] ship it"), LineKind::Task { done: true });
        assert_eq!(classify_line("- [ ]"), LineKind::Task { done: false });
        assert_eq!(classify_line("see - [x] inline"), LineKind::Task { done: true });
        assert_eq!(classify_line("- [X] then - [ ] open"), LineKind::Task { done: false });
    }

    #[test]
    fn test_quoted_tasks_count() {
        let tally = count_tasks("> - [x] quoted done\n> - [ ] quoted open\n");
        assert_eq!(tally.total, 2);
        assert_eq!(tally.done, 1);
        assert_eq!(tally.groups, 1);
    }

    #[test]
    fn test_callout_tasks_count() {
        let text = "> [!todo] Next\n> - [ ] write\n> - [x] plan\n\n- [x] ship";
        let tally = count_tasks(text);
        assert_eq!(tally.total, 3);
        assert_eq!(tally.done, 2);
        assert_eq!(tally.groups, 2);
    }

    #[test]
    fn test_done_never_exceeds_total() {
        let samples = [
            "",
            "- [x]",
            "- [x]\n- [x]\n- [ ]",
            "- [ ]\n\n\n- [x]\n-[x]\n- [X]",
            "#flag1 - [x] #draft\n- [x]",
        ];
        for text in samples {
            let tally = count_tasks(text);
            assert!(tally.done <= tally.total, "violated for {:?}", text);
            assert!(tally.groups <= tally.total, "groups exceed tasks for {:?}", text);
        }
    }

    #[test]
    fn test_extract_is_deterministic() {
        let text = "#flag2\n- [x] a\n- [ ] b\n#draft";
        let d = doc("Projects/Alpha/Alpha.md", Some("Projects/Alpha"));
        assert_eq!(extract(text, &d), extract(text, &d));
    }

    #[test]
    fn test_group_fields_from_parent() {
        let record = extract("", &doc("Projects/Alpha/notes.md", Some("Projects/Alpha")));
        assert_eq!(record.group_name, "Alpha");
        assert_eq!(record.group_path, "Projects/Alpha");

        let root = extract("", &doc("notes.md", None));
        assert_eq!(root.group_name, "");
        assert_eq!(root.group_path, "");
    }

    #[test]
    fn test_updated_at_passes_through() {
        let d = doc("a.md", None);
        assert_eq!(extract("whatever", &d).updated_at, d.last_modified);
    }
}
