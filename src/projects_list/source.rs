//! Input blocks.
//!
//! A hosting document embeds a fenced code block listing the documents to
//! tabulate, by basename, one per line or comma-separated:
//!
//! ````text
//! ```projects-list
//! Alpha, Beta
//! Gamma
//! ```
//! ````
//!
//! Blocks tagged `projects_list__kamyanytsya`, the info string used by
//! existing vaults, are always recognized alongside the configured one.

use std::collections::HashSet;

use crate::store::Document;

pub const DEFAULT_BLOCK_LANGUAGE: &str = "projects-list";
pub const VAULT_BLOCK_LANGUAGE: &str = "projects_list__kamyanytsya";

/// Splits a block into names. Entries are trimmed and empty ones dropped.
pub fn parse_names(block: &str) -> Vec<String> {
    block
        .split('\n')
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Input block of a hosting document: the first block tagged either with
/// `language` or with [`VAULT_BLOCK_LANGUAGE`].
pub fn find_input_block(text: &str, language: &str) -> Option<String> {
    find_block(text, &[language, VAULT_BLOCK_LANGUAGE])
}

/// Contents of the first fenced block in `text` whose info string is one of `languages`.
///
/// Backtick and tilde fences are both recognized. An unclosed block runs to
/// the end of the text.
pub fn find_block(text: &str, languages: &[&str]) -> Option<String> {
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let Some((fence, info)) = open_fence(line) else {
            continue;
        };
        if !languages.contains(&info) {
            skip_block(&mut lines, &fence);
            continue;
        }

        let mut body = Vec::new();
        for inner in lines.by_ref() {
            if closes(inner, &fence) {
                break;
            }
            body.push(inner);
        }
        return Some(body.join("\n"));
    }
    None
}

/// Documents whose basename matches one of `names`, in name order and then
/// store order. A document matched by several names appears once.
pub fn select_documents(documents: &[Document], names: &[String]) -> Vec<Document> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for name in names {
        for doc in documents.iter().filter(|d| &d.basename == name) {
            if seen.insert(doc.id.as_str()) {
                selected.push(doc.clone());
            }
        }
    }
    selected
}

/// Returns the fence marker run and the trimmed info string.
fn open_fence(line: &str) -> Option<(String, &str)> {
    let trimmed = line.trim_start();
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = trimmed.chars().take_while(|c| *c == marker).count();
    if run < 3 {
        return None;
    }
    let fence = trimmed[..run].to_string();
    Some((fence, trimmed[run..].trim()))
}

fn closes(line: &str, fence: &str) -> bool {
    let trimmed = line.trim();
    let Some(marker) = fence.chars().next() else {
        return false;
    };
    trimmed.len() >= fence.len() && trimmed.chars().all(|c| c == marker)
}

fn skip_block<'a>(lines: &mut impl Iterator<Item = &'a str>, fence: &str) {
    for line in lines {
        if closes(line, fence) {
            return;
        }
    }
}
