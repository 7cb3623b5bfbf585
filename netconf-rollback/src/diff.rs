//! Side-by-side comparison of two `show running-config` snapshots.

use crate::error::{Error, Result};
use log::info;
use quick_xml::escape::escape;
use similar::{DiffTag, TextDiff};
use std::fmt::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Equal,
    Removed,
    Added,
    Changed,
}

impl RowKind {
    fn class(&self) -> &'static str {
        match self {
            RowKind::Equal => "equal",
            RowKind::Removed => "removed",
            RowKind::Added => "added",
            RowKind::Changed => "changed",
        }
    }
}

/// One line pair. Line numbers are 1-based; a side is `None` when the line exists
/// only on the other side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRow {
    pub kind: RowKind,
    pub before: Option<(usize, String)>,
    pub after: Option<(usize, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    rows: Vec<DiffRow>,
    added: usize,
    removed: usize,
}

impl DiffReport {
    pub fn new(before: &[String], after: &[String]) -> DiffReport {
        let old: Vec<&str> = before.iter().map(String::as_str).collect();
        let new: Vec<&str> = after.iter().map(String::as_str).collect();
        let diff = TextDiff::from_slices(&old, &new);

        let mut report = DiffReport {
            rows: Vec::new(),
            added: 0,
            removed: 0,
        };
        for op in diff.ops() {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => {
                    for (o, n) in old_range.zip(new_range) {
                        report.push(RowKind::Equal, Some((o, old[o])), Some((n, new[n])));
                    }
                }
                DiffTag::Delete => {
                    for o in old_range {
                        report.push(RowKind::Removed, Some((o, old[o])), None);
                    }
                }
                DiffTag::Insert => {
                    for n in new_range {
                        report.push(RowKind::Added, None, Some((n, new[n])));
                    }
                }
                DiffTag::Replace => {
                    let paired = old_range.len().min(new_range.len());
                    for (o, n) in old_range.clone().zip(new_range.clone()) {
                        report.push(RowKind::Changed, Some((o, old[o])), Some((n, new[n])));
                    }
                    for o in old_range.skip(paired) {
                        report.push(RowKind::Removed, Some((o, old[o])), None);
                    }
                    for n in new_range.skip(paired) {
                        report.push(RowKind::Added, None, Some((n, new[n])));
                    }
                }
            }
        }
        report
    }

    fn push(&mut self, kind: RowKind, before: Option<(usize, &str)>, after: Option<(usize, &str)>) {
        if kind != RowKind::Equal {
            self.removed += before.is_some() as usize;
            self.added += after.is_some() as usize;
        }
        self.rows.push(DiffRow {
            kind,
            before: before.map(|(i, line)| (i + 1, line.to_string())),
            after: after.map(|(i, line)| (i + 1, line.to_string())),
        });
    }

    pub fn rows(&self) -> &[DiffRow] {
        &self.rows
    }

    /// Lines present only after the change, counting the new side of changed pairs.
    pub fn added(&self) -> usize {
        self.added
    }

    /// Lines present only before the change, counting the old side of changed pairs.
    pub fn removed(&self) -> usize {
        self.removed
    }

    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.removed > 0
    }

    pub fn changed_rows(&self) -> impl Iterator<Item = &DiffRow> {
        self.rows.iter().filter(|row| row.kind != RowKind::Equal)
    }

    /// Standalone HTML page with a two-column table, `from` on the left.
    pub fn to_html(&self, from: &str, to: &str) -> String {
        let mut html = String::new();
        html.push_str(HTML_HEAD);
        let _ = writeln!(
            html,
            "<h1>Configuration diff</h1>\n<p>{} line(s) added, {} line(s) removed</p>",
            self.added, self.removed
        );
        if !self.has_changes() {
            html.push_str("<p class=\"identical\">No differences</p>\n");
        }
        let _ = writeln!(
            html,
            "<table>\n<thead><tr><th colspan=\"2\">{}</th><th colspan=\"2\">{}</th></tr></thead>\n<tbody>",
            escape(from),
            escape(to)
        );
        for row in &self.rows {
            let _ = writeln!(
                html,
                "<tr class=\"{}\">{}{}</tr>",
                row.kind.class(),
                cells(&row.before),
                cells(&row.after)
            );
        }
        html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
        html
    }

    pub async fn write_html(&self, path: &Path, from: &str, to: &str) -> Result<()> {
        tokio::fs::write(path, self.to_html(from, to))
            .await
            .map_err(|err| Error::file(path, err))?;
        info!(
            "Wrote diff report to '{}' ({} added, {} removed)",
            path.display(),
            self.added,
            self.removed
        );
        Ok(())
    }
}

fn cells(side: &Option<(usize, String)>) -> String {
    match side {
        Some((number, line)) => format!(
            "<td class=\"lineno\">{}</td><td><pre>{}</pre></td>",
            number,
            escape(line.as_str())
        ),
        None => "<td class=\"lineno\"></td><td></td>".to_string(),
    }
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Configuration diff</title>
<style>
table { border-collapse: collapse; font-family: monospace; width: 100%; }
td, th { padding: 0 6px; vertical-align: top; }
td pre { margin: 0; white-space: pre-wrap; }
td.lineno { color: #888; text-align: right; }
tr.removed td { background: #ffdddd; }
tr.added td { background: #ddffdd; }
tr.changed td { background: #ffffcc; }
</style>
</head>
<body>
"#;
