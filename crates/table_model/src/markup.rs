//! Markup round-trip for table trees
//!
//! Parses table markup into a [`TableTree`] (ids are minted at parse time;
//! the external form is id-less) and serializes a tree back to markup.
//! Serialization can exclude ephemeral structure - synthetic helper elements
//! and marker classes exist only while a table is being edited and must not
//! survive into the persistent form.
//!
//! Only the table subset of markup is understood: `table`, `tbody`/`thead`/
//! `tfoot` (transparent), `tr`, `td`/`th` with `colspan`, `rowspan`, `scope`
//! and `class` attributes. Cell content is kept as raw inline markup; a
//! nested table inside a cell is carried opaquely within the content.

use crate::{CellElement, CellTag, HeaderScope, ModelError, Result, RowElement, TableTree};

// =============================================================================
// Serialization
// =============================================================================

/// Serialize a tree to markup, keeping every element and class.
pub fn serialize(tree: &TableTree) -> String {
    serialize_excluding(tree, &[])
}

/// Serialize a tree to markup, omitting elements that carry one of the given
/// ephemeral classes and stripping those classes from kept elements.
pub fn serialize_excluding(tree: &TableTree, ephemeral_classes: &[&str]) -> String {
    let is_ephemeral = |classes: &std::collections::BTreeSet<String>| {
        classes
            .iter()
            .any(|class| ephemeral_classes.contains(&class.as_str()))
    };

    let mut out = String::new();
    out.push_str("<table");
    push_class_attr(&mut out, &tree.table.classes, ephemeral_classes);
    if let Some(summary) = &tree.table.summary {
        out.push_str(&format!(
            " summary=\"{}\"",
            html_escape::encode_double_quoted_attribute(summary)
        ));
    }
    out.push_str(">\n<tbody>\n");

    for &row_id in tree.row_ids() {
        let row = match tree.get_row(row_id) {
            Some(row) => row,
            None => continue,
        };
        if is_ephemeral(&row.classes) {
            continue;
        }
        out.push_str("  <tr");
        push_class_attr(&mut out, &row.classes, ephemeral_classes);
        out.push_str(">\n");

        for &cell_id in &row.cells {
            let cell = match tree.get_cell(cell_id) {
                Some(cell) => cell,
                None => continue,
            };
            if is_ephemeral(&cell.classes) {
                continue;
            }
            let tag = cell.tag.as_str();
            out.push_str(&format!("    <{tag}"));
            if cell.effective_col_span() > 1 {
                out.push_str(&format!(" colspan=\"{}\"", cell.effective_col_span()));
            }
            if cell.effective_row_span() > 1 {
                out.push_str(&format!(" rowspan=\"{}\"", cell.effective_row_span()));
            }
            if let Some(scope) = cell.scope {
                out.push_str(&format!(" scope=\"{}\"", scope.as_str()));
            }
            push_class_attr(&mut out, &cell.classes, ephemeral_classes);
            out.push_str(&format!(">{}</{tag}>\n", cell.content));
        }
        out.push_str("  </tr>\n");
    }
    out.push_str("</tbody>\n</table>");
    out
}

fn push_class_attr(
    out: &mut String,
    classes: &std::collections::BTreeSet<String>,
    ephemeral: &[&str],
) {
    let kept: Vec<&str> = classes
        .iter()
        .map(String::as_str)
        .filter(|c| !ephemeral.contains(c))
        .collect();
    if !kept.is_empty() {
        out.push_str(&format!(
            " class=\"{}\"",
            html_escape::encode_double_quoted_attribute(&kept.join(" "))
        ));
    }
}

// =============================================================================
// Parsing
// =============================================================================

#[derive(Debug)]
struct Tag<'a> {
    name: String,
    attrs: &'a str,
    /// Byte offset of the opening `<`
    start: usize,
    /// Byte offset just past the closing `>`
    end: usize,
    closing: bool,
}

/// Scan for the next tag at or after `from`. Comment and doctype constructs
/// are skipped.
fn next_tag(s: &str, mut from: usize) -> Option<Tag<'_>> {
    loop {
        let start = from + s[from..].find('<')?;
        let rest = &s[start + 1..];
        if rest.starts_with('!') {
            // comment or doctype: skip to the closing '>'
            let close = s[start..].find('>')?;
            from = start + close + 1;
            continue;
        }
        let closing = rest.starts_with('/');
        let name_start = start + 1 + usize::from(closing);
        let name_len = s[name_start..]
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(s.len() - name_start);
        let gt = s[name_start..].find('>')? + name_start;
        let attrs_start = name_start + name_len;
        let attrs_end = if s[..gt].ends_with('/') { gt - 1 } else { gt };
        return Some(Tag {
            name: s[name_start..name_start + name_len].to_ascii_lowercase(),
            attrs: &s[attrs_start..attrs_end],
            start,
            end: gt + 1,
            closing,
        });
    }
}

/// Parse `name="value"` pairs from the attribute segment of a tag.
fn parse_attrs(s: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        while i < bytes.len() && (bytes[i] as char).is_whitespace() {
            i += 1;
        }
        let name_start = i;
        while i < bytes.len() && !(bytes[i] as char).is_whitespace() && bytes[i] != b'=' {
            i += 1;
        }
        if i == name_start {
            break;
        }
        let name = s[name_start..i].to_ascii_lowercase();
        while i < bytes.len() && (bytes[i] as char).is_whitespace() {
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && (bytes[i] as char).is_whitespace() {
                i += 1;
            }
            let value = if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                let value_start = i;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                let value = &s[value_start..i];
                i = (i + 1).min(bytes.len());
                value
            } else {
                let value_start = i;
                while i < bytes.len() && !(bytes[i] as char).is_whitespace() {
                    i += 1;
                }
                &s[value_start..i]
            };
            out.push((name, html_escape::decode_html_entities(value).into_owned()));
        } else {
            out.push((name, String::new()));
        }
    }
    out
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

/// Capture raw cell content from `from` until the matching close tag,
/// treating nested tables as opaque. Returns the content and the offset just
/// past the close tag.
fn capture_content(s: &str, from: usize, closer: &str) -> Option<(String, usize)> {
    let mut depth = 0i32;
    let mut pos = from;
    while let Some(tag) = next_tag(s, pos) {
        if tag.name == "table" {
            depth += if tag.closing { -1 } else { 1 };
        } else if tag.closing && tag.name == closer && depth == 0 {
            return Some((s[from..tag.start].to_string(), tag.end));
        }
        pos = tag.end;
    }
    None
}

/// Parse table markup into a tree. Fails if no well-formed `<table>` element
/// is found.
pub fn parse(markup: &str) -> Result<TableTree> {
    let mut pos = 0;
    let table_tag = loop {
        let tag = next_tag(markup, pos)
            .ok_or_else(|| ModelError::MalformedMarkup("no <table> element".to_string()))?;
        pos = tag.end;
        if tag.name == "table" && !tag.closing {
            break tag;
        }
    };

    let mut tree = TableTree::new();
    let attrs = parse_attrs(table_tag.attrs);
    if let Some(class) = attr(&attrs, "class") {
        for c in class.split_whitespace() {
            tree.table.add_class(c);
        }
    }
    if let Some(summary) = attr(&attrs, "summary") {
        tree.table.summary = Some(summary.to_string());
    }

    let mut current_row = None;
    while let Some(tag) = next_tag(markup, pos) {
        pos = tag.end;
        match (tag.name.as_str(), tag.closing) {
            ("table", true) => break,
            ("tr", false) => {
                let mut row = RowElement::new();
                let attrs = parse_attrs(tag.attrs);
                if let Some(class) = attr(&attrs, "class") {
                    for c in class.split_whitespace() {
                        row.add_class(c);
                    }
                }
                current_row = Some(tree.insert_row(row, None));
            }
            ("tr", true) => current_row = None,
            ("td", false) | ("th", false) => {
                let row_id = current_row.ok_or_else(|| {
                    ModelError::MalformedMarkup("cell outside of a row".to_string())
                })?;
                let attrs = parse_attrs(tag.attrs);
                let (content, after) =
                    capture_content(markup, tag.end, &tag.name).ok_or_else(|| {
                        ModelError::MalformedMarkup(format!("unclosed <{}>", tag.name))
                    })?;
                pos = after;

                let mut cell = CellElement::with_content(&content);
                if tag.name == "th" {
                    cell.tag = CellTag::Th;
                }
                cell.col_span = attr(&attrs, "colspan")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(1);
                cell.row_span = attr(&attrs, "rowspan")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(1);
                cell.scope = attr(&attrs, "scope").and_then(HeaderScope::parse);
                if let Some(class) = attr(&attrs, "class") {
                    for c in class.split_whitespace() {
                        cell.add_class(c);
                    }
                }
                tree.insert_cell(cell, row_id, None)?;
            }
            // section wrappers and captions are transparent here
            _ => {}
        }
    }

    Ok(tree)
}

/// Whether the markup of a cell's content contains a nested table.
pub fn content_has_table(content: &str) -> bool {
    let mut pos = 0;
    while let Some(tag) = next_tag(content, pos) {
        if tag.name == "table" && !tag.closing {
            return true;
        }
        pos = tag.end;
    }
    false
}

// =============================================================================
// Tests
// =============================================================================
