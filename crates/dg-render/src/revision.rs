//! Revision table: newest-first, fixed column widths, descriptions
//! truncated to fit.

use dg_core::svg::Node;

const ROW_HEIGHT_MM: f64 = 4.5;
const COL_REV_W: f64 = 10.0;
const COL_DATE_W: f64 = 20.0;
const COL_DESC_W: f64 = 55.0;
const COL_BY_W: f64 = 12.0;
const DESC_MAX_CHARS: usize = 28;
const FONT_SIZE_MM: f64 = 2.2;

#[derive(Debug, Clone, PartialEq)]
pub struct RevisionEntry {
    pub rev: String,
    pub date: String,
    pub description: String,
    pub by: String,
}

impl Default for RevisionEntry {
    fn default() -> Self {
        RevisionEntry { rev: "-".to_string(), date: String::new(), description: String::new(), by: "-".to_string() }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
        t.push('\u{2026}');
        t
    }
}

fn cell(x: f64, y: f64, content: &str) -> Node {
    Node::new("text")
        .with_attr("x", format!("{:.2}", x))
        .with_attr("y", format!("{:.2}", y))
        .with_attr("font-size", format!("{:.2}", FONT_SIZE_MM))
        .with_attr("fill", "#000")
        .with_text(content)
}

/// Render the revision table at `(x, y_top)`, newest entry first. The
/// caller is responsible for sorting `entries` into display order;
/// this function renders as given.
pub fn render_revision_table(entries: &[RevisionEntry], x: f64, y_top: f64) -> Node {
    let mut g = Node::new("g").with_attr("class", "revision-table");

    let header_y = y_top;
    g.push_child(cell(x, header_y, "REV"));
    g.push_child(cell(x + COL_REV_W, header_y, "DATE"));
    g.push_child(cell(x + COL_REV_W + COL_DATE_W, header_y, "DESCRIPTION"));
    g.push_child(cell(x + COL_REV_W + COL_DATE_W + COL_DESC_W, header_y, "BY"));

    let total_w = COL_REV_W + COL_DATE_W + COL_DESC_W + COL_BY_W;
    g.push_child(
        Node::new("line")
            .with_attr("x1", format!("{:.2}", x))
            .with_attr("y1", format!("{:.2}", header_y + 1.0))
            .with_attr("x2", format!("{:.2}", x + total_w))
            .with_attr("y2", format!("{:.2}", header_y + 1.0))
            .with_attr("stroke", "#000")
            .with_attr("stroke-width", "0.2"),
    );

    for (i, entry) in entries.iter().enumerate() {
        let y = header_y + (i as f64 + 1.0) * ROW_HEIGHT_MM;
        g.push_child(cell(x, y, &entry.rev));
        g.push_child(cell(x + COL_REV_W, y, &entry.date));
        g.push_child(cell(x + COL_REV_W + COL_DATE_W, y, &truncate(&entry.description, DESC_MAX_CHARS)));
        g.push_child(cell(x + COL_REV_W + COL_DATE_W + COL_DESC_W, y, &entry.by));
    }

    g
}

/// Sort a revision history newest-first by `rev` descending when `rev`
/// parses as an integer, falling back to input order otherwise (e.g.
/// the default single "-" entry).
pub fn newest_first(mut entries: Vec<RevisionEntry>) -> Vec<RevisionEntry> {
    entries.sort_by(|a, b| {
        match (a.rev.parse::<i64>(), b.rev.parse::<i64>()) {
            (Ok(ra), Ok(rb)) => rb.cmp(&ra),
            _ => std::cmp::Ordering::Equal,
        }
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_entry_uses_dash_placeholders() {
        let e = RevisionEntry::default();
        assert_eq!(e.rev, "-");
        assert_eq!(e.by, "-");
    }

    #[test]
    fn long_description_is_truncated() {
        let long = "a".repeat(50);
        let t = truncate(&long, DESC_MAX_CHARS);
        assert_eq!(t.chars().count(), DESC_MAX_CHARS);
        assert!(t.ends_with('\u{2026}'));
    }

    #[test]
    fn newest_first_sorts_numeric_revs_descending() {
        let entries = vec![
            RevisionEntry { rev: "1".to_string(), date: "2026-01-01".to_string(), description: "initial".to_string(), by: "jk".to_string() },
            RevisionEntry { rev: "3".to_string(), date: "2026-03-01".to_string(), description: "latest".to_string(), by: "jk".to_string() },
            RevisionEntry { rev: "2".to_string(), date: "2026-02-01".to_string(), description: "mid".to_string(), by: "jk".to_string() },
        ];
        let sorted = newest_first(entries);
        assert_eq!(sorted[0].rev, "3");
        assert_eq!(sorted[2].rev, "1");
    }

    #[test]
    fn render_produces_a_row_per_entry_plus_header() {
        let entries = vec![RevisionEntry::default()];
        let node = render_revision_table(&entries, 300.0, 10.0);
        let mut text_count = 0;
        node.walk(&mut |n| {
            if n.tag == "text" {
                text_count += 1;
            }
        });
        assert_eq!(text_count, 8);
    }
}
