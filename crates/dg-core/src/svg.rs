//! A small owned SVG document tree plus the primitives the renderer,
//! post-processor, QA scorer and repair passes all mutate in place.
//!
//! No XML crate is pulled in: the document is only ever produced and
//! consumed by this workspace's own code (a closed world), so a plain
//! tree with a hand-rolled serializer is enough.

use crate::geometry::{extract_floats, parse_path_d, parse_points, BBox};
use serde::{Deserialize, Serialize};

pub const ARROW_LENGTH_MM: f64 = 2.0;
pub const ARROW_HALF_WIDTH_MM: f64 = 0.7;
pub const TEXT_WIDTH_FACTOR: f64 = 0.55;

/// Escape the three XML reserved characters that matter inside attribute
/// values and text content. Not a full XML-entity escaper.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// One element in the SVG document tree. Attribute order is preserved so
/// serialization is deterministic across repeated runs on the same input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), attrs: Vec::new(), text: None, children: Vec::new() }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.attrs.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.attrs.push((key, value));
        }
    }

    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn get_attr_f64(&self, key: &str) -> Option<f64> {
        self.get_attr(key).and_then(|v| v.parse::<f64>().ok())
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        if let Some(idx) = self.attrs.iter().position(|(k, _)| k == key) {
            Some(self.attrs.remove(idx).1)
        } else {
            None
        }
    }

    pub fn class(&self) -> Option<&str> {
        self.get_attr("class")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class().map(|c| c.split_whitespace().any(|tok| tok == class)).unwrap_or(false)
    }

    /// True if this node's class starts with `prefix` (wildcard rules like
    /// `dimensions-*` or `plan-dimensions-*`).
    pub fn class_starts_with(&self, prefix: &str) -> bool {
        self.class().map(|c| c.starts_with(prefix)).unwrap_or(false)
    }

    pub fn push_child(&mut self, child: Node) -> &mut Node {
        self.children.push(child);
        self.children.last_mut().unwrap()
    }

    /// Depth-first, document-order visitor over every descendant (including
    /// self), mutable.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }

    pub fn walk(&self, f: &mut impl FnMut(&Node)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Collect mutable references to every descendant `<g>` whose class
    /// equals `class`, document order, not including self.
    pub fn find_groups_by_class<'a>(&'a mut self, class: &str) -> Vec<&'a mut Node> {
        let mut out = Vec::new();
        for child in &mut self.children {
            if child.tag == "g" && child.has_class(class) {
                out.push(child);
            } else {
                out.extend(child.find_groups_by_class(class));
            }
        }
        out
    }

    pub fn find_group_by_class(&self, class: &str) -> Option<&Node> {
        for child in &self.children {
            if child.tag == "g" && child.has_class(class) {
                return Some(child);
            }
            if let Some(found) = child.find_group_by_class(class) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_group_by_class_mut(&mut self, class: &str) -> Option<&mut Node> {
        for child in &mut self.children {
            if child.tag == "g" && child.has_class(class) {
                return Some(child);
            }
        }
        for child in &mut self.children {
            if let Some(found) = child.find_group_by_class_mut(class) {
                return Some(found);
            }
        }
        None
    }

    /// Axis-aligned bounding box of this node in page mm, or `None` for
    /// elements with no geometric extent (e.g. `<defs>`).
    pub fn bbox(&self) -> Option<BBox> {
        match self.tag.as_str() {
            "rect" => {
                let x = self.get_attr_f64("x")?;
                let y = self.get_attr_f64("y")?;
                let w = self.get_attr_f64("width")?;
                let h = self.get_attr_f64("height")?;
                Some(BBox::new(x, y, x + w, y + h))
            }
            "circle" => {
                let cx = self.get_attr_f64("cx")?;
                let cy = self.get_attr_f64("cy")?;
                let r = self.get_attr_f64("r")?;
                Some(BBox::new(cx - r, cy - r, cx + r, cy + r))
            }
            "line" => {
                let x1 = self.get_attr_f64("x1")?;
                let y1 = self.get_attr_f64("y1")?;
                let x2 = self.get_attr_f64("x2")?;
                let y2 = self.get_attr_f64("y2")?;
                Some(BBox::new(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)))
            }
            "polyline" | "polygon" => {
                let pts = parse_points(self.get_attr("points")?);
                points_bbox(&pts)
            }
            "path" => {
                let pts = parse_path_d(self.get_attr("d")?);
                points_bbox(&pts)
            }
            "text" => {
                let x = self.get_attr_f64("x").unwrap_or(0.0);
                let y = self.get_attr_f64("y").unwrap_or(0.0);
                let font_size = self.get_attr_f64("font-size").unwrap_or(2.5);
                let text = self.text.as_deref().unwrap_or("");
                let w = text.chars().count() as f64 * font_size * TEXT_WIDTH_FACTOR;
                let h = font_size * 1.2;
                let anchor = self.get_attr("text-anchor").unwrap_or("start");
                let (x_min, x_max) = match anchor {
                    "middle" => (x - w / 2.0, x + w / 2.0),
                    "end" => (x - w, x),
                    _ => (x, x + w),
                };
                Some(BBox::new(x_min, y - h, x_max, y))
            }
            "g" => {
                let boxes: Vec<BBox> = self.children.iter().filter_map(|c| c.bbox()).collect();
                BBox::union_all(&boxes)
            }
            _ => None,
        }
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }

    fn write(&self, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        out.push_str(&pad);
        out.push('<');
        out.push_str(&self.tag);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape_xml(v));
            out.push('"');
        }
        if self.children.is_empty() && self.text.is_none() {
            out.push_str("/>\n");
            return;
        }
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape_xml(text));
        }
        if !self.children.is_empty() {
            out.push('\n');
            for child in &self.children {
                child.write(out, indent + 1);
            }
            out.push_str(&pad);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push_str(">\n");
    }
}

fn points_bbox(pts: &[(f64, f64)]) -> Option<BBox> {
    if pts.is_empty() {
        return None;
    }
    let (mut x_min, mut y_min) = (f64::MAX, f64::MAX);
    let (mut x_max, mut y_max) = (f64::MIN, f64::MIN);
    for (x, y) in pts {
        x_min = x_min.min(*x);
        y_min = y_min.min(*y);
        x_max = x_max.max(*x);
        y_max = y_max.max(*y);
    }
    Some(BBox::new(x_min, y_min, x_max, y_max))
}

/// Length of a polyline/path's point chain, summed segment-by-segment.
pub fn polyline_length(pts: &[(f64, f64)]) -> f64 {
    pts.windows(2)
        .map(|w| {
            let (x1, y1) = w[0];
            let (x2, y2) = w[1];
            ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
        })
        .sum()
}

/// Build a filled arrowhead polygon, tip at `(tx, ty)` pointing along
/// `angle_rad`, with the fixed arrow length/half-width used everywhere.
pub fn arrowhead(tx: f64, ty: f64, angle_rad: f64, fill: &str) -> Node {
    let back_x = tx - ARROW_LENGTH_MM * angle_rad.cos();
    let back_y = ty - ARROW_LENGTH_MM * angle_rad.sin();
    let perp = angle_rad + std::f64::consts::FRAC_PI_2;
    let w = ARROW_HALF_WIDTH_MM;
    let p1 = (back_x + w * perp.cos(), back_y + w * perp.sin());
    let p2 = (back_x - w * perp.cos(), back_y - w * perp.sin());
    let points = format!(
        "{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}",
        tx, ty, p1.0, p1.1, p2.0, p2.1
    );
    Node::new("polygon").with_attr("points", points).with_attr("fill", fill)
}

/// A single straight extension or dimension line segment.
pub fn line(x1: f64, y1: f64, x2: f64, y2: f64, class: &str) -> Node {
    Node::new("line")
        .with_attr("x1", format!("{:.2}", x1))
        .with_attr("y1", format!("{:.2}", y1))
        .with_attr("x2", format!("{:.2}", x2))
        .with_attr("y2", format!("{:.2}", y2))
        .with_attr("class", class)
}

pub fn text_node(x: f64, y: f64, content: &str, anchor: &str, font_size: f64, class: &str) -> Node {
    Node::new("text")
        .with_attr("x", format!("{:.2}", x))
        .with_attr("y", format!("{:.2}", y))
        .with_attr("text-anchor", anchor)
        .with_attr("font-size", format!("{:.2}", font_size))
        .with_attr("class", class)
        .with_text(content)
}

/// Approximate rendered text width in mm using a fixed
/// `len * font_size * 0.55` heuristic.
pub fn text_width(content: &str, font_size: f64) -> f64 {
    content.chars().count() as f64 * font_size * TEXT_WIDTH_FACTOR
}

pub fn sample_path_points(node: &Node) -> Vec<(f64, f64)> {
    match node.tag.as_str() {
        "polyline" | "polygon" => node.get_attr("points").map(parse_points).unwrap_or_default(),
        "path" => node.get_attr("d").map(parse_path_d).unwrap_or_default(),
        "circle" => {
            let cu = node.get_attr_f64("cx").unwrap_or(0.0);
            let cv = node.get_attr_f64("cy").unwrap_or(0.0);
            vec![(cu, cv)]
        }
        _ => Vec::new(),
    }
}

/// Scan arbitrary text for numeric literals (used by callers that don't
/// want to go through the path/points-specific parsers).
pub fn floats_in(s: &str) -> Vec<f64> {
    extract_floats(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_xml_only_escapes_three_chars() {
        assert_eq!(escape_xml("a < b & c > d \"quote\""), "a &lt; b &amp; c &gt; d \"quote\"");
    }

    #[test]
    fn node_serialize_roundtrip_shape() {
        let n = Node::new("rect")
            .with_attr("x", "1.00")
            .with_attr("y", "2.00")
            .with_attr("width", "3.00")
            .with_attr("height", "4.00");
        let s = n.serialize();
        assert!(s.contains("<rect"));
        assert!(s.contains("x=\"1.00\""));
    }

    #[test]
    fn bbox_rect_and_circle() {
        let r = Node::new("rect").with_attr("x", "0").with_attr("y", "0").with_attr("width", "10").with_attr("height", "5");
        assert_eq!(r.bbox(), Some(BBox::new(0.0, 0.0, 10.0, 5.0)));

        let c = Node::new("circle").with_attr("cx", "5").with_attr("cy", "5").with_attr("r", "2");
        assert_eq!(c.bbox(), Some(BBox::new(3.0, 3.0, 7.0, 7.0)));
    }

    #[test]
    fn bbox_group_is_union_of_children() {
        let mut g = Node::new("g");
        g.push_child(Node::new("rect").with_attr("x", "0").with_attr("y", "0").with_attr("width", "1").with_attr("height", "1"));
        g.push_child(Node::new("rect").with_attr("x", "5").with_attr("y", "5").with_attr("width", "1").with_attr("height", "1"));
        let bbox = g.bbox().unwrap();
        assert_eq!(bbox, BBox::new(0.0, 0.0, 6.0, 6.0));
    }

    #[test]
    fn find_groups_by_class_is_document_order() {
        let mut root = Node::new("svg");
        root.push_child(Node::new("g").with_attr("class", "dimensions-front"));
        root.push_child(Node::new("g").with_attr("class", "other"));
        root.push_child(Node::new("g").with_attr("class", "dimensions-front"));
        assert_eq!(root.find_groups_by_class("dimensions-front").len(), 2);
    }
}
