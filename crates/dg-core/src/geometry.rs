//! Plane geometry and the float/coordinate scraping helpers shared by the
//! renderer, post-processor, QA scorer and repair passes.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A point in 3D model space, millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_slice(v: &[f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn distance_to(self, other: Point3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn xy_distance_to(self, other: Point3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A point in 2D page/view space (mm), used for SVG output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub u: f64,
    pub v: f64,
}

impl Point2 {
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }

    pub fn distance_to(self, other: Point2) -> f64 {
        let du = other.u - self.u;
        let dv = other.v - self.v;
        (du * du + dv * dv).sqrt()
    }
}

/// Axis-aligned bounding box in page millimeters. The single geometry
/// primitive reused by the annotation planner, QA scorer and repair passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self { x_min, y_min, x_max, y_max }
    }

    pub fn from_center(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x_min + self.x_max) / 2.0, (self.y_min + self.y_max) / 2.0)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Intersection area with another box (0 if disjoint).
    pub fn overlap_area(&self, other: &BBox) -> f64 {
        let ix = (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0);
        let iy = (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0);
        ix * iy
    }

    pub fn overlaps(&self, other: &BBox) -> bool {
        self.overlap_area(other) > 0.0
    }

    /// Intersection-over-union.
    pub fn iou(&self, other: &BBox) -> f64 {
        let inter = self.overlap_area(other);
        if inter <= 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox::new(
            self.x_min.min(other.x_min),
            self.y_min.min(other.y_min),
            self.x_max.max(other.x_max),
            self.y_max.max(other.y_max),
        )
    }

    pub fn union_all(boxes: &[BBox]) -> Option<BBox> {
        let mut iter = boxes.iter();
        let first = *iter.next()?;
        Some(iter.fold(first, |acc, b| acc.union(b)))
    }

    pub fn inset(&self, d: f64) -> BBox {
        BBox::new(self.x_min + d, self.y_min + d, self.x_max - d, self.y_max - d)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> BBox {
        BBox::new(self.x_min + dx, self.y_min + dy, self.x_max + dx, self.y_max + dy)
    }

    /// True if the box exceeds `cell` by more than `margin_mm` on any side.
    pub fn overflows(&self, cell: &BBox, margin_mm: f64) -> bool {
        self.x_min < cell.x_min - margin_mm
            || self.y_min < cell.y_min - margin_mm
            || self.x_max > cell.x_max + margin_mm
            || self.y_max > cell.y_max + margin_mm
    }
}

fn float_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"[-+]?\d*\.?\d+(?:[eE][-+]?\d+)?").unwrap())
}

/// Scan any string for floats, tolerant of locale-free SVG numeric syntax.
pub fn extract_floats(s: &str) -> Vec<f64> {
    float_regex()
        .find_iter(s)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

/// Parse an SVG `points="x1,y1 x2,y2 ..."` attribute into coordinate pairs.
pub fn parse_points(points: &str) -> Vec<(f64, f64)> {
    let floats = extract_floats(points);
    floats.chunks_exact(2).map(|c| (c[0], c[1])).collect()
}

/// Parse an SVG path `d="M x y L x y ..."` attribute into coordinate pairs.
/// Command letters are ignored; only numeric runs are paired up in order.
pub fn parse_path_d(d: &str) -> Vec<(f64, f64)> {
    let floats = extract_floats(d);
    floats.chunks_exact(2).map(|c| (c[0], c[1])).collect()
}

/// Round every float found by [`extract_floats`] in `s` to `decimals` places,
/// only rewriting the string when the rounded text is shorter (or equal).
pub fn round_floats_in_string(s: &str, decimals: usize) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for m in float_regex().find_iter(s) {
        out.push_str(&s[last..m.start()]);
        let raw = m.as_str();
        if let Ok(v) = raw.parse::<f64>() {
            let rounded = format_fixed(v, decimals);
            if rounded.len() <= raw.len() {
                out.push_str(&rounded);
            } else {
                out.push_str(raw);
            }
        } else {
            out.push_str(raw);
        }
        last = m.end();
    }
    out.push_str(&s[last..]);
    out
}

/// Count floats in `s` with >= `min_decimals` decimal digits as written.
pub fn count_high_precision_floats(s: &str, min_decimals: usize) -> usize {
    float_regex()
        .find_iter(s)
        .filter(|m| {
            let raw = m.as_str();
            match raw.split_once('.') {
                Some((_, frac)) => frac.len() >= min_decimals,
                None => false,
            }
        })
        .count()
}

/// Format a float with exactly `decimals` places.
pub fn format_fixed(v: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, v)
}

/// Default numeric output precision used across SVG emission.
pub const DEFAULT_DECIMALS: usize = 2;

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn round_to(v: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (v * f).round() / f
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_overlap_and_iou() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 15.0, 15.0);
        assert!(a.overlaps(&b));
        assert_eq!(a.overlap_area(&b), 25.0);
        assert!((a.iou(&b) - (25.0 / 175.0)).abs() < 1e-9);
    }

    #[test]
    fn bbox_no_overlap() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(20.0, 20.0, 30.0, 30.0);
        assert!(!a.overlaps(&b));
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn extract_floats_handles_svg_path() {
        let floats = extract_floats("M -3.5 10 L 4.25e1 -0.1");
        assert_eq!(floats, vec![-3.5, 10.0, 42.5, -0.1]);
    }

    #[test]
    fn parse_points_pairs_up() {
        let pts = parse_points("0,0 10.5,5 20,0");
        assert_eq!(pts, vec![(0.0, 0.0), (10.5, 5.0), (20.0, 0.0)]);
    }

    #[test]
    fn round_floats_in_string_shortens_only() {
        let s = round_floats_in_string("x=12.345678 y=3", 2);
        assert_eq!(s, "x=12.35 y=3");
    }

    #[test]
    fn count_high_precision_floats_detects_four_decimals() {
        assert_eq!(count_high_precision_floats("d=1.23456 e=1.2 f=3.0001", 4), 2);
    }
}
