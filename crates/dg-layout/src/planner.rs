//! Places annotation AABBs (dimension text, leaders, GD&T frames, notes)
//! on the page without overlapping anything already registered.
//!
//! Candidate positions are tried in order; the first achieving zero
//! overlap wins outright, otherwise the candidate with least total
//! overlap area is taken. Annotation boxes are never rotated and there
//! is no sheet boundary to tile — just the page's open space.

use dg_core::BBox;

#[derive(Debug, Clone, Default)]
pub struct AnnotationPlanner {
    placed: Vec<BBox>,
}

impl AnnotationPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, bbox: BBox) {
        self.placed.push(bbox);
    }

    pub fn placed(&self) -> &[BBox] {
        &self.placed
    }

    /// Summed overlap area of `bbox` against every box registered so far.
    pub fn overlap_score(&self, bbox: &BBox) -> f64 {
        self.placed.iter().map(|p| p.overlap_area(bbox)).sum()
    }

    /// First candidate (x_min, y_min) achieving zero overlap, short-
    /// circuiting the scan; otherwise the candidate with the smallest
    /// overlap_score, first-scanned on ties.
    pub fn find_best_position(&self, candidates: &[(f64, f64)], w: f64, h: f64) -> Option<(f64, f64)> {
        let mut best: Option<((f64, f64), f64)> = None;
        for &(x, y) in candidates {
            let bbox = BBox::new(x, y, x + w, y + h);
            let score = self.overlap_score(&bbox);
            if score <= 0.0 {
                return Some((x, y));
            }
            if best.as_ref().map(|(_, b)| score < *b).unwrap_or(true) {
                best = Some(((x, y), score));
            }
        }
        best.map(|(pos, _)| pos)
    }

    /// Find the best position and register it in one step.
    pub fn register_and_pick(&mut self, candidates: &[(f64, f64)], w: f64, h: f64) -> Option<BBox> {
        let (x, y) = self.find_best_position(candidates, w, h)?;
        let bbox = BBox::new(x, y, x + w, y + h);
        self.register(bbox);
        Some(bbox)
    }
}
