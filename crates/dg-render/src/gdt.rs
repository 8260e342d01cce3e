//! Automatic GD&T datum selection and tolerance assignment, driven by the
//! feature graph rather than an assembly-mate graph: this crate has no
//! notion of mated parts, only a single part's features.

use dg_core::svg::Node;
use dg_model::{FeatureGraph, FeatureKind, GroupPattern};
use dg_standards::ks::resolve_bolt_hole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis3 {
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatumKind {
    /// A primary/secondary/tertiary planar datum, keyed by the axis its
    /// face is normal to.
    Plane { normal: Axis3, area: f64 },
    /// An axis datum anchored to a bore feature.
    Axis { feature_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    pub label: char,
    pub kind: DatumKind,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GdtKind {
    Position,
    Cylindricity,
    Coaxiality,
    Perpendicularity,
}

impl GdtKind {
    pub fn symbol(self) -> char {
        match self {
            GdtKind::Position => '\u{2316}',
            GdtKind::Cylindricity => '\u{232D}',
            GdtKind::Coaxiality => '\u{25CE}',
            GdtKind::Perpendicularity => '\u{27C2}',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Mmc,
    Lmc,
}

impl Modifier {
    pub fn symbol(self) -> char {
        match self {
            Modifier::Mmc => '\u{24C2}',
            Modifier::Lmc => '\u{24C1}',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GdtAssignment {
    pub feature_id: String,
    pub kind: GdtKind,
    pub symbol: char,
    pub diameter_modifier: bool,
    pub value_mm: f64,
    pub datum_refs: Vec<char>,
    pub modifier: Option<Modifier>,
    pub note: Option<String>,
    pub target: (f64, f64),
}

/// Pick datum planes A, B, C from the three orthogonal faces of the
/// part's overall bounding box `(width, depth, height)`, largest area
/// first, then a D axis datum when a bore feature exists.
pub fn select_datums(part_dims: (f64, f64, f64), graph: &FeatureGraph) -> Vec<Datum> {
    let (w, d, h) = part_dims;
    let mut faces = vec![
        (Axis3::X, d * h, "face normal to X"),
        (Axis3::Y, w * h, "face normal to Y"),
        (Axis3::Z, w * d, "face normal to Z"),
    ];
    faces.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    let mut datums = Vec::new();
    for (i, label) in ['A', 'B', 'C'].iter().enumerate() {
        let (normal, area, desc) = faces[i];
        datums.push(Datum { label: *label, kind: DatumKind::Plane { normal, area }, description: desc.to_string() });
    }

    if let Some(bore) = graph.by_type(FeatureKind::Bore).first() {
        datums.push(Datum {
            label: 'D',
            kind: DatumKind::Axis { feature_id: bore.id.clone() },
            description: format!("axis of {}", bore.id),
        });
    }

    datums
}

/// Nominal-minus-drill clearance for the bolt size whose medium-fit drill
/// diameter is closest to `hole_diameter_mm`.
fn bolt_clearance_mm(hole_diameter_mm: f64) -> f64 {
    const SIZES: &[&str] = &["M3", "M4", "M5", "M6", "M8", "M10", "M12", "M14", "M16", "M20"];
    let mut best: Option<(f64, f64)> = None;
    for size in SIZES {
        let Ok(bh) = resolve_bolt_hole(size) else { continue };
        let nominal: f64 = size[1..].parse().unwrap_or(0.0);
        let diff = (bh.drill_medium - hole_diameter_mm).abs();
        if best.map(|(_, d)| diff < d).unwrap_or(true) {
            best = Some((bh.drill_medium - nominal, diff));
        }
    }
    best.map(|(clearance, _)| clearance).unwrap_or(0.1)
}

const DOWEL_POSITION_TOL_MM: f64 = 0.05;
const BORE_CYLINDRICITY_TOL_MM: f64 = 0.02;
const BORE_COAXIALITY_TOL_MM: f64 = 0.025;
const DATUM_PERPENDICULARITY_TOL_MM: f64 = 0.05;

/// Assign feature control frames per the rules in the renderer's design
/// notes: patterned/individual holes get position callouts to A,B,C;
/// dowels get a tight position callout with no modifier; bores get
/// cylindricity or coaxiality depending on whether an axis datum exists;
/// the secondary datum face gets perpendicularity to datum A.
pub fn assign_tolerances(graph: &FeatureGraph, datums: &[Datum]) -> Vec<GdtAssignment> {
    let mut out = Vec::new();
    let abc: Vec<char> = datums.iter().filter(|d| matches!(d.kind, DatumKind::Plane { .. })).map(|d| d.label).collect();
    let axis_datum = datums.iter().find(|d| matches!(d.kind, DatumKind::Axis { .. }));

    let mut grouped_holes: Vec<&str> = Vec::new();
    for grp in graph.groups() {
        if !matches!(grp.pattern, GroupPattern::BoltCircle | GroupPattern::HolePattern) {
            continue;
        }
        let diameter = grp.member_ids.first().and_then(|id| graph.get(id)).and_then(|f| f.diameter).unwrap_or(6.0);
        let clearance = bolt_clearance_mm(diameter);
        for id in &grp.member_ids {
            let Some(feat) = graph.get(id) else { continue };
            grouped_holes.push(id.as_str());
            out.push(GdtAssignment {
                feature_id: feat.id.clone(),
                kind: GdtKind::Position,
                symbol: GdtKind::Position.symbol(),
                diameter_modifier: true,
                value_mm: round4(0.25 * clearance),
                datum_refs: abc.clone(),
                modifier: Some(Modifier::Mmc),
                note: None,
                target: (feat.position[0], feat.position[1]),
            });
        }
    }

    for feat in graph.by_type(FeatureKind::Hole) {
        if grouped_holes.contains(&feat.id.as_str()) {
            continue;
        }
        let clearance = bolt_clearance_mm(feat.diameter.unwrap_or(6.0));
        out.push(GdtAssignment {
            feature_id: feat.id.clone(),
            kind: GdtKind::Position,
            symbol: GdtKind::Position.symbol(),
            diameter_modifier: true,
            value_mm: round4(0.25 * clearance),
            datum_refs: abc.clone(),
            modifier: Some(Modifier::Mmc),
            note: None,
            target: (feat.position[0], feat.position[1]),
        });
    }

    for feat in graph.by_type(FeatureKind::Dowel) {
        out.push(GdtAssignment {
            feature_id: feat.id.clone(),
            kind: GdtKind::Position,
            symbol: GdtKind::Position.symbol(),
            diameter_modifier: true,
            value_mm: DOWEL_POSITION_TOL_MM,
            datum_refs: abc.clone(),
            modifier: None,
            note: None,
            target: (feat.position[0], feat.position[1]),
        });
    }

    for bore in graph.by_type(FeatureKind::Bore) {
        match axis_datum {
            None => out.push(GdtAssignment {
                feature_id: bore.id.clone(),
                kind: GdtKind::Cylindricity,
                symbol: GdtKind::Cylindricity.symbol(),
                diameter_modifier: false,
                value_mm: BORE_CYLINDRICITY_TOL_MM,
                datum_refs: Vec::new(),
                modifier: None,
                note: None,
                target: (bore.position[0], bore.position[1]),
            }),
            Some(d) if d.kind == (DatumKind::Axis { feature_id: bore.id.clone() }) => out.push(GdtAssignment {
                feature_id: bore.id.clone(),
                kind: GdtKind::Coaxiality,
                symbol: GdtKind::Coaxiality.symbol(),
                diameter_modifier: true,
                value_mm: BORE_COAXIALITY_TOL_MM,
                datum_refs: vec![d.label],
                modifier: None,
                note: None,
                target: (bore.position[0], bore.position[1]),
            }),
            Some(_) => {}
        }
    }

    if let Some(secondary) = datums.iter().find(|d| d.label == 'B') {
        out.push(GdtAssignment {
            feature_id: format!("datum_{}", secondary.label),
            kind: GdtKind::Perpendicularity,
            symbol: GdtKind::Perpendicularity.symbol(),
            diameter_modifier: false,
            value_mm: DATUM_PERPENDICULARITY_TOL_MM,
            datum_refs: vec!['A'],
            modifier: None,
            note: Some("datum feature B to A".to_string()),
            target: (0.0, 0.0),
        });
    }

    out
}

fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}

const FCF_CELL_W: f64 = 7.0;
const FCF_CELL_H: f64 = 5.0;
const FCF_FONT_SIZE: f64 = 3.0;

/// Render one feature control frame as a row of bordered cells:
/// `[symbol | (Ø)value(modifier) | datum refs...]`.
pub fn render_fcf(assignment: &GdtAssignment, x: f64, y: f64) -> Node {
    let mut cells: Vec<String> = vec![assignment.symbol.to_string()];
    let mut value_text = String::new();
    if assignment.diameter_modifier {
        value_text.push('\u{2300}');
    }
    value_text.push_str(&format!("{:.3}", assignment.value_mm));
    if let Some(m) = assignment.modifier {
        value_text.push(m.symbol());
    }
    cells.push(value_text);
    for d in &assignment.datum_refs {
        cells.push(d.to_string());
    }

    let mut g = Node::new("g").with_attr("class", "gdt-frame").with_attr("data-feature", assignment.feature_id.clone());
    for (i, cell) in cells.iter().enumerate() {
        let cx = x + i as f64 * FCF_CELL_W;
        g.push_child(
            Node::new("rect")
                .with_attr("x", format!("{:.2}", cx))
                .with_attr("y", format!("{:.2}", y))
                .with_attr("width", format!("{:.2}", FCF_CELL_W))
                .with_attr("height", format!("{:.2}", FCF_CELL_H))
                .with_attr("fill", "none")
                .with_attr("stroke", "#000")
                .with_attr("stroke-width", "0.2"),
        );
        g.push_child(
            Node::new("text")
                .with_attr("x", format!("{:.2}", cx + FCF_CELL_W / 2.0))
                .with_attr("y", format!("{:.2}", y + FCF_CELL_H / 2.0 + 1.0))
                .with_attr("text-anchor", "middle")
                .with_attr("font-size", format!("{:.2}", FCF_FONT_SIZE))
                .with_attr("fill", "#000")
                .with_text(cell.clone()),
        );
    }
    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_model::Feature;
    use std::collections::HashMap;

    fn hole(id: &str, x: f64, y: f64, diameter: f64) -> Feature {
        Feature { id: id.to_string(), kind: FeatureKind::Hole, diameter: Some(diameter), depth: None, position: [x, y, 0.0], axis: [0.0, 0.0, 1.0], parent_id: None, size: None, extra: HashMap::new() }
    }

    #[test]
    fn datums_abc_are_areas_largest_first() {
        let graph = FeatureGraph::default();
        let datums = select_datums((100.0, 50.0, 20.0), &graph);
        assert_eq!(datums.len(), 3);
        assert_eq!(datums[0].label, 'A');
        let DatumKind::Plane { area: area_a, .. } = datums[0].kind else { panic!() };
        let DatumKind::Plane { area: area_c, .. } = datums[2].kind else { panic!() };
        assert!(area_a >= area_c);
    }

    fn bore_graph() -> FeatureGraph {
        let mut graph = FeatureGraph::default();
        graph.features.push(Feature { id: "bore1".into(), kind: FeatureKind::Bore, diameter: Some(30.0), depth: None, position: [0.0, 0.0, 0.0], axis: [0.0, 0.0, 1.0], parent_id: None, size: None, extra: HashMap::new() });
        graph
    }

    #[test]
    fn bore_with_axis_datum_gets_coaxiality() {
        let graph = bore_graph();
        let datums = select_datums((100.0, 50.0, 20.0), &graph);
        let assigns = assign_tolerances(&graph, &datums);
        let a = assigns.iter().find(|a| a.feature_id == "bore1").unwrap();
        assert_eq!(a.kind, GdtKind::Coaxiality);
        assert_eq!(a.datum_refs, vec!['D']);
    }

    #[test]
    fn bore_without_axis_datum_gets_cylindricity() {
        let graph = bore_graph();
        let datums_without_axis = select_datums((100.0, 50.0, 20.0), &FeatureGraph::default());
        let assigns = assign_tolerances(&graph, &datums_without_axis);
        let a = assigns.iter().find(|a| a.feature_id == "bore1").unwrap();
        assert_eq!(a.kind, GdtKind::Cylindricity);
    }

    #[test]
    fn ungrouped_hole_gets_position_callout_to_abc() {
        let mut graph = FeatureGraph::default();
        graph.features.push(hole("h1", 10.0, 10.0, 6.0));
        let datums = select_datums((100.0, 50.0, 20.0), &graph);
        let assigns = assign_tolerances(&graph, &datums);
        let a = assigns.iter().find(|a| a.feature_id == "h1").unwrap();
        assert_eq!(a.kind, GdtKind::Position);
        assert_eq!(a.datum_refs, vec!['A', 'B', 'C']);
    }

    #[test]
    fn fcf_renders_one_cell_per_symbol_value_and_datum() {
        let assignment = GdtAssignment {
            feature_id: "h1".into(),
            kind: GdtKind::Position,
            symbol: GdtKind::Position.symbol(),
            diameter_modifier: true,
            value_mm: 0.25,
            datum_refs: vec!['A', 'B', 'C'],
            modifier: Some(Modifier::Mmc),
            note: None,
            target: (0.0, 0.0),
        };
        let node = render_fcf(&assignment, 0.0, 0.0);
        // symbol + value + 3 datum refs = 5 cells, 2 nodes (rect+text) each.
        assert_eq!(node.children.len(), 10);
    }
}
