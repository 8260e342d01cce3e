//! Classifies shapes+operations into typed features and groups them into
//! patterns (bolt circles, hole patterns, counterbore sets).

use crate::error::{ModelError, Result};
use dg_core::config::{Config, Operation, ShapeKind};
use std::collections::HashMap;
use toml::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Hole,
    Bore,
    Counterbore,
    Dowel,
    Chamfer,
    Fillet,
    Thread,
    Slot,
}

impl FeatureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureKind::Hole => "hole",
            FeatureKind::Bore => "bore",
            FeatureKind::Counterbore => "counterbore",
            FeatureKind::Dowel => "dowel",
            FeatureKind::Chamfer => "chamfer",
            FeatureKind::Fillet => "fillet",
            FeatureKind::Thread => "thread",
            FeatureKind::Slot => "slot",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub kind: FeatureKind,
    pub diameter: Option<f64>,
    pub depth: Option<f64>,
    pub position: [f64; 3],
    pub axis: [f64; 3],
    pub parent_id: Option<String>,
    pub size: Option<f64>,
    pub extra: HashMap<String, Value>,
}

impl Feature {
    fn xy(&self) -> (f64, f64) {
        (self.position[0], self.position[1])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPattern {
    BoltCircle,
    HolePattern,
    CounterboreSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureGroup {
    pub pattern: GroupPattern,
    pub member_ids: Vec<String>,
    pub center: [f64; 3],
    pub pcd: f64,
    pub axis: [f64; 3],
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureGraph {
    pub features: Vec<Feature>,
    pub groups: Vec<FeatureGroup>,
}

impl FeatureGraph {
    pub fn by_type(&self, kind: FeatureKind) -> Vec<&Feature> {
        self.features.iter().filter(|f| f.kind == kind).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn groups(&self) -> &[FeatureGroup] {
        &self.groups
    }
}

fn snap(v: f64, step: f64) -> f64 {
    (v / step).round() * step
}

/// Classify a cylinder used as a cut tool into a feature kind via id
/// substrings, then radius/position heuristics as a fallback.
fn classify_cut_cylinder(id: &str, diameter: f64, x: f64, y: f64) -> FeatureKind {
    let lower = id.to_ascii_lowercase();
    if lower.contains("dowel") {
        FeatureKind::Dowel
    } else if lower.contains("counterbore") || lower.contains("cbore") {
        FeatureKind::Counterbore
    } else if lower.contains("bore") {
        FeatureKind::Bore
    } else if lower.contains("thread") {
        FeatureKind::Thread
    } else {
        let centered = x.abs() < 1e-6 && y.abs() < 1e-6;
        if diameter > 20.0 && centered {
            FeatureKind::Bore
        } else {
            FeatureKind::Hole
        }
    }
}

/// Scan shapes+operations and emit the typed feature graph.
pub fn infer(config: &Config) -> Result<FeatureGraph> {
    let mut features: Vec<Feature> = Vec::new();
    let mut slot_candidate_ids: Vec<String> = Vec::new();

    for op in &config.operations {
        match op {
            Operation::Cut { tool, .. } | Operation::Common { tool, .. } => {
                if let Some(shape) = config.shape(tool) {
                    if let ShapeKind::Cylinder { radius, height } = shape.kind {
                        let [x, y, _z] = shape.position();
                        let diameter = radius * 2.0;
                        let kind = classify_cut_cylinder(tool, diameter, x, y);
                        features.push(Feature {
                            id: tool.clone(),
                            kind,
                            diameter: Some(diameter),
                            depth: Some(height),
                            position: shape.position(),
                            axis: shape.common.direction.unwrap_or([0.0, 0.0, 1.0]),
                            parent_id: None,
                            size: None,
                            extra: shape.extra.clone(),
                        });
                    }
                }
            }
            Operation::Fillet { target, radius, result, .. } => {
                features.push(Feature {
                    id: result.clone(),
                    kind: FeatureKind::Fillet,
                    diameter: None,
                    depth: None,
                    position: config.shape(target).map(|s| s.position()).unwrap_or([0.0, 0.0, 0.0]),
                    axis: [0.0, 0.0, 1.0],
                    parent_id: Some(target.clone()),
                    size: *radius,
                    extra: HashMap::new(),
                });
            }
            Operation::Chamfer { target, size, result, .. } => {
                features.push(Feature {
                    id: result.clone(),
                    kind: FeatureKind::Chamfer,
                    diameter: None,
                    depth: None,
                    position: config.shape(target).map(|s| s.position()).unwrap_or([0.0, 0.0, 0.0]),
                    axis: [0.0, 0.0, 1.0],
                    parent_id: Some(target.clone()),
                    size: *size,
                    extra: HashMap::new(),
                });
            }
            Operation::Fuse { base, result, .. } => {
                let lower_base = base.to_ascii_lowercase();
                let lower_result = result.to_ascii_lowercase();
                if lower_base.contains("slot") || lower_result.contains("slot") {
                    slot_candidate_ids.push(result.clone());
                }
            }
            Operation::Shell { .. } | Operation::CircularPattern { .. } => {}
        }
    }

    // Slot detection: a fuse-produced "slot" id later consumed as a cut tool.
    for op in &config.operations {
        if let Operation::Cut { tool, .. } = op {
            if slot_candidate_ids.contains(tool) {
                if let Some(shape) = config.shape(tool) {
                    if let ShapeKind::Box { size } = shape.kind {
                        features.push(Feature {
                            id: tool.clone(),
                            kind: FeatureKind::Slot,
                            diameter: None,
                            depth: Some(size[2]),
                            position: shape.position(),
                            axis: [0.0, 0.0, 1.0],
                            parent_id: None,
                            size: Some(size[0].max(size[1])),
                            extra: shape.extra.clone(),
                        });
                    }
                }
            }
        }
    }

    // Thread detection: any shape carrying a `pitch`/`thread` marker in its
    // extra fields that participates as a cut tool becomes a thread feature.
    for feat in features.iter_mut() {
        if feat.kind == FeatureKind::Hole || feat.kind == FeatureKind::Bore {
            if feat.extra.contains_key("pitch") || feat.extra.get("thread").and_then(Value::as_bool) == Some(true) {
                feat.kind = FeatureKind::Thread;
            }
        }
    }

    link_counterbore_parents(&mut features);
    let groups = detect_groups(&features);

    Ok(FeatureGraph { features, groups })
}

fn link_counterbore_parents(features: &mut [Feature]) {
    let holes: Vec<(usize, (f64, f64))> = features
        .iter()
        .enumerate()
        .filter(|(_, f)| matches!(f.kind, FeatureKind::Hole | FeatureKind::Bore))
        .map(|(i, f)| (i, f.xy()))
        .collect();

    let mut parent_of: Vec<(usize, String)> = Vec::new();
    for (i, f) in features.iter().enumerate() {
        if f.kind != FeatureKind::Counterbore {
            continue;
        }
        let (cx, cy) = f.xy();
        let mut best: Option<(usize, f64)> = None;
        for &(hi, (hx, hy)) in &holes {
            let d = ((hx - cx).powi(2) + (hy - cy).powi(2)).sqrt();
            if d < 2.0 && best.map(|(_, bd)| d < bd).unwrap_or(true) {
                best = Some((hi, d));
            }
        }
        if let Some((hi, _)) = best {
            parent_of.push((i, features[hi].id.clone()));
        }
    }
    for (i, parent) in parent_of {
        features[i].parent_id = Some(parent);
    }
}

fn detect_groups(features: &[Feature]) -> Vec<FeatureGroup> {
    let mut groups = Vec::new();

    let holes: Vec<&Feature> = features.iter().filter(|f| f.kind == FeatureKind::Hole).collect();
    let mut by_diam: HashMap<i64, Vec<&Feature>> = HashMap::new();
    for h in &holes {
        let d = h.diameter.unwrap_or(0.0);
        let key = (snap(d, 0.5) * 1000.0).round() as i64;
        by_diam.entry(key).or_default().push(h);
    }

    for (_key, members) in by_diam {
        if members.len() < 3 {
            continue;
        }
        let n = members.len() as f64;
        let cx = members.iter().map(|f| f.position[0]).sum::<f64>() / n;
        let cy = members.iter().map(|f| f.position[1]).sum::<f64>() / n;
        let radii: Vec<f64> = members.iter().map(|f| ((f.position[0] - cx).powi(2) + (f.position[1] - cy).powi(2)).sqrt()).collect();
        let mean_radius = radii.iter().sum::<f64>() / n;
        if mean_radius < 1.0 {
            continue;
        }
        let within_tol = radii.iter().all(|r| (r - mean_radius).abs() <= 0.05 * mean_radius);
        if !within_tol {
            continue;
        }

        let mut angles: Vec<f64> = members.iter().map(|f| (f.position[1] - cy).atan2(f.position[0] - cx)).collect();
        angles.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let two_pi = std::f64::consts::TAU;
        let expected_gap = two_pi / n;
        let mut gaps: Vec<f64> = angles.windows(2).map(|w| w[1] - w[0]).collect();
        gaps.push(two_pi - (angles[angles.len() - 1] - angles[0]));
        let equal_angled = gaps.iter().all(|g| (g - expected_gap).abs() <= 0.15 * expected_gap);

        let pattern = if equal_angled { GroupPattern::BoltCircle } else { GroupPattern::HolePattern };
        let pcd = (mean_radius * 2.0 * 10.0).round() / 10.0;
        groups.push(FeatureGroup {
            pattern,
            member_ids: members.iter().map(|f| f.id.clone()).collect(),
            center: [cx, cy, members[0].position[2]],
            pcd,
            axis: [0.0, 0.0, 1.0],
            count: members.len(),
        });
    }

    // Counterbore sets: counterbores whose parents form a bolt circle.
    for g in groups.clone() {
        if g.pattern != GroupPattern::BoltCircle {
            continue;
        }
        let cbores: Vec<&Feature> = features
            .iter()
            .filter(|f| f.kind == FeatureKind::Counterbore && f.parent_id.as_deref().map(|p| g.member_ids.iter().any(|m| m == p)).unwrap_or(false))
            .collect();
        if cbores.len() == g.member_ids.len() && !cbores.is_empty() {
            groups.push(FeatureGroup {
                pattern: GroupPattern::CounterboreSet,
                member_ids: cbores.iter().map(|f| f.id.clone()).collect(),
                center: g.center,
                pcd: g.pcd,
                axis: g.axis,
                count: cbores.len(),
            });
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::config::Config;

    fn bolt_circle_config() -> Config {
        Config::parse(
            r#"
            [[shapes]]
            id = "body"
            type = "cylinder"
            position = [0,0,0]
            radius = 60
            height = 12

            [[shapes]]
            id = "bore"
            type = "cylinder"
            position = [0,0,-2]
            radius = 15
            height = 16

            [[shapes]]
            id = "hole_1"
            type = "cylinder"
            position = [45,0,0]
            radius = 5
            height = 12

            [[shapes]]
            id = "hole_2"
            type = "cylinder"
            position = [-45,0,0]
            radius = 5
            height = 12

            [[shapes]]
            id = "hole_3"
            type = "cylinder"
            position = [0,45,0]
            radius = 5
            height = 12

            [[shapes]]
            id = "hole_4"
            type = "cylinder"
            position = [0,-45,0]
            radius = 5
            height = 12

            [[operations]]
            type = "cut"
            base = "body"
            tool = "bore"
            result = "body"

            [[operations]]
            type = "cut"
            base = "body"
            tool = "hole_1"
            result = "body"

            [[operations]]
            type = "cut"
            base = "body"
            tool = "hole_2"
            result = "body"

            [[operations]]
            type = "cut"
            base = "body"
            tool = "hole_3"
            result = "body"

            [[operations]]
            type = "cut"
            base = "body"
            tool = "hole_4"
            result = "body"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn detects_bolt_circle_with_pcd_90() {
        let cfg = bolt_circle_config();
        let graph = infer(&cfg).unwrap();
        assert_eq!(graph.by_type(FeatureKind::Hole).len(), 4);
        assert_eq!(graph.by_type(FeatureKind::Bore).len(), 1);
        let bolt_circles: Vec<_> = graph.groups().iter().filter(|g| g.pattern == GroupPattern::BoltCircle).collect();
        assert_eq!(bolt_circles.len(), 1);
        assert_eq!(bolt_circles[0].count, 4);
        assert!((bolt_circles[0].pcd - 90.0).abs() < 0.2);
    }

    #[test]
    fn counterbore_links_to_nearest_coaxial_hole() {
        let mut cfg = bolt_circle_config();
        cfg.shapes.push(
            dg_core::Shape::from_toml(
                &toml::from_str(
                    r#"id = "cbore_1"
                       type = "cylinder"
                       position = [45,0,8]
                       radius = 9
                       height = 6"#,
                )
                .unwrap(),
            )
            .unwrap(),
        );
        cfg.operations.push(dg_core::Operation::from_toml(
            &toml::from_str(r#"type = "cut"
                                base = "body"
                                tool = "cbore_1"
                                result = "body""#)
                .unwrap(),
        ).unwrap());
        let graph = infer(&cfg).unwrap();
        let cbore = graph.get("cbore_1").unwrap();
        assert_eq!(cbore.parent_id.as_deref(), Some("hole_1"));
    }
}
