//! Dispatches each known dimension id to the extractor that can derive its
//! millimetre value straight from geometry when a template/override left
//! it unset.

use crate::feature::{FeatureGraph, FeatureKind, GroupPattern};
use crate::plan::Confidence;
use dg_core::config::{Config, Operation, ShapeKind};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractResult {
    pub value_mm: Option<f64>,
    pub confidence: Confidence,
    pub source: String,
}

impl ExtractResult {
    fn none() -> ExtractResult {
        ExtractResult { value_mm: None, confidence: Confidence::None, source: "extractor:none".to_string() }
    }

    fn found(value_mm: f64, confidence: Confidence, source: impl Into<String>) -> ExtractResult {
        ExtractResult { value_mm: Some(value_mm), confidence, source: source.into() }
    }
}

type Extractor = fn(&Config, &FeatureGraph) -> ExtractResult;

fn tool_ids(config: &Config) -> Vec<&str> {
    config
        .operations
        .iter()
        .filter_map(|op| match op {
            Operation::Cut { tool, .. } | Operation::Common { tool, .. } => Some(tool.as_str()),
            _ => None,
        })
        .collect()
}

/// Base (non-tool) shapes, the material the part is actually cut from.
fn body_shapes(config: &Config) -> Vec<&dg_core::Shape> {
    let tools = tool_ids(config);
    config.shapes.iter().filter(|s| !tools.contains(&s.id())).collect()
}

fn ext_od(config: &Config, _graph: &FeatureGraph) -> ExtractResult {
    body_shapes(config)
        .iter()
        .filter_map(|s| match s.kind {
            ShapeKind::Cylinder { radius, .. } => Some((s.id(), radius * 2.0)),
            _ => None,
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(id, d)| ExtractResult::found(d, Confidence::High, format!("shape:{id}")))
        .unwrap_or_else(ExtractResult::none)
}

fn ext_id(_config: &Config, graph: &FeatureGraph) -> ExtractResult {
    let bores = graph.by_type(FeatureKind::Bore);
    match bores.as_slice() {
        [single] => ExtractResult::found(single.diameter.unwrap_or(0.0), Confidence::High, format!("feature:{}", single.id)),
        [] => ExtractResult::none(),
        many => {
            let d = many.iter().map(|f| f.diameter.unwrap_or(0.0)).fold(0.0_f64, f64::max);
            ExtractResult::found(d, Confidence::Medium, "feature:bore(max)".to_string())
        }
    }
}

fn ext_pcd(_config: &Config, graph: &FeatureGraph) -> ExtractResult {
    graph
        .groups()
        .iter()
        .find(|g| g.pattern == GroupPattern::BoltCircle)
        .map(|g| ExtractResult::found(g.pcd, Confidence::High, "group:bolt_circle".to_string()))
        .unwrap_or_else(ExtractResult::none)
}

fn ext_bolt_dia(_config: &Config, graph: &FeatureGraph) -> ExtractResult {
    let Some(group) = graph.groups().iter().find(|g| g.pattern == GroupPattern::BoltCircle) else {
        return ExtractResult::none();
    };
    group
        .member_ids
        .first()
        .and_then(|id| graph.get(id))
        .and_then(|f| f.diameter)
        .map(|d| ExtractResult::found(d, Confidence::High, "group:bolt_circle.member[0]".to_string()))
        .unwrap_or_else(ExtractResult::none)
}

fn ext_bolt_count(_config: &Config, graph: &FeatureGraph) -> ExtractResult {
    graph
        .groups()
        .iter()
        .find(|g| g.pattern == GroupPattern::BoltCircle)
        .map(|g| ExtractResult::found(g.count as f64, Confidence::High, "group:bolt_circle.count".to_string()))
        .unwrap_or_else(ExtractResult::none)
}

fn ext_thk(config: &Config, _graph: &FeatureGraph) -> ExtractResult {
    let bodies = body_shapes(config);
    let from_cylinder = bodies
        .iter()
        .filter_map(|s| match s.kind {
            ShapeKind::Cylinder { radius, height } => Some((s.id(), radius, height)),
            _ => None,
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(id, _, h)| (id, h));
    let from_box = bodies
        .iter()
        .filter_map(|s| match s.kind {
            ShapeKind::Box { size } => Some((s.id(), size[0] * size[1], size[2])),
            _ => None,
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(id, _, h)| (id, h));

    match (from_cylinder, from_box) {
        (Some((id, h)), None) | (None, Some((id, h))) => ExtractResult::found(h, Confidence::High, format!("shape:{id}")),
        (Some((cid, ch)), Some((bid, bh))) => {
            if ch >= bh {
                ExtractResult::found(ch, Confidence::Medium, format!("shape:{cid}"))
            } else {
                ExtractResult::found(bh, Confidence::Medium, format!("shape:{bid}"))
            }
        }
        (None, None) => ExtractResult::none(),
    }
}

/// Axial span of a stacked/fused cylinder chain, a proxy for shaft overall
/// length.
fn ext_total_length(config: &Config, _graph: &FeatureGraph) -> ExtractResult {
    let cylinders: Vec<(f64, f64)> = body_shapes(config)
        .iter()
        .filter_map(|s| match s.kind {
            ShapeKind::Cylinder { height, .. } => {
                let z = s.position()[2];
                Some((z - height / 2.0, z + height / 2.0))
            }
            _ => None,
        })
        .collect();
    if cylinders.is_empty() {
        return ExtractResult::none();
    }
    let lo = cylinders.iter().map(|(l, _)| *l).fold(f64::MAX, f64::min);
    let hi = cylinders.iter().map(|(_, h)| *h).fold(f64::MIN, f64::max);
    ExtractResult::found(hi - lo, Confidence::Medium, "shape:body(span)".to_string())
}

/// Two largest distinct step diameters on a stepped shaft, in descending
/// order; `OD1` first, `OD2` second.
fn stepped_diameters(config: &Config) -> Vec<f64> {
    let mut diameters: Vec<f64> = body_shapes(config)
        .iter()
        .filter_map(|s| match s.kind {
            ShapeKind::Cylinder { radius, .. } => Some(radius * 2.0),
            _ => None,
        })
        .collect();
    diameters.sort_by(|a, b| b.partial_cmp(a).unwrap());
    diameters.dedup_by(|a, b| (*a - *b).abs() < 0.01);
    diameters
}

fn ext_od1(config: &Config, _graph: &FeatureGraph) -> ExtractResult {
    stepped_diameters(config)
        .first()
        .map(|d| ExtractResult::found(*d, Confidence::High, "shape:body(step[0])".to_string()))
        .unwrap_or_else(ExtractResult::none)
}

fn ext_od2(config: &Config, _graph: &FeatureGraph) -> ExtractResult {
    stepped_diameters(config)
        .get(1)
        .map(|d| ExtractResult::found(*d, Confidence::High, "shape:body(step[1])".to_string()))
        .unwrap_or_else(ExtractResult::none)
}

fn largest_box<'a>(config: &'a Config) -> Option<&'a dg_core::Shape> {
    body_shapes(config)
        .into_iter()
        .filter(|s| matches!(s.kind, ShapeKind::Box { .. }))
        .max_by(|a, b| box_volume(a).partial_cmp(&box_volume(b)).unwrap())
}

fn box_volume(s: &dg_core::Shape) -> f64 {
    match s.kind {
        ShapeKind::Box { size } => size[0] * size[1] * size[2],
        _ => 0.0,
    }
}

fn ext_box_axis(config: &Config, axis: usize) -> ExtractResult {
    largest_box(config)
        .and_then(|s| match s.kind {
            ShapeKind::Box { size } => Some((s.id(), size[axis])),
            _ => None,
        })
        .map(|(id, v)| ExtractResult::found(v, Confidence::High, format!("shape:{id}")))
        .unwrap_or_else(ExtractResult::none)
}

fn ext_width(config: &Config, _graph: &FeatureGraph) -> ExtractResult {
    ext_box_axis(config, 0)
}

fn ext_height(config: &Config, _graph: &FeatureGraph) -> ExtractResult {
    ext_box_axis(config, 1)
}

fn ext_depth(config: &Config, _graph: &FeatureGraph) -> ExtractResult {
    ext_box_axis(config, 2)
}

fn ext_base_w(config: &Config, _graph: &FeatureGraph) -> ExtractResult {
    ext_box_axis(config, 0)
}

/// Height of the second-largest body box, approximating a rib/web.
fn ext_web_h(config: &Config, _graph: &FeatureGraph) -> ExtractResult {
    let mut boxes: Vec<(&str, f64, f64)> = body_shapes(config)
        .iter()
        .filter_map(|s| match s.kind {
            ShapeKind::Box { size } => Some((s.id(), size[0] * size[1] * size[2], size[1])),
            _ => None,
        })
        .collect();
    boxes.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    boxes
        .get(1)
        .map(|(id, _, h)| ExtractResult::found(*h, Confidence::Medium, format!("shape:{id}")))
        .unwrap_or_else(ExtractResult::none)
}

fn ext_hole_dia(_config: &Config, graph: &FeatureGraph) -> ExtractResult {
    graph
        .by_type(FeatureKind::Hole)
        .first()
        .and_then(|f| f.diameter)
        .map(|d| ExtractResult::found(d, Confidence::Medium, "feature:hole[0]".to_string()))
        .unwrap_or_else(ExtractResult::none)
}

fn ext_wall_thk(config: &Config, _graph: &FeatureGraph) -> ExtractResult {
    if let Some(v) = config.manufacturing.min_wall_override {
        return ExtractResult::found(v, Confidence::High, "manufacturing.min_wall_override".to_string());
    }
    config
        .operations
        .iter()
        .find_map(|op| match op {
            Operation::Shell { thickness, .. } => Some(*thickness),
            _ => None,
        })
        .map(|t| ExtractResult::found(t, Confidence::High, "operation:shell".to_string()))
        .unwrap_or_else(ExtractResult::none)
}

fn ext_chamfer(_config: &Config, graph: &FeatureGraph) -> ExtractResult {
    graph
        .by_type(FeatureKind::Chamfer)
        .first()
        .and_then(|f| f.size)
        .map(|s| ExtractResult::found(s, Confidence::Medium, "feature:chamfer[0]".to_string()))
        .unwrap_or_else(ExtractResult::none)
}

fn ext_keyway_w(_config: &Config, graph: &FeatureGraph) -> ExtractResult {
    graph
        .by_type(FeatureKind::Slot)
        .first()
        .and_then(|f| f.size)
        .map(|s| ExtractResult::found(s, Confidence::Medium, "feature:slot[0]".to_string()))
        .unwrap_or_else(ExtractResult::none)
}

fn find_cylinder_by_tag<'a>(config: &'a Config, tags: &[&str]) -> Option<(&'a str, f64)> {
    config.shapes.iter().find_map(|s| {
        let lower = s.id().to_ascii_lowercase();
        if tags.iter().any(|t| lower.contains(t)) {
            if let ShapeKind::Cylinder { radius, .. } = s.kind {
                return Some((s.id(), radius * 2.0));
            }
        }
        None
    })
}

fn ext_bearing_seat(config: &Config, _graph: &FeatureGraph) -> ExtractResult {
    find_cylinder_by_tag(config, &["seat", "bearing"])
        .map(|(id, d)| ExtractResult::found(d, Confidence::Medium, format!("shape:{id}")))
        .unwrap_or_else(ExtractResult::none)
}

fn ext_bushing_dia(config: &Config, graph: &FeatureGraph) -> ExtractResult {
    if let Some((id, d)) = find_cylinder_by_tag(config, &["bushing"]) {
        return ExtractResult::found(d, Confidence::High, format!("shape:{id}"));
    }
    graph
        .by_type(FeatureKind::Bore)
        .first()
        .and_then(|f| f.diameter)
        .map(|d| ExtractResult::found(d, Confidence::Medium, "feature:bore[0]".to_string()))
        .unwrap_or_else(ExtractResult::none)
}

/// Largest step diameter across the shaft, the one value `STEP_DIAMETERS`
/// can carry as a scalar dimension id (the full list is exposed through
/// `stepped_diameters` for callers that want every step).
fn ext_step_diameters(config: &Config, _graph: &FeatureGraph) -> ExtractResult {
    stepped_diameters(config)
        .first()
        .map(|d| ExtractResult::found(*d, Confidence::Medium, "shape:body(step_max)".to_string()))
        .unwrap_or_else(ExtractResult::none)
}

fn extractors() -> HashMap<&'static str, Extractor> {
    let mut m: HashMap<&'static str, Extractor> = HashMap::new();
    m.insert("OD", ext_od);
    m.insert("ID", ext_id);
    m.insert("PCD", ext_pcd);
    m.insert("BOLT_DIA", ext_bolt_dia);
    m.insert("BOLT_COUNT", ext_bolt_count);
    m.insert("THK", ext_thk);
    m.insert("TOTAL_LENGTH", ext_total_length);
    m.insert("OD1", ext_od1);
    m.insert("OD2", ext_od2);
    m.insert("WIDTH", ext_width);
    m.insert("HEIGHT", ext_height);
    m.insert("DEPTH", ext_depth);
    m.insert("BASE_W", ext_base_w);
    m.insert("WEB_H", ext_web_h);
    m.insert("HOLE_DIA", ext_hole_dia);
    m.insert("BORE_ID", ext_id);
    m.insert("WALL_THK", ext_wall_thk);
    m.insert("CHAMFER", ext_chamfer);
    m.insert("KEYWAY_W", ext_keyway_w);
    m.insert("BEARING_SEAT", ext_bearing_seat);
    m.insert("BUSHING_DIA", ext_bushing_dia);
    m.insert("STEP_DIAMETERS", ext_step_diameters);
    m
}

/// Resolve a single dimension intent's value, honoring `value_mm`
/// set by a template/override before ever touching the geometry.
pub fn extract_value(id: &str, existing_value_mm: Option<f64>, config: &Config, graph: &FeatureGraph) -> ExtractResult {
    if let Some(v) = existing_value_mm {
        return ExtractResult::found(v, Confidence::High, "user_override".to_string());
    }
    match extractors().get(id) {
        Some(f) => f(config, graph),
        None => ExtractResult::none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::infer;

    fn flange_config() -> Config {
        Config::parse(
            r#"
            [[shapes]]
            id = "body"
            type = "cylinder"
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
    fn existing_value_wins_as_user_override() {
        let cfg = flange_config();
        let graph = infer(&cfg).unwrap();
        let r = extract_value("OD", Some(99.0), &cfg, &graph);
        assert_eq!(r.value_mm, Some(99.0));
        assert_eq!(r.confidence, Confidence::High);
        assert_eq!(r.source, "user_override");
    }

    #[test]
    fn od_extracted_from_largest_body_cylinder() {
        let cfg = flange_config();
        let graph = infer(&cfg).unwrap();
        let r = extract_value("OD", None, &cfg, &graph);
        assert_eq!(r.value_mm, Some(120.0));
    }

    #[test]
    fn pcd_extracted_from_bolt_circle_group() {
        let cfg = flange_config();
        let graph = infer(&cfg).unwrap();
        let r = extract_value("PCD", None, &cfg, &graph);
        assert!((r.value_mm.unwrap() - 90.0).abs() < 0.2);
    }

    #[test]
    fn unknown_id_returns_none_confidence() {
        let cfg = flange_config();
        let graph = infer(&cfg).unwrap();
        let r = extract_value("NOT_A_REAL_ID", None, &cfg, &graph);
        assert_eq!(r.confidence, Confidence::None);
    }
}
