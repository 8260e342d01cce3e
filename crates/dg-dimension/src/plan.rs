//! Plan-driven dimension rendering: supplements auto (chain) dimensions
//! with the drawing plan's `dim_intents`, skipping anything the auto
//! renderer already drew.

use crate::chain::Stacks;
use crate::common::{dim_diameter, dim_horizontal, dim_vertical, Circle, DimStyleConfig, DimensionTelemetry, ViewTransform};
use dg_core::svg::Node;
use dg_core::BBox;
use dg_model::{DimIntent, DimStyle, Side};

const REVIEW_COLOR: &str = "#D00";

/// Feature ids routed to a vertical linear dimension; everything else that
/// isn't diameter-like goes horizontal.
const V_FEATURES: &[&str] = &["THK", "HEIGHT", "WEB_H", "WALL_THK"];

fn style_bucket(intent: &DimIntent) -> &'static str {
    if intent.is_diameter_like() {
        return "diameter";
    }
    if intent.style == DimStyle::Linear && V_FEATURES.contains(&intent.feature.as_str()) {
        return "linear_v";
    }
    if intent.style == DimStyle::Linear {
        return "linear_h";
    }
    match intent.style {
        DimStyle::Radius => "radius",
        DimStyle::Callout => "callout",
        DimStyle::Note => "note",
        _ => "other",
    }
}

fn auto_categories_for_bucket(bucket: &str) -> &'static [&'static str] {
    match bucket {
        "diameter" => &["hole_diameter"],
        "linear_h" => &["overall_width", "chain_horizontal"],
        "linear_v" => &["overall_height", "chain_vertical"],
        "radius" => &["radius"],
        _ => &[],
    }
}

/// Returns `Some(auto_dim_id)` if this intent duplicates an already-emitted
/// auto dimension within `max(tol, 0.002*|value|)`, honoring the dedupe
/// policy (`smart` is style-aware, `value_only` ignores category, `off`
/// never dedupes).
fn find_auto_dedupe_match(intent: &DimIntent, telemetry: &DimensionTelemetry, policy: &str, tol: f64) -> Option<String> {
    let value_mm = intent.value_mm?;
    let policy = policy.to_lowercase();
    if policy == "off" {
        return None;
    }
    let dyn_tol = tol.max(0.002 * value_mm.abs());
    let bucket = style_bucket(intent);
    let allowed = auto_categories_for_bucket(bucket);

    let mut best: Option<(String, f64)> = None;
    for ad in &telemetry.auto_dimensions {
        if policy == "smart" && !allowed.is_empty() && !allowed.contains(&ad.category.as_str()) {
            continue;
        }
        let delta = (ad.value_mm - value_mm).abs();
        if delta <= dyn_tol && best.as_ref().map(|(_, d)| delta < *d).unwrap_or(true) {
            best = Some((ad.dim_id.clone(), delta));
        }
    }
    best.map(|(id, _)| id)
}

fn find_closest_circle(value_mm: f64, circles: &[Circle]) -> Option<Circle> {
    let target_r = value_mm / 2.0;
    let mut best: Option<Circle> = None;
    let mut best_diff = f64::INFINITY;
    for c in circles {
        let diff = (c.cr - target_r).abs();
        if diff < best_diff {
            best_diff = diff;
            best = Some(*c);
        }
    }
    if best.is_some() && best_diff < target_r * 0.3 {
        best
    } else {
        None
    }
}

fn review_marker(intent: &DimIntent, cx: f64, cy: f64, h_stack: usize) -> Node {
    let y = cy + 30.0 + h_stack as f64 * 5.0;
    Node::new("text")
        .with_attr("x", format!("{:.2}", cx))
        .with_attr("y", format!("{:.2}", y))
        .with_attr("text-anchor", "middle")
        .with_attr("font-size", "2.5")
        .with_attr("fill", REVIEW_COLOR)
        .with_attr("font-weight", "bold")
        .with_text(format!("[REVIEW: {}]", intent.id))
}

/// Render plan-driven dimensions for one view. Returns the accumulated SVG
/// nodes and the updated h/v stack counters (threaded from the auto-dim
/// pass so plan rows don't collide with chain rows).
#[allow(clippy::too_many_arguments)]
pub fn render_plan_dimensions(
    dim_intents: &[DimIntent],
    vname: &str,
    vt: &ViewTransform,
    circles: &[Circle],
    cell: BBox,
    stacks: Stacks,
    style: &DimStyleConfig,
    dedupe_policy: &str,
    dedupe_tol_mm: f64,
    telemetry: &mut DimensionTelemetry,
) -> (Vec<Node>, Stacks) {
    let mut out = Vec::new();
    let mut stacks = stacks;
    if dim_intents.is_empty() || vname == "iso" {
        return (out, stacks);
    }

    for intent in dim_intents {
        if !intent.view.is_empty() && intent.view != vname {
            continue;
        }

        if let Some(auto_id) = find_auto_dedupe_match(intent, telemetry, dedupe_policy, dedupe_tol_mm) {
            telemetry.record_plan(&intent.feature, vname, intent.style.as_str(), intent.required, intent.value_mm, &intent.id, "skipped_duplicate", false, Some("already_in_auto_dims"));
            telemetry.record_conflict(vname, "dedupe", "plan_dim_skipped_due_to_auto_match", "info", intent.value_mm);
            let _ = auto_id;
            continue;
        }

        let Some(value_mm) = intent.value_mm else {
            if intent.required {
                out.push(review_marker(intent, vt.cx, vt.cy, stacks.h));
                telemetry.record_plan(&intent.feature, vname, intent.style.as_str(), intent.required, None, &intent.id, "missing_value", false, Some("required_dim_missing_value"));
            } else {
                telemetry.record_plan(&intent.feature, vname, intent.style.as_str(), intent.required, None, &intent.id, "missing_value_optional", false, Some("optional_dim_missing_value"));
            }
            continue;
        };

        if intent.is_diameter_like() {
            if vname == "front" {
                let angle_deg = intent.placement.as_ref().and_then(|p| p.angle_deg).or_else(|| intent.placement.as_ref().and_then(|p| p.side).map(Side::default_angle_deg)).unwrap_or(45.0);
                if let Some(circle) = find_closest_circle(value_mm, circles) {
                    let (px, py) = vt.project(circle.cu, circle.cv);
                    let r_scaled = circle.cr * vt.scale;
                    let elems = dim_diameter(px, py, r_scaled, value_mm / 2.0, angle_deg, "", None, &intent.id);
                    out.extend(elems);
                    telemetry.record_plan(&intent.feature, vname, intent.style.as_str(), intent.required, Some(value_mm), &intent.id, "rendered", true, None);
                } else {
                    telemetry.record_plan(&intent.feature, vname, intent.style.as_str(), intent.required, Some(value_mm), &intent.id, "skipped_no_anchor", false, Some("no_matching_circle"));
                }
            } else {
                telemetry.record_plan(&intent.feature, vname, intent.style.as_str(), intent.required, Some(value_mm), &intent.id, "skipped_view", false, Some("diameter_intent_front_only"));
            }
            continue;
        }

        match intent.style {
            DimStyle::Linear => {
                let bucket = style_bucket(intent);
                if bucket == "linear_v" {
                    let side_left = intent.placement.as_ref().and_then(|p| p.side).map(|s| matches!(s, Side::Left | Side::TopLeft | Side::BottomLeft)).unwrap_or(false);
                    let (left, _) = vt.project(vt.bounds.x_min, 0.0);
                    let (right, _) = vt.project(vt.bounds.x_max, 0.0);
                    let (_, top) = vt.project(0.0, vt.bounds.y_max);
                    let (_, bottom) = vt.project(0.0, vt.bounds.y_min);
                    let extra = intent.placement.as_ref().and_then(|p| p.offset_mm).unwrap_or(0.0);
                    let x_dim = if side_left {
                        left - (style.dim_gap + style.dim_offset + stacks.v as f64 * style.dim_offset + extra)
                    } else {
                        right + style.dim_gap + style.dim_offset + stacks.v as f64 * style.dim_offset + extra
                    };
                    let x_base = if side_left { left } else { right };
                    let elems = dim_vertical(top, bottom, x_base, x_dim, value_mm, "", &intent.id, style.dim_ext_overshoot, style.dim_gap);
                    out.extend(elems);
                    stacks.v += 1;
                    telemetry.record_plan(&intent.feature, vname, intent.style.as_str(), intent.required, Some(value_mm), &intent.id, "rendered", true, None);
                } else {
                    let side_top = intent.placement.as_ref().and_then(|p| p.side).map(Side::stacks_above).unwrap_or(false);
                    let (left, _) = vt.project(vt.bounds.x_min, 0.0);
                    let (right, _) = vt.project(vt.bounds.x_max, 0.0);
                    let (_, top) = vt.project(0.0, vt.bounds.y_max);
                    let (_, bottom) = vt.project(0.0, vt.bounds.y_min);
                    let extra = intent.placement.as_ref().and_then(|p| p.offset_mm).unwrap_or(0.0);
                    let y_dim = if side_top {
                        top - (style.dim_gap + style.dim_offset + stacks.h as f64 * style.dim_offset + extra)
                    } else {
                        bottom + style.dim_gap + style.dim_offset + stacks.h as f64 * style.dim_offset + extra
                    };
                    let y_base = if side_top { top } else { bottom };
                    let elems = dim_horizontal(left, right, y_base, y_dim, value_mm, "", &intent.id, style.dim_ext_overshoot, style.dim_gap);
                    out.extend(elems);
                    stacks.h += 1;
                    telemetry.record_plan(&intent.feature, vname, intent.style.as_str(), intent.required, Some(value_mm), &intent.id, "rendered", true, None);
                }
            }
            DimStyle::Radius => {
                telemetry.record_plan(&intent.feature, vname, intent.style.as_str(), intent.required, Some(value_mm), &intent.id, "delegated", false, Some("radius_auto_dim"));
            }
            DimStyle::Callout => {
                telemetry.record_plan(&intent.feature, vname, intent.style.as_str(), intent.required, Some(value_mm), &intent.id, "delegated", false, Some("callout_renderer"));
            }
            DimStyle::Note => {
                telemetry.record_plan(&intent.feature, vname, intent.style.as_str(), intent.required, Some(value_mm), &intent.id, "delegated", false, Some("notes_renderer"));
            }
            _ => {
                telemetry.record_plan(&intent.feature, vname, intent.style.as_str(), intent.required, Some(value_mm), &intent.id, "skipped_style", false, Some(&format!("unsupported_style:{}", intent.style.as_str())));
            }
        }
    }

    if out.is_empty() {
        return (Vec::new(), stacks);
    }
    (out, stacks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_model::{Confidence, DimIntent, DimStyle};

    fn vt() -> ViewTransform {
        ViewTransform::new(BBox::new(-25.0, -25.0, 25.0, 25.0), 100.0, 100.0, 1.0)
    }

    fn intent(id: &str, feature: &str, style: DimStyle, view: &str, value_mm: Option<f64>, required: bool) -> DimIntent {
        DimIntent {
            id: id.to_string(),
            feature: feature.to_string(),
            view: view.to_string(),
            style,
            required,
            priority: 0,
            value_mm,
            confidence: Confidence::High,
            source: "template".to_string(),
            review: false,
            placement: None,
        }
    }

    #[test]
    fn diameter_intent_with_matching_circle_renders_on_front() {
        let intents = vec![intent("OD", "OD", DimStyle::Diameter, "front", Some(20.0), true)];
        let circles = vec![Circle { cu: 0.0, cv: 0.0, cr: 10.0 }];
        let mut telemetry = DimensionTelemetry::default();
        let cell = BBox::new(0.0, 0.0, 210.0, 148.5);
        let (nodes, _) = render_plan_dimensions(&intents, "front", &vt(), &circles, cell, Stacks::default(), &DimStyleConfig::default(), "smart", 0.5, &mut telemetry);
        assert!(!nodes.is_empty());
        assert_eq!(telemetry.plan_dimensions[0].status, "rendered");
    }

    #[test]
    fn diameter_intent_skipped_outside_front_view() {
        let intents = vec![intent("OD", "OD", DimStyle::Diameter, "top", Some(20.0), true)];
        let mut telemetry = DimensionTelemetry::default();
        let cell = BBox::new(0.0, 0.0, 210.0, 148.5);
        let (nodes, _) = render_plan_dimensions(&intents, "top", &vt(), &[], cell, Stacks::default(), &DimStyleConfig::default(), "smart", 0.5, &mut telemetry);
        assert!(nodes.is_empty());
        assert_eq!(telemetry.plan_dimensions[0].status, "skipped_view");
    }

    #[test]
    fn missing_required_value_renders_review_marker() {
        let intents = vec![intent("THK", "THK", DimStyle::Linear, "front", None, true)];
        let mut telemetry = DimensionTelemetry::default();
        let cell = BBox::new(0.0, 0.0, 210.0, 148.5);
        let (nodes, _) = render_plan_dimensions(&intents, "front", &vt(), &[], cell, Stacks::default(), &DimStyleConfig::default(), "smart", 0.5, &mut telemetry);
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].text.as_deref().unwrap().contains("REVIEW"));
    }

    #[test]
    fn dedupe_skips_plan_dim_matching_auto_dimension() {
        let intents = vec![intent("WIDTH", "WIDTH", DimStyle::Linear, "front", Some(50.0), false)];
        let mut telemetry = DimensionTelemetry::default();
        telemetry.record_auto("front", "overall_width", 50.001);
        let cell = BBox::new(0.0, 0.0, 210.0, 148.5);
        let (nodes, _) = render_plan_dimensions(&intents, "front", &vt(), &[], cell, Stacks::default(), &DimStyleConfig::default(), "smart", 0.5, &mut telemetry);
        assert!(nodes.is_empty());
        assert_eq!(telemetry.plan_dimensions[0].status, "skipped_duplicate");
    }

    #[test]
    fn off_policy_never_dedupes() {
        let intents = vec![intent("WIDTH", "WIDTH", DimStyle::Linear, "front", Some(50.0), false)];
        let mut telemetry = DimensionTelemetry::default();
        telemetry.record_auto("front", "overall_width", 50.0);
        let cell = BBox::new(0.0, 0.0, 210.0, 148.5);
        let (nodes, _) = render_plan_dimensions(&intents, "front", &vt(), &[], cell, Stacks::default(), &DimStyleConfig::default(), "off", 0.5, &mut telemetry);
        assert!(!nodes.is_empty());
    }
}
