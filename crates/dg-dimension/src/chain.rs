//! Automatic chain dimensioning for one view: overall dims, diameter
//! callouts, hole-to-hole/hole-to-edge chain segments, and radius dims.

use crate::common::{
    dim_diameter, dim_horizontal, dim_radius, dim_vertical, Arc, Circle, DedupeState, DimStyleConfig,
    DimensionTelemetry, ViewTransform, HIDDEN_GROUPS,
};
use dg_core::svg::Node;
use dg_core::BBox;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainTolerances {
    pub general: String,
    pub holes: String,
}

/// Running horizontal/vertical dimension-row stack counts for one view,
/// shared between the chain and plan renderers so later dimensions don't
/// overlap earlier ones.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stacks {
    pub h: usize,
    pub v: usize,
}

/// Render the four chain-dimensioning passes for one view. `vname == "iso"`
/// always produces nothing; pictorial views are never auto-dimensioned.
#[allow(clippy::too_many_arguments)]
pub fn render_chain_dimensions(
    vname: &str,
    vt: &ViewTransform,
    circles: &[Circle],
    arcs: &[Arc],
    tolerances: &ChainTolerances,
    style: &DimStyleConfig,
    cell: BBox,
    telemetry: &mut DimensionTelemetry,
    dedupe: &mut DedupeState,
) -> (Vec<Node>, Stacks) {
    let mut out = Vec::new();
    let mut stacks = Stacks::default();
    if vname == "iso" {
        return (out, stacks);
    }

    let bounds = vt.bounds;
    let (left, top) = vt.project(bounds.x_min, bounds.y_max);
    let (right, bottom) = vt.project(bounds.x_max, bounds.y_min);

    let cell_bottom = cell.y_max - 2.0;
    let cell_right = cell.x_max - 2.0;
    let max_h_stacks = (((cell_bottom - bottom - style.dim_offset) / style.feat_dim_stack) as i64).max(1) as usize;
    let max_v_stacks = (((cell_right - right - style.dim_offset) / style.feat_dim_stack) as i64).max(1) as usize;

    let width_mm = vt.width_mm();
    let height_mm = vt.height_mm();

    // Overall width.
    if width_mm > 0.5 {
        let y_dim = bottom + style.dim_offset + style.feat_dim_stack * stacks.h as f64;
        if dedupe.is_redundant("linear_h", width_mm) {
            telemetry.record_conflict(vname, "overall_width", "cross_view_redundant", "info", Some(width_mm));
        } else if y_dim < cell_bottom {
            out.extend(dim_horizontal(left, right, bottom, y_dim, width_mm, &tolerances.general, "", style.dim_ext_overshoot, style.dim_gap));
            let dim_id = telemetry.record_auto(vname, "overall_width", width_mm);
            let _ = dim_id;
            stacks.h += 1;
        } else {
            telemetry.record_conflict(vname, "overall_width", "cell_bottom_limit", "warning", Some(width_mm));
        }
    }

    // Overall height.
    if height_mm > 0.5 {
        let x_dim = right + style.dim_offset + style.feat_dim_stack * stacks.v as f64;
        if dedupe.is_redundant("linear_v", height_mm) {
            telemetry.record_conflict(vname, "overall_height", "cross_view_redundant", "info", Some(height_mm));
        } else if x_dim < cell_right {
            out.extend(dim_vertical(top, bottom, right, x_dim, height_mm, &tolerances.general, "", style.dim_ext_overshoot, style.dim_gap));
            telemetry.record_auto(vname, "overall_height", height_mm);
            stacks.v += 1;
        } else {
            telemetry.record_conflict(vname, "overall_height", "cell_right_limit", "warning", Some(height_mm));
        }
    }

    // Hole diameter callouts, deduplicated by radius (0.1mm) and skipped
    // below 1.5mm page radius.
    let cell_x0 = cell.x_min + 2.0;
    let cell_y0 = cell.y_min + 2.0;
    let mut seen_radii: Vec<f64> = Vec::new();
    let mut leader_angle = 45.0;
    for c in circles {
        if seen_radii.iter().any(|sr| (c.cr - sr).abs() < 0.1) {
            continue;
        }
        seen_radii.push(c.cr);

        let (px, py) = vt.project(c.cu, c.cv);
        let r_scaled = c.cr * vt.scale;
        if r_scaled < 1.5 {
            continue;
        }
        let dia_mm = c.cr * 2.0;
        if dedupe.is_redundant("diameter", dia_mm) {
            telemetry.record_conflict(vname, "hole_diameter", "cross_view_redundant", "info", Some(dia_mm));
            continue;
        }
        let cell_bounds = BBox::new(cell_x0, cell_y0, cell_right, cell_bottom);
        out.extend(dim_diameter(px, py, r_scaled, c.cr, leader_angle, &tolerances.holes, Some(cell_bounds), ""));
        telemetry.record_auto(vname, "hole_diameter", dia_mm);
        leader_angle += 30.0;
    }

    // Feature chain: left_edge -> hole1 -> hole2 -> ... -> right_edge, and
    // the vertical analogue.
    if !circles.is_empty() {
        let mut unique_cu: Vec<f64> = Vec::new();
        let mut sorted_u: Vec<f64> = circles.iter().map(|c| c.cu).collect();
        sorted_u.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for u in sorted_u {
            if unique_cu.last().map(|last| (u - last).abs() > 1.0).unwrap_or(true) {
                unique_cu.push(u);
            }
        }
        let mut unique_cv: Vec<f64> = Vec::new();
        let mut sorted_v: Vec<f64> = circles.iter().map(|c| c.cv).collect();
        sorted_v.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for v in sorted_v {
            if unique_cv.last().map(|last| (v - last).abs() > 1.0).unwrap_or(true) {
                unique_cv.push(v);
            }
        }

        let mut chain_u = vec![bounds.x_min];
        chain_u.extend(unique_cu);
        chain_u.push(bounds.x_max);
        let mut h_segments: Vec<(f64, f64, f64)> = Vec::new();
        for w in chain_u.windows(2) {
            let dist = w[1] - w[0];
            if dist > 2.0 && (dist - width_mm).abs() > 1.0 {
                let (px1, _) = vt.project(w[0], bounds.y_min);
                let (px2, _) = vt.project(w[1], bounds.y_min);
                if (px2 - px1).abs() >= 8.0 {
                    h_segments.push((px1, px2, dist));
                }
            }
        }
        if !h_segments.is_empty() {
            if stacks.h < max_h_stacks {
                let y_feat = bottom + style.dim_offset + style.feat_dim_stack * stacks.h as f64;
                if y_feat < cell_bottom {
                    for (px1, px2, dist) in h_segments {
                        if dedupe.is_redundant("linear_h", dist) {
                            telemetry.record_conflict(vname, "chain_horizontal", "cross_view_redundant", "info", Some(dist));
                            continue;
                        }
                        out.extend(dim_horizontal(px1, px2, bottom, y_feat, dist, "", "", style.dim_ext_overshoot, style.dim_gap));
                        telemetry.record_auto(vname, "chain_horizontal", dist);
                    }
                    stacks.h += 1;
                } else {
                    telemetry.record_conflict(vname, "chain_horizontal", "cell_bottom_limit", "warning", None);
                }
            } else {
                telemetry.record_conflict(vname, "chain_horizontal", "stack_limit", "warning", None);
            }
        }

        let mut chain_v = vec![bounds.y_min];
        chain_v.extend(unique_cv);
        chain_v.push(bounds.y_max);
        let mut v_segments: Vec<(f64, f64, f64)> = Vec::new();
        for w in chain_v.windows(2) {
            let dist = w[1] - w[0];
            if dist > 2.0 && (dist - height_mm).abs() > 1.0 {
                let (_, py_top) = vt.project(bounds.x_min, w[1]);
                let (_, py_bot) = vt.project(bounds.x_min, w[0]);
                if (py_bot - py_top).abs() >= 8.0 {
                    v_segments.push((py_top, py_bot, dist));
                }
            }
        }
        if !v_segments.is_empty() {
            if stacks.v < max_v_stacks {
                let x_feat = right + style.dim_offset + style.feat_dim_stack * stacks.v as f64;
                if x_feat < cell_right {
                    for (py_top, py_bot, dist) in v_segments {
                        if dedupe.is_redundant("linear_v", dist) {
                            telemetry.record_conflict(vname, "chain_vertical", "cross_view_redundant", "info", Some(dist));
                            continue;
                        }
                        out.extend(dim_vertical(py_top, py_bot, right, x_feat, dist, "", "", style.dim_ext_overshoot, style.dim_gap));
                        telemetry.record_auto(vname, "chain_vertical", dist);
                    }
                    stacks.v += 1;
                } else {
                    telemetry.record_conflict(vname, "chain_vertical", "cell_right_limit", "warning", None);
                }
            } else {
                telemetry.record_conflict(vname, "chain_vertical", "stack_limit", "warning", None);
            }
        }
    }

    // Radius dimensions for unique arc radii in visible groups.
    let mut seen_r: Vec<f64> = Vec::new();
    for a in arcs {
        if HIDDEN_GROUPS.contains(&a.group) {
            continue;
        }
        if seen_r.iter().any(|sr| (a.r - sr).abs() < 0.1) {
            continue;
        }
        seen_r.push(a.r);
        let r_scaled = a.r * vt.scale;
        if r_scaled < 1.0 {
            continue;
        }
        if dedupe.is_redundant("radius", a.r) {
            telemetry.record_conflict(vname, "radius", "cross_view_redundant", "info", Some(a.r));
            continue;
        }
        let (cx_pg, cy_pg) = vt.project(a.cu, a.cv);
        let (mx_pg, my_pg) = vt.project(a.mu, a.mv);
        out.extend(dim_radius(cx_pg, cy_pg, mx_pg, my_pg, r_scaled, a.r));
        telemetry.record_auto(vname, "radius", a.r);
    }

    (out, stacks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::BBox;

    fn vt() -> ViewTransform {
        ViewTransform::new(BBox::new(-25.0, -25.0, 25.0, 25.0), 100.0, 100.0, 1.0)
    }

    #[test]
    fn overall_dims_recorded_with_auto_dim_id_convention() {
        let mut telemetry = DimensionTelemetry::default();
        let mut dedupe = DedupeState::new(true, 0.5);
        let cell = BBox::new(0.0, 0.0, 210.0, 148.5);
        let (nodes, stacks) = render_chain_dimensions(
            "front",
            &vt(),
            &[],
            &[],
            &ChainTolerances::default(),
            &DimStyleConfig::default(),
            cell,
            &mut telemetry,
            &mut dedupe,
        );
        assert!(!nodes.is_empty());
        assert_eq!(stacks.h, 1);
        assert_eq!(stacks.v, 1);
        assert_eq!(telemetry.auto_dimensions[0].dim_id, "auto_front_001");
        assert_eq!(telemetry.auto_dimensions[1].dim_id, "auto_front_002");
    }

    #[test]
    fn iso_view_produces_nothing() {
        let mut telemetry = DimensionTelemetry::default();
        let mut dedupe = DedupeState::new(true, 0.5);
        let cell = BBox::new(0.0, 0.0, 210.0, 148.5);
        let (nodes, _) = render_chain_dimensions(
            "iso",
            &vt(),
            &[],
            &[],
            &ChainTolerances::default(),
            &DimStyleConfig::default(),
            cell,
            &mut telemetry,
            &mut dedupe,
        );
        assert!(nodes.is_empty());
        assert!(telemetry.auto_dimensions.is_empty());
    }

    #[test]
    fn duplicate_radius_circles_collapse_to_one_callout() {
        let mut telemetry = DimensionTelemetry::default();
        let mut dedupe = DedupeState::new(false, 0.5);
        let cell = BBox::new(0.0, 0.0, 210.0, 148.5);
        let circles = vec![Circle { cu: -10.0, cv: 0.0, cr: 5.0 }, Circle { cu: 10.0, cv: 0.0, cr: 5.05 }];
        let (_, _) = render_chain_dimensions(
            "front",
            &vt(),
            &circles,
            &[],
            &ChainTolerances::default(),
            &DimStyleConfig::default(),
            cell,
            &mut telemetry,
            &mut dedupe,
        );
        let dia_count = telemetry.auto_dimensions.iter().filter(|r| r.category == "hole_diameter").count();
        assert_eq!(dia_count, 1);
    }

    #[test]
    fn cross_view_redundant_width_is_a_conflict_not_a_dimension() {
        let mut telemetry = DimensionTelemetry::default();
        let mut dedupe = DedupeState::new(true, 0.5);
        let cell = BBox::new(0.0, 0.0, 210.0, 148.5);
        render_chain_dimensions("front", &vt(), &[], &[], &ChainTolerances::default(), &DimStyleConfig::default(), cell, &mut telemetry, &mut dedupe);
        let before = telemetry.auto_dimensions.len();
        render_chain_dimensions("top", &vt(), &[], &[], &ChainTolerances::default(), &DimStyleConfig::default(), cell, &mut telemetry, &mut dedupe);
        assert_eq!(telemetry.auto_dimensions.len(), before);
        assert!(telemetry.conflicts.iter().any(|c| c.reason == "cross_view_redundant"));
    }
}
