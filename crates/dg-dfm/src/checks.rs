//! Process-aware manufacturability checks (DFM-01..09) driven by constraint
//! tables keyed on manufacturing process, plus an optional shop tool-profile.

use dg_core::config::{Config, Operation, Shape, ShapeKind};
use std::collections::HashSet;

/// DFM-01..06 thresholds per manufacturing process.
#[derive(Debug, Clone, Copy)]
pub struct ProcessConstraints {
    pub min_wall: f64,
    pub hole_edge_factor: f64,
    pub hole_spacing_factor: f64,
    pub max_drill_ratio: f64,
}

fn constraints_for(process: &str) -> ProcessConstraints {
    match process {
        "casting" => ProcessConstraints { min_wall: 3.0, hole_edge_factor: 2.0, hole_spacing_factor: 1.5, max_drill_ratio: 3.0 },
        "sheet_metal" => ProcessConstraints { min_wall: 0.5, hole_edge_factor: 1.0, hole_spacing_factor: 1.0, max_drill_ratio: 10.0 },
        "3d_printing" => ProcessConstraints { min_wall: 0.8, hole_edge_factor: 0.5, hole_spacing_factor: 0.5, max_drill_ratio: 20.0 },
        _ => ProcessConstraints { min_wall: 1.5, hole_edge_factor: 1.0, hole_spacing_factor: 1.0, max_drill_ratio: 5.0 },
    }
}

/// Optional shop tool profile (DFM-07/08/09), supplied outside the part
/// config proper — no corresponding source table exists, so every field
/// defaults to "no constraint configured" and the check is skipped.
#[derive(Debug, Clone, Default)]
pub struct ShopProfile {
    pub min_hole_diameter_mm: Option<f64>,
    pub max_tool_reach_mm: Option<f64>,
    pub min_internal_radius_mm: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DfmCheck {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    pub feature: Option<String>,
    pub recommendation: Option<String>,
}

impl DfmCheck {
    fn new(code: &'static str, severity: Severity, message: String) -> Self {
        Self { code, severity, message, feature: None, recommendation: None }
    }

    fn feature(mut self, id: impl Into<String>) -> Self {
        self.feature = Some(id.into());
        self
    }

    fn recommend(mut self, text: impl Into<String>) -> Self {
        self.recommendation = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DfmSummary {
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    pub total: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DfmReport {
    pub success: bool,
    pub process: String,
    pub material: String,
    pub checks: Vec<DfmCheck>,
    pub summary: DfmSummary,
    pub score: i64,
}

struct HoleGeo {
    id: String,
    radius: f64,
    height: f64,
    x: f64,
    y: f64,
}

impl HoleGeo {
    fn diameter(&self) -> f64 {
        self.radius * 2.0
    }
}

struct BodyGeo {
    x: f64,
    y: f64,
    radius: f64,
}

fn cut_tool_ids(config: &Config) -> HashSet<&str> {
    config
        .operations
        .iter()
        .filter_map(|op| match op {
            Operation::Cut { tool, .. } => Some(tool.as_str()),
            _ => None,
        })
        .collect()
}

fn dist_2d(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
}

fn cut_cylinders<'a>(config: &'a Config, cut_tools: &HashSet<&str>) -> Vec<(&'a Shape, f64, f64)> {
    config
        .shapes
        .iter()
        .filter(|s| cut_tools.contains(s.id()))
        .filter_map(|s| match s.kind {
            ShapeKind::Cylinder { radius, height } => Some((s, radius, height)),
            _ => None,
        })
        .collect()
}

fn extract_holes(config: &Config) -> Vec<HoleGeo> {
    let cut_tools = cut_tool_ids(config);
    cut_cylinders(config, &cut_tools)
        .into_iter()
        .map(|(s, radius, height)| {
            let pos = s.position();
            HoleGeo { id: s.id().to_string(), radius, height, x: pos[0], y: pos[1] }
        })
        .collect()
}

/// Largest non-cut cylindrical body — stands in for the outer boundary.
fn outer_body(config: &Config) -> Option<BodyGeo> {
    let cut_tools = cut_tool_ids(config);
    config
        .shapes
        .iter()
        .filter(|s| !cut_tools.contains(s.id()))
        .filter_map(|s| match s.kind {
            ShapeKind::Cylinder { radius, .. } => {
                let pos = s.position();
                Some(BodyGeo { x: pos[0], y: pos[1], radius })
            }
            _ => None,
        })
        .max_by(|a, b| a.radius.partial_cmp(&b.radius).unwrap())
}

fn is_central_bore(hole: &HoleGeo, body: &BodyGeo) -> bool {
    dist_2d(hole.x, hole.y, body.x, body.y) < 0.1
}

/// Ids of cut cylinders that are the larger/shallower half of a coaxial
/// pair — i.e. a counterbore riding on top of a through hole.
fn counterbore_ids(config: &Config) -> HashSet<String> {
    let cut_tools = cut_tool_ids(config);
    let cyls = cut_cylinders(config, &cut_tools);
    let mut out = HashSet::new();
    for i in 0..cyls.len() {
        for j in (i + 1)..cyls.len() {
            let (s1, r1, h1) = &cyls[i];
            let (s2, r2, h2) = &cyls[j];
            let p1 = s1.position();
            let p2 = s2.position();
            if dist_2d(p1[0], p1[1], p2[0], p2[1]) < 0.1 {
                if r1 > r2 && h1 < h2 {
                    out.insert(s1.id().to_string());
                } else if r2 > r1 && h2 < h1 {
                    out.insert(s2.id().to_string());
                }
            }
        }
    }
    out
}

/// DFM-01: wall thickness between a hole and the outer body boundary.
fn check_wall_thickness(config: &Config, c: &ProcessConstraints) -> Vec<DfmCheck> {
    let Some(outer) = outer_body(config) else { return Vec::new() };
    extract_holes(config)
        .iter()
        .filter_map(|h| {
            let dist = dist_2d(h.x, h.y, outer.x, outer.y);
            let wall = outer.radius - dist - h.radius;
            if wall < 0.0 {
                None
            } else if wall < c.min_wall {
                Some(
                    DfmCheck::new("DFM-01", Severity::Error, format!("Wall thickness {wall:.1}mm < min {}mm at hole '{}'", c.min_wall, h.id))
                        .feature(&h.id)
                        .recommend(format!("Increase wall to >= {}mm or reduce hole diameter", c.min_wall)),
                )
            } else if wall < c.min_wall * 1.5 {
                Some(
                    DfmCheck::new("DFM-01", Severity::Warning, format!("Wall thickness {wall:.1}mm is marginal (min {}mm) at hole '{}'", c.min_wall, h.id))
                        .feature(&h.id)
                        .recommend("Consider increasing wall thickness for safety margin"),
                )
            } else {
                None
            }
        })
        .collect()
}

/// DFM-02: hole-to-edge distance, skipping central bores and counterbores.
fn check_hole_edge_distance(config: &Config, c: &ProcessConstraints) -> Vec<DfmCheck> {
    let Some(outer) = outer_body(config) else { return Vec::new() };
    let cb_ids = counterbore_ids(config);
    extract_holes(config)
        .iter()
        .filter(|h| !is_central_bore(h, &outer) && !cb_ids.contains(&h.id))
        .filter_map(|h| {
            let min_dist = c.hole_edge_factor * h.diameter();
            let dist = dist_2d(h.x, h.y, outer.x, outer.y);
            let edge_dist = outer.radius - dist - h.radius;
            if edge_dist >= 0.0 && edge_dist < min_dist {
                Some(
                    DfmCheck::new(
                        "DFM-02",
                        Severity::Error,
                        format!(
                            "Hole '{}' edge distance {edge_dist:.1}mm < required {min_dist:.1}mm ({}x dia {:.1}mm)",
                            h.id, c.hole_edge_factor, h.diameter()
                        ),
                    )
                    .feature(&h.id)
                    .recommend(format!("Move hole at least {min_dist:.1}mm from edge")),
                )
            } else {
                None
            }
        })
        .collect()
}

/// DFM-03: hole-to-hole spacing, skipping counterbores, coaxial pairs, and
/// any pair touching the central bore.
fn check_hole_spacing(config: &Config, c: &ProcessConstraints) -> Vec<DfmCheck> {
    let outer = outer_body(config);
    let cb_ids = counterbore_ids(config);
    let holes = extract_holes(config);
    let mut out = Vec::new();
    for i in 0..holes.len() {
        if cb_ids.contains(&holes[i].id) {
            continue;
        }
        for j in (i + 1)..holes.len() {
            if cb_ids.contains(&holes[j].id) {
                continue;
            }
            let (h1, h2) = (&holes[i], &holes[j]);
            if dist_2d(h1.x, h1.y, h2.x, h2.y) < 0.1 {
                continue;
            }
            if let Some(outer) = &outer {
                if is_central_bore(h1, outer) || is_central_bore(h2, outer) {
                    continue;
                }
            }
            let center_dist = dist_2d(h1.x, h1.y, h2.x, h2.y);
            let edge_gap = center_dist - h1.radius - h2.radius;
            let ref_dia = h1.diameter().min(h2.diameter());
            let min_spacing = c.hole_spacing_factor * ref_dia;
            if edge_gap >= 0.0 && edge_gap < min_spacing {
                out.push(
                    DfmCheck::new(
                        "DFM-03",
                        Severity::Warning,
                        format!(
                            "Hole spacing {edge_gap:.1}mm between '{}' and '{}' < recommended {min_spacing:.1}mm ({}x dia {ref_dia:.1}mm)",
                            h1.id, h2.id, c.hole_spacing_factor
                        ),
                    )
                    .feature(format!("{},{}", h1.id, h2.id))
                    .recommend(format!("Increase spacing to >= {min_spacing:.1}mm")),
                );
            }
        }
    }
    out
}

/// DFM-04: internal corners left unbroken when cuts exist.
fn check_fillet_chamfer(config: &Config) -> Vec<DfmCheck> {
    let has_cuts = config.operations.iter().any(|op| matches!(op, Operation::Cut { .. }));
    let has_fillet = config.operations.iter().any(|op| matches!(op, Operation::Fillet { .. }));
    let has_chamfer = config.operations.iter().any(|op| matches!(op, Operation::Chamfer { .. }));

    if has_cuts && !has_fillet && !has_chamfer {
        vec![DfmCheck::new(
            "DFM-04",
            Severity::Warning,
            "No fillet or chamfer operations found — internal corners may cause stress concentration".to_string(),
        )
        .recommend("Add fillet (R >= 0.5mm) or chamfer to internal corners")]
    } else if has_cuts && !has_fillet {
        vec![DfmCheck::new("DFM-04", Severity::Info, "Chamfer present but no fillet — consider fillets for stress-critical corners".to_string())
            .recommend("Fillets distribute stress better than chamfers at internal corners")]
    } else {
        Vec::new()
    }
}

/// DFM-05: drill depth-to-diameter ratio.
fn check_drill_ratio(config: &Config, c: &ProcessConstraints) -> Vec<DfmCheck> {
    extract_holes(config)
        .iter()
        .filter(|h| h.diameter() > 0.0)
        .filter_map(|h| {
            let ratio = h.height / h.diameter();
            if ratio > c.max_drill_ratio {
                Some(
                    DfmCheck::new(
                        "DFM-05",
                        Severity::Warning,
                        format!(
                            "Drill ratio {ratio:.1}:1 for '{}' exceeds max {:.0}:1 (depth={:.1}mm, dia={:.1}mm)",
                            h.id, c.max_drill_ratio, h.height, h.diameter()
                        ),
                    )
                    .feature(&h.id)
                    .recommend(format!("Reduce depth or increase diameter to achieve <= {:.0}:1 ratio", c.max_drill_ratio)),
                )
            } else {
                None
            }
        })
        .collect()
}

/// DFM-06: coaxial cut-cylinder step-downs — a deliberate counterbore is
/// downgraded to `info`, anything else is a potential undercut. A coaxial
/// group of three or more step-downs escalates to `error` regardless of
/// the pairwise counterbore/undercut classification, since a deep stack of
/// internal steps is a tooling-access risk on its own.
fn check_undercut(config: &Config) -> Vec<DfmCheck> {
    let cut_tools = cut_tool_ids(config);
    let cyls = cut_cylinders(config, &cut_tools);
    let mut out = Vec::new();
    for i in 0..cyls.len() {
        for j in (i + 1)..cyls.len() {
            let (s1, r1, h1) = &cyls[i];
            let (s2, r2, h2) = &cyls[j];
            let p1 = s1.position();
            let p2 = s2.position();
            if dist_2d(p1[0], p1[1], p2[0], p2[1]) >= 0.1 || (r1 - r2).abs() < f64::EPSILON {
                continue;
            }
            let (larger, larger_r, smaller, smaller_r) = if r1 > r2 { (s1, *r1, s2, *r2) } else { (s2, *r2, s1, *r1) };
            let larger_h = if r1 > r2 { *h1 } else { *h2 };
            let smaller_h = if r1 > r2 { *h2 } else { *h1 };
            let is_counterbore = larger_h < smaller_h;
            let severity = if is_counterbore { Severity::Info } else { Severity::Warning };
            let prefix = if is_counterbore { "Counterbore" } else { "Potential undercut" };
            let recommend = if is_counterbore {
                "Counterbore depth and clearance are adequate"
            } else {
                "Verify tool access for internal step — consider through-hole or relief groove"
            };
            out.push(
                DfmCheck::new(
                    "DFM-06",
                    severity,
                    format!("{prefix}: coaxial holes '{}' (R={larger_r}mm) and '{}' (R={smaller_r}mm) form internal step", larger.id(), smaller.id()),
                )
                .feature(format!("{},{}", larger.id(), smaller.id()))
                .recommend(recommend),
            );
        }
    }
    out.extend(check_coaxial_stacks(&cyls));
    out
}

/// Groups cut cylinders by shared XY axis (within 0.1mm) and emits one
/// `DFM-06` error per group that has three or more coaxial step-downs.
fn check_coaxial_stacks(cyls: &[(&Shape, f64, f64)]) -> Vec<DfmCheck> {
    let mut visited = vec![false; cyls.len()];
    let mut out = Vec::new();

    for i in 0..cyls.len() {
        if visited[i] {
            continue;
        }
        let pi = cyls[i].0.position();
        let mut group = vec![i];
        for j in (i + 1)..cyls.len() {
            if visited[j] {
                continue;
            }
            let pj = cyls[j].0.position();
            if dist_2d(pi[0], pi[1], pj[0], pj[1]) < 0.1 {
                group.push(j);
            }
        }
        for &idx in &group {
            visited[idx] = true;
        }

        if group.len() < 3 {
            continue;
        }

        let mut ids: Vec<&str> = group.iter().map(|&idx| cyls[idx].0.id()).collect();
        ids.sort_unstable();
        out.push(
            DfmCheck::new(
                "DFM-06",
                Severity::Error,
                format!("{} coaxial step-downs stacked on one axis: {}", group.len(), ids.join(", ")),
            )
            .feature(ids.join(","))
            .recommend("Reduce the number of coaxial diameter steps or split into separate features with tool-accessible relief"),
        );
    }

    out
}

/// A cut op whose base/result id contains "slot" and two intersecting cut
/// boxes forming a narrow inner channel — flagged as a T-slot undercut.
fn check_t_slot(config: &Config) -> Vec<DfmCheck> {
    let cut_tools = cut_tool_ids(config);
    let boxes: Vec<(&Shape, [f64; 3])> = config
        .shapes
        .iter()
        .filter(|s| cut_tools.contains(s.id()))
        .filter_map(|s| match s.kind {
            ShapeKind::Box { size } => Some((s, size)),
            _ => None,
        })
        .collect();
    let mut out = Vec::new();
    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            let (s1, size1) = boxes[i];
            let (s2, size2) = boxes[j];
            if !(s1.id().to_ascii_lowercase().contains("slot") || s2.id().to_ascii_lowercase().contains("slot")) {
                continue;
            }
            let p1 = s1.position();
            let p2 = s2.position();
            if dist_2d(p1[0], p1[1], p2[0], p2[1]) > (size1[0].max(size1[1]) + size2[0].max(size2[1])) {
                continue;
            }
            let narrow = size1[1].min(size2[1]);
            if narrow < 3.0 {
                out.push(
                    DfmCheck::new("DFM-06", Severity::Warning, format!("T-slot: narrow inner channel {narrow:.1}mm between '{}' and '{}'", s1.id(), s2.id()))
                        .feature("t_slot")
                        .recommend("Widen inner channel or verify tool reach for T-slot cutter"),
                );
            }
        }
    }
    out
}

fn fillet_chamfer_sizes(config: &Config) -> Vec<(&'static str, String, f64)> {
    config
        .operations
        .iter()
        .filter_map(|op| match op {
            Operation::Fillet { target, radius: Some(r), .. } => Some(("fillet", target.clone(), *r)),
            Operation::Chamfer { target, size: Some(s), .. } => Some(("chamfer", target.clone(), *s)),
            _ => None,
        })
        .collect()
}

/// DFM-07: hole diameter below the smallest drill the shop stocks.
fn check_min_hole_diameter(config: &Config, profile: &ShopProfile) -> Vec<DfmCheck> {
    let Some(min_dia) = profile.min_hole_diameter_mm else { return Vec::new() };
    extract_holes(config)
        .iter()
        .filter(|h| h.diameter() > 0.0 && h.diameter() < min_dia)
        .map(|h| {
            DfmCheck::new("DFM-07", Severity::Warning, format!("Hole '{}' diameter {:.1}mm below smallest available drill {min_dia:.1}mm", h.id, h.diameter()))
                .feature(&h.id)
                .recommend(format!("Use a hole diameter >= {min_dia:.1}mm or request a special tool"))
        })
        .collect()
}

/// DFM-08: hole depth beyond the shop's maximum tool reach.
fn check_max_tool_reach(config: &Config, profile: &ShopProfile) -> Vec<DfmCheck> {
    let Some(max_reach) = profile.max_tool_reach_mm else { return Vec::new() };
    extract_holes(config)
        .iter()
        .filter(|h| h.height > max_reach)
        .map(|h| {
            DfmCheck::new("DFM-08", Severity::Warning, format!("Hole '{}' depth {:.1}mm exceeds max tool reach {max_reach:.1}mm", h.id, h.height))
                .feature(&h.id)
                .recommend("Reduce depth or split into a stepped drill operation")
        })
        .collect()
}

/// DFM-09: fillet/chamfer size below the shop's minimum tool radius.
fn check_min_internal_radius(config: &Config, profile: &ShopProfile) -> Vec<DfmCheck> {
    let Some(min_r) = profile.min_internal_radius_mm else { return Vec::new() };
    fillet_chamfer_sizes(config)
        .into_iter()
        .filter(|(_, _, size)| *size < min_r)
        .map(|(kind, target, size)| {
            DfmCheck::new("DFM-09", Severity::Warning, format!("{kind} of {size:.2}mm on '{target}' is below the shop's minimum internal radius {min_r:.2}mm"))
                .feature(target)
                .recommend(format!("Increase {kind} to >= {min_r:.2}mm or confirm with the shop"))
        })
        .collect()
}

/// Runs every DFM check over `config`, against the constraints implied by
/// `manufacturing.process` (default `machining`), `manufacturing.material`,
/// and `manufacturing.min_wall_override` if set; `shop_profile` supplies the
/// optional DFM-07/08/09 tool-constraint thresholds.
pub fn run_checks(config: &Config, shop_profile: &ShopProfile) -> DfmReport {
    let process = config.manufacturing.process.clone().unwrap_or_else(|| "machining".to_string());
    let material = config.manufacturing.material.clone().unwrap_or_else(|| "unknown".to_string());
    let mut constraints = constraints_for(&process);
    if let Some(ov) = config.manufacturing.min_wall_override {
        if ov > 0.0 {
            constraints.min_wall = ov;
        }
    }

    let mut checks = Vec::new();
    checks.extend(check_wall_thickness(config, &constraints));
    checks.extend(check_hole_edge_distance(config, &constraints));
    checks.extend(check_hole_spacing(config, &constraints));
    checks.extend(check_fillet_chamfer(config));
    checks.extend(check_drill_ratio(config, &constraints));
    checks.extend(check_undercut(config));
    checks.extend(check_t_slot(config));
    checks.extend(check_min_hole_diameter(config, shop_profile));
    checks.extend(check_max_tool_reach(config, shop_profile));
    checks.extend(check_min_internal_radius(config, shop_profile));

    let errors = checks.iter().filter(|c| c.severity == Severity::Error).count();
    let warnings = checks.iter().filter(|c| c.severity == Severity::Warning).count();
    let info = checks.iter().filter(|c| c.severity == Severity::Info).count();
    let score = (100 - 15 * errors as i64 - 5 * warnings as i64).max(0);

    DfmReport {
        success: true,
        process,
        material,
        summary: DfmSummary { errors, warnings, info, total: checks.len() },
        checks,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::Config;

    fn disc_with_hole(hole_x: f64, hole_r: f64) -> Config {
        let toml_src = format!(
            r#"
            [[shapes]]
            id = "disc"
            type = "cylinder"
            radius = 100
            height = 10

            [[shapes]]
            id = "h1"
            type = "cylinder"
            radius = {hole_r}
            height = 10
            position = [{hole_x}, 0, 0]

            [[operations]]
            type = "cut"
            base = "disc"
            tool = "h1"
            result = "disc"
            "#
        );
        Config::parse(&toml_src).unwrap()
    }

    #[test]
    fn thin_wall_is_an_error() {
        let config = disc_with_hole(94.5, 5.0);
        let report = run_checks(&config, &ShopProfile::default());
        assert!(report.checks.iter().any(|c| c.code == "DFM-01" && c.severity == Severity::Error));
    }

    #[test]
    fn bolt_circle_hole_near_edge_triggers_edge_check() {
        let config = disc_with_hole(92.0, 5.0);
        let report = run_checks(&config, &ShopProfile::default());
        assert!(report.checks.iter().any(|c| c.code == "DFM-02"));
    }

    #[test]
    fn deep_drill_triggers_ratio_warning() {
        let toml_src = r#"
            [[shapes]]
            id = "disc"
            type = "cylinder"
            radius = 100
            height = 60

            [[shapes]]
            id = "h1"
            type = "cylinder"
            radius = 2.5
            height = 60
            position = [0, 0, 0]

            [[operations]]
            type = "cut"
            base = "disc"
            tool = "h1"
            result = "disc"
        "#;
        let config = Config::parse(toml_src).unwrap();
        let report = run_checks(&config, &ShopProfile::default());
        assert!(report.checks.iter().any(|c| c.code == "DFM-05"));
    }

    #[test]
    fn missing_fillet_or_chamfer_is_a_warning() {
        let config = disc_with_hole(0.0, 5.0);
        let report = run_checks(&config, &ShopProfile::default());
        assert!(report.checks.iter().any(|c| c.code == "DFM-04" && c.severity == Severity::Warning));
    }

    #[test]
    fn score_deducts_per_severity() {
        let config = disc_with_hole(94.5, 5.0);
        let report = run_checks(&config, &ShopProfile::default());
        let expected = 100 - 15 * report.summary.errors as i64 - 5 * report.summary.warnings as i64;
        assert_eq!(report.score, expected.max(0));
    }

    #[test]
    fn shop_profile_flags_undersized_fillet() {
        let toml_src = r#"
            [[shapes]]
            id = "disc"
            type = "cylinder"
            radius = 100
            height = 20

            [[shapes]]
            id = "h1"
            type = "cylinder"
            radius = 5
            height = 20
            position = [50, 0, -2]

            [[operations]]
            type = "cut"
            base = "disc"
            tool = "h1"
            result = "disc"

            [[operations]]
            type = "fillet"
            target = "disc"
            radius = 0.2
            result = "disc_f"
        "#;
        let config = Config::parse(toml_src).unwrap();
        let profile = ShopProfile { min_internal_radius_mm: Some(1.0), ..Default::default() };
        let report = run_checks(&config, &profile);
        assert!(report.checks.iter().any(|c| c.code == "DFM-09"));
    }

    #[test]
    fn two_coaxial_steps_stay_below_error() {
        let toml_src = r#"
            [[shapes]]
            id = "disc"
            type = "cylinder"
            radius = 100
            height = 20

            [[shapes]]
            id = "h1"
            type = "cylinder"
            radius = 10
            height = 8
            position = [0, 0, -2]

            [[shapes]]
            id = "h2"
            type = "cylinder"
            radius = 6
            height = 20
            position = [0, 0, 0]

            [[operations]]
            type = "cut"
            base = "disc"
            tool = "h1"
            result = "disc"

            [[operations]]
            type = "cut"
            base = "disc"
            tool = "h2"
            result = "disc"
        "#;
        let config = Config::parse(toml_src).unwrap();
        let report = run_checks(&config, &ShopProfile::default());
        assert!(!report.checks.iter().any(|c| c.code == "DFM-06" && c.severity == Severity::Error));
        assert!(report.checks.iter().any(|c| c.code == "DFM-06"));
    }

    #[test]
    fn three_coaxial_step_downs_is_an_error() {
        let toml_src = r#"
            [[shapes]]
            id = "disc"
            type = "cylinder"
            radius = 100
            height = 30

            [[shapes]]
            id = "h1"
            type = "cylinder"
            radius = 12
            height = 8
            position = [0, 0, -2]

            [[shapes]]
            id = "h2"
            type = "cylinder"
            radius = 9
            height = 16
            position = [0, 0, -2]

            [[shapes]]
            id = "h3"
            type = "cylinder"
            radius = 6
            height = 30
            position = [0, 0, 0]

            [[operations]]
            type = "cut"
            base = "disc"
            tool = "h1"
            result = "disc"

            [[operations]]
            type = "cut"
            base = "disc"
            tool = "h2"
            result = "disc"

            [[operations]]
            type = "cut"
            base = "disc"
            tool = "h3"
            result = "disc"
        "#;
        let config = Config::parse(toml_src).unwrap();
        let report = run_checks(&config, &ShopProfile::default());
        assert!(report.checks.iter().any(|c| c.code == "DFM-06" && c.severity == Severity::Error));
    }
}
