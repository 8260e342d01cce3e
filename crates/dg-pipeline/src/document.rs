//! Assembles the fixed-layout A3 page: hatch defs, border, the four view
//! cells with their edge geometry and dimensioning, GD&T frames, surface
//! finish, general notes, revision table, title block and BOM.

use dg_core::config::Config;
use dg_core::svg::Node;
use dg_core::viewcell::{title_block_zone, View, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use dg_core::BBox;
use dg_dimension::chain::{render_chain_dimensions, ChainTolerances, Stacks};
use dg_dimension::plan::render_plan_dimensions;
use dg_dimension::{baseline, Arc, Circle, DedupeState, DimStyleConfig, DimensionTelemetry};
use dg_layout::AnnotationPlanner;
use dg_model::{DrawingPlan, FeatureGraph, FeatureKind};
use dg_render::gdt::{assign_tolerances, render_fcf, select_datums, GdtAssignment};
use dg_render::notes::{build_category_notes, render_general_notes};
use dg_render::revision::{newest_first, render_revision_table, RevisionEntry};
use dg_render::surface_finish::render_default_symbol;
use dg_render::titleblock::{extract_bom, render as render_title_block, render_bom};
use dg_render::view::{auto_scale, projection_symbol, render_view, view_transform, Edge, ViewGeometry};
use std::collections::HashMap;

const VIEW_MARGIN_MM: f64 = 12.0;
const GDT_ROW_W_MM: f64 = 28.0;
const GDT_ROW_H_MM: f64 = 5.5;
const BOM_MAX_ROWS: usize = 4;

/// Caller-supplied facts the document assembler can't derive from the
/// compiled plan or feature graph alone.
pub struct DocumentOptions {
    pub plan_dimensions: bool,
    pub part_name: String,
    pub standard: String,
    pub tolerance_grade: String,
    pub surface_finish_ra: f64,
    pub revisions: Vec<RevisionEntry>,
}

fn raw_str(config: &Config, key: &str) -> Option<String> {
    config.raw.as_table()?.get(key)?.as_str().map(str::to_string)
}

fn part_name_from(config: &Config, plan: &DrawingPlan) -> String {
    raw_str(config, "part_name").unwrap_or_else(|| plan.part_type.to_uppercase())
}

/// Pulls `[style]` overrides out of the plan, falling back to the engine's
/// defaults for anything not present.
fn dim_style_from_plan(plan: &DrawingPlan) -> DimStyleConfig {
    let mut style = DimStyleConfig::default();
    let get = |k: &str| plan.style.get(k).and_then(toml::Value::as_float);
    if let Some(v) = get("dim_gap") {
        style.dim_gap = v;
    }
    if let Some(v) = get("dim_offset") {
        style.dim_offset = v;
    }
    if let Some(v) = get("dim_ext_overshoot") {
        style.dim_ext_overshoot = v;
    }
    if let Some(v) = get("feat_dim_stack") {
        style.feat_dim_stack = v;
    }
    style
}

fn circles_and_arcs(geom: &ViewGeometry) -> (Vec<Circle>, Vec<Arc>) {
    let mut circles = Vec::new();
    for edges in geom.groups.values() {
        for e in edges {
            if let Edge::Circle { cu, cv, r } = e {
                circles.push(Circle { cu: *cu, cv: *cv, cr: *r });
            }
        }
    }
    let arcs = geom.arcs.iter().map(|a| Arc { cu: a.cu, cv: a.cv, r: a.r, mu: a.mu, mv: a.mv, group: a.group }).collect();
    (circles, arcs)
}

fn hatch_defs() -> Node {
    let mut defs = Node::new("defs");
    let mut pattern = Node::new("pattern")
        .with_attr("id", "section-hatch")
        .with_attr("patternUnits", "userSpaceOnUse")
        .with_attr("width", "2")
        .with_attr("height", "2")
        .with_attr("patternTransform", "rotate(45)");
    pattern.push_child(
        Node::new("line").with_attr("x1", "0").with_attr("y1", "0").with_attr("x2", "0").with_attr("y2", "2").with_attr("stroke", "#000").with_attr("stroke-width", "0.2"),
    );
    defs.push_child(pattern);
    defs
}

fn view_label(view: View) -> &'static str {
    match view {
        View::Front => "FRONT VIEW",
        View::Top => "TOP VIEW",
        View::Right => "RIGHT VIEW",
        View::Iso => "ISOMETRIC",
    }
}

fn cell_frame(view: View) -> Node {
    let cell = view.cell();
    let mut g = Node::new("g").with_attr("class", format!("cell-frame-{}", view.name()));
    g.push_child(
        Node::new("rect")
            .with_attr("x", format!("{:.2}", cell.x_min))
            .with_attr("y", format!("{:.2}", cell.y_min))
            .with_attr("width", format!("{:.2}", cell.width()))
            .with_attr("height", format!("{:.2}", cell.height()))
            .with_attr("fill", "none")
            .with_attr("stroke", "#000")
            .with_attr("stroke-width", "0.25"),
    );
    g.push_child(
        Node::new("text")
            .with_attr("x", format!("{:.2}", cell.x_min + 2.0))
            .with_attr("y", format!("{:.2}", cell.y_min + 4.0))
            .with_attr("font-size", "3.0")
            .with_attr("fill", "#000")
            .with_text(view_label(view)),
    );
    g
}

/// GD&T frames are conventionally hung off the view that best shows the
/// datum structure; we anchor them all in the front cell, stacked top to
/// bottom, rather than exactly over their (often hidden-group) targets.
fn render_gdt_frames(assignments: &[GdtAssignment]) -> Node {
    let cell = View::Front.cell();
    let mut planner = AnnotationPlanner::new();
    let mut g = Node::new("g").with_attr("class", "gdt-frames");
    let mut y = cell.y_min + 6.0;
    for assignment in assignments {
        let row_w = GDT_ROW_W_MM.min(cell.width() - 4.0);
        let candidates = [(cell.x_min + 2.0, y)];
        let placed = planner.register_and_pick(&candidates, row_w, GDT_ROW_H_MM).map(|b| (b.x_min, b.y_min)).unwrap_or((cell.x_min + 2.0, y));
        let mut frame = render_fcf(assignment, placed.0, placed.1);
        frame.set_attr("class", format!("gdt-{}", assignment.feature_id));
        g.push_child(frame);
        y += GDT_ROW_H_MM + 1.0;
    }
    g
}

fn part_dims_from_plan(plan: &DrawingPlan) -> (f64, f64, f64) {
    let lookup = |id: &str| plan.dim_intents.iter().find(|d| d.feature == id).and_then(|d| d.value_mm);
    let x = lookup("WIDTH").or_else(|| lookup("OD")).or_else(|| lookup("OD1")).unwrap_or(100.0);
    let y = lookup("HEIGHT").or_else(|| lookup("OD")).or_else(|| lookup("PCD")).unwrap_or(x);
    let z = lookup("DEPTH").or_else(|| lookup("THK")).or_else(|| lookup("TOTAL_LENGTH")).or_else(|| lookup("WALL_THK")).unwrap_or(20.0);
    (x, y, z)
}

/// Assembles the full `<svg>` document for one compiled plan. Returns the
/// root node plus the dimensioning telemetry accumulated across all views
/// (the caller folds conflicts/unresolved-review counts into warnings).
pub fn assemble(
    config: &Config,
    plan: &DrawingPlan,
    graph: &FeatureGraph,
    geometry: &HashMap<String, ViewGeometry>,
    options: &DocumentOptions,
) -> (Node, DimensionTelemetry, Vec<String>) {
    let mut root = Node::new("svg")
        .with_attr("xmlns", "http://www.w3.org/2000/svg")
        .with_attr("width", "420mm")
        .with_attr("height", "297mm")
        .with_attr("viewBox", format!("0 0 {} {}", PAGE_WIDTH_MM, PAGE_HEIGHT_MM));

    root.push_child(hatch_defs());
    root.push_child(
        Node::new("rect")
            .with_attr("x", "0")
            .with_attr("y", "0")
            .with_attr("width", format!("{}", PAGE_WIDTH_MM))
            .with_attr("height", format!("{}", PAGE_HEIGHT_MM))
            .with_attr("fill", "none")
            .with_attr("stroke", "#000")
            .with_attr("stroke-width", "0.5"),
    );

    let mut warnings = Vec::new();
    let mut telemetry = DimensionTelemetry::default();
    let mut dedupe = DedupeState::new(plan.dimensioning.dedupe_policy != "off", plan.dimensioning.tol_mm);
    let style = dim_style_from_plan(plan);
    let tolerances = ChainTolerances::default();
    let strategy = baseline::select_dimension_strategy(graph);

    let mut front_vt = None;

    for view in View::all() {
        root.push_child(cell_frame(view));
        if !plan.views.enabled.iter().any(|v| v == view.name()) {
            continue;
        }
        let Some(geom) = geometry.get(view.name()) else {
            warnings.push(format!("no kernel geometry supplied for enabled view '{}'", view.name()));
            continue;
        };

        let scale = auto_scale(geom.bounds, view.cell(), VIEW_MARGIN_MM, plan.scale.min, plan.scale.max);
        let vt = view_transform(view, geom.bounds, scale);
        let iso_simplify = true;
        root.push_child(render_view(view, geom, &vt, iso_simplify));
        if view == View::Front {
            front_vt = Some(vt);
        }

        let (circles, arcs) = circles_and_arcs(geom);
        let mut dims = Node::new("g").with_attr("class", format!("dimensions-{}", view.name()));
        let stacks = if view == View::Front && strategy != "chain" {
            let features: Vec<baseline::BaselineFeature> = graph
                .by_type(FeatureKind::Hole)
                .into_iter()
                .chain(graph.by_type(FeatureKind::Bore))
                .map(|f| baseline::BaselineFeature { position: (f.position[0], f.position[1]), label: f.id.clone(), tolerance: String::new() })
                .collect();
            let nodes = if strategy == "ordinate" {
                baseline::render_ordinate_dimensions(&features, (0.0, 0.0), baseline::Axis::Horizontal, &vt)
            } else {
                baseline::render_baseline_dimensions(&features, (0.0, 0.0), baseline::Axis::Horizontal, &vt, None)
            };
            for n in nodes {
                dims.push_child(n);
            }
            Stacks::default()
        } else {
            let (nodes, stacks) = render_chain_dimensions(view.name(), &vt, &circles, &arcs, &tolerances, &style, view.cell(), &mut telemetry, &mut dedupe);
            for n in nodes {
                dims.push_child(n);
            }
            stacks
        };
        root.push_child(dims);

        if options.plan_dimensions {
            let (nodes, _) = render_plan_dimensions(&plan.dim_intents, view.name(), &vt, &circles, view.cell(), stacks, &style, &plan.dimensioning.dedupe_policy, plan.dimensioning.tol_mm, &mut telemetry);
            if !nodes.is_empty() {
                let mut plan_g = Node::new("g").with_attr("class", format!("plan-dimensions-{}", view.name()));
                for n in nodes {
                    plan_g.push_child(n);
                }
                root.push_child(plan_g);
            }
        }
    }

    let part_dims = part_dims_from_plan(plan);
    let datums = select_datums(part_dims, graph);
    let assignments = assign_tolerances(graph, &datums);
    root.push_child(render_gdt_frames(&assignments));

    if let Ok(symbol) = render_default_symbol(options.surface_finish_ra, config.manufacturing.process.as_deref(), PAGE_WIDTH_MM - 40.0, title_block_zone().y_min - 4.0) {
        root.push_child(symbol);
    }

    let notes = build_category_notes(config, &options.standard, &options.tolerance_grade);
    root.push_child(render_general_notes(&notes, 5.0, 236.0));

    if !options.revisions.is_empty() {
        root.push_child(render_revision_table(&newest_first(&options.revisions), PAGE_WIDTH_MM - 90.0, 200.0));
    }

    let bounds = front_vt.map(|vt| vt.bounds).unwrap_or_else(|| BBox::new(0.0, 0.0, part_dims.0, part_dims.1));
    let scale_for_block = front_vt.map(|vt| vt.scale).unwrap_or(1.0);
    root.push_child(render_title_block(&part_name_from(config, plan), scale_for_block, &bounds));

    if config.is_assembly {
        let rows = extract_bom(config);
        let shown: Vec<_> = rows.into_iter().take(BOM_MAX_ROWS).collect();
        root.push_child(render_bom(&shown, 160.0, title_block_zone().y_min + 10.0));
    }

    root.push_child(projection_symbol(PAGE_WIDTH_MM - 15.0, title_block_zone().y_min - 4.0));

    (root, telemetry, warnings)
}
