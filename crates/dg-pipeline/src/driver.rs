//! Orchestrates the whole closed loop: compile the plan, assemble the
//! drawing, post-process it, score it, repair it when the score or a hard
//! gate demands it, and re-run post-process/score after repair. The DFM
//! analyzer runs independently of the render/QA loop, over the same
//! compiled plan and feature graph.

use std::collections::HashMap;

use dg_core::config::Config;
use dg_core::svg::Node;
use dg_dfm::{run_checks, DfmReport, ShopProfile};
use dg_model::{compile_plan, DrawingPlan, FeatureGraph, TemplateStore};
use dg_qa::{is_hard_fail, postprocess, rebuild_notes, repair_overflow, repair_text_overlaps, score, NotesRepair, OverflowReport, PostProcessReport, QaReport, TextOverlapReport};
use dg_render::revision::RevisionEntry;
use dg_render::view::ViewGeometry;

use crate::document::{self, DocumentOptions};
use crate::error::{PipelineError, Result};

/// Inputs the driver can't derive from the config alone: kernel-projected
/// view geometry, and the caller-supplied facts `DocumentOptions` needs.
pub struct RunOptions {
    pub plan_dimensions: bool,
    pub part_name: Option<String>,
    pub standard: String,
    pub tolerance_grade: String,
    pub surface_finish_ra: f64,
    pub revisions: Vec<RevisionEntry>,
    pub shop_profile: ShopProfile,
    /// Repair is attempted only when the QA score is below this or a hard
    /// gate metric (overflow, notes overflow) is non-zero. `None` always
    /// attempts repair when a hard gate fails, regardless of score.
    pub fail_under: Option<u32>,
    /// Skip post-processing, repair, and DFM entirely; return the raw
    /// assembled SVG and telemetry only.
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            plan_dimensions: true,
            part_name: None,
            standard: "KS".to_string(),
            tolerance_grade: "m".to_string(),
            surface_finish_ra: 3.2,
            revisions: Vec::new(),
            shop_profile: ShopProfile::default(),
            fail_under: None,
            dry_run: false,
        }
    }
}

/// A single repair pass's result, folded into `RepairLog` in application
/// order (`rebuild_notes`, then `repair_text_overlaps`, then
/// `repair_overflow`, matching the source's last-resort ordering).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RepairLog {
    pub notes: Option<NotesRepair>,
    pub text_overlaps: Option<TextOverlapReport>,
    pub overflow: Option<OverflowReport>,
}

pub struct PipelineOutcome {
    pub svg: String,
    pub plan: DrawingPlan,
    pub graph: FeatureGraph,
    pub postprocess: PostProcessReport,
    pub qa_before_repair: QaReport,
    pub qa: QaReport,
    pub repair: Option<RepairLog>,
    pub dfm: DfmReport,
    pub warnings: Vec<String>,
}

/// Runs the full pipeline over an already-parsed config: D→B→E produce
/// the enriched plan, H assembles the SVG, I/J/K close the repair loop,
/// L runs independently over the same plan/graph.
pub fn run(config: &Config, templates: &TemplateStore, geometry: &HashMap<String, ViewGeometry>, options: &RunOptions) -> Result<PipelineOutcome> {
    let (plan, graph, validation_warnings) = compile_plan(config, templates)?;
    tracing::info!(stage = "compile_plan", part_type = %plan.part_type, warnings = validation_warnings.len(), "plan compiled");
    let mut warnings: Vec<String> = validation_warnings.iter().map(|w| format!("{:?}: {}", w.code, w.message)).collect();

    let doc_options = DocumentOptions {
        plan_dimensions: options.plan_dimensions,
        part_name: options.part_name.clone().unwrap_or_else(|| plan.part_type.to_uppercase()),
        standard: options.standard.clone(),
        tolerance_grade: options.tolerance_grade.clone(),
        surface_finish_ra: options.surface_finish_ra,
        revisions: options.revisions.clone(),
    };

    let (mut root, telemetry, doc_warnings) = document::assemble(config, &plan, &graph, geometry, &doc_options);
    tracing::info!(stage = "assemble", conflicts = telemetry.conflicts.len(), "drawing assembled");
    warnings.extend(doc_warnings);
    warnings.extend(telemetry.conflicts.iter().map(|c| format!("dimension conflict in {} ({}): {}", c.view, c.category, c.reason)));
    warnings.extend(plan.dim_intents.iter().filter(|d| d.review).map(|d| format!("dimension '{}' has no value and is flagged for review", d.id)));

    let dfm = run_checks(config, &options.shop_profile);
    tracing::info!(stage = "dfm", errors = dfm.summary.errors, warnings = dfm.summary.warnings, score = dfm.score, "dfm analysis complete");

    if options.dry_run {
        return Ok(PipelineOutcome {
            svg: root.serialize(),
            plan,
            graph,
            postprocess: PostProcessReport::default(),
            qa_before_repair: QaReport::default(),
            qa: QaReport::default(),
            repair: None,
            dfm,
            warnings,
        });
    }

    let mut post_report = postprocess::run(&mut root);
    tracing::info!(stage = "postprocess", errors = post_report.errors.len(), "post-process complete");
    let qa_before = score::compute(&root);
    tracing::info!(stage = "score", score = qa_before.score, "qa scored");

    let needs_repair = is_hard_fail(&qa_before.metrics) || options.fail_under.map(|floor| (qa_before.score as i64) < floor as i64).unwrap_or(false);

    let (qa_final, repair_log) = if needs_repair {
        tracing::info!(stage = "repair", score_before = qa_before.score, "repair triggered");
        let log = run_repairs(&mut root, config, &options.standard, &options.tolerance_grade);
        post_report = postprocess::run(&mut root);
        let after = score::compute(&root);
        tracing::info!(stage = "score", score = after.score, "qa re-scored after repair");
        (after, Some(log))
    } else {
        (qa_before.clone(), None)
    };

    Ok(PipelineOutcome {
        svg: root.serialize(),
        plan,
        graph,
        postprocess: post_report,
        qa_before_repair: qa_before,
        qa: qa_final,
        repair: repair_log,
        dfm,
        warnings,
    })
}

/// Applies the three repair passes in the source's order (notes rebuild
/// first since it is the cheapest and most likely to clear
/// `notes_overflow`; text-overlap nudging next; overflow scaling last as
/// it is the most invasive).
fn run_repairs(root: &mut Node, config: &Config, standard: &str, grade: &str) -> RepairLog {
    let notes = rebuild_notes(root, config, standard, grade);
    let text_overlaps = repair_text_overlaps(root);
    let overflow = repair_overflow(root);
    RepairLog { notes: Some(notes), text_overlaps: Some(text_overlaps), overflow: Some(overflow) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLANGE_TEMPLATE: &str = r#"
        schema_version = "1"
        part_type = "flange"
        profile = "ks"

        [views]
        enabled = ["front", "top"]

        datums = ["A"]

        [[dim_intents]]
        id = "OD"
        feature = "OD"
        view = "front"
        style = "diameter"
        required = true

        [[dim_intents]]
        id = "ID"
        feature = "ID"
        view = "front"
        style = "diameter"
        required = true

        [[dim_intents]]
        id = "PCD"
        feature = "PCD"
        view = "front"
        style = "diameter"
        required = true

        [[dim_intents]]
        id = "BOLT_DIA"
        feature = "BOLT_DIA"
        view = "front"
        style = "diameter"
        required = true

        [[dim_intents]]
        id = "THK"
        feature = "THK"
        view = "top"
        style = "linear"
        required = true

        [notes]
        general = ["General tolerance per ISO 2768-m"]
    "#;

    const FLANGE_CONFIG: &str = r#"
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
    "#;

    fn empty_geometry() -> HashMap<String, ViewGeometry> {
        let mut map = HashMap::new();
        for name in ["front", "top", "right", "iso"] {
            map.insert(name.to_string(), ViewGeometry { bounds: dg_core::BBox::new(-60.0, -60.0, 60.0, 60.0), groups: Default::default(), arcs: Vec::new() });
        }
        map
    }

    #[test]
    fn runs_end_to_end_on_flange_config() {
        let config = Config::parse(FLANGE_CONFIG).unwrap();
        let mut store = TemplateStore::new();
        store.insert("flange", FLANGE_TEMPLATE).unwrap();
        let geometry = empty_geometry();

        let outcome = run(&config, &store, &geometry, &RunOptions::default()).unwrap();
        assert_eq!(outcome.plan.part_type, "flange");
        assert!(outcome.svg.starts_with("<svg") || outcome.svg.contains("<svg"));
        assert!(outcome.qa.score <= 100.0);
        assert!(outcome.dfm.summary.total >= 0);
    }

    #[test]
    fn dry_run_skips_qa_and_dfm_scoring() {
        let config = Config::parse(FLANGE_CONFIG).unwrap();
        let mut store = TemplateStore::new();
        store.insert("flange", FLANGE_TEMPLATE).unwrap();
        let geometry = empty_geometry();

        let mut opts = RunOptions::default();
        opts.dry_run = true;
        let outcome = run(&config, &store, &geometry, &opts).unwrap();
        assert_eq!(outcome.qa.score, 0.0);
        assert!(outcome.postprocess.rule_results.is_empty());
        // DFM still runs on dry-run since it is independent of the render/QA loop.
        assert_eq!(outcome.dfm.process, "machining");
    }
}
