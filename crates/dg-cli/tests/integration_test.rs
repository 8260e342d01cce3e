//! Integration tests for the full drawing-generation pipeline, driven
//! through the same library crates the CLI calls into: TOML part config
//! → plan compilation → SVG assembly → QA scoring → DFM analysis.

use std::collections::HashMap;

use dg_core::config::Config;
use dg_core::BBox;
use dg_dfm::ShopProfile;
use dg_model::{classify, compile_plan, deep_merge, TemplateStore};
use dg_pipeline::{run, RunOptions};
use dg_render::view::ViewGeometry;

const FLANGE_TEMPLATE: &str = r#"
    schema_version = "1"
    part_type = "flange"
    profile = "ks"

    [views]
    enabled = ["front", "top"]

    datums = ["A"]

    [dimensioning]
    tol_mm = 0.1

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

const PRESET_TIGHT_TOLERANCE: &str = r#"
    [dimensioning]
    tol_mm = 0.02

    [[dim_intents]]
    id = "OD"
    priority = 5

    [[dim_intents]]
    id = "ID"
    priority = 5
"#;

fn empty_geometry() -> HashMap<String, ViewGeometry> {
    let mut map = HashMap::new();
    for name in ["front", "top", "right", "iso"] {
        map.insert(name.to_string(), ViewGeometry { bounds: BBox::new(-60.0, -60.0, 60.0, 60.0), groups: Default::default(), arcs: Vec::new() });
    }
    map
}

fn flange_store() -> TemplateStore {
    let mut store = TemplateStore::new();
    store.insert("flange", FLANGE_TEMPLATE).unwrap();
    store
}

/// Parses the flange config and verifies it classifies and compiles.
#[test]
fn test_config_classifies_and_compiles() {
    let config = Config::parse(FLANGE_CONFIG).unwrap();
    assert_eq!(classify(&config), "flange");

    let (plan, graph, warnings) = compile_plan(&config, &flange_store()).unwrap();
    assert_eq!(plan.part_type, "flange");
    assert_eq!(plan.dim_intents.len(), 5);
    assert!(!graph.groups().is_empty());
    assert!(warnings.is_empty(), "flange plan should resolve every required dimension: {warnings:?}");
}

/// Full pipeline: config + template store + empty geometry → SVG + QA + DFM.
#[test]
fn test_full_pipeline_flange() {
    let config = Config::parse(FLANGE_CONFIG).unwrap();
    let geometry = empty_geometry();

    let outcome = run(&config, &flange_store(), &geometry, &RunOptions::default()).unwrap();

    assert!(outcome.svg.contains("<svg"));
    assert!(outcome.svg.contains("</svg>"));
    assert!(outcome.qa.score >= 0.0 && outcome.qa.score <= 100.0);
    assert_eq!(outcome.dfm.process, "machining");
    assert_eq!(outcome.dfm.summary.total, outcome.dfm.checks.len());
}

/// A preset merged under `[drawing]` before parsing should tighten the
/// resolved tolerance and bump the priority of the two diameter intents,
/// the same deep-merge path the CLI's `load_config` exercises.
#[test]
fn test_preset_merge_tightens_tolerance() {
    let mut raw: toml::Value = toml::from_str(FLANGE_CONFIG).unwrap();
    let preset: toml::Value = toml::from_str(PRESET_TIGHT_TOLERANCE).unwrap();

    let table = raw.as_table_mut().unwrap();
    let existing_drawing = table.get("drawing").cloned().unwrap_or(toml::Value::Table(Default::default()));
    let merged_drawing = deep_merge(&existing_drawing, &preset);
    table.insert("drawing".to_string(), merged_drawing);

    let merged_src = toml::to_string(&raw).unwrap();
    let config = Config::parse(&merged_src).unwrap();

    let (plan, _graph, _warnings) = compile_plan(&config, &flange_store()).unwrap();
    assert_eq!(plan.dimensioning.tol_mm, 0.02);

    let od = plan.dim_intents.iter().find(|d| d.id == "OD").unwrap();
    assert_eq!(od.priority, 5);
}

/// Running with `--process` override reaches the DFM analyzer.
#[test]
fn test_manufacturing_process_override_reaches_dfm() {
    let mut raw: toml::Value = toml::from_str(FLANGE_CONFIG).unwrap();
    let table = raw.as_table_mut().unwrap();
    let mut manufacturing = toml::map::Map::new();
    manufacturing.insert("process".to_string(), toml::Value::String("casting".to_string()));
    table.insert("manufacturing".to_string(), toml::Value::Table(manufacturing));

    let merged_src = toml::to_string(&raw).unwrap();
    let config = Config::parse(&merged_src).unwrap();

    let report = dg_dfm::run_checks(&config, &ShopProfile::default());
    assert_eq!(report.process, "casting");
}

/// `--dry-run` should skip QA/postprocess/repair but still classify,
/// compile, assemble an SVG, and run DFM.
#[test]
fn test_dry_run_skips_scoring_but_assembles_svg() {
    let config = Config::parse(FLANGE_CONFIG).unwrap();
    let geometry = empty_geometry();

    let mut options = RunOptions::default();
    options.dry_run = true;
    let outcome = run(&config, &flange_store(), &geometry, &options).unwrap();

    assert!(outcome.svg.contains("<svg"));
    assert_eq!(outcome.qa.score, 0.0);
    assert!(outcome.repair.is_none());
    assert_eq!(outcome.dfm.process, "machining");
}
