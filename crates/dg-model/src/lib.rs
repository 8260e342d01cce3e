//! Feature graph inference, template store, drawing-plan compiler and
//! feature-value extraction: the layer between a parsed `dg_core::Config`
//! and a validated `DrawingPlan` ready for dimensioning and rendering.

pub mod error;
pub mod feature;
pub mod feature_value;
pub mod plan;
pub mod template;
pub mod validate;

pub use error::{ModelError, Result};
pub use feature::{Feature, FeatureGraph, FeatureKind, GroupPattern};
pub use feature_value::{extract_value, ExtractResult};
pub use plan::{Confidence, DimIntent, DimStyle, DrawingPlan, PlacementHint, Side};
pub use template::{classify, deep_merge, TemplateStore};
pub use validate::{validate_plan, ValidationCode, ValidationError};

/// Compiles a parsed configuration straight into a validated drawing plan:
/// classify the part type, deep-merge its template with any `[drawing]`
/// override table, resolve every dimension intent's value against the
/// feature graph, then validate the result.
pub fn compile_plan(config: &dg_core::Config, templates: &TemplateStore) -> Result<(DrawingPlan, FeatureGraph, Vec<ValidationError>)> {
    let graph = feature::infer(config)?;
    let part_type = classify(config);

    let base = templates.get(part_type).or_else(|_| templates.get("generic"))?;
    let merged = match config.drawing_table() {
        Some(t) => deep_merge(base, &toml::Value::Table(t.clone())),
        None => base.clone(),
    };

    let mut plan = DrawingPlan::from_value(&merged);
    if plan.part_type.is_empty() || plan.part_type == "generic" {
        plan.part_type = part_type.to_string();
    }

    for intent in &mut plan.dim_intents {
        if intent.value_mm.is_some() {
            continue;
        }
        let result = extract_value(&intent.feature, None, config, &graph);
        intent.value_mm = result.value_mm;
        intent.confidence = result.confidence;
        intent.source = result.source;
        intent.review = intent.value_mm.is_none() && intent.required;
        if intent.review {
            tracing::warn!(dim_id = %intent.id, part_type, "dimension intent could not be resolved, flagged for review");
        }
    }

    let warnings = validate::validate_plan(&plan, &config.raw)?;
    Ok((plan, graph, warnings))
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

    #[test]
    fn compiles_flange_plan_end_to_end() {
        let config = dg_core::Config::parse(FLANGE_CONFIG).unwrap();
        let mut store = TemplateStore::new();
        store.insert("flange", FLANGE_TEMPLATE).unwrap();

        let (plan, graph, warnings) = compile_plan(&config, &store).unwrap();
        assert_eq!(plan.part_type, "flange");
        assert_eq!(graph.groups().len(), 1);
        assert!(warnings.is_empty());

        let od = plan.dim_intents.iter().find(|d| d.id == "OD").unwrap();
        assert_eq!(od.value_mm, Some(120.0));
        assert!(!od.review);

        let pcd = plan.dim_intents.iter().find(|d| d.id == "PCD").unwrap();
        assert!((pcd.value_mm.unwrap() - 90.0).abs() < 0.2);
    }
}
