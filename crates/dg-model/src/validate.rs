//! Plan validator: V1-V10 checks, distinguishing fatal from warning
//! severity via a method on one error type rather than several types.

use crate::plan::DrawingPlan;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use toml::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationCode {
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    V10,
}

impl ValidationCode {
    pub fn is_fatal(self) -> bool {
        !matches!(self, ValidationCode::V6 | ValidationCode::V8 | ValidationCode::V9)
    }
}

#[derive(Debug, Error, Clone)]
#[error("{code:?}: {message}")]
pub struct ValidationError {
    pub code: ValidationCode,
    pub message: String,
}

pub const SUPPORTED_SCHEMA_VERSIONS: &[&str] = &["1", "1.0"];
const VALID_VIEWS: &[&str] = &["top", "front", "right", "iso"];
const KNOWN_PART_TYPES: &[&str] = &["assembly", "shaft", "flange", "bracket", "housing", "bushing_plate", "generic"];

/// Top-level keys `dg_core::Config::from_value` recognizes.
const KNOWN_CONFIG_KEYS: &[&str] = &["shapes", "operations", "parts", "assembly", "manufacturing", "notes", "drawing"];
/// Keys `DrawingPlan::from_value` recognizes on the merged template+override table.
const KNOWN_DRAWING_KEYS: &[&str] = &["schema_version", "part_type", "profile", "views", "datums", "dimensioning", "dim_intents", "notes", "scale", "style"];

/// V9: scans the raw config document (and its nested `[drawing]` override
/// table, if present) for keys outside the known schema — catches typos
/// like `dimentsioning` or `part_typ` that would otherwise be silently
/// ignored by the tolerant `Value::get` lookups in `Config`/`DrawingPlan`
/// parsing. A trailing `_merge` suffix is the id-list patch directive
/// (see `template::deep_merge`), not a typo, and is skipped.
fn scan_unknown_keys(raw: &Value) -> Vec<ValidationError> {
    let mut warnings = Vec::new();
    let Some(root) = raw.as_table() else { return warnings };

    for key in root.keys() {
        if key.ends_with("_merge") {
            continue;
        }
        if !KNOWN_CONFIG_KEYS.contains(&key.as_str()) {
            warnings.push(ValidationError { code: ValidationCode::V9, message: format!("unknown top-level key '{key}'") });
        }
    }

    if let Some(drawing) = root.get("drawing").and_then(Value::as_table) {
        for key in drawing.keys() {
            if key.ends_with("_merge") {
                continue;
            }
            if !KNOWN_DRAWING_KEYS.contains(&key.as_str()) {
                warnings.push(ValidationError { code: ValidationCode::V9, message: format!("unknown key 'drawing.{key}'") });
            }
        }
    }

    warnings
}

fn required_dims_for(part_type: &str) -> &'static [&'static str] {
    match part_type {
        "flange" => &["OD", "ID", "PCD", "BOLT_DIA", "THK"],
        "shaft" => &["OD", "TOTAL_LENGTH"],
        "bracket" => &["WIDTH", "HEIGHT", "DEPTH"],
        "housing" => &["WIDTH", "HEIGHT", "DEPTH", "WALL_THK"],
        "bushing_plate" => &["WIDTH", "HEIGHT", "THK", "HOLE_DIA"],
        _ => &[],
    }
}

/// Run every V1..V10 check. `raw` is the config document's raw TOML value,
/// scanned for V9 key typos alongside the plan-level checks. Returns the
/// warnings (V6/V8/V9) on success, or the first fatal violation
/// encountered, in code order.
pub fn validate_plan(plan: &DrawingPlan, raw: &Value) -> Result<Vec<ValidationError>, ValidationError> {
    let mut warnings = scan_unknown_keys(raw);

    // V1
    if !SUPPORTED_SCHEMA_VERSIONS.contains(&plan.schema_version.as_str()) {
        return Err(ValidationError { code: ValidationCode::V1, message: format!("unsupported schema_version '{}'", plan.schema_version) });
    }

    // V2
    if plan.part_type.is_empty() {
        return Err(ValidationError { code: ValidationCode::V2, message: "part_type missing".to_string() });
    }
    if !KNOWN_PART_TYPES.contains(&plan.part_type.as_str()) {
        warnings.push(ValidationError { code: ValidationCode::V9, message: format!("unknown part_type '{}'", plan.part_type) });
    }

    // V3
    if plan.views.enabled.is_empty() {
        return Err(ValidationError { code: ValidationCode::V3, message: "no enabled views".to_string() });
    }
    for v in &plan.views.enabled {
        if !VALID_VIEWS.contains(&v.as_str()) {
            return Err(ValidationError { code: ValidationCode::V3, message: format!("unknown view '{v}'") });
        }
    }

    // V4
    let required_ids = required_dims_for(&plan.part_type);
    let have: HashSet<&str> = plan.dim_intents.iter().filter(|d| d.required).map(|d| d.feature.as_str()).collect();
    for id in required_ids {
        if !have.contains(id) {
            return Err(ValidationError { code: ValidationCode::V4, message: format!("required dimension intent '{id}' missing for part_type '{}'", plan.part_type) });
        }
    }

    // V5
    for intent in &plan.dim_intents {
        if intent.view != "notes" && !plan.views.enabled.contains(&intent.view) {
            return Err(ValidationError { code: ValidationCode::V5, message: format!("intent '{}' targets view '{}' which is not enabled", intent.id, intent.view) });
        }
    }

    // V6 (warning)
    if plan.datums.is_empty() {
        warnings.push(ValidationError { code: ValidationCode::V6, message: "no datums declared".to_string() });
    }

    // V7
    if plan.scale.min > plan.scale.max {
        return Err(ValidationError { code: ValidationCode::V7, message: format!("scale.min ({}) > scale.max ({})", plan.scale.min, plan.scale.max) });
    }

    // V8 (warning)
    if plan.notes.general.is_empty() {
        warnings.push(ValidationError { code: ValidationCode::V8, message: "notes.general is empty".to_string() });
    }

    // V10
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for intent in &plan.dim_intents {
        *seen.entry(intent.id.as_str()).or_insert(0) += 1;
    }
    if let Some((dup, _)) = seen.into_iter().find(|(_, n)| *n > 1) {
        return Err(ValidationError { code: ValidationCode::V10, message: format!("duplicate dim_intent id '{dup}'") });
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{DimIntent, DimStyle, Confidence};

    fn empty_raw() -> Value {
        Value::Table(Default::default())
    }

    fn flange_plan() -> DrawingPlan {
        let mut plan = DrawingPlan::default();
        plan.part_type = "flange".to_string();
        plan.views.enabled = vec!["front".to_string(), "top".to_string()];
        plan.datums = vec!["A".to_string()];
        plan.notes.general = vec!["General tolerance ISO 2768-m".to_string()];
        for id in ["OD", "ID", "PCD", "BOLT_DIA", "THK"] {
            plan.dim_intents.push(DimIntent {
                id: id.to_string(),
                feature: id.to_string(),
                view: "front".to_string(),
                style: DimStyle::Linear,
                required: true,
                priority: 0,
                value_mm: Some(10.0),
                confidence: Confidence::High,
                source: "template".to_string(),
                review: false,
                placement: None,
            });
        }
        plan
    }

    #[test]
    fn flange_template_passes() {
        let plan = flange_plan();
        assert!(validate_plan(&plan, &empty_raw()).is_ok());
    }

    #[test]
    fn removing_required_flag_triggers_v4() {
        let mut plan = flange_plan();
        plan.dim_intents[0].required = false;
        let err = validate_plan(&plan, &empty_raw()).unwrap_err();
        assert_eq!(err.code, ValidationCode::V4);
    }

    #[test]
    fn duplicate_ids_trigger_v10() {
        let mut plan = flange_plan();
        let dup = plan.dim_intents[0].clone();
        plan.dim_intents.push(dup);
        let err = validate_plan(&plan, &empty_raw()).unwrap_err();
        assert_eq!(err.code, ValidationCode::V10);
    }

    #[test]
    fn empty_datums_is_a_warning_not_fatal() {
        let mut plan = flange_plan();
        plan.datums.clear();
        let warnings = validate_plan(&plan, &empty_raw()).unwrap();
        assert!(warnings.iter().any(|w| w.code == ValidationCode::V6));
    }

    #[test]
    fn unknown_top_level_key_triggers_v9() {
        let plan = flange_plan();
        let raw: Value = toml::from_str("materal = \"steel\"").unwrap();
        let warnings = validate_plan(&plan, &raw).unwrap();
        assert!(warnings.iter().any(|w| w.code == ValidationCode::V9 && w.message.contains("materal")));
    }

    #[test]
    fn unknown_nested_drawing_key_triggers_v9() {
        let plan = flange_plan();
        let raw: Value = toml::from_str("[drawing]\ndimentsioning = {}\n").unwrap();
        let warnings = validate_plan(&plan, &raw).unwrap();
        assert!(warnings.iter().any(|w| w.code == ValidationCode::V9 && w.message.contains("dimentsioning")));
    }

    #[test]
    fn merge_directive_suffix_is_not_a_typo() {
        let plan = flange_plan();
        let raw: Value = toml::from_str("[drawing]\ndim_intents_merge = \"replace\"\ndim_intents = []\n").unwrap();
        let warnings = validate_plan(&plan, &raw).unwrap();
        assert!(!warnings.iter().any(|w| w.code == ValidationCode::V9));
    }
}
