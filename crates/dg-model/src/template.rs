//! Part-type classifier, TOML template store and deep-merge-with-id-list-
//! patch semantics.

use crate::error::{ModelError, Result};
use dg_core::config::{Config, Operation, ShapeKind};
use std::collections::HashMap;
use std::path::Path;
use toml::Value;

/// Rule-based, deterministic classifier, evaluated in priority order.
pub fn classify(config: &Config) -> &'static str {
    if config.is_assembly {
        return "assembly";
    }

    let cylinder_ids: Vec<&str> = config.shapes.iter().filter(|s| matches!(s.kind, ShapeKind::Cylinder { .. })).map(|s| s.id()).collect();
    let box_count = config.shapes.iter().filter(|s| matches!(s.kind, ShapeKind::Box { .. })).count();

    let cut_tools: Vec<&str> = config
        .operations
        .iter()
        .filter_map(|op| match op {
            Operation::Cut { tool, .. } | Operation::Common { tool, .. } => Some(tool.as_str()),
            _ => None,
        })
        .collect();
    let fused_bases: Vec<&str> = config
        .operations
        .iter()
        .filter_map(|op| match op {
            Operation::Fuse { base, tool, .. } => Some([base.as_str(), tool.as_str()]),
            _ => None,
        })
        .flatten()
        .collect();

    let non_cut_cylinders: usize = cylinder_ids.iter().filter(|id| !cut_tools.contains(id)).count();
    let cut_cylinders: usize = cylinder_ids.iter().filter(|id| cut_tools.contains(id)).count();
    let fused_non_cut_cylinders: usize = cylinder_ids.iter().filter(|id| !cut_tools.contains(id) && fused_bases.contains(id)).count();

    let has_cut_op = config.operations.iter().any(|op| matches!(op, Operation::Cut { .. }));
    let has_box = box_count > 0;

    if fused_non_cut_cylinders >= 3 {
        return "shaft";
    }
    if non_cut_cylinders <= 2 && cut_cylinders >= 4 && box_count == 0 {
        return "flange";
    }

    if has_box && has_cut_op {
        let fused_box_ids: Vec<&str> = config
            .shapes
            .iter()
            .filter(|s| matches!(s.kind, ShapeKind::Box { .. }))
            .map(|s| s.id())
            .filter(|id| fused_bases.contains(id))
            .collect();
        if !fused_box_ids.is_empty() {
            return "bracket";
        }

        let has_section_hint = config.shapes.iter().any(|s| s.id().to_ascii_lowercase().contains("section"))
            || config.operations.iter().any(|op| op.result_id().to_ascii_lowercase().contains("section"));
        if has_section_hint {
            return "housing";
        }

        if cut_cylinders >= 6 {
            return "bushing_plate";
        }

        let min_box_dim = config
            .shapes
            .iter()
            .filter_map(|s| match s.kind {
                ShapeKind::Box { size } => Some(size[0].min(size[1]).min(size[2])),
                _ => None,
            })
            .fold(f64::MAX, f64::min);
        return if min_box_dim < 25.0 { "bracket" } else { "housing" };
    }

    "generic"
}

#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: HashMap<String, Value>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.toml` file from `dir`, keyed by filename stem
    /// (`configs/templates/<part_type>.toml`).
    pub fn load_dir(dir: &Path) -> Result<TemplateStore> {
        let mut store = TemplateStore::new();
        let entries = std::fs::read_dir(dir).map_err(|e| ModelError::Core(dg_core::Error::Io(e)))?;
        for entry in entries {
            let entry = entry.map_err(|e| ModelError::Core(dg_core::Error::Io(e)))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
            let text = std::fs::read_to_string(&path).map_err(|e| ModelError::Core(dg_core::Error::Io(e)))?;
            store.insert(&stem, &text)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, part_type: &str, toml_src: &str) -> Result<()> {
        let value: Value = toml::from_str(toml_src).map_err(|e| ModelError::TemplateParse(e.to_string()))?;
        self.templates.insert(part_type.to_string(), value);
        Ok(())
    }

    pub fn get(&self, part_type: &str) -> Result<&Value> {
        self.templates.get(part_type).ok_or_else(|| ModelError::TemplateNotFound(part_type.to_string()))
    }

    pub fn contains(&self, part_type: &str) -> bool {
        self.templates.contains_key(part_type)
    }
}

fn is_id_list(v: &Value) -> bool {
    match v.as_array() {
        Some(arr) if !arr.is_empty() => arr.iter().all(|e| e.as_table().map(|t| t.contains_key("id")).unwrap_or(false)),
        _ => false,
    }
}

/// Recursive deep merge: dict x dict merges key-wise (override wins on
/// leaves); list x list of id-records patch-merges by id, preserving base
/// order and appending new ids; a sibling `<key>_merge = "replace"` forces
/// full replacement; otherwise override wins outright.
pub fn deep_merge(base: &Value, over: &Value) -> Value {
    match (base, over) {
        (Value::Table(base_t), Value::Table(over_t)) => {
            let mut out = base_t.clone();
            for (k, ov) in over_t {
                if k.ends_with("_merge") {
                    continue;
                }
                let force_replace = over_t.get(&format!("{k}_merge")).and_then(Value::as_str) == Some("replace");
                match out.get(k) {
                    Some(bv) if !force_replace => {
                        out.insert(k.clone(), deep_merge(bv, ov));
                    }
                    _ => {
                        out.insert(k.clone(), ov.clone());
                    }
                }
            }
            Value::Table(out)
        }
        (Value::Array(base_a), Value::Array(over_a)) if is_id_list(base) && is_id_list(over) => {
            Value::Array(merge_id_lists(base_a, over_a))
        }
        (_, ov) => ov.clone(),
    }
}

fn merge_id_lists(base: &[Value], over: &[Value]) -> Vec<Value> {
    let mut result: Vec<Value> = Vec::new();
    let mut seen_ids: Vec<String> = Vec::new();

    for b in base {
        let id = b.as_table().and_then(|t| t.get("id")).and_then(Value::as_str).unwrap_or_default().to_string();
        let override_entry = over.iter().find(|o| o.as_table().and_then(|t| t.get("id")).and_then(Value::as_str) == Some(id.as_str()));
        match override_entry {
            Some(o) => {
                let removed = o.as_table().and_then(|t| t.get("remove")).and_then(Value::as_bool).unwrap_or(false);
                if !removed {
                    result.push(deep_merge(b, o));
                }
            }
            None => result.push(b.clone()),
        }
        seen_ids.push(id);
    }

    for o in over {
        let id = o.as_table().and_then(|t| t.get("id")).and_then(Value::as_str).unwrap_or_default().to_string();
        if !seen_ids.contains(&id) {
            let removed = o.as_table().and_then(|t| t.get("remove")).and_then(Value::as_bool).unwrap_or(false);
            if !removed {
                result.push(o.clone());
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_override_leaves_base_unchanged() {
        let base: Value = toml::from_str(r#"a = 1
                                             [[items]]
                                             id = "x"
                                             value = 1"#).unwrap();
        let over: Value = toml::from_str("").unwrap();
        assert_eq!(deep_merge(&base, &over), base);
    }

    #[test]
    fn id_list_patch_preserves_order_and_appends() {
        let base: Value = toml::from_str(r#"[[items]]
                                             id = "a"
                                             value = 1
                                             [[items]]
                                             id = "b"
                                             value = 2"#).unwrap();
        let over: Value = toml::from_str(r#"[[items]]
                                             id = "b"
                                             value = 20
                                             [[items]]
                                             id = "c"
                                             value = 3"#).unwrap();
        let merged = deep_merge(&base, &over);
        let items = merged.as_table().unwrap().get("items").unwrap().as_array().unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.as_table().unwrap().get("id").unwrap().as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let b_value = items[1].as_table().unwrap().get("value").unwrap().as_integer().unwrap();
        assert_eq!(b_value, 20);
    }

    #[test]
    fn remove_true_deletes_entry() {
        let base: Value = toml::from_str(r#"[[items]]
                                             id = "a"
                                             value = 1
                                             [[items]]
                                             id = "b"
                                             value = 2"#).unwrap();
        let over: Value = toml::from_str(r#"[[items]]
                                             id = "a"
                                             remove = true"#).unwrap();
        let merged = deep_merge(&base, &over);
        let items = merged.as_table().unwrap().get("items").unwrap().as_array().unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn merge_directive_forces_replace() {
        let base: Value = toml::from_str(r#"[[items]]
                                             id = "a"
                                             value = 1"#).unwrap();
        let over: Value = toml::from_str(r#"items_merge = "replace"
                                             [[items]]
                                             id = "z"
                                             value = 9"#).unwrap();
        let merged = deep_merge(&base, &over);
        let items = merged.as_table().unwrap().get("items").unwrap().as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_table().unwrap().get("id").unwrap().as_str().unwrap(), "z");
    }

    #[test]
    fn classifier_assembly_takes_priority() {
        let cfg = Config::parse(r#"
            [assembly]
            name = "asm"
            [[parts]]
            label = "p1"
            [[shapes]]
            id = "a"
            type = "sphere"
            radius = 1
        "#).unwrap();
        assert_eq!(classify(&cfg), "assembly");
    }

    #[test]
    fn classifier_flange_from_cylinders_only() {
        let cfg = Config::parse(r#"
            [[shapes]]
            id = "body"
            type = "cylinder"
            radius = 60
            height = 12
            [[shapes]]
            id = "h1"
            type = "cylinder"
            position = [45,0,0]
            radius = 5
            height = 12
            [[shapes]]
            id = "h2"
            type = "cylinder"
            position = [-45,0,0]
            radius = 5
            height = 12
            [[shapes]]
            id = "h3"
            type = "cylinder"
            position = [0,45,0]
            radius = 5
            height = 12
            [[shapes]]
            id = "h4"
            type = "cylinder"
            position = [0,-45,0]
            radius = 5
            height = 12
            [[operations]]
            type = "cut"
            base = "body"
            tool = "h1"
            result = "body"
            [[operations]]
            type = "cut"
            base = "body"
            tool = "h2"
            result = "body"
            [[operations]]
            type = "cut"
            base = "body"
            tool = "h3"
            result = "body"
            [[operations]]
            type = "cut"
            base = "body"
            tool = "h4"
            result = "body"
        "#).unwrap();
        assert_eq!(classify(&cfg), "flange");
    }
}
