//! The parsed configuration data model: shapes, operations, assembly,
//! drawing overrides, manufacturing/tolerance/notes sections.
//!
//! Config is immutable after parse. Everything that isn't one of the
//! handful of fields every shape/operation needs is kept as raw
//! `toml::Value` under `extra`, decoded lazily by the components that
//! care about it (feature inference, feature-value extraction, DFM).

use crate::error::Error;
use std::collections::HashMap;
use toml::Value;

pub type Extra = HashMap<String, Value>;

fn table(v: &Value) -> Option<&toml::map::Map<String, Value>> {
    v.as_table()
}

fn req_str(t: &toml::map::Map<String, Value>, key: &str, ctx: &str) -> Result<String, Error> {
    t.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::MissingField { field: key.to_string(), context: ctx.to_string() })
}

fn opt_str(t: &toml::map::Map<String, Value>, key: &str) -> Option<String> {
    t.get(key).and_then(Value::as_str).map(str::to_string)
}

fn opt_f64(t: &toml::map::Map<String, Value>, key: &str) -> Option<f64> {
    t.get(key).and_then(Value::as_float).or_else(|| t.get(key).and_then(Value::as_integer).map(|i| i as f64))
}

fn req_f64(t: &toml::map::Map<String, Value>, key: &str, ctx: &str) -> Result<f64, Error> {
    opt_f64(t, key).ok_or_else(|| Error::MissingField { field: key.to_string(), context: ctx.to_string() })
}

fn opt_f64_vec3(t: &toml::map::Map<String, Value>, key: &str) -> Option<[f64; 3]> {
    let arr = t.get(key)?.as_array()?;
    if arr.len() != 3 {
        return None;
    }
    let mut out = [0.0; 3];
    for (i, v) in arr.iter().enumerate() {
        out[i] = v.as_float().or_else(|| v.as_integer().map(|i| i as f64))?;
    }
    Some(out)
}

fn req_f64_vec3(t: &toml::map::Map<String, Value>, key: &str, ctx: &str) -> Result<[f64; 3], Error> {
    opt_f64_vec3(t, key).ok_or_else(|| Error::MissingField { field: key.to_string(), context: ctx.to_string() })
}

fn extra_minus(t: &toml::map::Map<String, Value>, skip: &[&str]) -> Extra {
    t.iter()
        .filter(|(k, _)| !skip.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Common fields shared by every shape primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeCommon {
    pub id: String,
    pub position: [f64; 3],
    /// axis (xyz, unit) + angle in degrees.
    pub rotation: Option<([f64; 3], f64)>,
    pub direction: Option<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Box { size: [f64; 3] },
    Cylinder { radius: f64, height: f64 },
    Sphere { radius: f64 },
    Cone { radius1: f64, radius2: f64, height: f64 },
    Torus { major_radius: f64, minor_radius: f64 },
    Revolution { profile: Vec<[f64; 2]>, profile_start: [f64; 2] },
    Extrusion { profile: Vec<[f64; 2]>, height: f64 },
    Library { path: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub common: ShapeCommon,
    pub kind: ShapeKind,
    pub extra: Extra,
}

impl Shape {
    pub fn id(&self) -> &str {
        &self.common.id
    }

    pub fn position(&self) -> [f64; 3] {
        self.common.position
    }

    /// Parses a `[[shapes]]` table entry. `type` dispatches the tagged
    /// record; everything outside the common+type-specific fields is
    /// retained in `extra`.
    pub fn from_toml(v: &Value) -> Result<Shape, Error> {
        let t = table(v).ok_or_else(|| Error::MissingField { field: "shapes[]".into(), context: "config".into() })?;
        let ty = req_str(t, "type", "shape")?;
        let id = req_str(t, "id", "shape")?;
        let position = opt_f64_vec3(t, "position").unwrap_or([0.0, 0.0, 0.0]);
        let rotation = t.get("rotation").and_then(Value::as_array).and_then(|arr| {
            if arr.len() != 4 {
                return None;
            }
            let mut v4 = [0.0f64; 4];
            for (i, x) in arr.iter().enumerate() {
                v4[i] = x.as_float().or_else(|| x.as_integer().map(|i| i as f64))?;
            }
            Some(([v4[0], v4[1], v4[2]], v4[3]))
        });
        let direction = opt_f64_vec3(t, "direction");
        let common = ShapeCommon { id: id.clone(), position, rotation, direction };
        let mut skip = vec!["type", "id", "position", "rotation", "direction"];

        let kind = match ty.as_str() {
            "box" => {
                skip.push("size");
                ShapeKind::Box { size: req_f64_vec3(t, "size", &id)? }
            }
            "cylinder" => {
                skip.push("radius");
                skip.push("height");
                ShapeKind::Cylinder { radius: req_f64(t, "radius", &id)?, height: req_f64(t, "height", &id)? }
            }
            "sphere" => {
                skip.push("radius");
                ShapeKind::Sphere { radius: req_f64(t, "radius", &id)? }
            }
            "cone" => {
                skip.push("radius1");
                skip.push("radius2");
                skip.push("height");
                ShapeKind::Cone {
                    radius1: req_f64(t, "radius1", &id)?,
                    radius2: req_f64(t, "radius2", &id)?,
                    height: req_f64(t, "height", &id)?,
                }
            }
            "torus" => {
                skip.push("major_radius");
                skip.push("minor_radius");
                ShapeKind::Torus {
                    major_radius: req_f64(t, "major_radius", &id)?,
                    minor_radius: req_f64(t, "minor_radius", &id)?,
                }
            }
            "revolution" => {
                skip.push("profile");
                skip.push("profile_start");
                let profile = parse_profile(t.get("profile"));
                let profile_start = t
                    .get("profile_start")
                    .and_then(Value::as_array)
                    .map(|a| [coerce_f64(&a[0]), coerce_f64(&a[1])])
                    .unwrap_or([0.0, 0.0]);
                if profile_start[0] < 0.0 {
                    return Err(Error::NegativeRevolutionRadius { shape: id.clone(), x: profile_start[0] });
                }
                if profile.len() >= 3 && profile.first() != profile.last() {
                    return Err(Error::UnclosedProfile(id.clone()));
                }
                ShapeKind::Revolution { profile, profile_start }
            }
            "extrusion" => {
                skip.push("profile");
                skip.push("height");
                ShapeKind::Extrusion { profile: parse_profile(t.get("profile")), height: req_f64(t, "height", &id)? }
            }
            other if other.starts_with("library/") => {
                ShapeKind::Library { path: other.to_string() }
            }
            other => return Err(Error::UnknownShapeType(other.to_string())),
        };

        Ok(Shape { common, kind, extra: extra_minus(t, &skip) })
    }
}

fn coerce_f64(v: &Value) -> f64 {
    v.as_float().or_else(|| v.as_integer().map(|i| i as f64)).unwrap_or(0.0)
}

fn parse_profile(v: Option<&Value>) -> Vec<[f64; 2]> {
    v.and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|p| p.as_array())
                .filter(|p| p.len() == 2)
                .map(|p| [coerce_f64(&p[0]), coerce_f64(&p[1])])
                .collect()
        })
        .unwrap_or_default()
}

/// A typed operation. `result` is the id introduced or overwritten in the
/// shape scope; for fillet/chamfer it defaults to `{op}_{target}` when
/// absent.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Fuse { base: String, tool: String, result: String },
    Cut { base: String, tool: String, result: String },
    Common { base: String, tool: String, result: String },
    Fillet { target: String, radius: Option<f64>, edges: Option<Vec<String>>, result: String },
    Chamfer { target: String, size: Option<f64>, edges: Option<Vec<String>>, result: String },
    Shell { target: String, thickness: f64, faces: Option<Vec<String>> },
    CircularPattern {
        target: String,
        axis: [f64; 3],
        center: [f64; 3],
        count: u32,
        angle: f64,
        include_original: bool,
    },
}

impl Operation {
    /// The id this operation introduces into the shape scope.
    pub fn result_id(&self) -> &str {
        match self {
            Operation::Fuse { result, .. } | Operation::Cut { result, .. } | Operation::Common { result, .. } => result,
            Operation::Fillet { result, .. } | Operation::Chamfer { result, .. } => result,
            Operation::Shell { target, .. } => target,
            Operation::CircularPattern { target, .. } => target,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Operation::Fuse { .. } => "fuse",
            Operation::Cut { .. } => "cut",
            Operation::Common { .. } => "common",
            Operation::Fillet { .. } => "fillet",
            Operation::Chamfer { .. } => "chamfer",
            Operation::Shell { .. } => "shell",
            Operation::CircularPattern { .. } => "circular_pattern",
        }
    }

    /// Ids this operation reads from the shape scope (must already exist).
    pub fn reads(&self) -> Vec<&str> {
        match self {
            Operation::Fuse { base, tool, .. }
            | Operation::Cut { base, tool, .. }
            | Operation::Common { base, tool, .. } => vec![base.as_str(), tool.as_str()],
            Operation::Fillet { target, .. } | Operation::Chamfer { target, .. } => vec![target.as_str()],
            Operation::Shell { target, .. } => vec![target.as_str()],
            Operation::CircularPattern { target, .. } => vec![target.as_str()],
        }
    }

    pub fn from_toml(v: &Value) -> Result<Operation, Error> {
        let t = table(v).ok_or_else(|| Error::MissingField { field: "operations[]".into(), context: "config".into() })?;
        let ty = req_str(t, "type", "operation")?;
        let ctx = format!("operation:{ty}");
        let op = match ty.as_str() {
            "fuse" | "cut" | "common" => {
                let base = req_str(t, "base", &ctx)?;
                let tool = req_str(t, "tool", &ctx)?;
                let result = req_str(t, "result", &ctx)?;
                match ty.as_str() {
                    "fuse" => Operation::Fuse { base, tool, result },
                    "cut" => Operation::Cut { base, tool, result },
                    _ => Operation::Common { base, tool, result },
                }
            }
            "fillet" | "chamfer" => {
                let target = req_str(t, "target", &ctx)?;
                let result = opt_str(t, "result").unwrap_or_else(|| format!("{ty}_{target}"));
                let edges = t.get("edges").and_then(Value::as_array).map(|a| {
                    a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
                });
                if ty == "fillet" {
                    Operation::Fillet { target, radius: opt_f64(t, "radius"), edges, result }
                } else {
                    Operation::Chamfer { target, size: opt_f64(t, "size"), edges, result }
                }
            }
            "shell" => {
                let target = req_str(t, "target", &ctx)?;
                let thickness = req_f64(t, "thickness", &ctx)?;
                let faces = t.get("faces").and_then(Value::as_array).map(|a| {
                    a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
                });
                Operation::Shell { target, thickness, faces }
            }
            "circular_pattern" => Operation::CircularPattern {
                target: req_str(t, "target", &ctx)?,
                axis: req_f64_vec3(t, "axis", &ctx)?,
                center: opt_f64_vec3(t, "center").unwrap_or([0.0, 0.0, 0.0]),
                count: opt_f64(t, "count").unwrap_or(0.0) as u32,
                angle: opt_f64(t, "angle").unwrap_or(360.0),
                include_original: t.get("include_original").and_then(Value::as_bool).unwrap_or(true),
            },
            other => return Err(Error::UnknownOperationType(other.to_string())),
        };
        Ok(op)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManufacturingConfig {
    pub process: Option<String>,
    pub material: Option<String>,
    pub min_wall_override: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotesConfig {
    pub general: Vec<String>,
    pub placement: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartRef {
    pub label: String,
    pub shapes: Vec<Shape>,
    pub operations: Vec<Operation>,
    pub material: Option<String>,
    pub placement: Option<[f64; 3]>,
}

/// The fully parsed, immutable configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub shapes: Vec<Shape>,
    pub operations: Vec<Operation>,
    pub parts: Vec<PartRef>,
    pub is_assembly: bool,
    pub manufacturing: ManufacturingConfig,
    pub notes: NotesConfig,
    /// Raw TOML document, kept for the plan validator's key-typo scan (V9)
    /// and the drawing-overrides deep merge.
    pub raw: Value,
}

impl Config {
    pub fn parse(toml_src: &str) -> Result<Config, Error> {
        let raw: Value = toml::from_str(toml_src)?;
        Config::from_value(raw)
    }

    pub fn from_value(raw: Value) -> Result<Config, Error> {
        let t = raw.as_table().ok_or_else(|| Error::MissingField { field: "<root>".into(), context: "config".into() })?;

        let shapes = t
            .get("shapes")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().map(Shape::from_toml).collect::<Result<Vec<_>, _>>())
            .transpose()?
            .unwrap_or_default();

        let mut seen = std::collections::HashSet::new();
        for s in &shapes {
            if !seen.insert(s.id().to_string()) {
                return Err(Error::DuplicateId(s.id().to_string()));
            }
        }

        let operations = t
            .get("operations")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().map(Operation::from_toml).collect::<Result<Vec<_>, _>>())
            .transpose()?
            .unwrap_or_default();

        let is_assembly = t.contains_key("assembly");

        let parts = t
            .get("parts")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .map(|p| {
                        let pt = table(p).ok_or_else(|| Error::MissingField { field: "parts[]".into(), context: "config".into() })?;
                        let label = req_str(pt, "label", "part")?;
                        let part_shapes = pt
                            .get("shapes")
                            .and_then(Value::as_array)
                            .map(|a| a.iter().map(Shape::from_toml).collect::<Result<Vec<_>, _>>())
                            .transpose()?
                            .unwrap_or_default();
                        let part_ops = pt
                            .get("operations")
                            .and_then(Value::as_array)
                            .map(|a| a.iter().map(Operation::from_toml).collect::<Result<Vec<_>, _>>())
                            .transpose()?
                            .unwrap_or_default();
                        let material = part_shapes.first().and_then(|s| s.extra.get("material")).and_then(Value::as_str).map(str::to_string);
                        let placement = opt_f64_vec3(pt, "placement");
                        Ok(PartRef { label, shapes: part_shapes, operations: part_ops, material, placement })
                    })
                    .collect::<Result<Vec<_>, Error>>()
            })
            .transpose()?
            .unwrap_or_default();

        let manufacturing = t
            .get("manufacturing")
            .and_then(table)
            .map(|m| ManufacturingConfig {
                process: opt_str(m, "process"),
                material: opt_str(m, "material"),
                min_wall_override: opt_f64(m, "min_wall_override"),
            })
            .unwrap_or_default();

        let notes = t
            .get("notes")
            .and_then(table)
            .map(|n| NotesConfig {
                general: n
                    .get("general")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default(),
                placement: opt_str(n, "placement"),
            })
            .unwrap_or_default();

        // Validate referenced ids exist within the growing shape scope.
        let mut scope: std::collections::HashSet<&str> = shapes.iter().map(|s| s.id()).collect();
        for op in &operations {
            for r in op.reads() {
                if !scope.contains(r) {
                    return Err(Error::DanglingReference(r.to_string()));
                }
            }
            scope.insert(op.result_id());
        }

        Ok(Config { shapes, operations, parts, is_assembly, manufacturing, notes, raw })
    }

    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    pub fn drawing_table(&self) -> Option<&toml::map::Map<String, Value>> {
        self.raw.as_table().and_then(|t| t.get("drawing")).and_then(Value::as_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLANGE_TOML: &str = r#"
        [[shapes]]
        id = "body"
        type = "cylinder"
        position = [0,0,0]
        radius = 60
        height = 12

        [[shapes]]
        id = "bore"
        type = "cylinder"
        position = [0,0,-2]
        radius = 15
        height = 16

        [[operations]]
        type = "cut"
        base = "body"
        tool = "bore"
        result = "body"
    "#;

    #[test]
    fn parses_minimal_config() {
        let cfg = Config::parse(FLANGE_TOML).unwrap();
        assert_eq!(cfg.shapes.len(), 2);
        assert_eq!(cfg.operations.len(), 1);
        assert!(!cfg.is_assembly);
    }

    #[test]
    fn duplicate_shape_id_is_fatal() {
        let toml_src = r#"
            [[shapes]]
            id = "a"
            type = "sphere"
            radius = 1
            [[shapes]]
            id = "a"
            type = "sphere"
            radius = 2
        "#;
        let err = Config::parse(toml_src).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));
    }

    #[test]
    fn dangling_reference_is_fatal() {
        let toml_src = r#"
            [[shapes]]
            id = "a"
            type = "sphere"
            radius = 1
            [[operations]]
            type = "cut"
            base = "a"
            tool = "ghost"
            result = "a"
        "#;
        let err = Config::parse(toml_src).unwrap_err();
        assert!(matches!(err, Error::DanglingReference(_)));
    }

    #[test]
    fn unknown_shape_type_is_fatal() {
        let toml_src = r#"
            [[shapes]]
            id = "a"
            type = "frobnicator"
        "#;
        let err = Config::parse(toml_src).unwrap_err();
        assert!(matches!(err, Error::UnknownShapeType(_)));
    }

    #[test]
    fn negative_revolution_start_is_geometry_error() {
        let toml_src = r#"
            [[shapes]]
            id = "a"
            type = "revolution"
            profile = [[0,0],[1,1],[0,2],[0,0]]
            profile_start = [-1, 0]
        "#;
        let err = Config::parse(toml_src).unwrap_err();
        assert!(matches!(err, Error::NegativeRevolutionRadius { .. }));
    }
}
