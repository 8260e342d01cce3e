//! The drawing plan data model: the typed result of deep-merging a
//! part-type template with user overrides.

use std::collections::HashMap;
use toml::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimStyle {
    Linear,
    Diameter,
    Radius,
    Callout,
    Note,
    Angular,
}

impl DimStyle {
    pub fn from_str(s: &str) -> Option<DimStyle> {
        match s {
            "linear" => Some(DimStyle::Linear),
            "diameter" => Some(DimStyle::Diameter),
            "radius" => Some(DimStyle::Radius),
            "callout" => Some(DimStyle::Callout),
            "note" => Some(DimStyle::Note),
            "angular" => Some(DimStyle::Angular),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DimStyle::Linear => "linear",
            DimStyle::Diameter => "diameter",
            DimStyle::Radius => "radius",
            DimStyle::Callout => "callout",
            DimStyle::Note => "note",
            DimStyle::Angular => "angular",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    None,
}

impl Confidence {
    pub fn from_str(s: &str) -> Confidence {
        match s {
            "high" => Confidence::High,
            "medium" => Confidence::Medium,
            _ => Confidence::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::None => "none",
        }
    }
}

/// 8-way compass placement side, mapping to a default leader angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Right,
    TopRight,
    Top,
    TopLeft,
    Left,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Side {
    pub fn from_str(s: &str) -> Option<Side> {
        match s {
            "right" => Some(Side::Right),
            "top_right" => Some(Side::TopRight),
            "top" => Some(Side::Top),
            "top_left" => Some(Side::TopLeft),
            "left" => Some(Side::Left),
            "bottom_left" => Some(Side::BottomLeft),
            "bottom" => Some(Side::Bottom),
            "bottom_right" => Some(Side::BottomRight),
            _ => None,
        }
    }

    /// `_SIDE_TO_ANGLE` table.
    pub fn default_angle_deg(self) -> f64 {
        match self {
            Side::Right => 20.0,
            Side::TopRight => 45.0,
            Side::Top => 70.0,
            Side::TopLeft => 120.0,
            Side::Left => 160.0,
            Side::BottomLeft => 230.0,
            Side::Bottom => 290.0,
            Side::BottomRight => 330.0,
        }
    }

    /// Whether this side implies stacking a linear dimension above its
    /// geometry rather than below.
    pub fn stacks_above(self) -> bool {
        matches!(self, Side::Top | Side::TopLeft | Side::TopRight)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementHint {
    pub side: Option<Side>,
    pub offset_mm: Option<f64>,
    pub angle_deg: Option<f64>,
}

impl PlacementHint {
    pub fn from_table(t: &toml::map::Map<String, Value>) -> Option<PlacementHint> {
        // Nested `placement = { side = "...", offset_mm = ..., angle_deg = ... }`
        if let Some(p) = t.get("placement").and_then(Value::as_table) {
            return Some(PlacementHint {
                side: p.get("side").and_then(Value::as_str).and_then(Side::from_str),
                offset_mm: p.get("offset_mm").and_then(Value::as_float),
                angle_deg: p.get("angle_deg").and_then(Value::as_float),
            });
        }
        // Flattened `placement_side`, `placement_offset_mm`, `placement_angle_deg`.
        let side = t.get("placement_side").and_then(Value::as_str).and_then(Side::from_str);
        let offset_mm = t.get("placement_offset_mm").and_then(Value::as_float);
        let angle_deg = t.get("placement_angle_deg").and_then(Value::as_float);
        if side.is_some() || offset_mm.is_some() || angle_deg.is_some() {
            Some(PlacementHint { side, offset_mm, angle_deg })
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimIntent {
    pub id: String,
    pub feature: String,
    pub view: String,
    pub style: DimStyle,
    pub required: bool,
    pub priority: i32,
    pub value_mm: Option<f64>,
    pub confidence: Confidence,
    pub source: String,
    pub review: bool,
    pub placement: Option<PlacementHint>,
}

/// Ids that route through the diameter renderer even when tagged `linear`,
/// pinned as a constant rather than a configuration field (see DESIGN.md
/// Open Questions).
pub const DIAMETER_LIKE_IDS: &[&str] = &["OD", "ID", "PCD", "BOLT_DIA", "OD1", "OD2", "BORE_ID", "HOLE_DIA", "BUSHING_DIA"];

impl DimIntent {
    pub fn is_diameter_like(&self) -> bool {
        self.style == DimStyle::Diameter || (self.style == DimStyle::Linear && DIAMETER_LIKE_IDS.contains(&self.feature.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewsConfig {
    pub enabled: Vec<String>,
    pub layout: Option<String>,
    pub options: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleConfig {
    pub mode: String,
    pub min: f64,
    pub max: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        ScaleConfig { mode: "auto".to_string(), min: 0.1, max: 5.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensioningConfig {
    pub scheme: String,
    pub dedupe_policy: String,
    pub tol_mm: f64,
}

impl Default for DimensioningConfig {
    fn default() -> Self {
        DimensioningConfig { scheme: "chain".to_string(), dedupe_policy: "smart".to_string(), tol_mm: 0.05 }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotesPlan {
    pub general: Vec<String>,
    pub placement: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawingPlan {
    pub schema_version: String,
    pub part_type: String,
    pub profile: String,
    pub views: ViewsConfig,
    pub datums: Vec<String>,
    pub dimensioning: DimensioningConfig,
    pub dim_intents: Vec<DimIntent>,
    pub notes: NotesPlan,
    pub scale: ScaleConfig,
    pub style: HashMap<String, Value>,
}

impl Default for DrawingPlan {
    fn default() -> Self {
        DrawingPlan {
            schema_version: "1".to_string(),
            part_type: "generic".to_string(),
            profile: "ks".to_string(),
            views: ViewsConfig::default(),
            datums: Vec::new(),
            dimensioning: DimensioningConfig::default(),
            dim_intents: Vec::new(),
            notes: NotesPlan::default(),
            scale: ScaleConfig::default(),
            style: HashMap::new(),
        }
    }
}

impl DrawingPlan {
    pub fn from_value(v: &Value) -> DrawingPlan {
        let mut plan = DrawingPlan::default();
        let Some(t) = v.as_table() else { return plan };

        if let Some(s) = t.get("schema_version") {
            plan.schema_version = value_as_string(s);
        }
        if let Some(s) = t.get("part_type").and_then(Value::as_str) {
            plan.part_type = s.to_string();
        }
        if let Some(s) = t.get("profile").and_then(Value::as_str) {
            plan.profile = s.to_string();
        }

        if let Some(views) = t.get("views").and_then(Value::as_table) {
            plan.views.enabled = views
                .get("enabled")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            plan.views.layout = views.get("layout").and_then(Value::as_str).map(str::to_string);
            if let Some(opts) = views.get("options").and_then(Value::as_table) {
                plan.views.options = opts.clone().into_iter().collect();
            }
        }

        if let Some(datums) = t.get("datums").and_then(Value::as_array) {
            plan.datums = datums.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
        }

        if let Some(d) = t.get("dimensioning").and_then(Value::as_table) {
            if let Some(s) = d.get("scheme").and_then(Value::as_str) {
                plan.dimensioning.scheme = s.to_string();
            }
            if let Some(s) = d.get("dedupe_policy").and_then(Value::as_str) {
                plan.dimensioning.dedupe_policy = s.to_string();
            }
            if let Some(f) = d.get("tol_mm").and_then(Value::as_float) {
                plan.dimensioning.tol_mm = f;
            }
        }

        if let Some(intents) = t.get("dim_intents").and_then(Value::as_array) {
            plan.dim_intents = intents.iter().filter_map(parse_dim_intent).collect();
        }

        if let Some(notes) = t.get("notes").and_then(Value::as_table) {
            plan.notes.general = notes
                .get("general")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            plan.notes.placement = notes.get("placement").and_then(Value::as_str).map(str::to_string);
        }

        if let Some(scale) = t.get("scale").and_then(Value::as_table) {
            if let Some(s) = scale.get("mode").and_then(Value::as_str) {
                plan.scale.mode = s.to_string();
            }
            if let Some(f) = scale.get("min").and_then(Value::as_float) {
                plan.scale.min = f;
            }
            if let Some(f) = scale.get("max").and_then(Value::as_float) {
                plan.scale.max = f;
            }
        }

        if let Some(style) = t.get("style").and_then(Value::as_table) {
            plan.style = style.clone().into_iter().collect();
        }

        plan
    }
}

fn value_as_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        other => other.to_string(),
    }
}

fn parse_dim_intent(v: &Value) -> Option<DimIntent> {
    let t = v.as_table()?;
    let id = t.get("id")?.as_str()?.to_string();
    let feature = t.get("feature").and_then(Value::as_str).unwrap_or(&id).to_string();
    let view = t.get("view").and_then(Value::as_str).unwrap_or("front").to_string();
    let style = t
        .get("style")
        .and_then(Value::as_str)
        .and_then(DimStyle::from_str)
        .unwrap_or(DimStyle::Linear);
    let view = if style == DimStyle::Diameter && t.get("view").is_none() {
        "front".to_string()
    } else {
        view
    };
    let required = t.get("required").and_then(Value::as_bool).unwrap_or(false);
    let priority = t.get("priority").and_then(Value::as_integer).unwrap_or(0) as i32;
    let value_mm = t.get("value_mm").and_then(Value::as_float).or_else(|| t.get("value_mm").and_then(Value::as_integer).map(|i| i as f64));
    let confidence = t.get("confidence").and_then(Value::as_str).map(Confidence::from_str).unwrap_or(Confidence::None);
    let source = t.get("source").and_then(Value::as_str).unwrap_or("template").to_string();
    let review = value_mm.is_none() && required;
    let placement = PlacementHint::from_table(t);

    Some(DimIntent { id, feature, view, style, required, priority, value_mm, confidence, source, review, placement })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diameter_intent_without_view_defaults_to_front() {
        let v: Value = toml::from_str(r#"id="OD" style="diameter" required=true"#).unwrap();
        let intent = parse_dim_intent(&v).unwrap();
        assert_eq!(intent.view, "front");
    }

    #[test]
    fn missing_value_on_required_marks_review() {
        let v: Value = toml::from_str(r#"id="OD" style="diameter" required=true"#).unwrap();
        let intent = parse_dim_intent(&v).unwrap();
        assert!(intent.review);
    }

    #[test]
    fn diameter_like_linear_id_routes_as_diameter() {
        let v: Value = toml::from_str(r#"id="OD" style="linear" view="front""#).unwrap();
        let intent = parse_dim_intent(&v).unwrap();
        assert!(intent.is_diameter_like());
    }
}
