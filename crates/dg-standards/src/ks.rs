//! KS B 0401 callout formatters for engineering drawings: fit callouts,
//! bolt hole/counterbore notes, thread callouts, surface finish, general
//! tolerance notes, and center-distance tolerances.

use crate::error::StandardsError;
use crate::tolerance::get_fit;

/// `⌀25 H7/g6`. Deliberately does not special-case diameter==25 — see
/// DESIGN.md Open Questions.
pub fn format_fit_callout(diameter: f64, fit_class: &str) -> String {
    format!("\u{2300}{} {}", format_diameter(diameter), fit_class)
}

/// `⌀25 H7/g6 (+0.021/0) (-0.007/-0.020)`.
pub fn format_fit_tolerance(diameter: f64, fit_class: &str) -> Result<String, StandardsError> {
    let (hole_spec, shaft_spec) = fit_class.split_once('/').ok_or_else(|| StandardsError::MalformedSpec(fit_class.to_string()))?;
    let fit = get_fit(diameter, hole_spec, shaft_spec)?;
    Ok(format!(
        "\u{2300}{} {} ({}/{}) ({}/{})",
        format_diameter(diameter),
        fit_class,
        signed(fit.hole_upper),
        signed(fit.hole_lower),
        signed(fit.shaft_upper),
        signed(fit.shaft_lower),
    ))
}

fn signed(v: f64) -> String {
    if v > 0.0 {
        format!("+{v:.3}")
    } else if v == 0.0 {
        "0".to_string()
    } else {
        format!("{v:.3}")
    }
}

fn format_diameter(d: f64) -> String {
    if (d.fract()).abs() < 1e-9 {
        format!("{d:.0}")
    } else {
        format!("{d}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoltHole {
    pub drill_close: f64,
    pub drill_medium: f64,
    pub drill_coarse: f64,
    pub cb_d: f64,
    pub cb_depth: f64,
    pub pitch: f64,
}

impl BoltHole {
    pub fn drill(&self, hole_type: &str) -> f64 {
        match hole_type {
            "close" => self.drill_close,
            "coarse" => self.drill_coarse,
            _ => self.drill_medium,
        }
    }
}

/// Metric bolt hole dimensions by nominal size, following the ISO
/// 273/KS B 1007 clearance-hole conventions (close/medium/coarse
/// clearance over the nominal thread diameter), with counterbore
/// diameter sized for a standard hex bolt head and counterbore depth
/// covering head height plus a washer.
pub fn resolve_bolt_hole(bolt_size: &str) -> Result<BoltHole, StandardsError> {
    let bh = match bolt_size {
        "M3" => BoltHole { drill_close: 3.2, drill_medium: 3.4, drill_coarse: 3.6, cb_d: 6.4, cb_depth: 3.4, pitch: 0.5 },
        "M4" => BoltHole { drill_close: 4.3, drill_medium: 4.5, drill_coarse: 4.8, cb_d: 8.0, cb_depth: 4.4, pitch: 0.7 },
        "M5" => BoltHole { drill_close: 5.3, drill_medium: 5.5, drill_coarse: 5.8, cb_d: 9.5, cb_depth: 5.4, pitch: 0.8 },
        "M6" => BoltHole { drill_close: 6.4, drill_medium: 6.6, drill_coarse: 7.0, cb_d: 11.0, cb_depth: 6.5, pitch: 1.0 },
        "M8" => BoltHole { drill_close: 8.4, drill_medium: 9.0, drill_coarse: 10.0, cb_d: 15.0, cb_depth: 8.6, pitch: 1.25 },
        "M10" => BoltHole { drill_close: 10.5, drill_medium: 11.0, drill_coarse: 12.0, cb_d: 18.0, cb_depth: 10.8, pitch: 1.5 },
        "M12" => BoltHole { drill_close: 13.0, drill_medium: 13.5, drill_coarse: 14.5, cb_d: 20.0, cb_depth: 13.0, pitch: 1.75 },
        "M14" => BoltHole { drill_close: 15.0, drill_medium: 15.5, drill_coarse: 16.5, cb_d: 23.0, cb_depth: 15.1, pitch: 2.0 },
        "M16" => BoltHole { drill_close: 17.0, drill_medium: 17.5, drill_coarse: 18.5, cb_d: 26.0, cb_depth: 17.3, pitch: 2.0 },
        "M20" => BoltHole { drill_close: 21.0, drill_medium: 22.0, drill_coarse: 24.0, cb_d: 32.0, cb_depth: 21.6, pitch: 2.5 },
        other => return Err(StandardsError::UnknownBoltSize(other.to_string())),
    };
    Ok(bh)
}

/// `⌀11 THRU` or `⌀11 ↧20`.
pub fn format_bolt_hole_callout(bolt_size: &str, through: bool, depth: Option<f64>, hole_type: &str) -> Result<String, StandardsError> {
    let bh = resolve_bolt_hole(bolt_size)?;
    let drill_d = bh.drill(hole_type);
    if through {
        Ok(format!("\u{2300}{} THRU", format_diameter(drill_d)))
    } else {
        let d = depth.unwrap_or(bh.cb_depth);
        Ok(format!("\u{2300}{} \u{21a7}{}", format_diameter(drill_d), format_diameter(d)))
    }
}

/// `⌀11 THRU, C'BORE ⌀18 ↧10.8`.
pub fn format_counterbore_callout(bolt_size: &str, hole_type: &str) -> Result<String, StandardsError> {
    let bh = resolve_bolt_hole(bolt_size)?;
    Ok(format!(
        "\u{2300}{} THRU, C'BORE \u{2300}{} \u{21a7}{}",
        format_diameter(bh.drill(hole_type)),
        format_diameter(bh.cb_d),
        format_diameter(bh.cb_depth),
    ))
}

/// `M10×1.5-6H THRU` or `M10×1.5-6H ↧20`.
pub fn format_thread_callout(size: &str, pitch: Option<f64>, depth: Option<f64>, through: bool, thread_class: &str) -> String {
    let mut callout = size.to_string();
    if let Some(p) = pitch {
        callout.push_str(&format!("\u{d7}{p}"));
    }
    callout.push_str(&format!("-{thread_class}"));
    if through {
        callout.push_str(" THRU");
    } else if let Some(d) = depth {
        callout.push_str(&format!(" \u{21a7}{}", format_diameter(d)));
    }
    callout
}

/// `GENERAL TOLERANCES PER KS B 0401 — Grade m (ISO 2768-m)`.
pub fn format_general_tolerance_note(standard: &str, grade: &str) -> String {
    let iso = match grade {
        "f" => "ISO 2768-f".to_string(),
        "m" => "ISO 2768-m".to_string(),
        "c" => "ISO 2768-c".to_string(),
        "v" => "ISO 2768-v".to_string(),
        other => format!("ISO 2768-{other}"),
    };
    format!("GENERAL TOLERANCES PER {standard} \u{2014} Grade {grade} ({iso})")
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceFinish {
    pub typical_ra: f64,
    pub achievable_ra: f64,
    pub lay: &'static str,
}

/// Typical Ra by machining process, synthesized from common ISO 1302
/// machining-allowance tables (see DESIGN.md).
pub fn resolve_surface_for_process(process: &str) -> Result<SurfaceFinish, StandardsError> {
    let sf = match process {
        "turning" => SurfaceFinish { typical_ra: 3.2, achievable_ra: 0.8, lay: "=" },
        "milling" => SurfaceFinish { typical_ra: 3.2, achievable_ra: 1.6, lay: "X" },
        "grinding" => SurfaceFinish { typical_ra: 0.8, achievable_ra: 0.2, lay: "M" },
        "drilling" => SurfaceFinish { typical_ra: 6.3, achievable_ra: 3.2, lay: "=" },
        "boring" => SurfaceFinish { typical_ra: 1.6, achievable_ra: 0.4, lay: "=" },
        "reaming" => SurfaceFinish { typical_ra: 1.6, achievable_ra: 0.8, lay: "=" },
        "casting" => SurfaceFinish { typical_ra: 12.5, achievable_ra: 6.3, lay: "M" },
        other => return Err(StandardsError::UnknownProcess(other.to_string())),
    };
    Ok(sf)
}

/// ISO 1302 surface-finish symbol slots a..e: Ra, production method,
/// sampling length/filter, lay direction, machining allowance.
pub fn format_surface_finish_full(ra: f64, process: Option<&str>, lay: Option<&str>, allowance: Option<f64>) -> Result<[(char, String); 5], StandardsError> {
    let mut slot_c = String::new();
    let mut slot_d = String::new();
    if let Some(p) = process {
        let sf = resolve_surface_for_process(p)?;
        let mut capitalized = p.to_string();
        if let Some(first) = capitalized.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        slot_c = capitalized;
        slot_d = lay.unwrap_or(sf.lay).to_string();
    } else if let Some(l) = lay {
        slot_d = l.to_string();
    }
    let slot_e = allowance.map(|a| format_diameter(a)).unwrap_or_default();
    Ok([
        ('a', format!("Ra {ra}")),
        ('b', String::new()),
        ('c', slot_c),
        ('d', slot_d),
        ('e', slot_e),
    ])
}

/// Center distance tolerance grades js7..js10, by distance range (mm).
/// Synthesized from the ISO 286 js-series progression.
fn center_distance_ranges() -> &'static [(f64, f64)] {
    &[(0.0, 3.0), (3.0, 6.0), (6.0, 10.0), (10.0, 18.0), (18.0, 30.0), (30.0, 50.0), (50.0, 80.0), (80.0, 120.0), (120.0, 180.0)]
}

fn center_distance_grade(grade: &str) -> Result<[f64; 9], StandardsError> {
    match grade {
        "js7" => Ok([5.0, 6.0, 7.5, 9.0, 10.5, 12.5, 15.0, 17.5, 20.0]),
        "js8" => Ok([7.0, 9.0, 11.0, 13.5, 16.5, 19.5, 23.0, 27.0, 31.5]),
        "js9" => Ok([12.5, 15.0, 18.0, 21.5, 26.0, 31.0, 37.0, 43.5, 50.0]),
        "js10" => Ok([20.0, 24.0, 29.0, 35.0, 42.0, 50.0, 60.0, 70.0, 80.0]),
        other => Err(StandardsError::UnknownCenterDistanceGrade(other.to_string())),
    }
}

pub fn resolve_center_distance_tol(distance_mm: f64, grade: &str) -> Result<f64, StandardsError> {
    let values = center_distance_grade(grade)?;
    let ranges = center_distance_ranges();
    for (i, (lo, hi)) in ranges.iter().enumerate() {
        if distance_mm >= *lo && distance_mm <= *hi {
            return Ok(values[i] / 1000.0);
        }
    }
    if distance_mm < ranges[0].0 {
        Ok(values[0] / 1000.0)
    } else {
        Ok(values[values.len() - 1] / 1000.0)
    }
}

/// `100 ±0.025` or, given a grade, resolved from the center-distance
/// tolerance table.
pub fn format_center_distance(distance: f64, tolerance: Option<f64>, grade: Option<&str>) -> Result<String, StandardsError> {
    if let Some(t) = tolerance {
        return Ok(format!("{} \u{b1}{}", format_diameter(distance), t));
    }
    if let Some(g) = grade {
        let tol = resolve_center_distance_tol(distance, g)?;
        return Ok(format!("{} \u{b1}{:.3}", format_diameter(distance), tol));
    }
    Ok(format_diameter(distance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_callout_does_not_special_case_25() {
        assert_eq!(format_fit_callout(25.0, "H7/g6"), "\u{2300}25 H7/g6");
        assert_eq!(format_fit_callout(10.0, "H7"), "\u{2300}10 H7");
    }

    #[test]
    fn bolt_hole_callout_through() {
        let s = format_bolt_hole_callout("M10", true, None, "medium").unwrap();
        assert_eq!(s, "\u{2300}11 THRU");
    }

    #[test]
    fn counterbore_callout_matches_known_values() {
        let s = format_counterbore_callout("M10", "medium").unwrap();
        assert_eq!(s, "\u{2300}11 THRU, C'BORE \u{2300}18 \u{21a7}10.8");
    }

    #[test]
    fn thread_callout_with_pitch_and_through() {
        let s = format_thread_callout("M10", Some(1.5), None, true, "6H");
        assert_eq!(s, "M10\u{d7}1.5-6H THRU");
    }

    #[test]
    fn general_tolerance_note_maps_grade_to_iso() {
        let s = format_general_tolerance_note("KS B 0401", "m");
        assert!(s.contains("ISO 2768-m"));
    }

    #[test]
    fn unknown_bolt_size_is_an_error() {
        assert!(resolve_bolt_hole("M1000").is_err());
    }
}
