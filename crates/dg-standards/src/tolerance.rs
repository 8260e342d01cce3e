//! ISO 286 standard tolerance database: IT grade tolerances, fundamental
//! deviations, and fit calculations. All table values are in micrometers,
//! converted to mm at the API boundary.

use crate::error::StandardsError;

/// Diameter ranges (mm), ISO 286 table boundaries.
const DIAMETER_RANGES: [(f64, f64); 13] = [
    (1.0, 3.0),
    (3.0, 6.0),
    (6.0, 10.0),
    (10.0, 18.0),
    (18.0, 30.0),
    (30.0, 50.0),
    (50.0, 80.0),
    (80.0, 120.0),
    (120.0, 180.0),
    (180.0, 250.0),
    (250.0, 315.0),
    (315.0, 400.0),
    (400.0, 500.0),
];

const IT6: [u32; 13] = [6, 8, 9, 11, 13, 16, 19, 22, 25, 29, 32, 36, 40];
const IT7: [u32; 13] = [10, 12, 15, 18, 21, 25, 30, 35, 40, 46, 52, 57, 63];
const IT8: [u32; 13] = [14, 18, 22, 27, 33, 39, 46, 54, 63, 72, 81, 89, 97];
const IT9: [u32; 13] = [25, 30, 36, 43, 52, 62, 74, 87, 100, 115, 130, 140, 155];
const IT10: [u32; 13] = [40, 48, 58, 70, 84, 100, 120, 140, 160, 185, 210, 230, 250];
const IT11: [u32; 13] = [60, 75, 90, 110, 130, 160, 190, 220, 250, 290, 320, 360, 400];

/// ISO 286 steps tighten by roughly this factor per grade (the R10
/// preferred-number ratio, 10^(1/5)); IT5 is synthesized one step
/// tighter than IT6 rather than left as a dead lookup (see DESIGN.md
/// Open Questions).
const IT_GRADE_STEP: f64 = 1.6;

fn it_value_um(grade: u8, idx: usize) -> Result<f64, StandardsError> {
    let table: &[u32; 13] = match grade {
        6 => &IT6,
        7 => &IT7,
        8 => &IT8,
        9 => &IT9,
        10 => &IT10,
        11 => &IT11,
        5 => return Ok((IT6[idx] as f64 / IT_GRADE_STEP).max(1.0)),
        _ => return Err(StandardsError::UnknownGrade(grade)),
    };
    Ok(table[idx] as f64)
}

/// Shaft deviation letters d..h: fundamental deviation is the upper
/// deviation (es); lower = es - IT.
fn shaft_upper_dev_um(letter: &str, idx: usize) -> Option<i32> {
    let table: [i32; 13] = match letter {
        "h" => [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        "g" => [-2, -4, -5, -6, -7, -9, -10, -12, -14, -15, -17, -18, -20],
        "f" => [-6, -10, -13, -16, -20, -25, -30, -36, -43, -50, -56, -62, -68],
        "e" => [-14, -20, -25, -32, -40, -50, -60, -72, -85, -100, -110, -125, -135],
        "d" => [-20, -30, -40, -50, -65, -80, -100, -120, -145, -170, -190, -210, -230],
        _ => return None,
    };
    Some(table[idx])
}

/// Shaft deviation letters k..s: fundamental deviation is the lower
/// deviation (ei); upper = ei + IT.
fn shaft_lower_dev_um(letter: &str, idx: usize) -> Option<i32> {
    let table: [i32; 13] = match letter {
        "k" => [0, 1, 1, 1, 2, 2, 2, 3, 3, 4, 4, 4, 5],
        "m" => [2, 4, 6, 7, 8, 9, 11, 13, 15, 17, 20, 21, 23],
        "n" => [4, 8, 10, 12, 15, 17, 20, 23, 27, 31, 34, 37, 40],
        "p" => [6, 12, 15, 18, 22, 26, 32, 37, 43, 50, 56, 62, 68],
        "s" => [14, 19, 23, 28, 35, 43, 53, 59, 68, 79, 88, 98, 108],
        _ => return None,
    };
    Some(table[idx])
}

/// Hole deviation letters F..H: fundamental deviation is the lower
/// deviation (EI); upper = EI + IT.
fn hole_lower_dev_um(letter: &str, idx: usize) -> Option<i32> {
    let table: [i32; 13] = match letter {
        "H" => [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        "G" => [2, 4, 5, 6, 7, 9, 10, 12, 14, 15, 17, 18, 20],
        "F" => [6, 10, 13, 16, 20, 25, 30, 36, 43, 50, 56, 62, 68],
        _ => return None,
    };
    Some(table[idx])
}

/// Hole deviation letters K..P: fundamental deviation is the upper
/// deviation (ES); lower = ES - IT.
fn hole_upper_dev_um(letter: &str, idx: usize) -> Option<i32> {
    let table: [i32; 13] = match letter {
        "K" => [0, -1, -1, -1, -2, -2, -2, -3, -3, -4, -4, -4, -5],
        "N" => [-4, -8, -10, -12, -15, -17, -20, -23, -27, -31, -34, -37, -40],
        "P" => [-6, -12, -15, -18, -22, -26, -32, -37, -43, -50, -56, -62, -68],
        _ => return None,
    };
    Some(table[idx])
}

fn range_index(diameter: f64) -> usize {
    for (i, (lo, hi)) in DIAMETER_RANGES.iter().enumerate() {
        if diameter >= *lo && diameter <= *hi {
            return i;
        }
    }
    if diameter < DIAMETER_RANGES[0].0 {
        0
    } else {
        DIAMETER_RANGES.len() - 1
    }
}

/// Common standard diameters (mm), used by `fuzzy_match_diameter`.
const STANDARD_DIAMETERS: &[f64] = &[
    1.0, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 12.0, 14.0, 15.0, 16.0, 18.0, 20.0, 22.0, 24.0, 25.0,
    28.0, 30.0, 32.0, 35.0, 36.0, 38.0, 40.0, 42.0, 45.0, 48.0, 50.0, 55.0, 56.0, 60.0, 63.0, 65.0, 70.0, 71.0, 75.0,
    80.0, 85.0, 90.0, 95.0, 100.0, 105.0, 110.0, 115.0, 120.0, 125.0, 130.0, 140.0, 150.0, 160.0, 170.0, 180.0, 190.0,
    200.0, 220.0, 250.0, 280.0, 300.0, 315.0, 350.0, 400.0, 450.0, 500.0,
];

/// Snap a measured diameter to the nearest standard value within
/// `tolerance`, falling back to the nearest half-millimetre.
pub fn fuzzy_match_diameter(measured_d: f64, tolerance: f64) -> f64 {
    let round_half = (measured_d * 2.0).round() / 2.0;

    let mut best = measured_d;
    let mut best_diff = tolerance;
    for &s in STANDARD_DIAMETERS {
        let diff = (measured_d - s).abs();
        if diff < best_diff {
            best = s;
            best_diff = diff;
        }
    }

    if (measured_d - round_half).abs() < best_diff {
        round_half
    } else {
        best
    }
}

fn parse_spec(spec: &str) -> Result<(String, u8), StandardsError> {
    let letter: String = spec.chars().take_while(|c| c.is_alphabetic()).collect();
    let grade_str: String = spec.chars().skip_while(|c| c.is_alphabetic()).collect();
    let grade: u8 = grade_str.parse().map_err(|_| StandardsError::MalformedSpec(spec.to_string()))?;
    Ok((letter, grade))
}

/// Upper/lower deviation in mm for `diameter` under a fit spec like `H7`
/// or `g6`.
pub fn get_tolerance(diameter: f64, spec: &str) -> Result<(f64, f64), StandardsError> {
    let (letter, grade) = parse_spec(spec)?;
    let idx = range_index(diameter);
    let it_um = it_value_um(grade, idx)?;
    let is_hole = letter.chars().next().map(char::is_uppercase).unwrap_or(false);

    let (upper_um, lower_um) = if is_hole {
        if letter == "JS" {
            (it_um / 2.0, -it_um / 2.0)
        } else if let Some(ei) = hole_lower_dev_um(&letter, idx) {
            (ei as f64 + it_um, ei as f64)
        } else if let Some(es) = hole_upper_dev_um(&letter, idx) {
            (es as f64, es as f64 - it_um)
        } else {
            return Err(StandardsError::UnknownDeviationLetter(letter));
        }
    } else if letter == "js" {
        (it_um / 2.0, -it_um / 2.0)
    } else if let Some(es) = shaft_upper_dev_um(&letter, idx) {
        (es as f64, es as f64 - it_um)
    } else if let Some(ei) = shaft_lower_dev_um(&letter, idx) {
        (ei as f64 + it_um, ei as f64)
    } else {
        return Err(StandardsError::UnknownDeviationLetter(letter));
    };

    Ok((upper_um / 1000.0, lower_um / 1000.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitType {
    Clearance,
    Transition,
    Interference,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub fit_type: FitType,
    pub clearance_min: f64,
    pub clearance_max: f64,
    pub hole_upper: f64,
    pub hole_lower: f64,
    pub shaft_upper: f64,
    pub shaft_lower: f64,
}

/// Fit characteristics for a hole/shaft pair at a nominal diameter.
pub fn get_fit(diameter: f64, hole_spec: &str, shaft_spec: &str) -> Result<FitResult, StandardsError> {
    let (hole_upper, hole_lower) = get_tolerance(diameter, hole_spec)?;
    let (shaft_upper, shaft_lower) = get_tolerance(diameter, shaft_spec)?;

    let clearance_max = hole_upper - shaft_lower;
    let clearance_min = hole_lower - shaft_upper;

    let fit_type = if clearance_min > 0.0 {
        FitType::Clearance
    } else if clearance_max < 0.0 {
        FitType::Interference
    } else {
        FitType::Transition
    };

    Ok(FitResult {
        fit_type,
        clearance_min: dg_core::geometry::round_to(clearance_min, 4),
        clearance_max: dg_core::geometry::round_to(clearance_max, 4),
        hole_upper: dg_core::geometry::round_to(hole_upper, 4),
        hole_lower: dg_core::geometry::round_to(hole_lower, 4),
        shaft_upper: dg_core::geometry::round_to(shaft_upper, 4),
        shaft_lower: dg_core::geometry::round_to(shaft_lower, 4),
    })
}

/// Recommended fit class for a stated application purpose.
pub fn recommend_fit(purpose: &str) -> Option<&'static str> {
    match purpose {
        "rotating_shaft" | "bearing_shaft" => Some("H7/g6"),
        "sliding" => Some("H7/h6"),
        "location" | "bearing_housing" => Some("H7/k6"),
        "light_press" => Some("H7/n6"),
        "press_fit" | "gear_on_shaft" => Some("H7/p6"),
        "free_clearance" => Some("H11/d11"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it7_at_50mm_is_25_micron() {
        let (upper, lower) = get_tolerance(50.0, "H7").unwrap();
        assert!((upper - 0.025).abs() < 0.0001);
        assert!((lower - 0.0).abs() < 0.0001);
    }

    #[test]
    fn h7_g6_fit_at_25mm_is_clearance() {
        let fit = get_fit(25.0, "H7", "g6").unwrap();
        assert_eq!(fit.fit_type, FitType::Clearance);
        assert!((fit.hole_upper - 0.021).abs() < 0.0001);
        assert!((fit.hole_lower - 0.0).abs() < 0.0001);
        assert!((fit.shaft_upper - (-0.007)).abs() < 0.0001);
        assert!((fit.shaft_lower - (-0.020)).abs() < 0.0001);
        assert!((fit.clearance_min - 0.007).abs() < 0.0001);
        assert!((fit.clearance_max - 0.041).abs() < 0.0001);
    }

    #[test]
    fn unknown_grade_is_an_error() {
        let err = get_tolerance(25.0, "H12").unwrap_err();
        assert!(matches!(err, StandardsError::UnknownGrade(12)));
    }

    #[test]
    fn grade5_is_tighter_than_grade6() {
        let (g5_upper, _) = get_tolerance(50.0, "H5").unwrap();
        let (g6_upper, _) = get_tolerance(50.0, "H6").unwrap();
        assert!(g5_upper < g6_upper);
        assert!(g5_upper > 0.0);
    }

    #[test]
    fn fuzzy_match_snaps_to_nearest_standard() {
        assert_eq!(fuzzy_match_diameter(19.998, 0.05), 20.0);
        assert_eq!(fuzzy_match_diameter(24.97, 0.05), 25.0);
    }
}
