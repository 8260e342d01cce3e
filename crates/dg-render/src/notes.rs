//! General notes block: a fixed category order, word-wrapped and
//! numbered, built from the manufacturing config and the standards
//! databases.

use dg_core::config::Config;
use dg_core::svg::Node;
use dg_standards::ks::{format_general_tolerance_note, resolve_surface_for_process};

pub const NOTES_FONT_SIZE_MM: f64 = 2.5;
pub const NOTES_LINE_PITCH_MM: f64 = 4.0;
pub const NOTES_START_Y_MM: f64 = 236.0;
pub const NOTES_MAX_Y_MM: f64 = 268.0;
pub const NOTES_MAX_WIDTH_MM: f64 = 120.0;
const CHAR_WIDTH_FACTOR: f64 = 0.55;

/// Character budget for a line of a given width/font size, matching the
/// `len * font_size * 0.55` text-width heuristic used throughout.
pub fn char_budget(max_width_mm: f64, font_size_mm: f64) -> usize {
    ((max_width_mm / (font_size_mm * CHAR_WIDTH_FACTOR)).floor() as usize).max(1)
}

/// Greedy word-wrap: append whole words while the running line stays
/// within `budget` characters; a single word longer than the budget is
/// kept whole on its own line rather than split.
pub fn word_wrap(text: &str, budget: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate_len = if current.is_empty() { word.len() } else { current.len() + 1 + word.len() };
        if candidate_len > budget && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn raw_str(config: &Config, table: &str, key: &str) -> Option<String> {
    config.raw.as_table()?.get(table)?.as_table()?.get(key)?.as_str().map(str::to_string)
}

/// Build the general notes in fixed category order: general tolerance,
/// default surface finish, edge treatment + deburr, material, heat
/// treatment, coating, units-in-mm. Categories with no applicable data
/// (surface finish without a process, heat treatment/coating unset) are
/// omitted rather than emitted empty.
pub fn build_category_notes(config: &Config, standard: &str, tolerance_grade: &str) -> Vec<String> {
    let mut notes = Vec::new();

    notes.push(format_general_tolerance_note(standard, tolerance_grade));

    if let Some(process) = config.manufacturing.process.as_deref() {
        if let Ok(sf) = resolve_surface_for_process(process) {
            notes.push(format!("DEFAULT SURFACE FINISH: Ra {} ({})", sf.typical_ra, process));
        }
    }

    notes.push("BREAK ALL SHARP EDGES 0.2-0.5MM, DEBURR ALL MACHINED EDGES".to_string());

    if let Some(material) = config.manufacturing.material.as_deref() {
        notes.push(format!("MATERIAL: {}", material));
    }

    if let Some(heat_treatment) = raw_str(config, "manufacturing", "heat_treatment") {
        notes.push(format!("HEAT TREATMENT: {}", heat_treatment));
    }

    if let Some(coating) = raw_str(config, "manufacturing", "coating") {
        notes.push(format!("COATING: {}", coating));
    }

    notes.push("ALL DIMENSIONS IN MILLIMETERS UNLESS OTHERWISE SPECIFIED".to_string());

    notes
}

/// Render numbered, word-wrapped notes starting at `(x, y_start)`,
/// stopping (without emitting a partial final line) once the next line
/// would exceed `NOTES_MAX_Y_MM`.
pub fn render_general_notes(notes: &[String], x: f64, y_start: f64) -> Node {
    let mut g = Node::new("g").with_attr("class", "general-notes");
    let budget = char_budget(NOTES_MAX_WIDTH_MM, NOTES_FONT_SIZE_MM);
    let mut y = y_start;
    for (i, note) in notes.iter().enumerate() {
        let wrapped = word_wrap(note, budget.saturating_sub(4));
        for (j, line) in wrapped.iter().enumerate() {
            if y > NOTES_MAX_Y_MM {
                return g;
            }
            let content = if j == 0 { format!("{}. {}", i + 1, line) } else { format!("   {}", line) };
            g.push_child(
                Node::new("text")
                    .with_attr("x", format!("{:.2}", x))
                    .with_attr("y", format!("{:.2}", y))
                    .with_attr("font-size", format!("{:.2}", NOTES_FONT_SIZE_MM))
                    .with_attr("fill", "#000")
                    .with_text(content),
            );
            y += NOTES_LINE_PITCH_MM;
        }
    }
    g
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_wrap_keeps_lines_within_budget() {
        let lines = word_wrap("ALL DIMENSIONS IN MILLIMETERS UNLESS OTHERWISE SPECIFIED", 20);
        assert!(lines.iter().all(|l| l.len() <= 20));
        assert!(lines.len() > 1);
    }

    #[test]
    fn word_wrap_keeps_overlong_word_whole() {
        let lines = word_wrap("SUPERCALIFRAGILISTICEXPIALIDOCIOUS", 5);
        assert_eq!(lines, vec!["SUPERCALIFRAGILISTICEXPIALIDOCIOUS"]);
    }

    #[test]
    fn category_order_is_fixed_and_units_note_always_present() {
        let mut config = Config::parse("[[shapes]]\nid=\"s1\"\ntype=\"box\"\nposition=[0,0,0]\nsize=[1,1,1]\n").unwrap();
        config.manufacturing.process = Some("milling".to_string());
        config.manufacturing.material = Some("Aluminum 6061".to_string());
        let notes = build_category_notes(&config, "KS B 0412", "m");
        assert!(notes[0].contains("KS B 0412"));
        assert!(notes.iter().any(|n| n.contains("Ra")));
        assert!(notes.iter().any(|n| n.contains("DEBURR")));
        assert!(notes.iter().any(|n| n.contains("Aluminum 6061")));
        assert_eq!(notes.last().unwrap(), "ALL DIMENSIONS IN MILLIMETERS UNLESS OTHERWISE SPECIFIED");
    }
}
