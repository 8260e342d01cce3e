use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use dg_core::config::Config;
use dg_dfm::ShopProfile;
use dg_model::{classify, compile_plan, TemplateStore};
use dg_pipeline::{run as run_pipeline, RunOptions};
use dg_render::view::ViewGeometry;
use dg_render::revision::RevisionEntry;

#[derive(Parser)]
#[command(name = "drawgen", version, about = "Compile a part/assembly description into an ISO/KS engineering drawing package")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the part/assembly TOML config (shorthand for `render <file>`)
    config_file: Option<PathBuf>,

    /// Path to the kernel-projected per-view geometry JSON
    #[arg(short, long, global = true)]
    geometry: Option<PathBuf>,

    /// Directory of part-type template TOML files
    #[arg(long, global = true, default_value = "configs/templates")]
    templates: PathBuf,

    /// Named override preset, loaded from `<presets-dir>/<name>.toml` and
    /// deep-merged under the config's own `[drawing]` overrides
    #[arg(long, global = true)]
    preset: Option<String>,

    /// Directory holding override presets
    #[arg(long, global = true, default_value = "configs/overrides/presets")]
    presets_dir: PathBuf,

    /// Render plan-driven dimensions in addition to the automatic chain pass
    #[arg(long, global = true, default_value_t = true)]
    plan: bool,

    /// Disable plan-driven dimensions (wins over --plan)
    #[arg(long, global = true)]
    no_plan: bool,

    /// Drawing style profile
    #[arg(long, global = true, default_value = "ks")]
    profile: String,

    /// Compile and validate the plan and run DFM, but skip post-process/QA/repair
    #[arg(long, global = true)]
    dry_run: bool,

    /// Write the combined QA + DFM + post-process report as JSON to this path
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    /// Exit non-zero if the final QA score falls below this
    #[arg(long, global = true)]
    fail_under: Option<u32>,

    /// Output directory for the rendered SVG
    #[arg(short, long, global = true, default_value = "output")]
    output_dir: PathBuf,

    /// Manufacturing process override (machining|casting|sheet_metal|3d_printing)
    #[arg(long, global = true)]
    process: Option<String>,

    /// Tolerance grade label printed in the general notes (e.g. "m", "f", "c")
    #[arg(long, global = true, default_value = "m")]
    tolerance_grade: String,

    /// Default surface-finish Ra (micrometers) for the title-block symbol
    #[arg(long, global = true, default_value_t = 3.2)]
    surface_finish_ra: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the plan and render the full drawing package
    Render {
        /// Path to the part/assembly TOML config
        config_file: PathBuf,
    },
    /// Classify the part, compile the plan and print V1-V10 validation results
    Validate {
        /// Path to the part/assembly TOML config
        config_file: PathBuf,
    },
    /// Run the design-for-manufacturability analyzer only
    Dfm {
        /// Path to the part/assembly TOML config
        config_file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Render { config_file }) => run_render(config_file, &cli)?,
        Some(Commands::Validate { config_file }) => run_validate(config_file, &cli)?,
        Some(Commands::Dfm { config_file }) => run_dfm(config_file, &cli)?,
        None => {
            if let Some(ref config_file) = cli.config_file {
                run_render(config_file, &cli)?;
            } else {
                eprintln!("Usage: drawgen <CONFIG_FILE> or drawgen render <CONFIG_FILE>");
                eprintln!("Run 'drawgen --help' for more information.");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Reads the config file, deep-merges a named preset into its `[drawing]`
/// table and a `--process` override into `[manufacturing]`, then parses
/// the result. Config stays immutable from this point on.
fn load_config(config_file: &Path, cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let src = fs::read_to_string(config_file)?;
    let mut raw: toml::Value = toml::from_str(&src)?;

    if let Some(name) = &cli.preset {
        let preset_path = cli.presets_dir.join(format!("{name}.toml"));
        let preset_src = fs::read_to_string(&preset_path).map_err(|e| format!("could not read preset '{name}' at {}: {e}", preset_path.display()))?;
        let preset_val: toml::Value = toml::from_str(&preset_src)?;

        let table = raw.as_table_mut().ok_or("config root is not a table")?;
        let existing_drawing = table.get("drawing").cloned().unwrap_or(toml::Value::Table(Default::default()));
        let merged = dg_model::deep_merge(&existing_drawing, &preset_val);
        table.insert("drawing".to_string(), merged);
    }

    if let Some(process) = &cli.process {
        let table = raw.as_table_mut().ok_or("config root is not a table")?;
        let mut manufacturing = table.get("manufacturing").and_then(toml::Value::as_table).cloned().unwrap_or_default();
        manufacturing.insert("process".to_string(), toml::Value::String(process.clone()));
        table.insert("manufacturing".to_string(), toml::Value::Table(manufacturing));
    }

    let merged_src = toml::to_string(&raw)?;
    Ok(Config::parse(&merged_src)?)
}

fn load_templates(cli: &Cli) -> Result<TemplateStore, Box<dyn std::error::Error>> {
    Ok(TemplateStore::load_dir(&cli.templates)?)
}

fn load_geometry(cli: &Cli) -> Result<HashMap<String, ViewGeometry>, Box<dyn std::error::Error>> {
    match &cli.geometry {
        Some(path) => {
            let src = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&src)?)
        }
        None => Ok(HashMap::new()),
    }
}

fn run_options(cli: &Cli) -> RunOptions {
    RunOptions {
        plan_dimensions: cli.plan && !cli.no_plan,
        part_name: None,
        standard: "KS".to_string(),
        tolerance_grade: cli.tolerance_grade.clone(),
        surface_finish_ra: cli.surface_finish_ra,
        revisions: vec![RevisionEntry { rev: "A".to_string(), date: String::new(), description: "Initial release".to_string(), by: "-".to_string() }],
        shop_profile: ShopProfile::default(),
        fail_under: cli.fail_under,
        dry_run: cli.dry_run,
    }
}

fn run_render(config_file: &Path, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_file, cli)?;
    let templates = load_templates(cli)?;
    let geometry = load_geometry(cli)?;

    if cli.geometry.is_none() && !cli.dry_run {
        eprintln!("ERROR: --geometry is required unless --dry-run is set (no kernel view geometry supplied).");
        std::process::exit(1);
    }

    println!("Part type: {}", classify(&config));

    let options = run_options(cli);
    let outcome = match run_pipeline(&config, &templates, &geometry, &options) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    };

    for w in &outcome.warnings {
        eprintln!("WARNING: {w}");
    }

    fs::create_dir_all(&cli.output_dir)?;
    let part_slug = slugify(&outcome.plan.part_type);
    let svg_path = cli.output_dir.join(format!("{part_slug}.svg"));
    fs::write(&svg_path, &outcome.svg)?;
    println!("Drawing written to: {}", svg_path.display());

    if !cli.dry_run {
        println!("QA score: {:.1} (before repair: {:.1})", outcome.qa.score, outcome.qa_before_repair.score);
        if outcome.repair.is_some() {
            println!("Repair passes ran (hard gate or --fail-under threshold not met before repair).");
        }
        println!(
            "DFM: {} error(s), {} warning(s), {} info, score {}",
            outcome.dfm.summary.errors, outcome.dfm.summary.warnings, outcome.dfm.summary.info, outcome.dfm.score
        );
        for check in &outcome.dfm.checks {
            println!("  [{}] {}: {}", check.code, check.severity.as_str(), check.message);
        }
    }

    if let Some(report_path) = &cli.report {
        let report = serde_json::json!({
            "file": svg_path.to_string_lossy(),
            "qa": outcome.qa,
            "qa_before_repair": outcome.qa_before_repair,
            "postprocess": outcome.postprocess,
            "repair": outcome.repair,
            "dfm": outcome.dfm,
            "warnings": outcome.warnings,
        });
        fs::write(report_path, serde_json::to_string_pretty(&report)?)?;
        println!("Report written to: {}", report_path.display());
    }

    if let Some(floor) = cli.fail_under {
        if !cli.dry_run && (outcome.qa.score as i64) < floor as i64 {
            eprintln!("QA score {:.1} is below --fail-under {floor}", outcome.qa.score);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn run_validate(config_file: &Path, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_file, cli)?;
    let templates = load_templates(cli)?;

    let part_type = classify(&config);
    println!("Part type: {part_type}");

    match compile_plan(&config, &templates) {
        Ok((plan, graph, warnings)) => {
            println!("Schema version: {}", plan.schema_version);
            println!("Enabled views: {}", plan.views.enabled.join(", "));
            println!("Datums: {}", plan.datums.join(", "));
            println!("Feature groups: {}", graph.groups().len());
            println!("Dimension intents: {}", plan.dim_intents.len());
            for intent in &plan.dim_intents {
                let value = intent.value_mm.map(|v| format!("{v:.2}")).unwrap_or_else(|| "REVIEW".to_string());
                println!("  {:<12} {:<10} view={:<8} value={}", intent.id, intent.style.as_str(), intent.view, value);
            }
            if warnings.is_empty() {
                println!("Validation: passed with no warnings.");
            } else {
                println!("Validation warnings:");
                for w in &warnings {
                    println!("  {:?}: {}", w.code, w.message);
                }
            }
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn run_dfm(config_file: &Path, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_file, cli)?;
    let report = dg_dfm::run_checks(&config, &ShopProfile::default());

    println!("Process: {}, material: {}", report.process, report.material);
    println!("Checks: {} ({} error, {} warning, {} info)", report.summary.total, report.summary.errors, report.summary.warnings, report.summary.info);
    for check in &report.checks {
        println!("  [{}] {}: {}", check.code, check.severity.as_str(), check.message);
        if let Some(rec) = &check.recommendation {
            println!("      recommendation: {rec}");
        }
    }
    println!("DFM score: {}", report.score);

    if let Some(report_path) = &cli.report {
        fs::write(report_path, serde_json::to_string_pretty(&report)?)?;
        println!("Report written to: {}", report_path.display());
    }

    if !report.success {
        std::process::exit(1);
    }

    Ok(())
}

/// Filesystem-safe slug from a part type, used for the output file name.
fn slugify(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_lowercases_and_replaces_punctuation() {
        assert_eq!(slugify("Bolt Circle Flange"), "bolt_circle_flange");
    }
}
