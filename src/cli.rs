// ============================================================================
// TourFE CLI: headless inspection and conversion of tour documents
// ============================================================================
//
// Usage examples:
//   TourFE --input DT_EX0001.json --check
//   TourFE -i DT_EX0001.json -o DT_EX0001.tfe            (format from output ext)
//   TourFE -i "exports/*.json" --output-dir projects/ --format tfe
//   TourFE -i tour.tfe -o tour.json --verbose
//
// Every image source is probed on the local filesystem; relative paths are
// resolved against the document's folder. Images that cannot be loaded are
// reported and dropped, the same way the editor's JSON import does.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::io::DocumentFormat;
use crate::probe::FsImageProbe;
use crate::project::Project;
use crate::settings::EditorSettings;

/// TourFE headless document tool.
#[derive(Parser, Debug)]
#[command(
    name = "TourFE",
    about = "Inspect, validate and convert tour layout documents",
    long_about = "Load tour documents (.json exports or .tfe projects), report their\n\
                  layout, and optionally write them back in either format.\n\n\
                  Example:\n  \
                  TourFE --input DT_EX0001.json --check\n  \
                  TourFE -i \"exports/*.json\" --output-dir projects/ --format tfe"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "exports/*.json").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch conversion.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: json or tfe. Inferred from --output when omitted.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Validate only; never write output.
    #[arg(long)]
    pub check: bool,

    /// Print the per-item layout and timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch conversion.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let writes = !args.check && (args.output.is_some() || args.output_dir.is_some() || args.format.is_some());

    if writes && let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let settings = EditorSettings::load();
    let total = inputs.len();
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        println!("[{}/{}] {}", idx + 1, total, input_path.display());
        let file_start = Instant::now();

        let output_path = if writes {
            match build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref(), format) {
                Some(p) => Some(p),
                None => {
                    eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
                    any_failure = true;
                    continue;
                }
            }
        } else {
            None
        };

        match run_one(input_path, output_path.as_deref(), &settings, args.verbose) {
            Ok(summary) => {
                println!("  {}", summary);
                if let Some(out) = &output_path {
                    println!(
                        "  → {} ({:.0}ms)",
                        out.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log::error!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file pipeline
// ============================================================================

/// Load, probe and validate one document, then write it when `output` is set.
/// Returns a one-line summary.
fn run_one(input: &Path, output: Option<&Path>, settings: &EditorSettings, verbose: bool) -> Result<String, String> {
    let base_dir = input.parent().unwrap_or(Path::new("."));
    let probe = FsImageProbe::with_base_dir(base_dir);

    let (mut project, skipped) = Project::open(input, settings, &probe).map_err(|e| format!("load failed: {}", e))?;
    for name in &skipped {
        println!("  skipped: {}", name);
    }

    let layout = project.layout();
    layout.validate().map_err(|e| format!("invalid layout: {}", e))?;

    if verbose {
        for (coords, column, item) in layout.iter_items() {
            println!(
                "  {} width {:.1} flex {:.1}  {}",
                coords, column.width_ratio, item.flex, item.src
            );
        }
    }
    if project.document().has_unpublished_images() {
        println!("  warning: some images use local data:/blob: sources");
    }

    let summary = format!(
        "\"{}\": {} group(s), {} image(s), {} skipped",
        project.document().title,
        layout.group_count(),
        layout.item_count(),
        skipped.len()
    );

    if let Some(out) = output {
        project.save(out).map_err(|e| format!("save failed: {}", e))?;
    }
    Ok(summary)
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Pick the output format from `--format`, else from the output extension,
/// else JSON.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<DocumentFormat, String> {
    if let Some(f) = format_arg {
        return match f.to_lowercase().as_str() {
            "json" => Ok(DocumentFormat::Json),
            "tfe" => Ok(DocumentFormat::Tfe),
            other => Err(format!("unknown format '{}' (expected json or tfe)", other)),
        };
    }
    if let Some(out) = output {
        return DocumentFormat::from_path(out)
            .ok_or_else(|| format!("cannot infer format from '{}'", out.display()));
    }
    Ok(DocumentFormat::Json)
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: DocumentFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_selection() {
        assert_eq!(parse_format(Some("TFE"), None), Ok(DocumentFormat::Tfe));
        assert_eq!(parse_format(None, Some(Path::new("a/b.json"))), Ok(DocumentFormat::Json));
        assert_eq!(parse_format(None, None), Ok(DocumentFormat::Json));
        assert!(parse_format(Some("png"), None).is_err());
        assert!(parse_format(None, Some(Path::new("x.png"))).is_err());
    }

    #[test]
    fn output_paths() {
        let input = Path::new("docs/tour.json");
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out")), DocumentFormat::Tfe),
            Some(PathBuf::from("out/tour.tfe"))
        );
        assert_eq!(
            build_output_path(input, None, None, DocumentFormat::Json),
            Some(PathBuf::from("docs/tour_out.json"))
        );
        assert_eq!(
            build_output_path(input, Some(Path::new("x.tfe")), None, DocumentFormat::Tfe),
            Some(PathBuf::from("x.tfe"))
        );
    }

    #[test]
    fn globs_expand_and_dedupe() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.json", "b.json", "c.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        let pattern = format!("{}/*.json", dir.path().display());
        let literal = dir.path().join("a.json").display().to_string();
        let found = resolve_inputs(&[literal, pattern]);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn converts_json_to_project_file() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbaImage::new(4, 2).save(dir.path().join("gate.png")).unwrap();
        let json = r#"{ "TITLE": "Gate", "INNER_IMAGES": [
            { "IMAGE_SRC": "gate.png", "TITLE": "Front" },
            { "IMAGE_SRC": "missing.png", "POSITION": { "GROUP": 1, "COL": 0, "ITEM": 0 } }
        ] }"#;
        let input = dir.path().join("tour.json");
        std::fs::write(&input, json).unwrap();
        let output = dir.path().join("tour.tfe");

        let summary = run_one(&input, Some(&output), &EditorSettings::default(), false).unwrap();
        assert_eq!(summary, "\"Gate\": 1 group(s), 1 image(s), 1 skipped");

        let (project, _) = Project::open(&output, &EditorSettings::default(), &FsImageProbe::new()).unwrap();
        assert_eq!(project.layout().item_count(), 1);
        assert_eq!(project.layout().groups[0].columns[0].items[0].dimensions.width, 4);
    }

    #[test]
    fn broken_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.json");
        std::fs::write(&input, "not json").unwrap();
        assert!(run_one(&input, None, &EditorSettings::default(), false).is_err());
    }
}
