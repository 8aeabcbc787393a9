//! Labelprep: dataset preparation for YOLO-style object detection.
//!
//! Labelprep takes an annotation corpus from Pascal-VOC XML to the
//! normalized one-line-per-box text format and back, checks a prepared
//! dataset for structural problems, reports class and per-image object
//! distributions, and writes reproducible train/val/test list files.
//!
//! # Modules
//!
//! - [`ir`]: Geometry, class ids, the annotation model and the format readers/writers
//! - [`classes`]: Class registry and class-list files
//! - [`conversion`]: Corpus conversion in both directions
//! - [`validation`]: Dataset validation and error reporting
//! - [`stats`]: Label distribution analysis
//! - [`split`]: Train/val/test splitting
//! - [`error`]: Error types for labelprep operations

pub mod classes;
pub mod conversion;
pub mod corpus;
pub mod error;
pub mod fsutil;
pub mod image_probe;
pub mod ir;
pub mod split;
pub mod stats;
pub mod validation;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use serde::Serialize;

use classes::{ClassRegistry, CLASSES_TXT};
use ir::DenormalizeMode;
use split::{LabelPolicy, PathStyle, SplitOptions};
use validation::ValidateOptions;

pub use error::LabelprepError;

/// The labelprep CLI application.
#[derive(Parser)]
#[command(name = "labelprep")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Count class names over an XML annotation corpus.
    Summarize(SummarizeArgs),
    /// Convert VOC XML annotations into normalized label files.
    Xml2yolo(Xml2YoloArgs),
    /// Convert normalized label files into VOC XML annotations.
    Yolo2xml(Yolo2XmlArgs),
    /// Validate an image/label directory pair.
    Validate(ValidateArgs),
    /// Report class and per-image object distributions.
    Stats(StatsArgs),
    /// Write train/val/test list files.
    Split(SplitArgs),
}

/// Report format on stdout.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Where class names come from. At most one may be given.
#[derive(clap::Args)]
#[group(multiple = false)]
struct ClassSourceArgs {
    /// Class config (YAML with `names` and optional `aliases`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Class list file (`classes.txt` or a YAML `names` file).
    #[arg(long)]
    classes: Option<PathBuf>,

    /// Comma-separated class names, id = position.
    #[arg(long, use_value_delimiter = true)]
    names: Vec<String>,
}

/// Arguments for the summarize subcommand.
#[derive(clap::Args)]
struct SummarizeArgs {
    /// Directory searched recursively for `.xml` files.
    xml_dir: PathBuf,

    /// Write the names, most frequent first, to this `classes.txt`.
    #[arg(long)]
    classes_out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

/// Arguments for the xml2yolo subcommand.
#[derive(clap::Args)]
struct Xml2YoloArgs {
    /// Directory searched recursively for `.xml` files.
    input: PathBuf,

    /// Directory receiving one `.txt` file per XML file.
    output_dir: PathBuf,

    #[command(flatten)]
    class_source: ClassSourceArgs,

    /// Order classes by frequency over the input corpus.
    #[arg(long, conflicts_with_all = ["config", "classes", "names"])]
    from_frequency: bool,

    /// YAML mapping of raw object names to registry names, applied first.
    #[arg(long)]
    class_map: Option<PathBuf>,

    /// Also write the registry's names to `classes.txt` in this directory.
    #[arg(long)]
    classes_txt_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

/// Arguments for the yolo2xml subcommand.
#[derive(clap::Args)]
struct Yolo2XmlArgs {
    /// Directory of `.txt` label files.
    labels_dir: PathBuf,

    /// Directory holding the images the labels belong to.
    images_dir: PathBuf,

    /// Directory receiving one `.xml` file per label file.
    xml_dir: PathBuf,

    #[command(flatten)]
    class_source: ClassSourceArgs,

    /// Reproduce the historical `+1` pixel bias with truncation.
    #[arg(long)]
    legacy_pixel_bias: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Directory of images.
    images_dir: PathBuf,

    /// Directory of `.txt` label files.
    labels_dir: PathBuf,

    /// Largest class id allowed (inclusive).
    #[arg(long)]
    max_class_id: Option<i64>,

    /// Images decoded by the integrity check; 0 checks all of them.
    #[arg(long, default_value_t = validation::DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,

    /// Seed for the integrity sample.
    #[arg(long, env = "LABELPREP_SEED")]
    seed: Option<u64>,

    /// Report file. Defaults to `dataset_validation_report.txt` next to the images directory.
    #[arg(long, env = "LABELPREP_VALIDATION_REPORT")]
    report: Option<PathBuf>,

    /// Do not write the report file.
    #[arg(long, conflicts_with = "report")]
    no_report: bool,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

/// Arguments for the stats subcommand.
#[derive(clap::Args)]
struct StatsArgs {
    /// Directory searched recursively for `.txt` label files.
    labels_dir: PathBuf,

    /// Class names file. Searched for in the labels directory when omitted.
    #[arg(long)]
    class_file: Option<PathBuf>,

    /// Directory the report file is saved to.
    #[arg(long, env = "LABELPREP_STATS_DIR", default_value = "./output")]
    output_dir: PathBuf,

    /// Print the report without saving it.
    #[arg(long)]
    no_save: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

/// Arguments for the split subcommand.
#[derive(clap::Args)]
struct SplitArgs {
    /// Image directories.
    #[arg(long = "images", required = true, num_args = 1..)]
    images: Vec<PathBuf>,

    /// Label directories, one per image directory. Omit to look for labels
    /// next to the images.
    #[arg(long = "labels", num_args = 1..)]
    labels: Vec<PathBuf>,

    /// Share of all images going to train+val.
    #[arg(long, default_value_t = 0.9, value_parser = validate_percent)]
    trainval_percent: f64,

    /// Share of train+val going to train.
    #[arg(long, default_value_t = 0.9, value_parser = validate_percent)]
    train_percent: f64,

    #[arg(long, env = "LABELPREP_SEED")]
    seed: Option<u64>,

    /// Split images without a label file too.
    #[arg(long)]
    keep_all: bool,

    /// Write paths as given instead of absolute.
    #[arg(long)]
    relative_paths: bool,

    /// Also write `{split}_labels.txt` files.
    #[arg(long)]
    label_lists: bool,

    /// Only collect images whose file name contains one of these.
    #[arg(long = "search", use_value_delimiter = true)]
    search: Vec<String>,

    /// Defaults to `Main` next to the first images directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

fn validate_percent(s: &str) -> Result<f64, String> {
    match f64::from_str(s) {
        Ok(val) if (0.0..=1.0).contains(&val) => Ok(val),
        _ => Err(format!("The value {} must be in the interval [0.0, 1.0]", s)),
    }
}

/// Run the labelprep CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LabelprepError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Summarize(args)) => run_summarize(args),
        Some(Commands::Xml2yolo(args)) => run_xml2yolo(args),
        Some(Commands::Yolo2xml(args)) => run_yolo2xml(args),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Stats(args)) => run_stats(args),
        Some(Commands::Split(args)) => run_split(args),
        None => {
            println!("labelprep {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Dataset preparation for YOLO-style object detection.");
            println!();
            println!("Run 'labelprep --help' for usage information.");
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), LabelprepError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|source| LabelprepError::ReportSerialize { source })?;
    println!("{}", json);
    Ok(())
}

/// Build the registry from an explicit source, if one was given.
fn explicit_registry(source: &ClassSourceArgs) -> Result<Option<ClassRegistry>, LabelprepError> {
    if let Some(path) = &source.config {
        return classes::load_class_config(path).map(Some);
    }
    if let Some(path) = &source.classes {
        return ClassRegistry::from_list(classes::load_class_names(path)?).map(Some);
    }
    if !source.names.is_empty() {
        return ClassRegistry::from_list(&source.names).map(Some);
    }
    Ok(None)
}

/// Execute the summarize subcommand.
fn run_summarize(args: SummarizeArgs) -> Result<(), LabelprepError> {
    let scan = classes::scan_class_frequency(&args.xml_dir)?;

    match args.output {
        OutputFormat::Json => print_json(&scan)?,
        OutputFormat::Text => {
            println!(
                "Found {} class(es), {} object(s) in {} XML file(s):",
                scan.counts.len(),
                scan.total_objects(),
                scan.files_scanned
            );
            for (name, count) in &scan.counts {
                println!("  {}: {}", name, count);
            }
            if !scan.failed_files.is_empty() {
                println!("{} file(s) could not be parsed:", scan.failed_files.len());
                for (path, reason) in &scan.failed_files {
                    println!("  {}: {}", path.display(), reason);
                }
            }
        }
    }

    if let Some(path) = &args.classes_out {
        let names: Vec<String> = scan.counts.iter().map(|(name, _)| name.clone()).collect();
        classes::write_classes_txt(path, &names)?;
        info!("Wrote {} class name(s) to {}", names.len(), path.display());
    }
    Ok(())
}

/// Execute the xml2yolo subcommand.
fn run_xml2yolo(args: Xml2YoloArgs) -> Result<(), LabelprepError> {
    let registry = match explicit_registry(&args.class_source)? {
        Some(registry) => registry,
        None if args.from_frequency => ClassRegistry::from_frequency_scan(&args.input)?,
        None => return Err(LabelprepError::MissingClassSource),
    };
    info!("Using {} class(es)", registry.id_count());

    let class_map = args
        .class_map
        .as_deref()
        .map(classes::load_class_map)
        .transpose()?;

    let summary =
        conversion::convert_corpus(&args.input, &args.output_dir, &registry, class_map.as_ref())?;

    if let Some(dir) = &args.classes_txt_dir {
        let path = dir.join(CLASSES_TXT);
        classes::write_classes_txt(&path, registry.names())?;
        info!("Wrote class list to {}", path.display());
    }

    finish_conversion(&summary, args.output)
}

/// Execute the yolo2xml subcommand.
fn run_yolo2xml(args: Yolo2XmlArgs) -> Result<(), LabelprepError> {
    let registry = match explicit_registry(&args.class_source)? {
        Some(registry) => registry,
        None => {
            let path = classes::discover_class_file(&args.labels_dir)
                .ok_or(LabelprepError::MissingClassSource)?;
            info!("Using class names from {}", path.display());
            ClassRegistry::from_list(classes::load_class_names(&path)?)?
        }
    };

    let mode = if args.legacy_pixel_bias {
        DenormalizeMode::Legacy
    } else {
        DenormalizeMode::Clean
    };

    let summary = conversion::convert_labels_to_voc(
        &args.labels_dir,
        &args.images_dir,
        &args.xml_dir,
        &registry,
        mode,
    )?;

    finish_conversion(&summary, args.output)
}

fn finish_conversion(
    summary: &conversion::ConversionSummary,
    output: OutputFormat,
) -> Result<(), LabelprepError> {
    match output {
        OutputFormat::Json => print_json(summary)?,
        OutputFormat::Text => print!("{}", summary),
    }

    if summary.failed_count() > 0 {
        Err(LabelprepError::ConversionFailed {
            failed: summary.failed_count(),
            total: summary.files_total,
        })
    } else {
        Ok(())
    }
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), LabelprepError> {
    let opts = ValidateOptions {
        max_class_id: args.max_class_id,
        sample_size: args.sample_size,
        seed: args.seed,
    };
    let report = validation::validate_dataset(&args.images_dir, &args.labels_dir, &opts)?;

    match args.output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print!("{}", report.console_summary()),
    }

    if !args.no_report {
        let path = args
            .report
            .unwrap_or_else(|| validation::default_report_path(&args.images_dir));
        report.write_to(&path)?;
        info!("Validation report saved to {}", path.display());
    }

    // Determine exit status
    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(LabelprepError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report: Box::new(report),
        })
    } else {
        Ok(())
    }
}

/// Execute the stats subcommand.
fn run_stats(args: StatsArgs) -> Result<(), LabelprepError> {
    let report = stats::analyze_labels(&args.labels_dir, args.class_file.as_deref())?;

    match args.output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print!("{}", report),
    }

    if !args.no_save {
        let path = stats_report_path(&args.output_dir);
        report.write_to(&path)?;
        info!("Analysis report saved to {}", path.display());
    }
    Ok(())
}

fn stats_report_path(output_dir: &Path) -> PathBuf {
    output_dir.join(stats::ANALYSIS_REPORT_FILE_NAME)
}

/// Execute the split subcommand.
fn run_split(args: SplitArgs) -> Result<(), LabelprepError> {
    let opts = SplitOptions {
        trainval_percent: args.trainval_percent,
        train_percent: args.train_percent,
        seed: args.seed,
        label_policy: if args.keep_all {
            LabelPolicy::KeepAll
        } else {
            LabelPolicy::KeepLabeledOnly
        },
        path_style: if args.relative_paths {
            PathStyle::AsGiven
        } else {
            PathStyle::Absolute
        },
        label_lists: args.label_lists,
        search_strings: args.search,
        output_dir: args.output_dir,
    };

    let summary = split::split_dataset(&args.images, &args.labels, &opts)?;

    match args.output {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Text => {
            print!("{}", summary);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn percent_parser_bounds() {
        assert_eq!(validate_percent("0.75"), Ok(0.75));
        assert_eq!(validate_percent("1"), Ok(1.0));
        assert!(validate_percent("1.01").is_err());
        assert!(validate_percent("-0.1").is_err());
        assert!(validate_percent("abc").is_err());
    }

    #[test]
    fn class_sources_resolve_in_order() {
        let source = ClassSourceArgs {
            config: None,
            classes: None,
            names: vec!["cat".to_string(), "dog".to_string()],
        };
        let registry = explicit_registry(&source).expect("registry").expect("some");
        assert_eq!(registry.names(), ["cat", "dog"]);

        let empty = ClassSourceArgs {
            config: None,
            classes: None,
            names: Vec::new(),
        };
        assert!(explicit_registry(&empty).expect("ok").is_none());
    }
}
