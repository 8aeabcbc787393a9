//! Dataset validation for labelprep.
//!
//! Validation of one `(images_dir, labels_dir)` pair runs as a fixed
//! sequence of stages, each consuming the previous stage's output:
//!
//! `Init -> ScanningFiles -> CheckingCorrespondence -> SamplingImageIntegrity
//! -> CheckingLabelSyntax -> Reporting -> Done`
//!
//! Per-file problems are collected into the [`ValidationReport`]; only a
//! missing input directory aborts the run.

mod report;

pub use report::{
    ConsoleSummary, IssueCode, IssueContext, SamplingInfo, Severity, ValidationCounts,
    ValidationIssue, ValidationReport, CONSOLE_ORPHAN_LIMIT,
};

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::corpus::{list_files_with_extensions, shuffle_seeded};
use crate::error::LabelprepError;
use crate::image_probe;
use crate::ir::io_yolo::{is_list_file, LABEL_EXTENSION};
use crate::ir::stem_of;

/// Image extensions the validator looks at.
pub const VALIDATE_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

pub const DEFAULT_SAMPLE_SIZE: usize = 100;

pub const DEFAULT_REPORT_FILE_NAME: &str = "dataset_validation_report.txt";

/// Options for validation behavior.
#[derive(Clone, Debug)]
pub struct ValidateOptions {
    /// Inclusive upper bound for class ids; `None` disables the check.
    pub max_class_id: Option<i64>,
    /// Images decoded by the integrity check; 0 means all of them.
    pub sample_size: usize,
    /// Seed for the integrity sample.
    pub seed: Option<u64>,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            max_class_id: None,
            sample_size: DEFAULT_SAMPLE_SIZE,
            seed: None,
        }
    }
}

/// Validation stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Init,
    ScanningFiles,
    CheckingCorrespondence,
    SamplingImageIntegrity,
    CheckingLabelSyntax,
    Reporting,
    Done,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Init => Some(Stage::ScanningFiles),
            Stage::ScanningFiles => Some(Stage::CheckingCorrespondence),
            Stage::CheckingCorrespondence => Some(Stage::SamplingImageIntegrity),
            Stage::SamplingImageIntegrity => Some(Stage::CheckingLabelSyntax),
            Stage::CheckingLabelSyntax => Some(Stage::Reporting),
            Stage::Reporting => Some(Stage::Done),
            Stage::Done => None,
        }
    }
}

struct StageTracker {
    current: Stage,
}

impl StageTracker {
    fn new() -> Self {
        debug!("validation stage: {:?}", Stage::Init);
        Self {
            current: Stage::Init,
        }
    }

    fn advance(&mut self) -> Stage {
        if let Some(next) = self.current.next() {
            self.current = next;
            debug!("validation stage: {:?}", next);
        }
        self.current
    }
}

/// Output of the file scan.
#[derive(Clone, Debug, Default)]
pub struct ScannedFiles {
    pub images: Vec<PathBuf>,
    pub labels: Vec<PathBuf>,
}

/// Output of the correspondence check.
#[derive(Clone, Debug, Default)]
pub struct Correspondence {
    pub matched_pairs: usize,
    pub images_without_label: Vec<String>,
    pub labels_without_image: Vec<String>,
    /// Stems carried by more than one image, with the colliding file names.
    pub collisions: Vec<(String, Vec<String>)>,
}

/// Output of the integrity sample.
#[derive(Clone, Debug, Default)]
pub struct IntegrityFindings {
    pub sampling: SamplingInfo,
    pub failures: Vec<(PathBuf, String)>,
}

/// Validate one image/label directory pair.
pub fn validate_dataset(
    images_dir: &Path,
    labels_dir: &Path,
    opts: &ValidateOptions,
) -> Result<ValidationReport, LabelprepError> {
    let mut stages = StageTracker::new();

    stages.advance();
    let scanned = scan_files(images_dir, labels_dir)?;
    info!(
        "Found {} image file(s) and {} label file(s)",
        scanned.images.len(),
        scanned.labels.len()
    );

    stages.advance();
    let correspondence = check_correspondence(&scanned);

    stages.advance();
    let integrity = sample_image_integrity(&scanned.images, opts.sample_size, opts.seed);

    stages.advance();
    let label_issues = check_label_syntax(&scanned.labels, opts.max_class_id);

    stages.advance();
    let report = build_report(
        images_dir,
        labels_dir,
        opts,
        &scanned,
        correspondence,
        integrity,
        label_issues,
    );

    stages.advance();
    Ok(report)
}

/// List images and label files (non-recursive). List files such as
/// `classes.txt` are not labels.
pub fn scan_files(images_dir: &Path, labels_dir: &Path) -> Result<ScannedFiles, LabelprepError> {
    for dir in [images_dir, labels_dir] {
        if !dir.is_dir() {
            return Err(LabelprepError::InputDirMissing {
                path: dir.to_path_buf(),
            });
        }
    }

    let images = list_files_with_extensions(images_dir, VALIDATE_IMAGE_EXTENSIONS)?;
    let labels = list_files_with_extensions(labels_dir, &[LABEL_EXTENSION])?
        .into_iter()
        .filter(|path| !is_list_file(path))
        .collect();

    Ok(ScannedFiles { images, labels })
}

/// Join images and labels by stem.
pub fn check_correspondence(scanned: &ScannedFiles) -> Correspondence {
    let mut image_stems: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for path in &scanned.images {
        if let (Some(stem), Some(name)) = (
            stem_of(path),
            path.file_name().and_then(|name| name.to_str()),
        ) {
            image_stems.entry(stem).or_default().push(name.to_string());
        }
    }
    let label_stems: BTreeSet<String> = scanned.labels.iter().filter_map(|p| stem_of(p)).collect();

    let images_without_label = image_stems
        .keys()
        .filter(|stem| !label_stems.contains(*stem))
        .cloned()
        .collect();
    let labels_without_image = label_stems
        .iter()
        .filter(|stem| !image_stems.contains_key(*stem))
        .cloned()
        .collect();
    let matched_pairs = label_stems
        .iter()
        .filter(|stem| image_stems.contains_key(*stem))
        .count();
    let collisions = image_stems
        .iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(stem, names)| (stem.clone(), names.clone()))
        .collect();

    Correspondence {
        matched_pairs,
        images_without_label,
        labels_without_image,
        collisions,
    }
}

/// Decode a random sample of at most `sample_size` images (all of them
/// when `sample_size` is 0 or covers the set).
pub fn sample_image_integrity(
    images: &[PathBuf],
    sample_size: usize,
    seed: Option<u64>,
) -> IntegrityFindings {
    let mut sample: Vec<&PathBuf> = images.iter().collect();
    let exhaustive = sample_size == 0 || sample_size >= images.len();
    if !exhaustive {
        shuffle_seeded(&mut sample, seed);
        sample.truncate(sample_size);
        sample.sort();
    }

    let failures = sample
        .iter()
        .filter_map(|path| {
            image_probe::check_decodes(path)
                .err()
                .map(|err| ((*path).clone(), err.to_string()))
        })
        .collect();

    IntegrityFindings {
        sampling: SamplingInfo {
            total_images: images.len(),
            sampled: sample.len(),
            exhaustive,
            seed,
        },
        failures,
    }
}

/// Check every label file line by line.
pub fn check_label_syntax(labels: &[PathBuf], max_class_id: Option<i64>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for path in labels {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                issues.push(ValidationIssue::for_code(
                    IssueCode::UnreadableLabel,
                    format!("cannot read label file: {err}"),
                    IssueContext::Label { path: path.clone() },
                ));
                continue;
            }
        };

        if content.trim().is_empty() {
            issues.push(ValidationIssue::for_code(
                IssueCode::EmptyAnnotation,
                "label file is empty",
                IssueContext::Label { path: path.clone() },
            ));
            continue;
        }

        for (idx, line) in content.lines().enumerate() {
            for (code, message) in check_label_line(line, max_class_id) {
                issues.push(ValidationIssue::for_code(
                    code,
                    message,
                    IssueContext::LabelLine {
                        path: path.clone(),
                        line: idx + 1,
                    },
                ));
            }
        }
    }

    issues
}

/// Classify one label line. Blank lines pass.
///
/// The line must be exactly an integer and four finite numbers. A line
/// that has that shape can still fail the range checks, each reported
/// separately.
pub fn check_label_line(line: &str, max_class_id: Option<i64>) -> Vec<(IssueCode, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let malformed = || {
        vec![(
            IssueCode::MalformedLine,
            format!("expected 'class_id cx cy w h', found '{trimmed}'"),
        )]
    };

    let tokens: Vec<&str> = trimmed.split_whitespace().take(6).collect();
    if tokens.len() != 5 {
        return malformed();
    }
    let Ok(class_id) = tokens[0].parse::<i64>() else {
        return malformed();
    };
    let mut values = [0.0f64; 4];
    for (slot, token) in values.iter_mut().zip(&tokens[1..]) {
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => *slot = value,
            _ => return malformed(),
        }
    }

    let mut problems = Vec::new();
    if values.iter().any(|value| !(0.0..=1.0).contains(value)) {
        problems.push((
            IssueCode::CoordinateOutOfRange,
            format!(
                "coordinates ({}, {}, {}, {}) outside [0, 1]",
                values[0], values[1], values[2], values[3]
            ),
        ));
    }
    if class_id < 0 {
        problems.push((
            IssueCode::NegativeClassId,
            format!("class id {class_id} is negative"),
        ));
    } else if let Some(max) = max_class_id {
        if class_id > max {
            problems.push((
                IssueCode::ClassIdOutOfRange,
                format!("class id {class_id} exceeds maximum {max}"),
            ));
        }
    }
    problems
}

/// Where the report goes when no path is given: next to the images
/// directory, in its parent.
pub fn default_report_path(images_dir: &Path) -> PathBuf {
    match images_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(DEFAULT_REPORT_FILE_NAME),
        _ => PathBuf::from(DEFAULT_REPORT_FILE_NAME),
    }
}

fn build_report(
    images_dir: &Path,
    labels_dir: &Path,
    opts: &ValidateOptions,
    scanned: &ScannedFiles,
    correspondence: Correspondence,
    integrity: IntegrityFindings,
    label_issues: Vec<ValidationIssue>,
) -> ValidationReport {
    let mut issues = Vec::new();

    for stem in &correspondence.images_without_label {
        issues.push(ValidationIssue::for_code(
            IssueCode::OrphanImage,
            format!("no {stem}.{LABEL_EXTENSION} in {}", labels_dir.display()),
            IssueContext::Stem {
                dir: images_dir.to_path_buf(),
                stem: stem.clone(),
            },
        ));
    }
    for stem in &correspondence.labels_without_image {
        issues.push(ValidationIssue::for_code(
            IssueCode::OrphanLabel,
            format!("no image named {stem} in {}", images_dir.display()),
            IssueContext::Label {
                path: labels_dir.join(format!("{stem}.{LABEL_EXTENSION}")),
            },
        ));
    }
    for (stem, names) in &correspondence.collisions {
        issues.push(ValidationIssue::for_code(
            IssueCode::BasenameCollision,
            format!("stem shared by {}", names.join(", ")),
            IssueContext::Stem {
                dir: images_dir.to_path_buf(),
                stem: stem.clone(),
            },
        ));
    }
    for (path, message) in &integrity.failures {
        issues.push(ValidationIssue::for_code(
            IssueCode::ImageDecodeFailure,
            message.clone(),
            IssueContext::Image { path: path.clone() },
        ));
    }
    issues.extend(label_issues);

    let count = |code: IssueCode| issues.iter().filter(|issue| issue.code == code).count();
    let counts = ValidationCounts {
        images: scanned.images.len(),
        labels: scanned.labels.len(),
        matched_pairs: correspondence.matched_pairs,
        orphan_images: correspondence.images_without_label.len(),
        orphan_labels: correspondence.labels_without_image.len(),
        corrupt_images: integrity.failures.len(),
        empty_label_files: count(IssueCode::EmptyAnnotation),
        malformed_lines: count(IssueCode::MalformedLine),
        out_of_range_coordinates: count(IssueCode::CoordinateOutOfRange),
        out_of_range_class_ids: count(IssueCode::ClassIdOutOfRange),
        negative_class_ids: count(IssueCode::NegativeClassId),
        basename_collisions: correspondence.collisions.len(),
    };

    ValidationReport {
        images_dir: images_dir.to_path_buf(),
        labels_dir: labels_dir.to_path_buf(),
        max_class_id: opts.max_class_id,
        generated_at: chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        counts,
        sampling: integrity.sampling,
        images_without_label: correspondence.images_without_label,
        labels_without_image: correspondence.labels_without_image,
        issues,
    }
}
