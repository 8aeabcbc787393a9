//! Validation report types for structured error reporting.
//!
//! A [`ValidationReport`] is built once at the end of a validation run and
//! can be printed as a console summary, saved as a sectioned text file, or
//! serialized to JSON.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::LabelprepError;
use crate::fsutil::write_atomic;

/// Orphan entries shown per list in the console summary.
pub const CONSOLE_ORPHAN_LIMIT: usize = 5;

/// The result of validating one image/label directory pair.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
    /// Inclusive class id bound, if one was checked.
    pub max_class_id: Option<i64>,
    /// Local time the report was produced.
    pub generated_at: String,
    pub counts: ValidationCounts,
    pub sampling: SamplingInfo,
    /// Image stems with no label file, sorted.
    pub images_without_label: Vec<String>,
    /// Label stems with no image, sorted.
    pub labels_without_image: Vec<String>,
    /// All issues found, in stage order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns the number of errors in the report.
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Returns the number of warnings in the report.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if validation passed in strict mode (no errors or warnings).
    pub fn is_ok_strict(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues_with_code(&self, code: IssueCode) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |issue| issue.code == code)
    }

    /// Short form for the terminal: counts plus the first few entries of
    /// each orphan list and issue kind.
    pub fn console_summary(&self) -> ConsoleSummary<'_> {
        ConsoleSummary(self)
    }

    /// The full report with its header, as written by [`Self::write_to`].
    pub fn render_text(&self) -> String {
        let mut text = String::new();
        text.push_str("Dataset Validation Report\n");
        text.push_str(&"=".repeat(50));
        text.push('\n');
        text.push_str(&format!("Generated: {}\n", self.generated_at));
        text.push_str(&format!("Images directory: {}\n", self.images_dir.display()));
        text.push_str(&format!("Labels directory: {}\n", self.labels_dir.display()));
        text.push_str(&format!(
            "Max class id: {}\n",
            self.max_class_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unlimited".to_string())
        ));
        text.push_str(&format!("Image integrity: {}\n\n", self.sampling));
        text.push_str(&self.to_string());
        text
    }

    /// Save the full text report, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> Result<(), LabelprepError> {
        write_atomic(path, self.render_text().as_bytes())
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.counts)?;
        writeln!(f)?;

        if !self.images_without_label.is_empty() {
            writeln!(f, "Images without a label file:")?;
            for stem in &self.images_without_label {
                writeln!(f, "  - {stem}.*")?;
            }
            writeln!(f)?;
        }
        if !self.labels_without_image.is_empty() {
            writeln!(f, "Label files without an image:")?;
            for stem in &self.labels_without_image {
                writeln!(f, "  - {stem}.txt")?;
            }
            writeln!(f)?;
        }

        if self.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(
            f,
            "Validation completed with {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        for (idx, issue) in self.issues.iter().enumerate() {
            writeln!(f, "{}. {}", idx + 1, issue)?;
        }

        Ok(())
    }
}

/// Console view of a [`ValidationReport`].
pub struct ConsoleSummary<'a>(&'a ValidationReport);

impl fmt::Display for ConsoleSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        write!(f, "{}", report.counts)?;
        writeln!(f, "Image integrity: {}", report.sampling)?;

        for (title, stems, suffix) in [
            ("Images without a label file", &report.images_without_label, ".*"),
            ("Label files without an image", &report.labels_without_image, ".txt"),
        ] {
            if stems.is_empty() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{title} ({}):", stems.len())?;
            for stem in stems.iter().take(CONSOLE_ORPHAN_LIMIT) {
                writeln!(f, "  - {stem}{suffix}")?;
            }
            if stems.len() > CONSOLE_ORPHAN_LIMIT {
                writeln!(f, "  ... and {} more", stems.len() - CONSOLE_ORPHAN_LIMIT)?;
            }
        }

        writeln!(f)?;
        if report.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }
        writeln!(
            f,
            "Validation completed with {} error(s) and {} warning(s)",
            report.error_count(),
            report.warning_count()
        )?;

        for code in IssueCode::ALL {
            if matches!(code, IssueCode::OrphanImage | IssueCode::OrphanLabel) {
                continue;
            }
            let matching: Vec<&ValidationIssue> = report.issues_with_code(code).collect();
            if matching.is_empty() {
                continue;
            }
            writeln!(f, "  {:?} ({}):", code, matching.len())?;
            for issue in matching.iter().take(CONSOLE_ORPHAN_LIMIT) {
                writeln!(f, "    {}: {}", issue.context, issue.message)?;
            }
        }

        Ok(())
    }
}

/// Tallies over the scanned directories.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationCounts {
    pub images: usize,
    pub labels: usize,
    pub matched_pairs: usize,
    pub orphan_images: usize,
    pub orphan_labels: usize,
    pub corrupt_images: usize,
    pub empty_label_files: usize,
    pub malformed_lines: usize,
    pub out_of_range_coordinates: usize,
    pub out_of_range_class_ids: usize,
    pub negative_class_ids: usize,
    pub basename_collisions: usize,
}

impl fmt::Display for ValidationCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Image files: {}", self.images)?;
        writeln!(f, "Label files: {}", self.labels)?;
        writeln!(f, "Matched pairs: {}", self.matched_pairs)?;
        writeln!(f, "Images without label: {}", self.orphan_images)?;
        writeln!(f, "Labels without image: {}", self.orphan_labels)?;
        writeln!(f, "Corrupt images (sampled): {}", self.corrupt_images)?;
        writeln!(f, "Empty label files: {}", self.empty_label_files)?;
        writeln!(f, "Malformed lines: {}", self.malformed_lines)?;
        writeln!(
            f,
            "Out-of-range coordinates: {}",
            self.out_of_range_coordinates
        )?;
        writeln!(f, "Out-of-range class ids: {}", self.out_of_range_class_ids)?;
        writeln!(f, "Negative class ids: {}", self.negative_class_ids)?;
        writeln!(f, "Basename collisions: {}", self.basename_collisions)
    }
}

/// How much of the image set the decode check covered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SamplingInfo {
    pub total_images: usize,
    pub sampled: usize,
    /// True when every image was decoded.
    pub exhaustive: bool,
    pub seed: Option<u64>,
}

impl fmt::Display for SamplingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exhaustive {
            write!(f, "all {} image(s) decoded", self.total_images)
        } else {
            write!(
                f,
                "random sample of {} out of {} image(s) decoded; this is a sampling check, not a full scan",
                self.sampled, self.total_images
            )?;
            if let Some(seed) = self.seed {
                write!(f, " (seed {seed})")?;
            }
            Ok(())
        }
    }
}

/// A single validation issue (error or warning).
#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    /// The severity of the issue.
    pub severity: Severity,

    /// A stable code for the issue type.
    pub code: IssueCode,

    /// A human-readable description of the issue.
    pub message: String,

    /// Where the issue occurred.
    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    /// Creates an issue with the default severity for `code`.
    pub fn for_code(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(code.severity(), code, message, context)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

/// The severity of a validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Suspicious but usable for training.
    Warning,
    /// Missing, corrupt or invalid data.
    Error,
}

/// A stable code identifying the type of validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    // correspondence
    /// An image has no label file with the same stem.
    OrphanImage,
    /// A label file has no image with the same stem.
    OrphanLabel,
    /// Several images in one directory share a stem.
    BasenameCollision,

    // integrity
    /// A sampled image failed to decode.
    ImageDecodeFailure,

    // label syntax
    /// The label file could not be read as text.
    UnreadableLabel,
    /// The label file is empty or whitespace only.
    EmptyAnnotation,
    /// A line is not `class_id cx cy w h`.
    MalformedLine,
    /// A coordinate lies outside `[0, 1]`.
    CoordinateOutOfRange,
    /// A class id exceeds the configured maximum.
    ClassIdOutOfRange,
    /// A class id is negative.
    NegativeClassId,
}

impl IssueCode {
    pub const ALL: [IssueCode; 10] = [
        IssueCode::OrphanImage,
        IssueCode::OrphanLabel,
        IssueCode::BasenameCollision,
        IssueCode::ImageDecodeFailure,
        IssueCode::UnreadableLabel,
        IssueCode::EmptyAnnotation,
        IssueCode::MalformedLine,
        IssueCode::CoordinateOutOfRange,
        IssueCode::ClassIdOutOfRange,
        IssueCode::NegativeClassId,
    ];

    pub fn severity(self) -> Severity {
        match self {
            IssueCode::BasenameCollision => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// Where a validation issue occurred.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    /// Issue with an image file.
    Image { path: PathBuf },
    /// Issue with a label file as a whole.
    Label { path: PathBuf },
    /// Issue with one line of a label file (1-based).
    LabelLine { path: PathBuf, line: usize },
    /// Issue with a stem shared by several files.
    Stem { dir: PathBuf, stem: String },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Image { path } | IssueContext::Label { path } => {
                write!(f, "{}", path.display())
            }
            IssueContext::LabelLine { path, line } => write!(f, "{}:{}", path.display(), line),
            IssueContext::Stem { dir, stem } => write!(f, "{}/{}.*", dir.display(), stem),
        }
    }
}
