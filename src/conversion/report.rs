//! Conversion summary types.
//!
//! A corpus conversion never stops at the first bad file. Everything that
//! went wrong or was dropped along the way lands here, in the same shape
//! the validation report uses for dataset issues.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Outcome of one corpus conversion run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversionSummary {
    /// Source format name.
    pub from: String,
    /// Target format name.
    pub to: String,
    /// Input files discovered.
    pub files_total: usize,
    /// Output files written.
    pub files_converted: usize,
    /// Objects read from input files that parsed.
    pub objects_read: usize,
    /// Objects written to output files.
    pub objects_written: usize,
    /// Objects dropped because their class did not resolve, by raw name.
    pub unresolved_classes: BTreeMap<String, usize>,
    /// XML objects skipped because they had no `<bndbox>`.
    pub objects_without_bbox: usize,
    /// Label files that held no objects.
    pub empty_label_files: Vec<PathBuf>,
    pub issues: Vec<ConversionIssue>,
}

impl ConversionSummary {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, issue: ConversionIssue) {
        self.issues.push(issue);
    }

    /// Files that produced no output.
    pub fn failed_count(&self) -> usize {
        self.count(ConversionSeverity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(ConversionSeverity::Warning)
    }

    pub fn info_count(&self) -> usize {
        self.count(ConversionSeverity::Info)
    }

    /// Total objects skipped for an unresolved class.
    pub fn unresolved_count(&self) -> usize {
        self.unresolved_classes.values().sum()
    }

    /// Returns true if nothing was failed, dropped or malformed.
    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0 && self.warning_count() == 0
    }

    fn count(&self, severity: ConversionSeverity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }
}

impl fmt::Display for ConversionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Converted {} -> {}", self.from, self.to)?;
        writeln!(
            f,
            "  {} of {} file(s) converted, {} of {} object(s) written",
            self.files_converted, self.files_total, self.objects_written, self.objects_read
        )?;

        if !self.unresolved_classes.is_empty() {
            writeln!(
                f,
                "  {} object(s) skipped for unresolved classes:",
                self.unresolved_count()
            )?;
            for (name, count) in &self.unresolved_classes {
                writeln!(f, "    {name}: {count}")?;
            }
        }
        if self.objects_without_bbox > 0 {
            writeln!(
                f,
                "  {} object(s) skipped without <bndbox>",
                self.objects_without_bbox
            )?;
        }
        if !self.empty_label_files.is_empty() {
            writeln!(f, "  {} empty label file(s)", self.empty_label_files.len())?;
        }

        for (severity, title) in [
            (ConversionSeverity::Error, "Failures"),
            (ConversionSeverity::Warning, "Warnings"),
            (ConversionSeverity::Info, "Notes"),
        ] {
            let count = self.count(severity);
            if count == 0 {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{title} ({count}):")?;
            for issue in self.issues.iter().filter(|i| i.severity == severity) {
                writeln!(f, "  - {issue}")?;
            }
        }

        Ok(())
    }
}

/// A single problem met during conversion.
#[derive(Clone, Debug, Serialize)]
pub struct ConversionIssue {
    pub severity: ConversionSeverity,
    pub code: ConversionIssueCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub message: String,
}

impl ConversionIssue {
    /// The file produced no output.
    pub fn error(code: ConversionIssueCode, path: PathBuf, message: impl Into<String>) -> Self {
        Self::new(ConversionSeverity::Error, code, Some(path), message)
    }

    /// Part of a file was dropped.
    pub fn warning(
        code: ConversionIssueCode,
        path: Option<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ConversionSeverity::Warning, code, path, message)
    }

    pub fn info(code: ConversionIssueCode, path: PathBuf, message: impl Into<String>) -> Self {
        Self::new(ConversionSeverity::Info, code, Some(path), message)
    }

    fn new(
        severity: ConversionSeverity,
        code: ConversionIssueCode,
        path: Option<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code,
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConversionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSeverity {
    Error,
    Warning,
    Info,
}

/// Stable issue codes for programmatic consumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionIssueCode {
    // whole-file failures
    /// The input file could not be read or parsed.
    UnreadableInput,
    /// Image size in the annotation is zero or negative.
    InvalidGeometry,
    /// Another input file already maps to the same output file.
    OutputCollision,
    /// No image with the label's stem was found.
    MissingImage,
    /// The image was found but its header could not be read.
    ImageProbeFailed,
    /// The output file could not be written.
    WriteFailed,

    // partial drops
    /// Objects skipped because their class is not in the registry.
    UnresolvedClass,
    /// A label line references a class id with no name.
    ClassIdOutOfRange,
    /// A label line could not be parsed.
    MalformedLine,
    /// XML objects without `<bndbox>` were skipped.
    MissingBoundingBox,

    // notes
    /// The label file holds no objects.
    EmptyLabelFile,
}
