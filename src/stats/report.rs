//! Label distribution report types and text rendering.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::LabelprepError;
use crate::fsutil::write_atomic;
use crate::ir::io_yolo::MalformedLine;
use crate::ir::ClassId;

pub const ANALYSIS_REPORT_FILE_NAME: &str = "YOLO_Dataset_Analysis_Report.txt";

const BAR_WIDTH: usize = 20;

/// Class and per-image object distributions over a label corpus.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DistributionReport {
    pub labels_dir: PathBuf,
    /// Class-name file used, if any.
    pub class_file: Option<PathBuf>,
    pub generated_at: String,
    /// Label files that were parsed.
    pub total_label_files: usize,
    pub total_objects: usize,
    /// One entry per class id seen, ordered by id.
    pub classes: Vec<ClassShare>,
    /// Object count per file -> number of files with that count.
    pub objects_per_image: BTreeMap<usize, usize>,
    /// Class id -> (instances in one file -> number of files). Only files
    /// holding at least one instance of the class are counted.
    pub class_objects_per_image: BTreeMap<ClassId, BTreeMap<usize, usize>>,
    pub malformed_lines: Vec<MalformedLine>,
    /// Files that could not be read, with the reason.
    pub unreadable_files: Vec<(PathBuf, String)>,
}

/// Object count of one class.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassShare {
    pub id: ClassId,
    pub name: String,
    pub count: usize,
    /// Share of all objects, in percent.
    pub percent: f64,
}

impl DistributionReport {
    pub fn class_name(&self, id: ClassId) -> String {
        self.classes
            .iter()
            .find(|share| share.id == id)
            .map(|share| share.name.clone())
            .unwrap_or_else(|| format!("Class_{}", id))
    }

    /// The full report with its header, as written by [`Self::write_to`].
    pub fn render_text(&self) -> String {
        let mut text = String::new();
        text.push_str("YOLO Dataset Analysis Report\n");
        text.push_str(&"=".repeat(60));
        text.push('\n');
        text.push_str(&format!("Generated: {}\n", self.generated_at));
        text.push_str(&format!("Labels directory: {}\n", self.labels_dir.display()));
        text.push_str(&format!(
            "Class file: {}\n",
            self.class_file
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "none (class ids used as names)".to_string())
        ));
        text.push_str(&self.to_string());
        text
    }

    /// Save the full text report, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> Result<(), LabelprepError> {
        write_atomic(path, self.render_text().as_bytes())
    }

    fn fmt_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section(f, "Summary")?;
        writeln!(
            f,
            "  Label files:     {:>8}",
            format_number(self.total_label_files)
        )?;
        writeln!(
            f,
            "  Objects:         {:>8}",
            format_number(self.total_objects)
        )?;
        if !self.malformed_lines.is_empty() {
            writeln!(
                f,
                "  Malformed lines: {:>8}",
                format_number(self.malformed_lines.len())
            )?;
        }
        if !self.unreadable_files.is_empty() {
            writeln!(
                f,
                "  Unreadable files:{:>8}",
                format_number(self.unreadable_files.len())
            )?;
        }
        Ok(())
    }

    fn fmt_classes(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section(f, "Class distribution")?;
        let max_count = self.classes.iter().map(|c| c.count).max().unwrap_or(0);

        for share in &self.classes {
            writeln!(
                f,
                "  {} (ID: {}): {} ({:.1}%)  {}",
                share.name,
                share.id,
                format_number(share.count),
                share.percent,
                render_bar(share.count, max_count, BAR_WIDTH)
            )?;
        }
        Ok(())
    }

    fn fmt_objects_per_image(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section(f, "Objects per image")?;
        for (objects, images) in &self.objects_per_image {
            writeln!(
                f,
                "  {} object(s): {} image(s) ({})",
                objects,
                format_number(*images),
                fmt_percent(*images, self.total_label_files)
            )?;
        }
        Ok(())
    }

    fn fmt_class_objects_per_image(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section(f, "Per-class objects per image")?;
        for (id, histogram) in &self.class_objects_per_image {
            writeln!(f, "  {} (ID: {}):", self.class_name(*id), id)?;
            for (objects, images) in histogram {
                writeln!(
                    f,
                    "    {} object(s): {} image(s)",
                    objects,
                    format_number(*images)
                )?;
            }
        }
        Ok(())
    }

    fn fmt_problems(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.malformed_lines.is_empty() && self.unreadable_files.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        section(f, "Skipped input")?;
        for bad in &self.malformed_lines {
            writeln!(
                f,
                "  {}:{}: {} ('{}')",
                bad.path.display(),
                bad.line,
                bad.message,
                bad.raw
            )?;
        }
        for (path, reason) in &self.unreadable_files {
            writeln!(f, "  {}: {}", path.display(), reason)?;
        }
        Ok(())
    }
}

impl fmt::Display for DistributionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        self.fmt_summary(f)?;
        writeln!(f)?;
        self.fmt_classes(f)?;
        writeln!(f)?;
        self.fmt_objects_per_image(f)?;
        writeln!(f)?;
        self.fmt_class_objects_per_image(f)?;
        self.fmt_problems(f)?;
        Ok(())
    }
}

fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "── {} {}", title, "─".repeat(56usize.saturating_sub(title.len())))
}

/// Format a number with thousands separators.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format a percentage, handling zero denominators.
fn fmt_percent(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}%", (numerator as f64 / denominator as f64) * 100.0)
    }
}

/// Render a horizontal bar using Unicode block characters.
fn render_bar(count: usize, max_count: usize, width: usize) -> String {
    if max_count == 0 || width == 0 {
        return String::new();
    }

    let filled = ((count * width) / max_count).min(width);
    "█".repeat(filled) + &"░".repeat(width - filled)
}
