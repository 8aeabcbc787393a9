//! YOLO normalized-label reader and writer.
//!
//! One label file per image, one object per line:
//! `<class_id> <cx> <cy> <w> <h>`, all geometry as fractions of the image
//! size. Reading never aborts on a bad line: the line is reported as a
//! [`MalformedLine`] and left out of the result.

use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use super::{ClassId, YoloBox};
use crate::error::LabelprepError;
use crate::fsutil::write_atomic;

pub const LABEL_EXTENSION: &str = "txt";

/// Split and class lists that share the `.txt` extension but are not labels.
pub const LIST_FILE_NAMES: &[&str] = &[
    "classes.txt",
    "train.txt",
    "val.txt",
    "test.txt",
    "trainval.txt",
];

/// One parsed label line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelRow {
    pub class_id: ClassId,
    pub bbox: YoloBox,
}

impl LabelRow {
    pub fn new(class_id: impl Into<ClassId>, bbox: YoloBox) -> Self {
        Self {
            class_id: class_id.into(),
            bbox,
        }
    }
}

/// A label line that failed shape or numeric parsing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MalformedLine {
    pub path: PathBuf,
    /// 1-based line number.
    pub line: usize,
    pub raw: String,
    pub message: String,
}

/// Result of reading one label file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelFile {
    pub rows: Vec<LabelRow>,
    pub malformed: Vec<MalformedLine>,
}

/// How [`write_label_file`] treats an existing file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WriteMode {
    #[default]
    Overwrite,
    Append,
}

/// Read a label file, skipping blank lines and collecting malformed ones.
pub fn read_label_file(path: &Path) -> Result<LabelFile, LabelprepError> {
    let content = fs::read_to_string(path).map_err(LabelprepError::Io)?;
    Ok(parse_label_str(&content, path))
}

/// Returns true for list files such as `classes.txt` or `train.txt`.
pub fn is_list_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| LIST_FILE_NAMES.contains(&name))
        .unwrap_or(false)
}

/// Collect label files under `dir`, sorted by path, leaving out list files.
///
/// Without `recursive` only the top level of `dir` is listed.
pub fn collect_label_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, LabelprepError> {
    if !dir.is_dir() {
        return Err(LabelprepError::InputDirMissing {
            path: dir.to_path_buf(),
        });
    }

    let mut walker = WalkDir::new(dir).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| LabelprepError::Traverse {
            path: dir.to_path_buf(),
            message: source.to_string(),
        })?;
        let path = entry.path();
        let is_label = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(LABEL_EXTENSION))
            .unwrap_or(false);

        if entry.file_type().is_file() && is_label && !is_list_file(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Parse label file content held in memory.
pub fn parse_label_str(content: &str, path: &Path) -> LabelFile {
    let mut parsed = LabelFile::default();

    for (line_idx, line) in content.lines().enumerate() {
        match parse_label_line(line) {
            Ok(Some(row)) => parsed.rows.push(row),
            Ok(None) => {}
            Err(message) => parsed.malformed.push(MalformedLine {
                path: path.to_path_buf(),
                line: line_idx + 1,
                raw: line.to_string(),
                message,
            }),
        }
    }

    parsed
}

/// Parse a single label line.
///
/// Returns `Ok(None)` for blank lines. Tokens past the fifth are ignored.
pub fn parse_label_line(line: &str) -> Result<Option<LabelRow>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Take at most 5 tokens so pathological inputs do not allocate unbounded memory.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(5).collect();
    if tokens.len() < 5 {
        return Err(format!("expected 5 tokens, found {}", tokens.len()));
    }

    let class_id = tokens[0].parse::<usize>().map_err(|_| {
        format!(
            "invalid class_id '{}'; expected non-negative integer",
            tokens[0]
        )
    })?;

    let cx = parse_f64_token(tokens[1], "x_center")?;
    let cy = parse_f64_token(tokens[2], "y_center")?;
    let w = parse_f64_token(tokens[3], "width")?;
    let h = parse_f64_token(tokens[4], "height")?;

    Ok(Some(LabelRow::new(
        class_id,
        YoloBox::from_cxcywh(cx, cy, w, h),
    )))
}

/// Fuzz-only entrypoint for single-line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Result<(), String> {
    let _ = parse_label_line(input)?;
    Ok(())
}

fn parse_f64_token(raw: &str, field_name: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(format!(
            "invalid {field_name} '{raw}'; expected finite floating-point number"
        )),
    }
}

/// Format one row the way label files store it.
pub fn format_label_line(row: &LabelRow) -> String {
    let (cx, cy, w, h) = row.bbox.to_tuple();
    format!("{} {:.6} {:.6} {:.6} {:.6}", row.class_id, cx, cy, w, h)
}

/// Serialize rows into label file content.
pub fn to_label_string(rows: &[LabelRow]) -> String {
    let mut out = String::new();
    for row in rows {
        writeln!(out, "{}", format_label_line(row)).expect("write to string");
    }
    out
}

/// Write rows to a label file.
///
/// Overwrites go through a temporary file in the same directory so an
/// interrupted run never leaves a truncated label behind.
pub fn write_label_file(
    path: &Path,
    rows: &[LabelRow],
    mode: WriteMode,
) -> Result<(), LabelprepError> {
    let content = to_label_string(rows);

    match mode {
        WriteMode::Overwrite => write_atomic(path, content.as_bytes()),
        WriteMode::Append => {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(LabelprepError::Io)?;
            file.write_all(content.as_bytes())
                .map_err(LabelprepError::Io)
        }
    }
}
