//! Class registry: maps class names to dense integer ids.
//!
//! A registry is built once per run from one of three sources and is then
//! read-only:
//!
//! - an explicit ordered list (id = position),
//! - a canonical list plus an alias table (alias -> canonical -> position),
//! - a frequency scan over an XML corpus (most frequent class gets id 0).
//!
//! Class-list files (`classes.txt`, `data.yaml`-style documents and the
//! class config) are loaded by the [`io`] submodule.

pub mod io;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::error::LabelprepError;
use crate::ir::io_voc_xml::{collect_xml_files, read_voc_xml};
use crate::ir::ClassId;

pub use io::{
    discover_class_file, load_class_config, load_class_map, load_class_names, write_classes_txt,
    ClassConfig, CLASSES_TXT,
};

/// Name-to-id mapping shared read-only by conversion and analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassRegistry {
    names: Vec<String>,
    index: HashMap<String, ClassId>,
    aliases: HashMap<String, String>,
    counts: Option<Vec<(String, usize)>>,
}

impl ClassRegistry {
    /// Builds a registry where each name's id is its position in `names`.
    ///
    /// Names are trimmed; blank or duplicate names are rejected.
    pub fn from_list<I, S>(names: I) -> Result<Self, LabelprepError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Vec::new();
        let mut index = HashMap::new();

        for (position, raw) in names.into_iter().enumerate() {
            let name = raw.as_ref().trim();
            if name.is_empty() {
                return Err(LabelprepError::InvalidClassList {
                    message: format!("class name at position {position} is empty"),
                });
            }
            if index.insert(name.to_string(), ClassId(position)).is_some() {
                return Err(LabelprepError::InvalidClassList {
                    message: format!("duplicate class name '{name}'"),
                });
            }
            list.push(name.to_string());
        }

        Ok(Self {
            names: list,
            index,
            aliases: HashMap::new(),
            counts: None,
        })
    }

    /// Builds a registry from a canonical list and an alias table.
    ///
    /// Every alias must point at a canonical name.
    pub fn from_remap<I, S>(
        canonical: I,
        alias_to_canonical: &BTreeMap<String, String>,
    ) -> Result<Self, LabelprepError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::from_list(canonical)?;

        for (alias, target) in alias_to_canonical {
            let target = target.trim();
            if !registry.index.contains_key(target) {
                return Err(LabelprepError::InvalidClassList {
                    message: format!(
                        "alias '{alias}' points at '{target}', which is not a canonical class"
                    ),
                });
            }
            registry
                .aliases
                .insert(alias.trim().to_string(), target.to_string());
        }

        Ok(registry)
    }

    /// Builds a registry from class frequencies over every `.xml` file
    /// under `xml_dir`.
    pub fn from_frequency_scan(xml_dir: &Path) -> Result<Self, LabelprepError> {
        Self::from_frequency(scan_class_frequency(xml_dir)?)
    }

    /// Builds a registry from an already computed frequency scan.
    pub fn from_frequency(scan: ClassFrequency) -> Result<Self, LabelprepError> {
        let mut registry = Self::from_list(scan.counts.iter().map(|(name, _)| name))?;
        registry.counts = Some(scan.counts);
        Ok(registry)
    }

    /// Resolves a raw class name, applying the alias table first.
    pub fn resolve(&self, name: &str) -> Option<ClassId> {
        let name = name.trim();
        let canonical = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.index.get(canonical).copied()
    }

    /// Number of canonical classes.
    pub fn id_count(&self) -> usize {
        self.names.len()
    }

    /// Canonical names in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, id: ClassId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    /// Per-name occurrence counts, present only for frequency-scan registries.
    pub fn counts(&self) -> Option<&[(String, usize)]> {
        self.counts.as_deref()
    }
}

/// Class occurrence counts over an XML corpus.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ClassFrequency {
    /// Names ordered by descending count, ties in first-seen order.
    pub counts: Vec<(String, usize)>,
    pub files_scanned: usize,
    /// Files that could not be parsed, with the reason.
    pub failed_files: Vec<(PathBuf, String)>,
}

impl ClassFrequency {
    pub fn total_objects(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }
}

/// Counts class names over every `.xml` file under `xml_dir`.
///
/// Files are visited in sorted path order so that first-seen tie breaking
/// is stable across runs. Unparseable files are logged and recorded.
pub fn scan_class_frequency(xml_dir: &Path) -> Result<ClassFrequency, LabelprepError> {
    let files = collect_xml_files(xml_dir)?;
    info!(
        "Scanning {} XML file(s) under {}",
        files.len(),
        xml_dir.display()
    );

    let mut tally = NameTally::default();
    let mut failed_files = Vec::new();

    for path in &files {
        match read_voc_xml(path) {
            Ok(document) => tally.merge(
                document
                    .image
                    .annotations
                    .iter()
                    .map(|annotation| annotation.name.as_str()),
            ),
            Err(err) => {
                warn!("{}: {}", path.display(), err);
                failed_files.push((path.clone(), err.to_string()));
            }
        }
    }

    Ok(ClassFrequency {
        counts: tally.into_ordered(),
        files_scanned: files.len(),
        failed_files,
    })
}

/// Running name counts that remember first-seen order.
#[derive(Default)]
struct NameTally {
    order: Vec<String>,
    counts: HashMap<String, usize>,
}

impl NameTally {
    fn merge<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            match self.counts.get_mut(name) {
                Some(count) => *count += 1,
                None => {
                    self.order.push(name.to_string());
                    self.counts.insert(name.to_string(), 1);
                }
            }
        }
    }

    fn into_ordered(self) -> Vec<(String, usize)> {
        let NameTally { order, counts } = self;
        let mut ordered: Vec<(String, usize)> = order
            .into_iter()
            .map(|name| {
                let count = counts.get(&name).copied().unwrap_or(0);
                (name, count)
            })
            .collect();
        // stable: equal counts keep first-seen order
        ordered.sort_by(|a, b| b.1.cmp(&a.1));
        ordered
    }
}
