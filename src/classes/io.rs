//! Class-list files.
//!
//! Two shapes are read: a line-per-class `classes.txt` and YAML documents
//! with a `names` field, either a list or an `id: name` mapping. The class
//! config adds an optional `aliases` table on top of the list.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ClassRegistry;
use crate::error::LabelprepError;
use crate::fsutil::write_atomic;

pub const CLASSES_TXT: &str = "classes.txt";

/// Class configuration document.
///
/// ```yaml
/// names: [J-vehicle, M-vehicle, person]
/// aliases:
///   chariot: J-vehicle
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ClassConfig {
    pub names: Vec<String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl ClassConfig {
    pub fn into_registry(self) -> Result<ClassRegistry, LabelprepError> {
        ClassRegistry::from_remap(self.names, &self.aliases)
    }
}

#[derive(Deserialize)]
struct NamesDocument {
    names: NamesField,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NamesField {
    List(Vec<String>),
    Map(BTreeMap<usize, String>),
}

/// Load a class config file and build its registry.
pub fn load_class_config(path: &Path) -> Result<ClassRegistry, LabelprepError> {
    let raw = fs::read_to_string(path).map_err(LabelprepError::Io)?;
    let config: ClassConfig =
        serde_yaml::from_str(&raw).map_err(|source| LabelprepError::ClassConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
    config.into_registry()
}

/// Load a flat `raw name: replacement` YAML mapping, applied to object
/// names before registry lookup.
pub fn load_class_map(path: &Path) -> Result<BTreeMap<String, String>, LabelprepError> {
    let raw = fs::read_to_string(path).map_err(LabelprepError::Io)?;
    serde_yaml::from_str(&raw).map_err(|source| LabelprepError::ClassConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load class names in id order from `classes.txt` or a YAML names file.
///
/// The format is chosen by extension: `.yaml`/`.yml` are YAML, anything
/// else is read one name per line where the line number is the id. Blank
/// lines inside the file become `Class_<id>`; trailing blank lines are dropped.
pub fn load_class_names(path: &Path) -> Result<Vec<String>, LabelprepError> {
    let raw = fs::read_to_string(path).map_err(LabelprepError::Io)?;

    if is_yaml(path) {
        parse_yaml_names(&raw, path)
    } else {
        let by_line: BTreeMap<usize, String> = raw
            .lines()
            .map(str::trim)
            .enumerate()
            .filter(|(_, line)| !line.is_empty())
            .map(|(id, line)| (id, line.to_owned()))
            .collect();
        Ok(positional_names(&by_line))
    }
}

/// Dense id-ordered names from an id map, filling gaps with `Class_<id>`.
fn positional_names(by_id: &BTreeMap<usize, String>) -> Vec<String> {
    let Some(max_id) = by_id.keys().next_back().copied() else {
        return Vec::new();
    };
    (0..=max_id)
        .map(|id| {
            by_id
                .get(&id)
                .cloned()
                .unwrap_or_else(|| format!("Class_{id}"))
        })
        .collect()
}

fn parse_yaml_names(raw: &str, path: &Path) -> Result<Vec<String>, LabelprepError> {
    let document: NamesDocument =
        serde_yaml::from_str(raw).map_err(|source| LabelprepError::ClassConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

    match document.names {
        NamesField::List(names) => Ok(names),
        NamesField::Map(map) => {
            if map.is_empty() {
                return Err(LabelprepError::ClassFileInvalid {
                    path: path.to_path_buf(),
                    message: "'names' mapping is empty".to_string(),
                });
            }
            Ok(positional_names(&map))
        }
    }
}

/// Write names one per line, replacing any existing file.
pub fn write_classes_txt(path: &Path, names: &[String]) -> Result<(), LabelprepError> {
    let mut content = String::new();
    for name in names {
        content.push_str(name);
        content.push('\n');
    }
    write_atomic(path, content.as_bytes())
}

/// Find a class file in `dir`: the first YAML file by name, else `classes.txt`.
pub fn discover_class_file(dir: &Path) -> Option<PathBuf> {
    let mut yaml_files: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_yaml(path))
        .collect();
    yaml_files.sort();

    if let Some(first) = yaml_files.into_iter().next() {
        return Some(first);
    }

    let classes_txt = dir.join(CLASSES_TXT);
    classes_txt.is_file().then_some(classes_txt)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ClassId;

    #[test]
    fn classes_txt_ids_follow_line_numbers() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join(CLASSES_TXT);
        fs::write(&path, "cat\n\n dog \n\n\n").expect("write");

        let names = load_class_names(&path).expect("load");
        assert_eq!(names, vec!["cat", "Class_1", "dog"]);

        let registry = crate::classes::ClassRegistry::from_list(names).expect("registry");
        assert_eq!(registry.resolve("dog"), Some(ClassId(2)));

        fs::write(&path, "\n\n").expect("write");
        assert!(load_class_names(&path).expect("load").is_empty());
    }

    #[test]
    fn loads_yaml_list_and_mapping_with_gaps() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let list = temp.path().join("list.yaml");
        fs::write(&list, "nc: 2\nnames: [cat, dog]\n").expect("write");
        assert_eq!(load_class_names(&list).expect("load"), vec!["cat", "dog"]);

        let map = temp.path().join("map.yml");
        fs::write(&map, "names:\n  0: cat\n  2: bird\n").expect("write");
        assert_eq!(
            load_class_names(&map).expect("load"),
            vec!["cat", "Class_1", "bird"]
        );
    }

    #[test]
    fn class_config_builds_remap_registry() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("classes.yaml");
        fs::write(
            &path,
            "names: [J-vehicle, M-vehicle]\naliases:\n  chariot: J-vehicle\n",
        )
        .expect("write");

        let registry = load_class_config(&path).expect("load");
        assert_eq!(registry.resolve("chariot"), Some(ClassId(0)));
        assert_eq!(registry.resolve("M-vehicle"), Some(ClassId(1)));
    }

    #[test]
    fn loads_class_map() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("map.yaml");
        fs::write(&path, "kitty: cat\npuppy: dog\n").expect("write");

        let map = load_class_map(&path).expect("load");
        assert_eq!(map.get("kitty").map(String::as_str), Some("cat"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn class_config_reports_yaml_errors() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("bad.yaml");
        fs::write(&path, "names: {{").expect("write");
        assert!(matches!(
            load_class_config(&path),
            Err(LabelprepError::ClassConfigParse { .. })
        ));
    }

    #[test]
    fn discovery_prefers_yaml_over_classes_txt() {
        let temp = tempfile::tempdir().expect("create temp dir");
        assert_eq!(discover_class_file(temp.path()), None);

        fs::write(temp.path().join(CLASSES_TXT), "a\n").expect("write");
        assert_eq!(
            discover_class_file(temp.path()),
            Some(temp.path().join(CLASSES_TXT))
        );

        fs::write(temp.path().join("data.yaml"), "names: [a]\n").expect("write");
        assert_eq!(
            discover_class_file(temp.path()),
            Some(temp.path().join("data.yaml"))
        );
    }

    #[test]
    fn write_classes_txt_overwrites() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join(CLASSES_TXT);
        write_classes_txt(&path, &["a".to_string(), "b".to_string()]).expect("write");
        write_classes_txt(&path, &["c".to_string()]).expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "c\n");
    }
}
