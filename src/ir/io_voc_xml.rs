//! Pascal VOC style XML reader and writer.
//!
//! One `<annotation>` document per image carrying `<size>` and zero or more
//! `<object>` entries with a `<name>` and a pixel `<bndbox>`. Only the fields
//! the pipeline consumes are checked; everything else is ignored on read.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use roxmltree::Node;
use walkdir::WalkDir;

use super::model::{stem_of, AnnotatedImage, Annotation};
use super::{BBoxXYXY, ImageSize, Pixel};
use crate::error::LabelprepError;
use crate::fsutil::write_atomic;

pub const VOC_XML_EXTENSION: &str = "xml";

/// A parsed XML annotation file.
#[derive(Clone, Debug, PartialEq)]
pub struct VocDocument {
    pub image: AnnotatedImage,
    /// Number of `<object>` entries dropped because they had no `<bndbox>`.
    pub objects_without_bbox: usize,
}

/// Read one XML annotation file.
///
/// The image stem is taken from the XML file name, which is the join key
/// with the image asset and the label file.
pub fn read_voc_xml(path: &Path) -> Result<VocDocument, LabelprepError> {
    let xml = fs::read_to_string(path).map_err(LabelprepError::Io)?;
    parse_voc_xml_str(&xml, path)
}

/// Parse VOC XML from a UTF-8 string.
pub fn parse_voc_xml_str(xml: &str, path: &Path) -> Result<VocDocument, LabelprepError> {
    let document = roxmltree::Document::parse(xml).map_err(|source| LabelprepError::XmlParse {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;

    let annotation = document.root_element();
    if annotation.tag_name().name() != "annotation" {
        return Err(malformed(path, "missing <annotation> root element"));
    }

    let size = required_child_element(annotation, "size", path, "<annotation>")?;
    let width = parse_required_f64(size, "width", path, "<size>")?;
    let height = parse_required_f64(size, "height", path, "<size>")?;
    let depth = optional_child_text(size, "depth").and_then(|raw| match raw.parse::<u32>() {
        Ok(depth) => Some(depth),
        Err(_) => {
            warn!("{}: ignoring invalid <depth> value '{raw}'", path.display());
            None
        }
    });

    let stem = stem_of(path).unwrap_or_default();
    let mut image = AnnotatedImage::new(stem, ImageSize::new(width, height));
    image.depth = depth;
    image.file_name = optional_child_text(annotation, "filename");
    image.folder = optional_child_text(annotation, "folder");
    image.path = optional_child_text(annotation, "path");

    let mut objects_without_bbox = 0;
    for object in annotation
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "object")
    {
        let Some(bndbox) = child_element(object, "bndbox") else {
            objects_without_bbox += 1;
            warn!(
                "{}: skipping <object> '{}' without <bndbox>",
                path.display(),
                optional_child_text(object, "name").unwrap_or_default()
            );
            continue;
        };

        let name = required_child_text(object, "name", path, "<object>")?;
        let xmin = parse_required_f64(bndbox, "xmin", path, "<bndbox>")?;
        let ymin = parse_required_f64(bndbox, "ymin", path, "<bndbox>")?;
        let xmax = parse_required_f64(bndbox, "xmax", path, "<bndbox>")?;
        let ymax = parse_required_f64(bndbox, "ymax", path, "<bndbox>")?;

        let mut attributes = BTreeMap::new();
        for key in ["pose", "truncated", "difficult"] {
            if let Some(value) = optional_child_text(object, key) {
                attributes.insert(key.to_string(), value);
            }
        }

        image.annotations.push(Annotation {
            name,
            bbox: BBoxXYXY::<Pixel>::from_xyxy(xmin, ymin, xmax, ymax),
            attributes,
        });
    }

    Ok(VocDocument {
        image,
        objects_without_bbox,
    })
}

/// Parse VOC XML from bytes.
///
/// The input must be valid UTF-8.
pub fn from_voc_xml_slice(bytes: &[u8]) -> Result<VocDocument, LabelprepError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| LabelprepError::XmlParse {
        path: PathBuf::from("<memory>"),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    parse_voc_xml_str(xml, Path::new("<memory>"))
}

/// Write one image's annotations as a complete XML document.
///
/// With `append` set and an existing document at `path`, the existing
/// header is kept and the new objects are added after the existing ones.
/// Either way the whole document is built in memory and written once.
pub fn write_voc_xml(
    image: &AnnotatedImage,
    path: &Path,
    append: bool,
) -> Result<(), LabelprepError> {
    let xml = if append && path.is_file() {
        let mut existing = read_voc_xml(path)?.image;
        existing
            .annotations
            .extend(image.annotations.iter().cloned());
        to_voc_xml_string(&existing)
    } else {
        to_voc_xml_string(image)
    };

    write_atomic(path, xml.as_bytes())
}

/// Pixel values with at most six decimals and no trailing zeros.
fn format_coord(value: f64) -> String {
    let fixed = format!("{value:.6}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" => "0".to_string(),
        _ => trimmed.to_string(),
    }
}

/// Render one image's annotations as an XML document.
pub fn to_voc_xml_string(image: &AnnotatedImage) -> String {
    let mut xml = String::new();
    let file_name = image.file_name.as_deref().unwrap_or(&image.stem);

    writeln!(xml, "<annotation>").expect("write to string");
    writeln!(
        xml,
        "    <folder>{}</folder>",
        xml_escape(image.folder.as_deref().unwrap_or("images"))
    )
    .expect("write to string");
    writeln!(xml, "    <filename>{}</filename>", xml_escape(file_name)).expect("write to string");
    if let Some(path) = &image.path {
        writeln!(xml, "    <path>{}</path>", xml_escape(path)).expect("write to string");
    }
    writeln!(xml, "    <source>").expect("write to string");
    writeln!(xml, "        <database>Unknown</database>").expect("write to string");
    writeln!(xml, "    </source>").expect("write to string");
    writeln!(xml, "    <size>").expect("write to string");
    writeln!(
        xml,
        "        <width>{}</width>",
        format_coord(image.size.width)
    )
    .expect("write to string");
    writeln!(
        xml,
        "        <height>{}</height>",
        format_coord(image.size.height)
    )
    .expect("write to string");
    if let Some(depth) = image.depth {
        writeln!(xml, "        <depth>{}</depth>", depth).expect("write to string");
    }
    writeln!(xml, "    </size>").expect("write to string");
    writeln!(xml, "    <segmented>0</segmented>").expect("write to string");

    for annotation in &image.annotations {
        let attr = |key: &str, default: &'static str| -> String {
            annotation
                .attributes
                .get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(xml_escape)
                .unwrap_or_else(|| default.to_string())
        };

        writeln!(xml, "    <object>").expect("write to string");
        writeln!(xml, "        <name>{}</name>", xml_escape(&annotation.name))
            .expect("write to string");
        writeln!(xml, "        <pose>{}</pose>", attr("pose", "Unspecified"))
            .expect("write to string");
        writeln!(
            xml,
            "        <truncated>{}</truncated>",
            attr("truncated", "0")
        )
        .expect("write to string");
        writeln!(
            xml,
            "        <difficult>{}</difficult>",
            attr("difficult", "0")
        )
        .expect("write to string");
        writeln!(xml, "        <bndbox>").expect("write to string");
        writeln!(xml, "            <xmin>{}</xmin>", format_coord(annotation.bbox.xmin))
            .expect("write to string");
        writeln!(xml, "            <ymin>{}</ymin>", format_coord(annotation.bbox.ymin))
            .expect("write to string");
        writeln!(xml, "            <xmax>{}</xmax>", format_coord(annotation.bbox.xmax))
            .expect("write to string");
        writeln!(xml, "            <ymax>{}</ymax>", format_coord(annotation.bbox.ymax))
            .expect("write to string");
        writeln!(xml, "        </bndbox>").expect("write to string");
        writeln!(xml, "    </object>").expect("write to string");
    }

    writeln!(xml, "</annotation>").expect("write to string");
    xml
}

/// Recursively collect `.xml` files under `dir`, sorted by relative path.
pub fn collect_xml_files(dir: &Path) -> Result<Vec<PathBuf>, LabelprepError> {
    if !dir.is_dir() {
        return Err(LabelprepError::InputDirMissing {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|source| LabelprepError::Traverse {
            path: dir.to_path_buf(),
            message: source.to_string(),
        })?;

        if entry.file_type().is_file() && has_xml_extension(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_by_cached_key(|path| rel_string(dir, path));
    Ok(files)
}

fn malformed(path: &Path, message: impl Into<String>) -> LabelprepError {
    LabelprepError::MalformedAnnotation {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn required_child_element<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<Node<'a, 'input>, LabelprepError> {
    child_element(node, tag).ok_or_else(|| malformed(path, format!("missing <{tag}> in {context}")))
}

fn required_child_text(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<String, LabelprepError> {
    optional_child_text(node, tag)
        .ok_or_else(|| malformed(path, format!("missing <{tag}> in {context}")))
}

fn parse_required_f64(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<f64, LabelprepError> {
    let raw = required_child_text(node, tag, path, context)?;
    raw.parse::<f64>().map_err(|_| {
        malformed(
            path,
            format!("invalid <{tag}> value '{raw}' in {context}; expected number"),
        )
    })
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn optional_child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(VOC_XML_EXTENSION))
        .unwrap_or(false)
}

fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<annotation>
  <folder>images</folder>
  <filename>img1.jpg</filename>
  <size>
    <width>640</width>
    <height>480</height>
    <depth>3</depth>
  </size>
  <object>
    <name> cat </name>
    <pose>Left</pose>
    <difficult>1</difficult>
    <bndbox>
      <xmin>10</xmin>
      <ymin>20</ymin>
      <xmax>30.5</xmax>
      <ymax>40</ymax>
    </bndbox>
  </object>
  <object>
    <name>ghost</name>
  </object>
</annotation>"#;

    #[test]
    fn parse_extracts_size_objects_and_attrs() {
        let parsed = parse_voc_xml_str(SAMPLE, Path::new("dir/img1.xml")).expect("parse xml");
        let image = &parsed.image;

        assert_eq!(image.stem, "img1");
        assert_eq!(image.file_name.as_deref(), Some("img1.jpg"));
        assert_eq!(image.size, ImageSize::new(640.0, 480.0));
        assert_eq!(image.depth, Some(3));
        assert_eq!(image.annotations.len(), 1);
        assert_eq!(image.annotations[0].name, "cat");
        assert_eq!(image.annotations[0].bbox.xmax, 30.5);
        assert_eq!(
            image.annotations[0].attributes.get("pose"),
            Some(&"Left".to_string())
        );
        assert_eq!(parsed.objects_without_bbox, 1);
    }

    #[test]
    fn parse_rejects_missing_size() {
        let xml = "<annotation><object><name>a</name></object></annotation>";
        let err = parse_voc_xml_str(xml, Path::new("a.xml")).unwrap_err();
        assert!(matches!(err, LabelprepError::MalformedAnnotation { .. }));
    }

    #[test]
    fn parse_rejects_missing_bbox_field() {
        let xml = r#"<annotation>
  <size><width>10</width><height>10</height></size>
  <object><name>a</name><bndbox><xmin>1</xmin><ymin>1</ymin><xmax>5</xmax></bndbox></object>
</annotation>"#;
        let err = parse_voc_xml_str(xml, Path::new("a.xml")).unwrap_err();
        match err {
            LabelprepError::MalformedAnnotation { message, .. } => {
                assert!(message.contains("<ymax>"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_ignores_invalid_depth() {
        let xml = r#"<annotation>
  <size><width>10</width><height>10</height><depth>3.0</depth></size>
  <object><name>a</name><bndbox><xmin>1</xmin><ymin>1</ymin><xmax>5</xmax><ymax>5</ymax></bndbox></object>
</annotation>"#;
        let parsed = parse_voc_xml_str(xml, Path::new("a.xml")).expect("parse xml");
        assert_eq!(parsed.image.depth, None);
        assert_eq!(parsed.image.annotations.len(), 1);
    }

    #[test]
    fn written_coordinates_drop_float_noise() {
        let mut image = AnnotatedImage::new("a", ImageSize::new(40.0, 20.0));
        image.annotations.push(Annotation::new(
            "cat",
            BBoxXYXY::from_xyxy(20.000000000000004, 10.5, 29.999999999999996, -0.0),
        ));

        let xml = to_voc_xml_string(&image);
        assert!(xml.contains("<xmin>20</xmin>"));
        assert!(xml.contains("<ymin>10.5</ymin>"));
        assert!(xml.contains("<xmax>30</xmax>"));
        assert!(xml.contains("<ymax>0</ymax>"));
        assert!(xml.contains("<width>40</width>"));
    }

    #[test]
    fn parse_rejects_invalid_xml() {
        let err = parse_voc_xml_str("<annotation>", Path::new("a.xml")).unwrap_err();
        assert!(matches!(err, LabelprepError::XmlParse { .. }));
    }

    #[test]
    fn written_document_parses_back() {
        let mut image = AnnotatedImage::new("img&1", ImageSize::new(100.0, 50.0));
        image.file_name = Some("img&1.png".to_string());
        image.depth = Some(3);
        image.annotations.push(Annotation::new(
            "a<b",
            BBoxXYXY::from_xyxy(1.0, 2.0, 30.0, 40.0),
        ));

        let xml = to_voc_xml_string(&image);
        let parsed = parse_voc_xml_str(&xml, Path::new("img&1.xml")).expect("parse back");
        assert_eq!(parsed.image.file_name.as_deref(), Some("img&1.png"));
        assert_eq!(parsed.image.annotations[0].name, "a<b");
        assert_eq!(parsed.image.annotations[0].bbox, image.annotations[0].bbox);
        assert_eq!(
            parsed.image.annotations[0].attributes.get("pose"),
            Some(&"Unspecified".to_string())
        );
    }

    #[test]
    fn append_merges_objects_into_existing_document() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("img.xml");

        let mut first = AnnotatedImage::new("img", ImageSize::new(100.0, 100.0));
        first
            .annotations
            .push(Annotation::new("a", BBoxXYXY::from_xyxy(1.0, 1.0, 2.0, 2.0)));
        let mut second = AnnotatedImage::new("img", ImageSize::new(100.0, 100.0));
        second
            .annotations
            .push(Annotation::new("b", BBoxXYXY::from_xyxy(3.0, 3.0, 4.0, 4.0)));

        write_voc_xml(&first, &path, false).expect("write");
        write_voc_xml(&second, &path, true).expect("append");

        let names: Vec<String> = read_voc_xml(&path)
            .expect("read")
            .image
            .annotations
            .into_iter()
            .map(|ann| ann.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn collect_xml_files_is_recursive_and_sorted() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("sub")).expect("create sub dir");
        fs::write(temp.path().join("b.xml"), "").expect("write b");
        fs::write(temp.path().join("sub/a.XML"), "").expect("write a");
        fs::write(temp.path().join("c.txt"), "").expect("write c");

        let files = collect_xml_files(temp.path()).expect("collect");
        let rel: Vec<String> = files.iter().map(|p| rel_string(temp.path(), p)).collect();
        assert_eq!(rel, vec!["b.xml", "sub/a.XML"]);
    }
}
