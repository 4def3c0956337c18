/// Index-based linking of image files to contour annotation files
///
/// Images and annotations live in two independent directory trees with
/// differently-formatted filenames. A manifest pairs an image subject
/// folder with an annotation subject folder; within one pair, the only
/// join key is the numeric index embedded in each filename:
///
/// - image files are named `<digits>.<ext>` (index = the stem before the
///   first `.`);
/// - contour files are named like `IM-0001-0048-icontour-manual.txt`
///   (index = the third `-`-separated field, here 48).
///
/// Directory listings are sorted alphanumerically before matching, so
/// output order and duplicate-index tie-breaking never depend on the
/// filesystem's enumeration order.
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Which of the two anatomical boundary annotations to link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContourKind {
    /// Inner wall boundary (`i-contours` directory).
    Inner,
    /// Outer wall boundary (`o-contours` directory).
    Outer,
}

impl ContourKind {
    /// Name of the per-subject annotation subdirectory.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Inner => "i-contours",
            Self::Outer => "o-contours",
        }
    }
}

impl FromStr for ContourKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "inner" | "i" | "i-contours" => Ok(Self::Inner),
            "outer" | "o" | "o-contours" => Ok(Self::Outer),
            other => Err(Error::InvalidContourType(other.to_string())),
        }
    }
}

impl fmt::Display for ContourKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => f.write_str("inner"),
            Self::Outer => f.write_str("outer"),
        }
    }
}

/// One manifest row: which image subject folder pairs with which
/// annotation subject folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub image_folder: String,
    pub contour_folder: String,
}

/// The subject manifest, a two-column CSV with a header row. Row order
/// is significant: it defines subject ordering in the link output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// A malformed row is a configuration error and fails the whole
    /// parse, unlike per-file filename problems during linking.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut entries = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            if lineno == 0 {
                continue; // header
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split(',');
            match (fields.next(), fields.next()) {
                (Some(image), Some(contour))
                    if !image.trim().is_empty() && !contour.trim().is_empty() =>
                {
                    entries.push(ManifestEntry {
                        image_folder: image.trim().to_string(),
                        contour_folder: contour.trim().to_string(),
                    });
                }
                _ => {
                    return Err(Error::Manifest {
                        line: lineno + 1,
                        reason: "expected two comma-separated folder names".to_string(),
                    })
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One linked (subject, image, annotation) triple. `annotation` is
/// `None` only for unmatched images retained via
/// [`LinkOptions::keep_unmatched`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub subject: String,
    pub image: PathBuf,
    pub annotation: Option<PathBuf>,
}

/// Linking policy knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkOptions {
    /// Keep images that have no matching annotation (with
    /// `annotation: None`) instead of dropping them. Off by default,
    /// matching the training use case where only annotated images are
    /// usable.
    pub keep_unmatched: bool,
}

/// A file that could not be linked, with the reason it was skipped.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of a linking pass: the ordered records plus every file that
/// was skipped for a data-quality reason.
#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    pub records: Vec<LinkRecord>,
    pub skipped: Vec<SkippedFile>,
}

/// Extract the numeric index of an image file: the filename stem before
/// the first `.`, parsed as an integer.
pub fn image_index(path: &Path) -> Result<u32, Error> {
    let name = utf8_file_name(path)?;
    let stem = name.split('.').next().unwrap_or("");
    parse_index(stem, path)
}

/// Extract the numeric index of a contour file: the third `-`-separated
/// field of the filename, parsed as an integer.
pub fn contour_index(path: &Path) -> Result<u32, Error> {
    let name = utf8_file_name(path)?;
    match name.split('-').nth(2) {
        Some(field) => parse_index(field, path),
        None => Err(Error::MalformedFilename {
            path: path.to_path_buf(),
            reason: "expected at least three '-'-separated fields".to_string(),
        }),
    }
}

fn utf8_file_name(path: &Path) -> Result<&str, Error> {
    path.file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| Error::MalformedFilename {
            path: path.to_path_buf(),
            reason: "filename is missing or not valid UTF-8".to_string(),
        })
}

fn parse_index(field: &str, path: &Path) -> Result<u32, Error> {
    field.parse::<u32>().map_err(|_| Error::MalformedFilename {
        path: path.to_path_buf(),
        reason: format!("{field:?} is not an integer index"),
    })
}

/// Build the ordered link records for a manifest.
///
/// For each manifest entry (in manifest order) the image directory
/// `image_root/<image_folder>` is matched against the annotation
/// directory `annotation_root/<contour_folder>/<kind dir>`: files whose
/// numeric indices are equal are linked. Indices need not be contiguous
/// or start anywhere in particular.
///
/// Partial-failure semantics: files whose index cannot be extracted are
/// recorded in the report and skipped; a missing directory contributes
/// zero files for that subject. On duplicate contour indices within one
/// subject the alphanumerically-first file wins, with a warning.
///
/// Output paths are absolute. Record order is manifest order, then
/// alphanumeric filename order within a subject.
pub fn build_links(
    manifest: &Manifest,
    image_root: &Path,
    annotation_root: &Path,
    kind: ContourKind,
    options: LinkOptions,
) -> Result<LinkReport, Error> {
    let image_root = std::path::absolute(image_root)?;
    let annotation_root = std::path::absolute(annotation_root)?;

    let mut records = Vec::new();
    let mut skipped = Vec::new();

    for entry in manifest.entries() {
        let image_dir = image_root.join(&entry.image_folder);
        let contour_dir = annotation_root
            .join(&entry.contour_folder)
            .join(kind.dir_name());
        debug!(
            "subject {}: images {} / contours {}",
            entry.image_folder,
            image_dir.display(),
            contour_dir.display()
        );

        let mut contours_by_index: BTreeMap<u32, PathBuf> = BTreeMap::new();
        for path in list_files(&contour_dir, Some("txt")) {
            match contour_index(&path) {
                Ok(index) => {
                    if let Some(kept) = contours_by_index.get(&index) {
                        warn!(
                            "duplicate contour index {} in {}: keeping {}, ignoring {}",
                            index,
                            contour_dir.display(),
                            kept.display(),
                            path.display()
                        );
                    } else {
                        contours_by_index.insert(index, path);
                    }
                }
                Err(err) => {
                    warn!("skipping contour file: {err}");
                    skipped.push(SkippedFile {
                        path,
                        reason: err.to_string(),
                    });
                }
            }
        }

        for path in list_files(&image_dir, None) {
            match image_index(&path) {
                Ok(index) => match contours_by_index.get(&index) {
                    Some(contour) => records.push(LinkRecord {
                        subject: entry.image_folder.clone(),
                        image: path,
                        annotation: Some(contour.clone()),
                    }),
                    None if options.keep_unmatched => records.push(LinkRecord {
                        subject: entry.image_folder.clone(),
                        image: path,
                        annotation: None,
                    }),
                    None => debug!(
                        "no {} contour with index {} for {}",
                        kind,
                        index,
                        path.display()
                    ),
                },
                Err(err) => {
                    warn!("skipping image file: {err}");
                    skipped.push(SkippedFile {
                        path,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    Ok(LinkReport { records, skipped })
}

/// List the regular files of a directory in alphanumeric order,
/// optionally filtered by extension (case-insensitive). A directory that
/// cannot be read yields an empty listing: real-world datasets have
/// incomplete subject folders and that must not abort the run.
fn list_files(dir: &Path, extension: Option<&str>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("cannot list {}: {}", dir.display(), err);
            return paths;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(want) = extension {
            match path.extension().and_then(OsStr::to_str) {
                Some(ext) if ext.eq_ignore_ascii_case(want) => {}
                _ => continue,
            }
        }
        paths.push(path);
    }

    alphanumeric_sort::sort_path_slice(&mut paths);
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    const MANIFEST: &str = "patient_id,original_id\nSCD0000101,SC-HF-I-1\n";

    /// Lay out a synthetic dataset tree:
    /// `images/<subject>/<idx>.dcm` and
    /// `contours/<original>/i-contours/IM-0001-<idx>-icontour-manual.txt`.
    fn synthetic_tree(image_indices: &[&str], contour_indices: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let image_dir = dir.path().join("images/SCD0000101");
        let contour_dir = dir.path().join("contours/SC-HF-I-1/i-contours");
        fs::create_dir_all(&image_dir).unwrap();
        fs::create_dir_all(&contour_dir).unwrap();

        for idx in image_indices {
            File::create(image_dir.join(format!("{idx}.dcm"))).unwrap();
        }
        for idx in contour_indices {
            File::create(contour_dir.join(format!("IM-0001-{idx}-icontour-manual.txt"))).unwrap();
        }
        dir
    }

    fn link(dir: &TempDir, options: LinkOptions) -> LinkReport {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        build_links(
            &manifest,
            &dir.path().join("images"),
            &dir.path().join("contours"),
            ContourKind::Inner,
            options,
        )
        .unwrap()
    }

    #[test]
    fn contour_kind_parsing() {
        assert_eq!(ContourKind::from_str("inner").unwrap(), ContourKind::Inner);
        assert_eq!(
            ContourKind::from_str("o-contours").unwrap(),
            ContourKind::Outer
        );
        assert!(matches!(
            ContourKind::from_str("x-contours"),
            Err(Error::InvalidContourType(_))
        ));
    }

    #[test]
    fn manifest_rejects_malformed_rows() {
        assert!(matches!(
            Manifest::parse("patient_id,original_id\nonly_one_column\n"),
            Err(Error::Manifest { line: 2, .. })
        ));
    }

    #[test]
    fn manifest_preserves_row_order() {
        let manifest =
            Manifest::parse("patient_id,original_id\nb,ob\na,oa\n").unwrap();
        let folders: Vec<&str> = manifest
            .entries()
            .iter()
            .map(|e| e.image_folder.as_str())
            .collect();
        assert_eq!(folders, ["b", "a"]);
    }

    #[test]
    fn index_extraction() {
        assert_eq!(image_index(Path::new("/d/48.dcm")).unwrap(), 48);
        assert_eq!(
            contour_index(Path::new("/c/IM-0001-0048-icontour-manual.txt")).unwrap(),
            48
        );
        assert!(matches!(
            image_index(Path::new("/d/notes.dcm")),
            Err(Error::MalformedFilename { .. })
        ));
        assert!(matches!(
            contour_index(Path::new("/c/IM-0001.txt")),
            Err(Error::MalformedFilename { .. })
        ));
    }

    #[test]
    fn links_only_matching_indices() {
        // Images 1, 2, 3 against contours 1, 3: exactly two records,
        // index 2 absent.
        let dir = synthetic_tree(&["1", "2", "3"], &["0001", "0003"]);
        let report = link(&dir, LinkOptions::default());

        assert_eq!(report.records.len(), 2);
        let indices: Vec<u32> = report
            .records
            .iter()
            .map(|r| image_index(&r.image).unwrap())
            .collect();
        assert_eq!(indices, [1, 3]);
        for record in &report.records {
            assert_eq!(record.subject, "SCD0000101");
            let annotation = record.annotation.as_deref().unwrap();
            assert_eq!(
                contour_index(annotation).unwrap(),
                image_index(&record.image).unwrap()
            );
            assert!(record.image.is_absolute());
            assert!(annotation.is_absolute());
        }
    }

    #[test]
    fn record_count_is_bounded_by_both_sides() {
        let dir = synthetic_tree(&["1", "2", "3", "4"], &["0002", "0004", "0009"]);
        let report = link(&dir, LinkOptions::default());

        assert!(report.records.len() <= 4);
        assert!(report.records.len() <= 3);
        assert_eq!(report.records.len(), 2);
    }

    #[test]
    fn keep_unmatched_retains_images_without_annotation() {
        let dir = synthetic_tree(&["1", "2"], &["0001"]);
        let report = link(&dir, LinkOptions { keep_unmatched: true });

        assert_eq!(report.records.len(), 2);
        assert!(report.records[0].annotation.is_some());
        assert!(report.records[1].annotation.is_none());
    }

    #[test]
    fn malformed_filenames_are_skipped_not_fatal() {
        let dir = synthetic_tree(&["1", "readme"], &["0001", "bad"]);
        let report = link(&dir, LinkOptions::default());

        assert_eq!(report.records.len(), 1);
        // "readme.dcm" and "IM-0001-bad-icontour-manual.txt".
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn missing_subject_directory_yields_zero_records() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let report = build_links(
            &manifest,
            &dir.path().join("images"),
            &dir.path().join("contours"),
            ContourKind::Inner,
            LinkOptions::default(),
        )
        .unwrap();

        assert!(report.records.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn duplicate_contour_index_first_alphanumeric_wins() {
        let dir = synthetic_tree(&["7"], &[]);
        let contour_dir = dir.path().join("contours/SC-HF-I-1/i-contours");
        File::create(contour_dir.join("IM-0002-0007-icontour-manual.txt")).unwrap();
        File::create(contour_dir.join("IM-0001-0007-icontour-manual.txt")).unwrap();

        let report = link(&dir, LinkOptions::default());
        assert_eq!(report.records.len(), 1);
        let kept = report.records[0].annotation.as_deref().unwrap();
        assert!(kept.to_string_lossy().contains("IM-0001-0007"));
    }

    #[test]
    fn outer_kind_reads_o_contours_directory() {
        let dir = synthetic_tree(&["5"], &["0005"]);
        let o_dir = dir.path().join("contours/SC-HF-I-1/o-contours");
        fs::create_dir_all(&o_dir).unwrap();
        File::create(o_dir.join("IM-0001-0005-ocontour-manual.txt")).unwrap();

        let manifest = Manifest::parse(MANIFEST).unwrap();
        let report = build_links(
            &manifest,
            &dir.path().join("images"),
            &dir.path().join("contours"),
            ContourKind::Outer,
            LinkOptions::default(),
        )
        .unwrap();

        assert_eq!(report.records.len(), 1);
        let annotation = report.records[0].annotation.as_deref().unwrap();
        assert!(annotation.to_string_lossy().contains("o-contours"));
    }

    #[test]
    fn subjects_come_out_in_manifest_order() {
        let dir = TempDir::new().unwrap();
        for subject in ["zz", "aa"] {
            let image_dir = dir.path().join("images").join(subject);
            let contour_dir = dir
                .path()
                .join("contours")
                .join(format!("orig-{subject}"))
                .join("i-contours");
            fs::create_dir_all(&image_dir).unwrap();
            fs::create_dir_all(&contour_dir).unwrap();
            File::create(image_dir.join("1.dcm")).unwrap();
            File::create(contour_dir.join("IM-0001-0001-icontour-manual.txt")).unwrap();
        }

        let manifest =
            Manifest::parse("patient_id,original_id\nzz,orig-zz\naa,orig-aa\n").unwrap();
        let report = build_links(
            &manifest,
            &dir.path().join("images"),
            &dir.path().join("contours"),
            ContourKind::Inner,
            LinkOptions::default(),
        )
        .unwrap();

        let subjects: Vec<&str> = report.records.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(subjects, ["zz", "aa"]);
    }
}
