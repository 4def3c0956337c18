/// CSV persistence of the link table
///
/// Three columns with a header: subject id, absolute image path,
/// absolute annotation path (empty when the record has none). Reading a
/// written table back yields the same records in the same order.
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::Error;
use crate::linker::LinkRecord;

const HEADER: &str = "patient,image_path,contour_path";

pub fn write_records(path: &Path, records: &[LinkRecord]) -> Result<(), Error> {
    let mut out = String::with_capacity(64 * (records.len() + 1));
    out.push_str(HEADER);
    out.push('\n');
    for record in records {
        let annotation = record
            .annotation
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        out.push_str(&format!(
            "{},{},{}\n",
            record.subject,
            record.image.display(),
            annotation
        ));
    }
    fs::write(path, out)?;
    info!("wrote {} link records to {}", records.len(), path.display());
    Ok(())
}

pub fn read_records(path: &Path) -> Result<Vec<LinkRecord>, Error> {
    let text = fs::read_to_string(path)?;

    let mut records = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if lineno == 0 {
            continue; // header
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split(',');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(subject), Some(image), Some(annotation)) => records.push(LinkRecord {
                subject: subject.to_string(),
                image: PathBuf::from(image),
                annotation: if annotation.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(annotation))
                },
            }),
            _ => {
                return Err(Error::Table {
                    line: lineno + 1,
                    reason: "expected three comma-separated columns".to_string(),
                })
            }
        }
    }
    Ok(records)
}
