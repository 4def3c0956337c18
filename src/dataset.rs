/// Resolving link records into (pixels, mask) training samples
///
/// A linked record becomes a sample by decoding its image, parsing its
/// contour file, and rasterizing the polygon at the image's dimensions.
/// Bulk loading runs per-record in parallel and tolerates individual
/// failures: one corrupt file must not sink a whole dataset.
use log::warn;
use rand::seq::SliceRandom;
use rayon::prelude::*;

use crate::contour::parse_contour_file;
use crate::error::Error;
use crate::linker::LinkRecord;
use crate::mask::{rasterize, Mask};
use crate::pixels::{GrayPixels, PixelDecoder};

/// One training sample: the decoded image and its boolean mask, both at
/// the image's native dimensions.
#[derive(Debug, Clone)]
pub struct Sample {
    pub subject: String,
    pub pixels: GrayPixels,
    pub mask: Mask,
}

/// Turns link records into samples using an injected decoder.
pub struct SampleLoader<D> {
    decoder: D,
}

impl<D: PixelDecoder> SampleLoader<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    /// Load a single record. Fails with `MissingAnnotation` for records
    /// kept without a matching contour file.
    pub fn load(&self, record: &LinkRecord) -> Result<Sample, Error> {
        let annotation = record
            .annotation
            .as_deref()
            .ok_or_else(|| Error::MissingAnnotation {
                path: record.image.clone(),
            })?;

        let pixels = self.decoder.decode(&record.image)?;
        let polygon = parse_contour_file(annotation)?;
        let mask = rasterize(&polygon, pixels.width(), pixels.height())?;

        Ok(Sample {
            subject: record.subject.clone(),
            pixels,
            mask,
        })
    }

    /// Load every record in parallel, skipping records that fail with a
    /// warning. Output order matches input order.
    pub fn load_all(&self, records: &[LinkRecord]) -> Vec<Sample>
    where
        D: Sync,
    {
        records
            .par_iter()
            .filter_map(|record| match self.load(record) {
                Ok(sample) => Some(sample),
                Err(err) => {
                    warn!("skipping {}: {}", record.image.display(), err);
                    None
                }
            })
            .collect()
    }
}

/// Fixed-size batches over a record slice, optionally in shuffled order.
/// The final batch may be short. `batch_size` is clamped to at least 1.
pub struct Batches<'a> {
    records: Vec<&'a LinkRecord>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> Batches<'a> {
    pub fn new(records: &'a [LinkRecord], batch_size: usize, shuffle: bool) -> Self {
        let mut refs: Vec<&LinkRecord> = records.iter().collect();
        if shuffle {
            refs.shuffle(&mut rand::rng());
        }
        Self {
            records: refs,
            batch_size: batch_size.max(1),
            cursor: 0,
        }
    }
}

impl<'a> Iterator for Batches<'a> {
    type Item = Vec<&'a LinkRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.records.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.records.len());
        let batch = self.records[self.cursor..end].to_vec();
        self.cursor = end;
        Some(batch)
    }
}
