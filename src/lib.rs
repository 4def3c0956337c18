//! Links cardiac imaging files to hand-drawn contour annotations and
//! rasterizes those contours into pixel-accurate boolean masks.
//!
//! The two core pieces are [`linker::build_links`], which pairs image
//! files with annotation files by the numeric index embedded in their
//! filenames across two independent directory trees, and
//! [`mask::rasterize`], which fills a polygon into a boolean mask with
//! the canonical even-odd rule. Everything else is plumbing around them:
//! contour-file parsing, CSV persistence of the link table, an
//! image-decoding seam, and batch-oriented sample loading.

pub mod contour;
pub mod dataset;
pub mod error;
pub mod linker;
pub mod mask;
pub mod pixels;
pub mod table;

// Re-export the commonly used types and functions.
pub use contour::{parse_contour_file, Point};
pub use dataset::{Batches, Sample, SampleLoader};
pub use error::Error;
pub use linker::{
    build_links, ContourKind, LinkOptions, LinkRecord, LinkReport, Manifest,
};
pub use mask::{rasterize, Mask};
pub use pixels::{GrayPixels, ImageFileDecoder, PixelDecoder};
