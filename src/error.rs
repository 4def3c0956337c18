use std::path::PathBuf;

/// Crate-wide error type.
///
/// Configuration mistakes (bad contour kind, zero mask dimensions,
/// malformed manifest) fail fast. Per-file data-quality problems are
/// surfaced as `MalformedFilename` and recorded by the linker instead of
/// aborting a whole run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Mask construction with a zero dimension.
    #[error("mask dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Contour kind outside {inner, outer}.
    #[error("invalid contour type {0:?}, expected \"inner\" or \"outer\"")]
    InvalidContourType(String),

    /// Numeric index extraction from a filename failed.
    #[error("cannot extract numeric index from {path:?}: {reason}")]
    MalformedFilename { path: PathBuf, reason: String },

    /// A manifest row does not have the two expected columns.
    #[error("manifest line {line}: {reason}")]
    Manifest { line: usize, reason: String },

    /// A link-table row does not have the three expected columns.
    #[error("link table line {line}: {reason}")]
    Table { line: usize, reason: String },

    /// Tried to rasterize a record that carries no annotation path.
    #[error("record for {path:?} has no annotation file linked")]
    MissingAnnotation { path: PathBuf },

    /// Failed to decode an image file.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
