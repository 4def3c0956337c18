/// Grayscale pixel buffers and the image-decoding seam
///
/// The linker and rasterizer only need an image's dimensions and a flat
/// intensity buffer, so decoding sits behind the [`PixelDecoder`] trait.
/// The bundled [`ImageFileDecoder`] covers the standard raster formats
/// the `image` crate understands; callers with proprietary formats (the
/// cardiac DICOM exports this tool was built around) plug in their own
/// implementation.
use std::path::Path;

use crate::error::Error;

/// A single-frame grayscale image: 16-bit intensities, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayPixels {
    width: u32,
    height: u32,
    data: Vec<u16>,
}

impl GrayPixels {
    /// Wrap a row-major buffer. The buffer length must equal
    /// `width * height`; a mismatched buffer is a programming error on
    /// the decoder side and is rejected as an image-decode failure.
    pub fn from_raw(width: u32, height: u32, data: Vec<u16>) -> Result<Self, Error> {
        if data.len() != width as usize * height as usize {
            return Err(Error::ImageDecode(image::ImageError::Parameter(
                image::error::ParameterError::from_kind(
                    image::error::ParameterErrorKind::DimensionMismatch,
                ),
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> u16 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Row-major intensity buffer.
    pub fn data(&self) -> &[u16] {
        &self.data
    }
}

/// Image-decoding collaborator: path in, pixel array plus dimensions out.
pub trait PixelDecoder {
    fn decode(&self, path: &Path) -> Result<GrayPixels, Error>;
}

/// Decoder for standard raster formats (PNG, PGM, TIFF, ...) backed by
/// the `image` crate. Color input is converted to 16-bit grayscale.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFileDecoder;

impl PixelDecoder for ImageFileDecoder {
    fn decode(&self, path: &Path) -> Result<GrayPixels, Error> {
        let img = image::open(path)?.into_luma16();
        let (width, height) = img.dimensions();
        GrayPixels::from_raw(width, height, img.into_raw())
    }
}
