/// Boolean raster masks and the contour-to-mask rasterizer
///
/// `rasterize` fills a polygon with the canonical even-odd rule: a pixel
/// is inside iff a horizontal ray from its center to +infinity crosses an
/// odd number of polygon edges. The edge test is half-open on the y range
/// (`min(y1,y2) <= py < max(y1,y2)`) so shared vertices are never double
/// counted, and crossings are counted with a strict `x > px`, so a pixel
/// center exactly on a left edge is inside and one exactly on a right
/// edge is outside.
use image::{GrayImage, Luma};

use crate::contour::Point;
use crate::error::Error;

/// A width x height boolean grid, row-major. Never mutated after
/// construction; `get(x, y)` is true iff the pixel center (x+0.5, y+0.5)
/// lies inside the polygon it was rasterized from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    fn all_false(width: u32, height: u32) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Row-major backing slice.
    pub fn data(&self) -> &[bool] {
        &self.data
    }

    /// Number of true pixels.
    pub fn count_true(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    /// Render as an 8-bit grayscale image (inside = 255, outside = 0).
    pub fn to_image(&self) -> GrayImage {
        let mut img = GrayImage::new(self.width, self.height);
        for (x, y, px) in img.enumerate_pixels_mut() {
            if self.get(x, y) {
                *px = Luma([255]);
            }
        }
        img
    }
}

/// Rasterize a polygon into a boolean mask of the given dimensions.
///
/// Pure and deterministic: identical inputs always produce an identical
/// mask. Degenerate polygons (fewer than 3 points, or all collinear)
/// yield an all-false mask rather than an error, since annotation files
/// are an imperfect external input. Fails only with `InvalidDimensions`
/// when width or height is zero.
pub fn rasterize(polygon: &[Point], width: u32, height: u32) -> Result<Mask, Error> {
    let mut mask = Mask::all_false(width, height)?;
    if polygon.len() < 3 {
        return Ok(mask);
    }

    let mut crossings: Vec<f64> = Vec::new();
    for y in 0..height {
        let py = y as f64 + 0.5;

        crossings.clear();
        for i in 0..polygon.len() {
            let a = polygon[i];
            let b = polygon[(i + 1) % polygon.len()];
            if a.y.min(b.y) <= py && py < a.y.max(b.y) {
                // Half-open y range guarantees b.y != a.y here.
                let t = (py - a.y) / (b.y - a.y);
                crossings.push(a.x + t * (b.x - a.x));
            }
        }
        if crossings.is_empty() {
            continue;
        }
        crossings.sort_by(f64::total_cmp);

        let row = y as usize * width as usize;
        for x in 0..width {
            let px = x as f64 + 0.5;
            let to_the_right = crossings.len() - crossings.partition_point(|&c| c <= px);
            if to_the_right % 2 == 1 {
                mask.data[row + x as usize] = true;
            }
        }
    }

    Ok(mask)
}
