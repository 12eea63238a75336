use crate::error::{Result, TraceError};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contrast::otsu_level;

/// Row-major 8-bit intensity grid handed over by the decoding collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGrid {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl SampleGrid {
    pub fn new(width: u32, height: u32, samples: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(TraceError::invalid_input(format!(
                "sample grid {}x{} needs {} samples, got {}",
                width,
                height,
                expected,
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    pub fn from_gray_image(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            samples: image.as_raw().clone(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.samples[y as usize * self.width as usize + x as usize]
    }

    pub fn to_gray_image(&self) -> GrayImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| Luma([self.get(x, y)]))
    }
}

/// Foreground/background flags derived from a [`SampleGrid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reads a pixel; anything outside the canvas is background.
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.bits[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let idx = y as usize * self.width as usize + x as usize;
        self.bits[idx] = value;
    }

    pub fn foreground_count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Builds a bitmap from text rows where `#` marks foreground.
    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.first().map(|r| r.len()).unwrap_or(0) as u32;
        let mut bitmap = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                bitmap.set(x as u32, y as u32, ch == '#');
            }
        }
        bitmap
    }
}

/// Marks every sample at or below `threshold * 255` as foreground ink.
pub fn binarize(grid: &SampleGrid, threshold: f64) -> Result<Bitmap> {
    if grid.is_empty() {
        return Err(TraceError::invalid_input(format!(
            "cannot trace a {}x{} grid",
            grid.width(),
            grid.height()
        )));
    }
    if !(threshold.is_finite() && threshold > 0.0 && threshold < 1.0) {
        return Err(TraceError::invalid_input(format!(
            "threshold must lie strictly between 0 and 1, got {}",
            threshold
        )));
    }

    let cutoff = threshold * 255.0;
    Ok(Bitmap {
        width: grid.width(),
        height: grid.height(),
        bits: grid.samples().iter().map(|&v| v as f64 <= cutoff).collect(),
    })
}

/// Threshold fraction picked by Otsu's method, usable as `TraceParams::threshold`.
pub fn auto_threshold(grid: &SampleGrid) -> f64 {
    if grid.is_empty() {
        return crate::params::DEFAULT_THRESHOLD;
    }
    let level = otsu_level(&grid.to_gray_image());
    (level as f64 / 255.0).clamp(1.0 / 255.0, 254.0 / 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binarize_keeps_samples_at_or_below_cutoff() {
        // 0.5 * 255 = 127.5
        let grid = SampleGrid::new(4, 1, vec![0, 127, 128, 255]).unwrap();
        let bitmap = binarize(&grid, 0.5).unwrap();
        assert!(bitmap.get(0, 0));
        assert!(bitmap.get(1, 0));
        assert!(!bitmap.get(2, 0));
        assert!(!bitmap.get(3, 0));
        assert_eq!(bitmap.foreground_count(), 2);
    }

    #[test]
    fn binarize_rejects_zero_dimension_grid() {
        let grid = SampleGrid::new(0, 5, Vec::new()).unwrap();
        let err = binarize(&grid, 0.45).unwrap_err();
        assert!(matches!(err, TraceError::InvalidInput(_)));
    }

    #[test]
    fn binarize_rejects_threshold_outside_unit_interval() {
        let grid = SampleGrid::new(1, 1, vec![0]).unwrap();
        assert!(binarize(&grid, 0.0).is_err());
        assert!(binarize(&grid, 1.0).is_err());
        assert!(binarize(&grid, f64::NAN).is_err());
    }

    #[test]
    fn grid_rejects_mismatched_sample_count() {
        let err = SampleGrid::new(3, 3, vec![0; 8]).unwrap_err();
        assert!(matches!(err, TraceError::InvalidInput(_)));
    }

    #[test]
    fn out_of_range_reads_are_background() {
        let bitmap = Bitmap::from_rows(&["##", "##"]);
        assert!(bitmap.get(1, 1));
        assert!(!bitmap.get(-1, 0));
        assert!(!bitmap.get(0, 2));
        assert!(!bitmap.get(2, 0));
    }

    #[test]
    fn auto_threshold_splits_bimodal_grid() {
        let mut samples = vec![20u8; 50];
        samples.extend(vec![230u8; 50]);
        let grid = SampleGrid::new(10, 10, samples).unwrap();

        let threshold = auto_threshold(&grid);
        assert!(threshold > 0.0 && threshold < 1.0);

        let bitmap = binarize(&grid, threshold).unwrap();
        assert_eq!(bitmap.foreground_count(), 50);
    }
}
