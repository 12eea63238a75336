//! Adapters from encoded images to [`SampleGrid`]s and finished documents.

use crate::bitmap::SampleGrid;
use crate::error::Result;
use crate::params::TraceParams;
use crate::svg::serialize;
use crate::trace::trace;
use image::DynamicImage;
use rayon::prelude::*;
use std::path::Path;

/// Flattens transparency onto white and reduces to Rec. 601 luma.
pub fn grid_from_image(img: &DynamicImage) -> Result<SampleGrid> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let samples: Vec<u8> = rgba
        .as_raw()
        .par_chunks_exact(4)
        .map(|p| {
            // Alpha blend with white background
            let a = p[3] as f32 / 255.0;
            let r = p[0] as f32 * a + 255.0 * (1.0 - a);
            let g = p[1] as f32 * a + 255.0 * (1.0 - a);
            let b = p[2] as f32 * a + 255.0 * (1.0 - a);
            (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8
        })
        .collect();

    SampleGrid::new(width, height, samples)
}

pub fn decode_image_bytes(image_bytes: &[u8]) -> Result<SampleGrid> {
    let img = image::load_from_memory(image_bytes)?;
    log::debug!("Decoded {}x{} image", img.width(), img.height());
    grid_from_image(&img)
}

/// Decode, trace and serialize in one call.
pub fn trace_image_bytes(image_bytes: &[u8], params: &TraceParams) -> Result<String> {
    let grid = decode_image_bytes(image_bytes)?;
    let result = trace(&grid, params)?;
    serialize(&result)
}

pub fn trace_image_path(path: impl AsRef<Path>, params: &TraceParams) -> Result<String> {
    let bytes = std::fs::read(path.as_ref())?;
    trace_image_bytes(&bytes, params)
}
