use crate::bitmap::{binarize, SampleGrid};
use crate::contours::extract_contours;
use crate::error::{Result, TraceError};
use crate::optimize::{optimize_contour, Canvas};
use crate::params::{FillRule, TraceParams};
use crate::path::PathChain;
use crate::speckle::filter_speckles;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Everything the serializer needs to emit one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    pub width: u32,
    pub height: u32,
    /// In contour discovery order.
    pub chains: Vec<PathChain>,
    pub fill_color: [u8; 3],
    pub fill_rule: FillRule,
}

impl TraceResult {
    pub fn segment_count(&self) -> usize {
        self.chains.iter().map(|c| c.segments.len()).sum()
    }

    pub fn curve_count(&self) -> usize {
        self.chains.iter().map(PathChain::curve_count).sum()
    }
}

/// Binarize, extract, filter and fit. Holds no state between calls.
pub fn trace(grid: &SampleGrid, params: &TraceParams) -> Result<TraceResult> {
    let start = Instant::now();
    params.validate()?;

    let bitmap = binarize(grid, params.threshold)?;
    log::debug!(
        "Binarized {}x{} grid at threshold {:.3}: {} foreground pixels",
        grid.width(),
        grid.height(),
        params.threshold,
        bitmap.foreground_count()
    );

    let contours = extract_contours(&bitmap)?;
    log::debug!("Extracted {} contours", contours.len());

    let contours = filter_speckles(contours, params.turdsize);

    let canvas = Canvas::new(grid.width(), grid.height());
    let chains: Vec<PathChain> = contours
        .iter()
        .map(|contour| optimize_contour(contour, params, canvas))
        .collect();

    let result = TraceResult {
        width: grid.width(),
        height: grid.height(),
        chains,
        fill_color: params.fill_color,
        fill_rule: params.fill_rule,
    };
    verify(&result)?;

    log::debug!(
        "Fitted {} segments ({} curves)",
        result.segment_count(),
        result.curve_count()
    );
    log::info!(
        "Traced {}x{} grid into {} chains in {}ms",
        result.width,
        result.height,
        result.chains.len(),
        start.elapsed().as_millis()
    );
    Ok(result)
}

fn verify(result: &TraceResult) -> Result<()> {
    let (w, h) = (result.width as f64, result.height as f64);
    for (idx, chain) in result.chains.iter().enumerate() {
        if !chain.is_closed() {
            return Err(TraceError::design_violation(format!(
                "chain {} is not closed",
                idx
            )));
        }
        if let Some(gap) = chain.first_gap() {
            return Err(TraceError::design_violation(format!(
                "chain {} breaks before segment {}",
                idx, gap
            )));
        }
        for p in chain.segments.iter().flat_map(|s| s.points()) {
            if !p.is_finite() || p.x < 0.0 || p.y < 0.0 || p.x > w || p.y > h {
                return Err(TraceError::design_violation(format!(
                    "chain {} has coordinate ({}, {}) outside the {}x{} canvas",
                    idx, p.x, p.y, result.width, result.height
                )));
            }
        }
    }
    Ok(())
}
