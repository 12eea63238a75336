use crate::bitmap::SampleGrid;
use crate::error::Result;
use crate::params::TraceParams;
use crate::svg::serialize;
use crate::trace::{trace, TraceResult};
use rayon::prelude::*;
use std::time::Instant;

/// Traces independent grids in parallel. Results keep the input order and
/// one failing grid never affects the others.
pub fn trace_batch(grids: &[SampleGrid], params: &TraceParams) -> Vec<Result<TraceResult>> {
    let start = Instant::now();
    let results: Vec<Result<TraceResult>> =
        grids.par_iter().map(|grid| trace(grid, params)).collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    log::info!(
        "Traced batch of {} grids ({} failed) in {}ms",
        grids.len(),
        failed,
        start.elapsed().as_millis()
    );
    results
}

pub fn trace_batch_documents(grids: &[SampleGrid], params: &TraceParams) -> Vec<Result<String>> {
    grids
        .par_iter()
        .map(|grid| trace(grid, params).and_then(|result| serialize(&result)))
        .collect()
}
