//! Monochrome raster-to-vector tracing.
//!
//! A [`SampleGrid`] is binarized, its ink boundaries are walked on the
//! pixel-corner lattice, speckles are dropped, and each surviving contour is
//! fitted with lines and cubic curves before [`serialize`] writes SVG.

pub mod batch;
pub mod bitmap;
pub mod contours;
pub mod decode;
pub mod error;
pub mod optimize;
pub mod params;
pub mod path;
pub mod speckle;
pub mod svg;
pub mod trace;

pub use batch::{trace_batch, trace_batch_documents};
pub use bitmap::{auto_threshold, binarize, Bitmap, SampleGrid};
pub use contours::{extract_contours, Contour, GridPoint, Polarity};
pub use decode::{decode_image_bytes, grid_from_image, trace_image_bytes, trace_image_path};
pub use error::{Result, TraceError};
pub use optimize::{optimize_contour, Canvas};
pub use params::{FillRule, TraceParams, TracePreset};
pub use path::{PathChain, Point, Segment};
pub use speckle::filter_speckles;
pub use svg::serialize;
pub use trace::{trace, TraceResult};
