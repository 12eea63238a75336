use crate::error::{Result, TraceError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD: f64 = 0.45;
pub const DEFAULT_TURDSIZE: u32 = 2;
pub const DEFAULT_OPTTOLERANCE: f64 = 0.2;
pub const DEFAULT_ALPHAMAX: f64 = 1.0;

/// Fill rule declared on the emitted path.
///
/// Outer contours wind clockwise on screen and holes counter-clockwise, so
/// both rules reproduce the traced foreground.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl FillRule {
    pub fn as_svg(self) -> &'static str {
        match self {
            FillRule::NonZero => "nonzero",
            FillRule::EvenOdd => "evenodd",
        }
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TracePreset {
    Standard,
    Sticker,
    Detailed,
}

/// Per-call tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceParams {
    /// Fraction of full white at or below which a sample counts as ink.
    pub threshold: f64,
    /// Contours enclosing this many pixels or fewer are dropped as speckles.
    pub turdsize: u32,
    /// Maximum distance a fitted curve may stray from its source vertices.
    pub opttolerance: f64,
    /// Corner sensitivity; higher values round off more vertices.
    pub alphamax: f64,
    pub fill_color: [u8; 3],
    pub fill_rule: FillRule,
}

impl TraceParams {
    /// Standard: trace-bitmap defaults for general artwork.
    pub fn standard() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            turdsize: DEFAULT_TURDSIZE,
            opttolerance: DEFAULT_OPTTOLERANCE,
            alphamax: DEFAULT_ALPHAMAX,
            fill_color: [0, 0, 0],
            fill_rule: FillRule::NonZero,
        }
    }

    /// Sticker: high black cutoff so anti-aliased line art traces as solid ink.
    pub fn sticker() -> Self {
        Self {
            threshold: 0.8,
            turdsize: 4,
            opttolerance: 0.4,
            ..Self::standard()
        }
    }

    /// Detailed: keeps small features and sharper corners.
    pub fn detailed() -> Self {
        Self {
            turdsize: 0,
            opttolerance: 0.1,
            alphamax: 0.75,
            ..Self::standard()
        }
    }

    pub fn from_preset(preset: TracePreset) -> Self {
        match preset {
            TracePreset::Standard => Self::standard(),
            TracePreset::Sticker => Self::sticker(),
            TracePreset::Detailed => Self::detailed(),
        }
    }

    /// Parses a JSON config; missing fields fall back to the standard preset.
    pub fn from_json(text: &str) -> Result<Self> {
        let params: TraceParams = serde_json::from_str(text)
            .map_err(|e| TraceError::invalid_input(format!("Failed to parse trace params: {}", e)))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.threshold.is_finite() && self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(TraceError::invalid_input(format!(
                "threshold must lie strictly between 0 and 1, got {}",
                self.threshold
            )));
        }
        if !(self.opttolerance.is_finite() && self.opttolerance > 0.0) {
            return Err(TraceError::invalid_input(format!(
                "opttolerance must be a positive number, got {}",
                self.opttolerance
            )));
        }
        if !(self.alphamax.is_finite() && self.alphamax >= 0.0) {
            return Err(TraceError::invalid_input(format!(
                "alphamax must be a non-negative number, got {}",
                self.alphamax
            )));
        }
        Ok(())
    }
}

impl Default for TraceParams {
    fn default() -> Self {
        Self::standard()
    }
}
