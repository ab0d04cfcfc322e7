use std::path::PathBuf;
use std::time::Duration;

use crate::error::{EnhanceError, EnhanceResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which traditional chain to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Variant {
    /// CLAHE on luminance, then gamma on every channel
    Simple,
    /// CLAHE, gamma and Retinex on luminance, then saturation boost
    #[default]
    Enhanced,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Simple => "simple",
            Variant::Enhanced => "enhanced",
        }
    }
}

impl std::str::FromStr for Variant {
    type Err = EnhanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(Variant::Simple),
            "enhanced" => Ok(Variant::Enhanced),
            _ => Err(EnhanceError::invalid("variant", s, "expected `simple` or `enhanced`")),
        }
    }
}

/// Parameters of the traditional enhancement chain
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    pub gamma: f32,
    pub clahe_clip_limit: f32,
    /// (rows, cols)
    pub clahe_tile_grid: (u32, u32),
    pub retinex_blur_sigma: f32,
    pub saturation_boost: i32,
    pub variant: Variant,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gamma: 1.2,
            clahe_clip_limit: 3.0,
            clahe_tile_grid: (8, 8),
            retinex_blur_sigma: 15.0,
            saturation_boost: 10,
            variant: Variant::Enhanced,
        }
    }
}

impl PipelineConfig {
    /// Reject values outside their domain. Nothing is clamped here.
    pub fn validate(&self) -> EnhanceResult<()> {
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(EnhanceError::invalid("gamma", self.gamma, "must be finite and > 0"));
        }
        if !(self.clahe_clip_limit.is_finite() && self.clahe_clip_limit > 0.0) {
            return Err(EnhanceError::invalid(
                "clahe_clip_limit",
                self.clahe_clip_limit,
                "must be finite and > 0",
            ));
        }
        let (rows, cols) = self.clahe_tile_grid;
        if rows == 0 || cols == 0 {
            return Err(EnhanceError::invalid(
                "clahe_tile_grid",
                format!("{}x{}", rows, cols),
                "rows and cols must be > 0",
            ));
        }
        if !(self.retinex_blur_sigma.is_finite() && self.retinex_blur_sigma > 0.0) {
            return Err(EnhanceError::invalid(
                "retinex_blur_sigma",
                self.retinex_blur_sigma,
                "must be finite and > 0",
            ));
        }
        Ok(())
    }
}

/// Settings for the optional learned enhancement backend
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ModelConfig {
    pub model_path: PathBuf,
    /// Fixed model input resolution
    pub input_width: u32,
    pub input_height: u32,
    /// Per-call inference guard; `None` waits forever
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub timeout_ms: Option<u64>,
    /// Number of independent sessions (one per worker)
    pub sessions: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("weights/enlightengan.onnx"),
            input_width: 256,
            input_height: 256,
            timeout_ms: None,
            sessions: crate::default_worker_count(),
        }
    }
}

impl ModelConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> EnhanceResult<()> {
        if self.input_width == 0 || self.input_height == 0 {
            return Err(EnhanceError::invalid(
                "model_input_size",
                format!("{}x{}", self.input_width, self.input_height),
                "must be > 0",
            ));
        }
        if self.sessions == 0 {
            return Err(EnhanceError::invalid("model_sessions", 0, "must be > 0"));
        }
        if self.timeout_ms == Some(0) {
            return Err(EnhanceError::invalid("model_timeout_ms", 0, "must be > 0 when set"));
        }
        Ok(())
    }
}
