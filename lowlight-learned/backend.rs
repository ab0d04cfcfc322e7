use std::path::Path;

use lowlight_core::{EnhanceError, EnhanceResult};
use ndarray::Array4;

/// One loaded model instance. `run` takes `&mut self`; callers serialise
/// access per session.
pub trait InferenceSession: Send {
    /// NCHW `f32` in, NCHW `f32` out
    fn run(&mut self, input: Array4<f32>) -> EnhanceResult<Array4<f32>>;
}

/// Creates sessions from a weights file
pub trait SessionLoader: Send + Sync {
    fn load(&self, path: &Path) -> EnhanceResult<Box<dyn InferenceSession>>;
}

/// Loader used when no inference backend is compiled in
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedLoader;

impl SessionLoader for UnsupportedLoader {
    fn load(&self, path: &Path) -> EnhanceResult<Box<dyn InferenceSession>> {
        Err(EnhanceError::model_load(
            path,
            "no inference backend compiled in (enable the `onnx` feature)",
        ))
    }
}

/// ONNX Runtime when the `onnx` feature is on, otherwise a loader that
/// always fails
pub fn default_loader() -> Box<dyn SessionLoader> {
    #[cfg(feature = "onnx")]
    {
        Box::new(crate::onnx::OnnxLoader::default())
    }
    #[cfg(not(feature = "onnx"))]
    {
        Box::new(UnsupportedLoader)
    }
}
