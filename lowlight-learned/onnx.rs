//! ONNX Runtime backend (`onnx` feature).

use std::path::Path;

use lowlight_core::{EnhanceError, EnhanceResult};
use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;

use crate::backend::{InferenceSession, SessionLoader};

/// Builds one ONNX Runtime session per call
#[derive(Debug, Clone, Copy)]
pub struct OnnxLoader {
    /// Intra-op threads per session. Sessions already run one per worker,
    /// so the default keeps this at 1.
    pub intra_threads: usize,
}

impl Default for OnnxLoader {
    fn default() -> Self {
        Self { intra_threads: 1 }
    }
}

impl SessionLoader for OnnxLoader {
    fn load(&self, path: &Path) -> EnhanceResult<Box<dyn InferenceSession>> {
        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(self.intra_threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| {
                EnhanceError::model_load(path, format!("failed to build ONNX session: {}", e))
            })?;
        Ok(Box::new(OnnxSession { session }))
    }
}

struct OnnxSession {
    session: Session,
}

impl InferenceSession for OnnxSession {
    fn run(&mut self, input: Array4<f32>) -> EnhanceResult<Array4<f32>> {
        let input_value = Tensor::from_array(input)
            .map_err(|e| {
                EnhanceError::inference(format!("failed to create ONNX input tensor: {}", e))
            })?;

        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| EnhanceError::inference(format!("ONNX inference failed: {}", e)))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EnhanceError::inference(format!("failed to extract ONNX output: {}", e)))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        let &[n, c, h, w] = &dims[..] else {
            return Err(EnhanceError::inference(format!(
                "expected a 4-D output tensor, got shape {:?}",
                dims
            )));
        };

        Array4::from_shape_vec((n, c, h, w), data.to_vec())
            .map_err(|e| EnhanceError::inference(format!("output tensor layout: {}", e)))
    }
}
