use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used across the enhancement crates
pub type EnhanceResult<T> = Result<T, EnhanceError>;

/// Failure modes of the enhancement pipeline and the batch driver
#[derive(Error, Debug)]
pub enum EnhanceError {
    /// Configuration value outside its valid domain
    #[error("Invalid parameter: {parameter} = {value} ({reason})")]
    InvalidParameter {
        parameter: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Source file could not be opened or decoded
    #[error("Failed to read image {}: {}", .path.display(), .source)]
    UnreadableImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Learned backend weights missing, corrupt or unsupported
    #[error("Failed to load model {}: {reason}", .path.display())]
    ModelLoadFailure { path: PathBuf, reason: String },

    /// Transient backend error during a single inference call
    #[error("Inference failed: {reason}")]
    InferenceFailure { reason: String },

    /// Output file or one of its parent directories could not be written
    #[error("Failed to write {}: {}", .path.display(), .source)]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Output root could not be created; the batch cannot make progress
    #[error("Cannot create output directory {}: {}", .path.display(), .source)]
    BatchIOFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Numeric stage produced non-finite values
    #[error("Degenerate input: {reason}")]
    DegenerateInput { reason: String },
}

impl EnhanceError {
    pub fn invalid(parameter: &'static str, value: impl ToString, reason: &'static str) -> Self {
        Self::InvalidParameter {
            parameter,
            value: value.to_string(),
            reason,
        }
    }

    pub fn unreadable(path: &Path, source: image::ImageError) -> Self {
        Self::UnreadableImage {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn model_load(path: &Path, reason: impl Into<String>) -> Self {
        Self::ModelLoadFailure {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn inference(reason: impl Into<String>) -> Self {
        Self::InferenceFailure {
            reason: reason.into(),
        }
    }

    pub fn write<E>(path: &Path, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WriteFailure {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    /// Whether the batch driver may count this error and keep going
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            EnhanceError::BatchIOFailure { .. } | EnhanceError::InvalidParameter { .. }
        )
    }

    /// Stable short label for reports
    pub fn kind(&self) -> &'static str {
        match self {
            EnhanceError::InvalidParameter { .. } => "invalid_parameter",
            EnhanceError::UnreadableImage { .. } => "unreadable_image",
            EnhanceError::ModelLoadFailure { .. } => "model_load_failure",
            EnhanceError::InferenceFailure { .. } => "inference_failure",
            EnhanceError::WriteFailure { .. } => "write_failure",
            EnhanceError::BatchIOFailure { .. } => "batch_io_failure",
            EnhanceError::DegenerateInput { .. } => "degenerate_input",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_message() {
        let err = EnhanceError::invalid("gamma", -1.0, "must be > 0");
        assert_eq!(err.to_string(), "Invalid parameter: gamma = -1 (must be > 0)");
        assert!(!err.is_recoverable());
        assert_eq!(err.kind(), "invalid_parameter");
    }

    #[test]
    fn test_recoverable_classification() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let fatal = EnhanceError::BatchIOFailure {
            path: PathBuf::from("/out"),
            source: io,
        };
        assert!(!fatal.is_recoverable());

        let write = EnhanceError::write(
            Path::new("/out/a.png"),
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert!(write.is_recoverable());
        assert!(write.to_string().contains("/out/a.png"));

        assert!(EnhanceError::inference("timeout").is_recoverable());
        assert!(EnhanceError::model_load(Path::new("m.onnx"), "missing").is_recoverable());
    }
}
