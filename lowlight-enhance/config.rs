use std::path::PathBuf;
#[cfg(feature = "serde")]
use std::path::Path;

use lowlight_core::{EnhanceError, EnhanceResult, ModelConfig, PipelineConfig, Variant};

use crate::builder::PipelineBuilder;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Complete enhancement settings: pipeline parameters, optional learned
/// backend, worker count and descriptive metadata
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnhanceSettings {
    /// Batch worker threads
    pub workers: usize,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub version: Option<String>,
    /// Traditional chain parameters (also the fallback for the learned path)
    pub pipeline: PipelineConfig,
    /// Learned backend; `None` runs the traditional chain only
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub model: Option<ModelConfig>,
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self {
            workers: lowlight_core::default_worker_count(),
            name: None,
            description: None,
            version: None,
            pipeline: PipelineConfig::default(),
            model: None,
        }
    }
}

impl EnhanceSettings {
    pub fn new(pipeline: PipelineConfig) -> Self {
        Self {
            pipeline,
            ..Self::default()
        }
    }

    /// CLAHE and gamma only
    pub fn fast_preset() -> Self {
        Self {
            pipeline: PipelineConfig {
                variant: Variant::Simple,
                ..PipelineConfig::default()
            },
            name: Some("Fast".to_string()),
            description: Some("CLAHE on luminance followed by gamma on all channels".to_string()),
            version: Some("1.0".to_string()),
            ..Self::default()
        }
    }

    /// Full chain with Retinex and colour restoration
    pub fn quality_preset() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            name: Some("Quality".to_string()),
            description: Some(
                "CLAHE, gamma and Retinex on luminance with a saturation boost".to_string(),
            ),
            version: Some("1.0".to_string()),
            ..Self::default()
        }
    }

    /// Learned backend first, quality chain as fallback
    pub fn learned_preset(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model: Some(ModelConfig::new(model_path)),
            name: Some("Learned".to_string()),
            description: Some("Learned model with the quality chain as fallback".to_string()),
            ..Self::quality_preset()
        }
    }

    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self.version = Some("1.0".to_string());
        self
    }

    pub fn to_builder(self) -> PipelineBuilder {
        PipelineBuilder::from_config(self)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        let p = &self.pipeline;
        let model = match &self.model {
            Some(m) => format!("{} @ {}x{}", m.model_path.display(), m.input_width, m.input_height),
            None => "none".to_string(),
        };
        format!(
            "EnhanceSettings: variant={}, gamma={}, clahe=[clip:{}, grid:{}x{}], \
             retinex_sigma={}, saturation={:+}, workers={}, model={}",
            p.variant.as_str(),
            p.gamma,
            p.clahe_clip_limit,
            p.clahe_tile_grid.0,
            p.clahe_tile_grid.1,
            p.retinex_blur_sigma,
            p.saturation_boost,
            self.workers,
            model
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> EnhanceResult<()> {
        self.pipeline.validate()?;
        if let Some(model) = &self.model {
            model.validate()?;
        }
        if self.workers == 0 {
            return Err(EnhanceError::invalid("workers", 0, "must be > 0"));
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
type SettingsIoResult<T> = Result<T, Box<dyn std::error::Error>>;

#[cfg(feature = "serde")]
fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// File and string round trips. Everything read back is validated.
#[cfg(feature = "serde")]
impl EnhanceSettings {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> SettingsIoResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn from_toml(text: &str) -> SettingsIoResult<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> SettingsIoResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> SettingsIoResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> SettingsIoResult<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn load_toml<P: AsRef<Path>>(path: P) -> SettingsIoResult<Self> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// `.json` is written as JSON, anything else as TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> SettingsIoResult<()> {
        let path = path.as_ref();
        if is_json_path(path) {
            self.save_json(path)
        } else {
            self.save_toml(path)
        }
    }

    /// `.json` is read as JSON, anything else as TOML
    pub fn load<P: AsRef<Path>>(path: P) -> SettingsIoResult<Self> {
        let path = path.as_ref();
        if is_json_path(path) {
            Self::load_json(path)
        } else {
            Self::load_toml(path)
        }
    }
}
