use std::path::PathBuf;

use lowlight_core::{EnhanceResult, ModelConfig, Variant};

use crate::config::EnhanceSettings;
use crate::pipeline::TraditionalPipeline;

/// Fluent builder for `EnhanceSettings` and the traditional pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    settings: EnhanceSettings,
}

impl PipelineBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gamma applied after CLAHE (> 1 brightens)
    pub fn gamma(mut self, gamma: f32) -> Self {
        self.settings.pipeline.gamma = gamma;
        self
    }

    pub fn clahe_clip_limit(mut self, clip_limit: f32) -> Self {
        self.settings.pipeline.clahe_clip_limit = clip_limit;
        self
    }

    /// Set the CLAHE grid as (rows, cols)
    pub fn clahe_tile_grid(mut self, rows: u32, cols: u32) -> Self {
        self.settings.pipeline.clahe_tile_grid = (rows, cols);
        self
    }

    pub fn retinex_blur_sigma(mut self, sigma: f32) -> Self {
        self.settings.pipeline.retinex_blur_sigma = sigma;
        self
    }

    pub fn saturation_boost(mut self, boost: i32) -> Self {
        self.settings.pipeline.saturation_boost = boost;
        self
    }

    pub fn variant(mut self, variant: Variant) -> Self {
        self.settings.pipeline.variant = variant;
        self
    }

    /// Set the number of batch worker threads
    pub fn workers(mut self, n_workers: usize) -> Self {
        self.settings.workers = n_workers;
        self
    }

    /// Enable the learned backend with default model settings
    pub fn model(mut self, model_path: impl Into<PathBuf>) -> Self {
        let path = model_path.into();
        match self.settings.model.as_mut() {
            Some(model) => model.model_path = path,
            None => self.settings.model = Some(ModelConfig::new(path)),
        }
        self
    }

    /// Per-call inference timeout; ignored until a model is set
    pub fn model_timeout_ms(mut self, timeout_ms: u64) -> Self {
        if let Some(model) = self.settings.model.as_mut() {
            model.timeout_ms = Some(timeout_ms);
        }
        self
    }

    /// Model input resolution; ignored until a model is set
    pub fn model_input_size(mut self, width: u32, height: u32) -> Self {
        if let Some(model) = self.settings.model.as_mut() {
            model.input_width = width;
            model.input_height = height;
        }
        self
    }

    /// Drop the learned backend again
    pub fn without_model(mut self) -> Self {
        self.settings.model = None;
        self
    }

    /// Apply the fast preset, keeping the worker count
    pub fn preset_fast(mut self) -> Self {
        let workers = self.settings.workers;
        self.settings = EnhanceSettings::fast_preset();
        self.settings.workers = workers;
        self
    }

    /// Apply the quality preset, keeping the worker count
    pub fn preset_quality(mut self) -> Self {
        let workers = self.settings.workers;
        self.settings = EnhanceSettings::quality_preset();
        self.settings.workers = workers;
        self
    }

    /// Apply the learned preset, keeping the worker count
    pub fn preset_learned(mut self, model_path: impl Into<PathBuf>) -> Self {
        let workers = self.settings.workers;
        self.settings = EnhanceSettings::learned_preset(model_path);
        self.settings.workers = workers;
        self
    }

    /// Validate everything and build the traditional pipeline
    pub fn build(self) -> EnhanceResult<TraditionalPipeline> {
        self.settings.validate()?;
        TraditionalPipeline::new(self.settings.pipeline)
    }

    pub fn summary(&self) -> String {
        self.settings.summary()
    }

    pub fn from_config(settings: EnhanceSettings) -> Self {
        Self { settings }
    }

    /// Validated settings, e.g. for saving or for the learned adapter
    pub fn to_config(self) -> EnhanceResult<EnhanceSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }

    pub fn settings(&self) -> &EnhanceSettings {
        &self.settings
    }
}
