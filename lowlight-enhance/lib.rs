//! Traditional illumination enhancement.
//!
//! Leaf stages ([`gamma_correct`], [`clahe_enhance`], [`retinex_enhance`],
//! [`boost_saturation`]) compose into [`TraditionalPipeline`], the universal
//! fallback for the learned backend. [`LowLightSimulator`] runs the gamma
//! LUT the other way to synthesise dark training data.

pub mod builder;
pub mod clahe;
pub mod color;
pub mod config;
pub mod gamma;
pub mod lowlight;
pub mod pipeline;
pub mod retinex;
pub mod saturation;

pub use builder::PipelineBuilder;
pub use clahe::{clahe_enhance, Clahe};
pub use color::{rgb_to_hsv, rgb_to_lab, HsvPlanes, LabPlanes};
pub use config::EnhanceSettings;
pub use gamma::{gamma_correct, gamma_correct_channel, GammaLut};
pub use lowlight::LowLightSimulator;
pub use pipeline::TraditionalPipeline;
pub use retinex::retinex_enhance;
pub use saturation::boost_saturation;

pub use lowlight_core::{
    Channel, EnhanceError, EnhanceResult, Enhancer, Image, ModelConfig, PipelineConfig, Variant,
};
