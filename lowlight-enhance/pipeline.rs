use lowlight_core::{EnhanceResult, Enhancer, Image, PipelineConfig, Variant};
use tracing::debug;

use crate::clahe::Clahe;
use crate::color::rgb_to_lab;
use crate::gamma::GammaLut;
use crate::retinex::retinex_enhance;
use crate::saturation::boost_saturation;

/// CLAHE + gamma (+ Retinex + saturation) chain.
///
/// Construct once per configuration; every call is pure and deterministic,
/// so one instance can be shared across worker threads.
#[derive(Debug, Clone)]
pub struct TraditionalPipeline {
    config: PipelineConfig,
    gamma: GammaLut,
    clahe: Clahe,
}

impl TraditionalPipeline {
    pub fn new(config: PipelineConfig) -> EnhanceResult<Self> {
        config.validate()?;
        let gamma = GammaLut::new(config.gamma)?;
        let clahe = Clahe::from_config(&config)?;
        debug!(
            variant = config.variant.as_str(),
            gamma = config.gamma,
            clip_limit = config.clahe_clip_limit,
            "traditional pipeline ready"
        );
        Ok(Self { config, gamma, clahe })
    }

    /// Default parameters with the given variant
    pub fn with_variant(variant: Variant) -> EnhanceResult<Self> {
        Self::new(PipelineConfig {
            variant,
            ..PipelineConfig::default()
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn variant(&self) -> Variant {
        self.config.variant
    }

    /// Run the configured variant
    pub fn enhance(&self, image: &Image) -> EnhanceResult<Image> {
        match self.config.variant {
            Variant::Simple => Ok(self.simple(image)),
            Variant::Enhanced => self.enhanced(image),
        }
    }

    /// CLAHE on luminance, then the gamma LUT on all three channels
    pub fn simple(&self, image: &Image) -> Image {
        let equalized = self.clahe.apply_image(image);
        self.gamma.apply(&equalized)
    }

    /// CLAHE, gamma and Retinex on luminance, original chroma, then a
    /// saturation boost
    pub fn enhanced(&self, image: &Image) -> EnhanceResult<Image> {
        let lab = rgb_to_lab(image);

        let l = self.clahe.apply_channel(&lab.l);
        let l = self.gamma.apply_channel(&l);
        let l = retinex_enhance(&l, self.config.retinex_blur_sigma)?;

        let recombined = lab.with_luminance(l).to_rgb();
        Ok(boost_saturation(&recombined, self.config.saturation_boost))
    }
}

impl Enhancer for TraditionalPipeline {
    fn name(&self) -> &str {
        match self.config.variant {
            Variant::Simple => "traditional-simple",
            Variant::Enhanced => "traditional-enhanced",
        }
    }

    fn enhance(&self, image: &Image) -> EnhanceResult<Image> {
        TraditionalPipeline::enhance(self, image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use lowlight_core::EnhanceError;

    fn dark_scene(width: u32, height: u32) -> Image {
        Image::from_fn(width, height, |x, y| {
            let base = ((x * 7 + y * 3) % 50) as u8 + 5;
            Rgb([base, base.saturating_add(10), base / 2])
        })
    }

    fn mean_luma(image: &Image) -> f64 {
        let sum: u64 = image.iter().map(|&v| v as u64).sum();
        sum as f64 / image.as_raw().len() as f64
    }

    #[test]
    fn test_dimensions_preserved_for_both_variants() {
        for variant in [Variant::Simple, Variant::Enhanced] {
            let pipeline = TraditionalPipeline::with_variant(variant).unwrap();
            for (w, h) in [(1, 1), (17, 9), (120, 80)] {
                let out = pipeline.enhance(&dark_scene(w, h)).unwrap();
                assert_eq!(out.dimensions(), (w, h), "{:?}", variant);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let pipeline = TraditionalPipeline::with_variant(Variant::Enhanced).unwrap();
        let img = dark_scene(64, 48);
        let a = pipeline.enhance(&img).unwrap();
        let b = pipeline.enhance(&img).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_simple_brightens_dark_scene() {
        let pipeline = TraditionalPipeline::with_variant(Variant::Simple).unwrap();
        let img = dark_scene(96, 96);
        let out = pipeline.enhance(&img).unwrap();
        assert!(mean_luma(&out) > mean_luma(&img));
    }

    #[test]
    fn test_enhanced_stretches_luminance() {
        let pipeline = TraditionalPipeline::with_variant(Variant::Enhanced).unwrap();
        let img = dark_scene(96, 96);
        let out = pipeline.enhance(&img).unwrap();
        let max_in = img.iter().copied().max().unwrap();
        let max_out = out.iter().copied().max().unwrap();
        assert!(max_out > max_in);
    }

    #[test]
    fn test_flat_image_simple_variant() {
        // CLAHE leaves flat input alone, gamma 1.2 still brightens it
        let pipeline = TraditionalPipeline::with_variant(Variant::Simple).unwrap();
        let img = Image::from_pixel(10, 10, Rgb([80, 80, 80]));
        let out = pipeline.enhance(&img).unwrap();
        let lut = GammaLut::new(1.2).unwrap();
        assert!(out.iter().all(|&v| v == lut.map(80)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = PipelineConfig {
            gamma: -1.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            TraditionalPipeline::new(cfg),
            Err(EnhanceError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_enhancer_names() {
        let simple = TraditionalPipeline::with_variant(Variant::Simple).unwrap();
        let enhanced = TraditionalPipeline::with_variant(Variant::Enhanced).unwrap();
        assert_eq!(Enhancer::name(&simple), "traditional-simple");
        assert_eq!(Enhancer::name(&enhanced), "traditional-enhanced");
    }
}
