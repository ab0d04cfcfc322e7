use lowlight_core::{EnhanceError, EnhanceResult, Enhancer, Image};
use rand::prelude::*;
use tracing::trace;

use crate::gamma::GammaLut;

/// Synthesises low-light versions of well-lit images by applying the gamma
/// LUT with a gamma below 1.
///
/// The gamma for an image is drawn from `gamma_range` using an RNG seeded by
/// `seed` mixed with a hash of the pixel data, so the same input always
/// darkens the same way regardless of which worker handles it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowLightSimulator {
    gamma_range: (f32, f32),
    seed: u64,
}

impl Default for LowLightSimulator {
    fn default() -> Self {
        Self {
            gamma_range: (0.3, 0.7),
            seed: 42,
        }
    }
}

impl LowLightSimulator {
    pub fn new(gamma_range: (f32, f32), seed: u64) -> EnhanceResult<Self> {
        let (lo, hi) = gamma_range;
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0) {
            return Err(EnhanceError::invalid(
                "darken_gamma_range",
                format!("{}..{}", lo, hi),
                "bounds must be finite and > 0",
            ));
        }
        if lo > hi {
            return Err(EnhanceError::invalid(
                "darken_gamma_range",
                format!("{}..{}", lo, hi),
                "lower bound exceeds upper bound",
            ));
        }
        Ok(Self { gamma_range, seed })
    }

    /// Always use the same gamma ("extreme" mode uses 0.25)
    pub fn fixed(gamma: f32) -> EnhanceResult<Self> {
        Self::new((gamma, gamma), 42)
    }

    pub fn gamma_range(&self) -> (f32, f32) {
        self.gamma_range
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Gamma that `darken` would use for this image
    pub fn gamma_for(&self, image: &Image) -> f32 {
        let (lo, hi) = self.gamma_range;
        if lo == hi {
            return lo;
        }
        let mut rng = StdRng::seed_from_u64(self.seed ^ fnv1a(image.as_raw()));
        rng.gen_range(lo..hi)
    }

    /// Darkened image and the gamma that produced it
    pub fn darken(&self, image: &Image) -> EnhanceResult<(Image, f32)> {
        let gamma = self.gamma_for(image);
        let lut = GammaLut::new(gamma)?;
        trace!(gamma, "darkening image");
        Ok((lut.apply(image), gamma))
    }
}

impl Enhancer for LowLightSimulator {
    fn name(&self) -> &str {
        "lowlight-simulator"
    }

    fn enhance(&self, image: &Image) -> EnhanceResult<Image> {
        self.darken(image).map(|(out, _)| out)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}
