use lowlight_core::{Channel, EnhanceError, EnhanceResult, Image};

/// Precomputed 256-entry gamma mapping
///
/// `LUT[i] = round(((i / 255) ^ (1 / gamma)) * 255)`, clamped to `0..=255`.
/// gamma > 1 brightens, gamma < 1 darkens.
#[derive(Debug, Clone)]
pub struct GammaLut {
    gamma: f32,
    table: [u8; 256],
}

impl GammaLut {
    pub fn new(gamma: f32) -> EnhanceResult<Self> {
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(EnhanceError::invalid("gamma", gamma, "must be finite and > 0"));
        }

        let inv_gamma = 1.0 / gamma as f64;
        let mut table = [0u8; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let value = (i as f64 / 255.0).powf(inv_gamma) * 255.0;
            *entry = value.round().clamp(0.0, 255.0) as u8;
        }

        Ok(Self { gamma, table })
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn table(&self) -> &[u8; 256] {
        &self.table
    }

    #[inline]
    pub fn map(&self, value: u8) -> u8 {
        self.table[value as usize]
    }

    /// Same mapping on all three channels
    pub fn apply(&self, image: &Image) -> Image {
        let mut out = image.clone();
        for sub in out.iter_mut() {
            *sub = self.table[*sub as usize];
        }
        out
    }

    pub fn apply_channel(&self, channel: &Channel) -> Channel {
        let mut out = channel.clone();
        for sub in out.iter_mut() {
            *sub = self.table[*sub as usize];
        }
        out
    }
}

pub fn gamma_correct(image: &Image, gamma: f32) -> EnhanceResult<Image> {
    Ok(GammaLut::new(gamma)?.apply(image))
}

pub fn gamma_correct_channel(channel: &Channel, gamma: f32) -> EnhanceResult<Channel> {
    Ok(GammaLut::new(gamma)?.apply_channel(channel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use proptest::prelude::*;

    fn uniform(width: u32, height: u32, value: u8) -> Image {
        Image::from_pixel(width, height, Rgb([value, value, value]))
    }

    #[test]
    fn test_lut_endpoints() {
        for gamma in [0.25, 0.5, 1.0, 1.2, 2.2] {
            let lut = GammaLut::new(gamma).unwrap();
            assert_eq!(lut.map(0), 0);
            assert_eq!(lut.map(255), 255);
        }
    }

    #[test]
    fn test_identity_at_unit_gamma() {
        let lut = GammaLut::new(1.0).unwrap();
        for i in 0..=255u8 {
            assert!((lut.map(i) as i16 - i as i16).abs() <= 1);
        }

        let img = Image::from_fn(16, 16, |x, y| {
            Rgb([(x * 16) as u8, (y * 16) as u8, ((x + y) * 8) as u8])
        });
        let out = gamma_correct(&img, 1.0).unwrap();
        for (a, b) in img.iter().zip(out.iter()) {
            assert!((*a as i16 - *b as i16).abs() <= 1);
        }
    }

    #[test]
    fn test_half_gamma_on_mid_gray() {
        // gamma < 1 darkens under this LUT: (80/255)^2 * 255 = 25.098
        let img = uniform(100, 100, 80);
        let out = gamma_correct(&img, 0.5).unwrap();
        let expected = ((80.0f64 / 255.0).powf(1.0 / 0.5) * 255.0)
            .round()
            .clamp(0.0, 255.0) as u8;
        assert_eq!(expected, 25);
        assert!(out.iter().all(|&v| v == expected));
        assert_eq!(out.dimensions(), (100, 100));
    }

    #[test]
    fn test_enhancement_gamma_brightens() {
        let img = uniform(10, 10, 80);
        let out = gamma_correct(&img, 1.2).unwrap();
        assert!(out.iter().all(|&v| v > 80));
    }

    #[test]
    fn test_invalid_gamma() {
        for gamma in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                GammaLut::new(gamma),
                Err(EnhanceError::InvalidParameter { parameter: "gamma", .. })
            ));
        }
    }

    #[test]
    fn test_channel_variant_matches_image_variant() {
        let channel = Channel::from_fn(8, 8, |x, y| image::Luma([(x * 30 + y) as u8]));
        let out = gamma_correct_channel(&channel, 1.2).unwrap();
        let lut = GammaLut::new(1.2).unwrap();
        for (a, b) in channel.iter().zip(out.iter()) {
            assert_eq!(lut.map(*a), *b);
        }
    }

    proptest! {
        #[test]
        fn prop_lut_monotonic(gamma in 0.05f32..8.0) {
            let lut = GammaLut::new(gamma).unwrap();
            for w in lut.table().windows(2) {
                prop_assert!(w[0] <= w[1]);
            }
        }

        #[test]
        fn prop_smaller_gamma_is_pointwise_darker(g1 in 0.05f32..4.0, delta in 0.01f32..4.0) {
            let g2 = g1 + delta;
            let lo = GammaLut::new(g1).unwrap();
            let hi = GammaLut::new(g2).unwrap();
            for i in 0..256 {
                prop_assert!(lo.table()[i] <= hi.table()[i]);
            }
        }

        #[test]
        fn prop_dimensions_preserved(w in 1u32..40, h in 1u32..40, gamma in 0.1f32..3.0) {
            let img = uniform(w, h, 100);
            let out = gamma_correct(&img, gamma).unwrap();
            prop_assert_eq!(out.dimensions(), (w, h));
        }
    }
}
