use imageproc::filter::gaussian_blur_f32;
use lowlight_core::{Channel, EnhanceError, EnhanceResult};

/// Single-scale Retinex on one 8-bit plane.
///
/// `r = ln(L + 1) - ln(blur(L) + 1)`, min-max stretched to `0..=255` and
/// truncated to `u8`. A response with zero range (flat input) returns the
/// input plane unchanged.
pub fn retinex_enhance(channel: &Channel, sigma: f32) -> EnhanceResult<Channel> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(EnhanceError::invalid("retinex_blur_sigma", sigma, "must be finite and > 0"));
    }
    let (width, height) = channel.dimensions();
    let raw = channel.as_raw();
    if width == 0 || height == 0 || raw.iter().all(|&v| v == raw[0]) {
        return Ok(channel.clone());
    }

    let blurred = gaussian_blur_f32(channel, sigma);

    let response: Vec<f32> = raw
        .iter()
        .zip(blurred.as_raw().iter())
        .map(|(&l, &g)| (l as f32 + 1.0).ln() - (g as f32 + 1.0).ln())
        .collect();

    let (min, max) = response
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &r| (lo.min(r), hi.max(r)));

    if !(min.is_finite() && max.is_finite()) {
        return Err(EnhanceError::DegenerateInput {
            reason: format!("retinex response out of range [{}, {}]", min, max),
        });
    }

    let range = max - min;
    if range <= f32::EPSILON {
        return Ok(channel.clone());
    }

    let out: Vec<u8> = response
        .iter()
        .map(|&r| ((r - min) / range * 255.0).clamp(0.0, 255.0) as u8)
        .collect();

    Channel::from_raw(width, height, out).ok_or_else(|| EnhanceError::DegenerateInput {
        reason: "retinex output buffer size mismatch".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_flat_plane_is_unchanged() {
        let plane = Channel::from_pixel(40, 30, Luma([77]));
        let out = retinex_enhance(&plane, 15.0).unwrap();
        assert_eq!(out, plane);
    }

    #[test]
    fn test_output_spans_full_range() {
        let plane = Channel::from_fn(64, 64, |x, y| Luma([((x * 3 + y) % 120) as u8 + 10]));
        let out = retinex_enhance(&plane, 15.0).unwrap();
        assert_eq!(out.dimensions(), (64, 64));
        assert_eq!(out.iter().copied().min(), Some(0));
        assert_eq!(out.iter().copied().max(), Some(255));
    }

    #[test]
    fn test_bright_spot_stands_out() {
        let mut plane = Channel::from_pixel(33, 33, Luma([40]));
        plane.put_pixel(16, 16, Luma([200]));
        let out = retinex_enhance(&plane, 5.0).unwrap();
        assert_eq!(out.get_pixel(16, 16)[0], 255);
        assert!(out.get_pixel(0, 0)[0] < 255);
    }

    #[test]
    fn test_invalid_sigma() {
        let plane = Channel::from_pixel(4, 4, Luma([1]));
        assert!(retinex_enhance(&plane, 0.0).is_err());
        assert!(retinex_enhance(&plane, f32::NAN).is_err());
    }

    #[test]
    fn test_empty_plane() {
        let plane = Channel::new(0, 0);
        assert_eq!(retinex_enhance(&plane, 15.0).unwrap().dimensions(), (0, 0));
    }
}
