use lowlight_core::Image;

use crate::color::rgb_to_hsv;

/// Shift HSV saturation by `boost`, saturating at 0 and 255.
///
/// Hue and value planes are left as they are. A zero boost returns a copy.
pub fn boost_saturation(image: &Image, boost: i32) -> Image {
    if boost == 0 {
        return image.clone();
    }

    let mut hsv = rgb_to_hsv(image);
    for s in hsv.s.iter_mut() {
        *s = (*s as i32 + boost).clamp(0, 255) as u8;
    }
    hsv.to_rgb()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn saturation(px: &Rgb<u8>) -> f32 {
        let max = px.0.iter().copied().max().unwrap_or(0) as f32;
        let min = px.0.iter().copied().min().unwrap_or(0) as f32;
        if max == 0.0 { 0.0 } else { (max - min) / max }
    }

    #[test]
    fn test_zero_boost_is_identity() {
        let img = Image::from_fn(8, 8, |x, y| Rgb([(x * 30) as u8, (y * 30) as u8, 50]));
        assert_eq!(boost_saturation(&img, 0), img);
    }

    #[test]
    fn test_boost_increases_saturation() {
        let img = Image::from_pixel(4, 4, Rgb([180, 120, 100]));
        let out = boost_saturation(&img, 10);
        let before = saturation(img.get_pixel(0, 0));
        let after = saturation(out.get_pixel(0, 0));
        assert!(after > before, "{} -> {}", before, after);
    }

    #[test]
    fn test_fully_saturated_does_not_wrap() {
        let img = Image::from_pixel(4, 4, Rgb([255, 0, 0]));
        let out = boost_saturation(&img, 10);
        assert_eq!(*out.get_pixel(0, 0), Rgb([255, 0, 0]));
    }

    #[test]
    fn test_gray_boost_keeps_value() {
        // Hue of gray is 0 (red), so a boost tints it slightly red but
        // never pushes any channel above the value
        let img = Image::from_pixel(2, 2, Rgb([90, 90, 90]));
        let out = boost_saturation(&img, 10);
        let px = out.get_pixel(0, 0);
        assert!(px.0.iter().all(|&c| c <= 90));
        assert_eq!(px[0], 90);
    }

    #[test]
    fn test_negative_boost_desaturates() {
        let img = Image::from_pixel(2, 2, Rgb([200, 50, 50]));
        let out = boost_saturation(&img, -255);
        let px = out.get_pixel(0, 0);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
    }
}
