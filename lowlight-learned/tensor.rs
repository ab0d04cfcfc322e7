use image::Rgb;
use lowlight_core::{EnhanceError, EnhanceResult, Image};
use ndarray::Array4;

/// RGB image to a `[1, 3, H, W]` tensor scaled to `[-1, 1]`
pub fn to_tensor(image: &Image) -> Array4<f32> {
    let (w, h) = image.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, 3, h as usize, w as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 127.5 - 1.0;
        }
    }

    tensor
}

/// `[1, 3, H, W]` tensor in `[-1, 1]` back to an RGB image.
///
/// Values map through `(x + 1) * 127.5`, are clamped to `0..=255` and
/// truncated. Wrong shapes and non-finite values are inference failures.
pub fn from_tensor(tensor: &Array4<f32>, width: u32, height: u32) -> EnhanceResult<Image> {
    let expected = [1, 3, height as usize, width as usize];
    if tensor.shape() != &expected[..] {
        return Err(EnhanceError::inference(format!(
            "unexpected output shape {:?}, expected {:?}",
            tensor.shape(),
            expected
        )));
    }
    if tensor.iter().any(|v| !v.is_finite()) {
        return Err(EnhanceError::inference("model output contains non-finite values"));
    }

    Ok(Image::from_fn(width, height, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([0, 1, 2].map(|c| ((tensor[[0, c, y, x]] + 1.0) * 127.5).clamp(0.0, 255.0) as u8))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalisation_range() {
        let img = Image::from_fn(2, 1, |x, _| Rgb([if x == 0 { 0 } else { 255 }; 3]));
        let t = to_tensor(&img);
        assert_eq!(t.shape(), &[1, 3, 1, 2]);
        assert_eq!(t[[0, 0, 0, 0]], -1.0);
        assert_eq!(t[[0, 2, 0, 1]], 1.0);
    }

    #[test]
    fn test_layout_is_channel_major() {
        let img = Image::from_pixel(3, 2, Rgb([255, 0, 51]));
        let t = to_tensor(&img);
        assert_eq!(t.shape(), &[1, 3, 2, 3]);
        assert!(t.index_axis(ndarray::Axis(1), 0).iter().all(|&v| v == 1.0));
        assert!(t.index_axis(ndarray::Axis(1), 1).iter().all(|&v| v == -1.0));
    }

    #[test]
    fn test_round_trip_within_one_level() {
        let img = Image::from_fn(16, 8, |x, y| Rgb([(x * 16) as u8, (y * 30) as u8, 128]));
        let back = from_tensor(&to_tensor(&img), 16, 8).unwrap();
        for (a, b) in img.iter().zip(back.iter()) {
            assert!((*a as i16 - *b as i16).abs() <= 1);
        }
    }

    #[test]
    fn test_out_of_range_values_clamp() {
        let mut t = Array4::<f32>::zeros((1, 3, 1, 1));
        t[[0, 0, 0, 0]] = 4.0;
        t[[0, 1, 0, 0]] = -3.0;
        let img = from_tensor(&t, 1, 1).unwrap();
        assert_eq!(img.get_pixel(0, 0)[0], 255);
        assert_eq!(img.get_pixel(0, 0)[1], 0);
        assert_eq!(img.get_pixel(0, 0)[2], 127);
    }

    #[test]
    fn test_rejects_bad_shape_and_nan() {
        let t = Array4::<f32>::zeros((1, 3, 4, 4));
        assert!(from_tensor(&t, 8, 8).is_err());

        let mut t = Array4::<f32>::zeros((1, 3, 2, 2));
        t[[0, 1, 1, 1]] = f32::NAN;
        let err = from_tensor(&t, 2, 2).unwrap_err();
        assert_eq!(err.kind(), "inference_failure");
    }
}
