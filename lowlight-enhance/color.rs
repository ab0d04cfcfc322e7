//! 8-bit colour-space conversions.
//!
//! Lab and HSV planes use the common 8-bit packing: `L` scaled to 0–255,
//! `a`/`b` offset by 128, hue halved to 0–179. Every conversion rounds and
//! saturates to `u8`; nothing wraps.

use std::sync::OnceLock;

use image::Rgb;
use lowlight_core::{Channel, Image};
use rayon::prelude::*;

/// D65 reference white
const XN: f32 = 0.950456;
const ZN: f32 = 1.088754;

const RGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.412453, 0.357580, 0.180423],
    [0.212671, 0.715160, 0.072169],
    [0.019334, 0.119193, 0.950227],
];

const XYZ_TO_RGB: [[f32; 3]; 3] = [
    [3.240479, -1.537150, -0.498535],
    [-0.969256, 1.875991, 0.041556],
    [0.055648, -0.204043, 1.057311],
];

const LAB_EPSILON: f32 = 0.008856;
const LAB_KAPPA: f32 = 903.3;

/// Luminance plus two chroma planes
#[derive(Debug, Clone)]
pub struct LabPlanes {
    pub l: Channel,
    pub a: Channel,
    pub b: Channel,
}

impl LabPlanes {
    /// Swap in a new luminance plane, keeping chroma untouched
    pub fn with_luminance(self, l: Channel) -> Self {
        debug_assert_eq!(l.dimensions(), self.a.dimensions());
        Self { l, ..self }
    }

    pub fn to_rgb(&self) -> Image {
        lab_to_rgb(self)
    }
}

/// Hue, saturation and value planes
#[derive(Debug, Clone)]
pub struct HsvPlanes {
    pub h: Channel,
    pub s: Channel,
    pub v: Channel,
}

impl HsvPlanes {
    pub fn to_rgb(&self) -> Image {
        hsv_to_rgb(self)
    }
}

fn srgb_linear_table() -> &'static [f32; 256] {
    static TABLE: OnceLock<[f32; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0.0f32; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let c = i as f32 / 255.0;
            *entry = if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            };
        }
        table
    })
}

#[inline]
fn linear_to_srgb_u8(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let encoded = if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    to_u8(encoded * 255.0)
}

#[inline]
fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

#[inline]
fn lab_f_inv(f: f32) -> f32 {
    let cubed = f * f * f;
    if cubed > LAB_EPSILON {
        cubed
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

#[inline]
fn rgb_pixel_to_lab(px: [u8; 3]) -> [u8; 3] {
    let lin = srgb_linear_table();
    let (r, g, b) = (lin[px[0] as usize], lin[px[1] as usize], lin[px[2] as usize]);

    let m = &RGB_TO_XYZ;
    let x = (m[0][0] * r + m[0][1] * g + m[0][2] * b) / XN;
    let y = m[1][0] * r + m[1][1] * g + m[1][2] * b;
    let z = (m[2][0] * r + m[2][1] * g + m[2][2] * b) / ZN;

    let fy = lab_f(y);
    let l = if y > LAB_EPSILON { 116.0 * fy - 16.0 } else { LAB_KAPPA * y };
    let a = 500.0 * (lab_f(x) - fy);
    let bb = 200.0 * (fy - lab_f(z));

    [to_u8(l * 255.0 / 100.0), to_u8(a + 128.0), to_u8(bb + 128.0)]
}

#[inline]
fn lab_pixel_to_rgb(l8: u8, a8: u8, b8: u8) -> Rgb<u8> {
    let l = l8 as f32 * 100.0 / 255.0;
    let a = a8 as f32 - 128.0;
    let b = b8 as f32 - 128.0;

    let (y, fy) = if l > LAB_KAPPA * LAB_EPSILON {
        let fy = (l + 16.0) / 116.0;
        (fy * fy * fy, fy)
    } else {
        let y = l / LAB_KAPPA;
        (y, 7.787 * y + 16.0 / 116.0)
    };
    let x = lab_f_inv(fy + a / 500.0) * XN;
    let z = lab_f_inv(fy - b / 200.0) * ZN;

    let m = &XYZ_TO_RGB;
    let r = m[0][0] * x + m[0][1] * y + m[0][2] * z;
    let g = m[1][0] * x + m[1][1] * y + m[1][2] * z;
    let bl = m[2][0] * x + m[2][1] * y + m[2][2] * z;

    Rgb([linear_to_srgb_u8(r), linear_to_srgb_u8(g), linear_to_srgb_u8(bl)])
}

pub fn rgb_to_lab(image: &Image) -> LabPlanes {
    let (width, height) = image.dimensions();
    let mut packed = vec![0u8; image.as_raw().len()];

    packed
        .par_chunks_mut(3)
        .zip(image.as_raw().par_chunks(3))
        .for_each(|(dst, src)| {
            let lab = rgb_pixel_to_lab([src[0], src[1], src[2]]);
            dst.copy_from_slice(&lab);
        });

    let plane = |c: usize| Channel::from_fn(width, height, |x, y| {
        let idx = (y as usize * width as usize + x as usize) * 3 + c;
        image::Luma([packed[idx]])
    });

    LabPlanes {
        l: plane(0),
        a: plane(1),
        b: plane(2),
    }
}

pub fn lab_to_rgb(planes: &LabPlanes) -> Image {
    let (width, height) = planes.l.dimensions();
    Image::from_fn(width, height, |x, y| {
        lab_pixel_to_rgb(
            planes.l.get_pixel(x, y)[0],
            planes.a.get_pixel(x, y)[0],
            planes.b.get_pixel(x, y)[0],
        )
    })
}

#[inline]
fn rgb_pixel_to_hsv(px: &Rgb<u8>) -> [u8; 3] {
    let [r, g, b] = px.0.map(|c| c as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

    let h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    // 360 degrees folds back onto 0
    let h8 = (h / 2.0).round() as u32 % 180;
    [h8 as u8, to_u8(s), v as u8]
}

#[inline]
fn hsv_pixel_to_rgb(h8: u8, s8: u8, v8: u8) -> Rgb<u8> {
    let s = s8 as f32 / 255.0;
    let v = v8 as f32 / 255.0;
    if s == 0.0 {
        return Rgb([v8, v8, v8]);
    }

    let h = (h8 as f32 * 2.0) / 60.0;
    let sector = (h.floor() as i32).rem_euclid(6);
    let frac = h - h.floor();

    let p = v * (1.0 - s);
    let q = v * (1.0 - s * frac);
    let t = v * (1.0 - s * (1.0 - frac));

    let (r, g, b) = match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    Rgb([to_u8(r * 255.0), to_u8(g * 255.0), to_u8(b * 255.0)])
}

pub fn rgb_to_hsv(image: &Image) -> HsvPlanes {
    let (width, height) = image.dimensions();
    let mut h = Channel::new(width, height);
    let mut s = Channel::new(width, height);
    let mut v = Channel::new(width, height);

    for (x, y, px) in image.enumerate_pixels() {
        let [hh, ss, vv] = rgb_pixel_to_hsv(px);
        h.put_pixel(x, y, image::Luma([hh]));
        s.put_pixel(x, y, image::Luma([ss]));
        v.put_pixel(x, y, image::Luma([vv]));
    }

    HsvPlanes { h, s, v }
}

pub fn hsv_to_rgb(planes: &HsvPlanes) -> Image {
    let (width, height) = planes.h.dimensions();
    Image::from_fn(width, height, |x, y| {
        hsv_pixel_to_rgb(
            planes.h.get_pixel(x, y)[0],
            planes.s.get_pixel(x, y)[0],
            planes.v.get_pixel(x, y)[0],
        )
    })
}
