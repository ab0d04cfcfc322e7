use lowlight_core::{Channel, EnhanceError, EnhanceResult, Image, PipelineConfig};
use rayon::prelude::*;

use crate::color::rgb_to_lab;

const BINS: usize = 256;

/// Contrast Limited Adaptive Histogram Equalization on one 8-bit plane.
///
/// The plane is split into a `rows x cols` grid (the last tile on each axis
/// absorbs the remainder). Each tile gets a clipped, equalized LUT and every
/// pixel is bilinearly interpolated between the four nearest tile centres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clahe {
    clip_limit: f32,
    rows: u32,
    cols: u32,
}

/// Pixel span of one tile along an axis
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
}

impl Span {
    fn len(&self) -> usize {
        self.end - self.start
    }

    fn center(&self) -> f32 {
        (self.start + self.end - 1) as f32 / 2.0
    }
}

/// Neighbouring tiles and the weight of the second one
#[derive(Debug, Clone, Copy)]
struct AxisWeight {
    lo: usize,
    hi: usize,
    w: f32,
}

impl Clahe {
    pub fn new(clip_limit: f32, tile_grid: (u32, u32)) -> EnhanceResult<Self> {
        if !(clip_limit.is_finite() && clip_limit > 0.0) {
            return Err(EnhanceError::invalid(
                "clahe_clip_limit",
                clip_limit,
                "must be finite and > 0",
            ));
        }
        let (rows, cols) = tile_grid;
        if rows == 0 || cols == 0 {
            return Err(EnhanceError::invalid(
                "clahe_tile_grid",
                format!("{}x{}", rows, cols),
                "rows and cols must be > 0",
            ));
        }
        Ok(Self { clip_limit, rows, cols })
    }

    pub fn from_config(config: &PipelineConfig) -> EnhanceResult<Self> {
        Self::new(config.clahe_clip_limit, config.clahe_tile_grid)
    }

    pub fn clip_limit(&self) -> f32 {
        self.clip_limit
    }

    pub fn tile_grid(&self) -> (u32, u32) {
        (self.rows, self.cols)
    }

    /// Equalize a single plane. Constant planes come back unchanged.
    pub fn apply_channel(&self, channel: &Channel) -> Channel {
        let (width, height) = channel.dimensions();
        if width == 0 || height == 0 || Self::is_flat(channel) {
            return channel.clone();
        }

        let width = width as usize;
        let height = height as usize;
        // Never more tiles than pixels on an axis
        let col_spans = Self::split_axis(width, (self.cols as usize).min(width));
        let row_spans = Self::split_axis(height, (self.rows as usize).min(height));

        let luts = self.compute_tile_luts(channel, &row_spans, &col_spans);

        let x_weights = Self::axis_weights(width, &col_spans);
        let y_weights = Self::axis_weights(height, &row_spans);

        Self::interpolate(channel, &luts, col_spans.len(), &x_weights, &y_weights)
    }

    /// CLAHE on the Lab luminance plane; chroma planes pass through
    pub fn apply_image(&self, image: &Image) -> Image {
        let lab = rgb_to_lab(image);
        if Self::is_flat(&lab.l) {
            return image.clone();
        }
        let l = self.apply_channel(&lab.l);
        lab.with_luminance(l).to_rgb()
    }

    fn is_flat(channel: &Channel) -> bool {
        let raw = channel.as_raw();
        match raw.first() {
            Some(&first) => raw.iter().all(|&v| v == first),
            None => true,
        }
    }

    fn split_axis(len: usize, tiles: usize) -> Vec<Span> {
        let tile = len / tiles;
        (0..tiles)
            .map(|i| Span {
                start: i * tile,
                end: if i + 1 == tiles { len } else { (i + 1) * tile },
            })
            .collect()
    }

    fn compute_tile_luts(
        &self,
        channel: &Channel,
        rows: &[Span],
        cols: &[Span],
    ) -> Vec<[u8; BINS]> {
        let width = channel.width() as usize;
        let raw = channel.as_raw();

        let tiles: Vec<(Span, Span)> = rows
            .iter()
            .flat_map(|&r| cols.iter().map(move |&c| (r, c)))
            .collect();

        tiles
            .par_iter()
            .map(|(row, col)| {
                let mut histogram = [0u32; BINS];
                for y in row.start..row.end {
                    let line = &raw[y * width + col.start..y * width + col.end];
                    for &v in line {
                        histogram[v as usize] += 1;
                    }
                }
                let tile_px = row.len() * col.len();
                self.clip_histogram(&mut histogram, tile_px);
                Self::histogram_lut(&histogram, tile_px)
            })
            .collect()
    }

    /// Clip bins above the limit and spread the excess back over all bins
    fn clip_histogram(&self, histogram: &mut [u32; BINS], tile_px: usize) {
        let limit = ((self.clip_limit * tile_px as f32 / BINS as f32) as u32).max(1);

        let mut excess = 0u32;
        for count in histogram.iter_mut() {
            if *count > limit {
                excess += *count - limit;
                *count = limit;
            }
        }
        if excess == 0 {
            return;
        }

        let batch = excess / BINS as u32;
        let mut residual = excess - batch * BINS as u32;
        for count in histogram.iter_mut() {
            *count += batch;
        }

        if residual > 0 {
            let step = (BINS / residual as usize).max(1);
            for count in histogram.iter_mut().step_by(step) {
                if residual == 0 {
                    break;
                }
                *count += 1;
                residual -= 1;
            }
        }
    }

    fn histogram_lut(histogram: &[u32; BINS], tile_px: usize) -> [u8; BINS] {
        let scale = 255.0 / tile_px as f32;
        let mut lut = [0u8; BINS];
        let mut sum = 0u32;
        for (entry, &count) in lut.iter_mut().zip(histogram.iter()) {
            sum += count;
            *entry = (sum as f32 * scale).round().min(255.0) as u8;
        }
        lut
    }

    fn axis_weights(len: usize, spans: &[Span]) -> Vec<AxisWeight> {
        let centers: Vec<f32> = spans.iter().map(Span::center).collect();
        let last = centers.len() - 1;

        (0..len)
            .map(|p| {
                let p = p as f32;
                if p <= centers[0] {
                    return AxisWeight { lo: 0, hi: 0, w: 0.0 };
                }
                if p >= centers[last] {
                    return AxisWeight { lo: last, hi: last, w: 0.0 };
                }
                // centers are strictly increasing, so this finds the bracketing pair
                let hi = centers.iter().position(|&c| c > p).unwrap_or(last);
                let lo = hi - 1;
                let w = (p - centers[lo]) / (centers[hi] - centers[lo]);
                AxisWeight { lo, hi, w }
            })
            .collect()
    }

    fn interpolate(
        channel: &Channel,
        luts: &[[u8; BINS]],
        n_cols: usize,
        xw: &[AxisWeight],
        yw: &[AxisWeight],
    ) -> Channel {
        let width = channel.width() as usize;
        let src = channel.as_raw();
        let mut out = vec![0u8; src.len()];

        out.par_chunks_mut(width).enumerate().for_each(|(y, dst)| {
            let AxisWeight { lo: r0, hi: r1, w: wy } = yw[y];
            let row = &src[y * width..(y + 1) * width];

            for (x, (o, &v)) in dst.iter_mut().zip(row.iter()).enumerate() {
                let AxisWeight { lo: c0, hi: c1, w: wx } = xw[x];
                let v = v as usize;

                let top = (1.0 - wx) * luts[r0 * n_cols + c0][v] as f32
                    + wx * luts[r0 * n_cols + c1][v] as f32;
                let bottom = (1.0 - wx) * luts[r1 * n_cols + c0][v] as f32
                    + wx * luts[r1 * n_cols + c1][v] as f32;

                *o = ((1.0 - wy) * top + wy * bottom).round().clamp(0.0, 255.0) as u8;
            }
        });

        Channel::from_raw(channel.width(), channel.height(), out)
            .unwrap_or_else(|| channel.clone())
    }
}

/// Convenience wrapper: validate, then equalize the luminance of `image`
pub fn clahe_enhance(
    image: &Image,
    clip_limit: f32,
    tile_grid: (u32, u32),
) -> EnhanceResult<Image> {
    Ok(Clahe::new(clip_limit, tile_grid)?.apply_image(image))
}
