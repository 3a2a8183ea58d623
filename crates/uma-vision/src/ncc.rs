//! Sliding zero-mean normalized cross-correlation (the `CCOEFF_NORMED` family).
//!
//! For every placement `(x, y)` of a template `T` inside an image `I`:
//!
//! ```text
//! score = Σ (T - mean T)(I - mean I_window) / sqrt(Σ (T - mean T)² · Σ (I - mean I_window)²)
//! ```
//!
//! Because the centered template sums to zero, the numerator reduces to `Σ T'·I`, which is
//! either computed directly (small searches) or as one cyclic FFT correlation over the
//! row-major image buffer. Window statistics come from summed-area tables.

use image::GrayImage;
use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

/// Searches with fewer multiply-adds than this are computed directly.
const DIRECT_LIMIT: u64 = 1 << 24;

/// Denominators below this are treated as a flat window (score 0).
const FLAT_EPSILON: f64 = 1e-6;

/// Correlation scores for every valid template placement, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMap {
    pub width: u32,
    pub height: u32,
    pub scores: Vec<f32>,
}

impl ScoreMap {
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.scores[(y * self.width + x) as usize]
    }

    /// Global maximum `(x, y, score)`. The first maximum in row-major order wins ties.
    pub fn max_location(&self) -> Option<(u32, u32, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &s) in self.scores.iter().enumerate() {
            if s.is_nan() {
                continue;
            }
            match best {
                Some((_, b)) if s <= b => {}
                _ => best = Some((i, s)),
            }
        }
        best.map(|(i, s)| {
            let w = self.width as usize;
            ((i % w) as u32, (i / w) as u32, s)
        })
    }

    /// Every placement scoring at least `threshold`, in row-major order.
    pub fn above(&self, threshold: f32) -> impl Iterator<Item = (u32, u32, f32)> + '_ {
        let w = self.width as usize;
        self.scores
            .iter()
            .enumerate()
            .filter(move |&(_, &s)| s >= threshold)
            .map(move |(i, &s)| ((i % w) as u32, (i / w) as u32, s))
    }

    pub fn any_above(&self, threshold: f32) -> bool {
        self.scores.iter().any(|&s| s >= threshold)
    }
}

/// Template with its zero-mean pixels pre-computed.
#[derive(Debug, Clone)]
pub struct PreparedTemplate {
    width: u32,
    height: u32,
    centered: Vec<f64>,
    /// Σ (T - mean)²
    ssd: f64,
}

impl PreparedTemplate {
    pub fn new(gray: &GrayImage) -> Self {
        let (mean, std_dev) = compute_stats(gray);
        let centered: Vec<f64> = gray.pixels().map(|p| p[0] as f64 - mean).collect();
        let n = centered.len() as f64;
        Self {
            width: gray.width(),
            height: gray.height(),
            centered,
            ssd: std_dev * std_dev * n,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_flat(&self) -> bool {
        self.ssd < FLAT_EPSILON
    }
}

/// Mean and standard deviation of pixel values.
pub fn compute_stats(img: &GrayImage) -> (f64, f64) {
    let n = (img.width() as u64 * img.height() as u64) as f64;
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let mean = img.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
    let variance = img
        .pixels()
        .map(|p| (p[0] as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

/// Summed-area tables of pixel values and squared pixel values, `(w + 1) x (h + 1)`.
struct Integrals {
    stride: usize,
    sum: Vec<u64>,
    sq: Vec<u64>,
}

impl Integrals {
    fn new(img: &GrayImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sq = vec![0u64; stride * (h + 1)];
        let raw = img.as_raw();
        for y in 0..h {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w {
                let v = raw[y * w + x] as u64;
                row_sum += v;
                row_sq += v * v;
                let i = (y + 1) * stride + x + 1;
                sum[i] = sum[i - stride] + row_sum;
                sq[i] = sq[i - stride] + row_sq;
            }
        }
        Self { stride, sum, sq }
    }

    fn window(table: &[u64], stride: usize, x: usize, y: usize, w: usize, h: usize) -> u64 {
        let a = table[y * stride + x];
        let b = table[y * stride + x + w];
        let c = table[(y + h) * stride + x];
        let d = table[(y + h) * stride + x + w];
        d + a - b - c
    }

    /// Σ (I - mean)² over the window, computed exactly before converting to float.
    fn window_ssd(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let n = (w * h) as u128;
        let s = Self::window(&self.sum, self.stride, x, y, w, h) as u128;
        let q = Self::window(&self.sq, self.stride, x, y, w, h) as u128;
        let num = n * q - s * s;
        num as f64 / n as f64
    }
}

/// Correlate `template` against every placement inside `image`.
///
/// Returns `None` when the template does not fit or either image is empty.
pub fn match_template(image: &GrayImage, template: &PreparedTemplate) -> Option<ScoreMap> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = (template.width, template.height);
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return None;
    }
    let rw = iw - tw + 1;
    let rh = ih - th + 1;

    if template.is_flat() {
        return Some(ScoreMap {
            width: rw,
            height: rh,
            scores: vec![0.0; (rw * rh) as usize],
        });
    }

    let work = rw as u64 * rh as u64 * tw as u64 * th as u64;
    let cross = if work <= DIRECT_LIMIT {
        cross_direct(image, template, rw, rh)
    } else {
        cross_fft(image, template, rw, rh)
    };

    let integrals = Integrals::new(image);
    let (rw_us, tw_us, th_us) = (rw as usize, tw as usize, th as usize);
    let scores: Vec<f32> = cross
        .par_chunks(rw_us)
        .enumerate()
        .flat_map_iter(|(y, row)| {
            let integrals = &integrals;
            row.iter().enumerate().map(move |(x, &c)| {
                let i_ssd = integrals.window_ssd(x, y, tw_us, th_us);
                let denom = (template.ssd * i_ssd).sqrt();
                if denom < FLAT_EPSILON {
                    0.0
                } else {
                    (c / denom).clamp(-1.0, 1.0) as f32
                }
            })
        })
        .collect();

    Some(ScoreMap {
        width: rw,
        height: rh,
        scores,
    })
}

/// Σ T'·I for every placement, one output row per rayon task.
fn cross_direct(image: &GrayImage, template: &PreparedTemplate, rw: u32, rh: u32) -> Vec<f64> {
    let iw = image.width() as usize;
    let (tw, th) = (template.width as usize, template.height as usize);
    let raw = image.as_raw();
    (0..rh as usize)
        .into_par_iter()
        .flat_map_iter(|y| {
            (0..rw as usize).map(move |x| {
                let mut acc = 0.0;
                for ty in 0..th {
                    let img_row = &raw[(y + ty) * iw + x..(y + ty) * iw + x + tw];
                    let tmpl_row = &template.centered[ty * tw..(ty + 1) * tw];
                    acc += img_row
                        .iter()
                        .zip(tmpl_row)
                        .map(|(&p, &t)| p as f64 * t)
                        .sum::<f64>();
                }
                acc
            })
        })
        .collect()
}

/// Σ T'·I via one cyclic correlation over the flattened image.
///
/// The template is laid out with the image's row stride, so for every valid placement
/// `k = y * iw + x` the cyclic index never wraps and the result equals the 2-D sum.
fn cross_fft(image: &GrayImage, template: &PreparedTemplate, rw: u32, rh: u32) -> Vec<f64> {
    let (iw, ih) = (image.width() as usize, image.height() as usize);
    let (tw, th) = (template.width as usize, template.height as usize);
    let n = iw * ih;

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut img_freq: Vec<Complex<f64>> = image
        .as_raw()
        .iter()
        .map(|&p| Complex::new(p as f64, 0.0))
        .collect();
    let mut tmpl_freq = vec![Complex::new(0.0, 0.0); n];
    for ty in 0..th {
        for tx in 0..tw {
            tmpl_freq[ty * iw + tx] = Complex::new(template.centered[ty * tw + tx], 0.0);
        }
    }

    forward.process(&mut img_freq);
    forward.process(&mut tmpl_freq);

    for (a, b) in img_freq.iter_mut().zip(&tmpl_freq) {
        *a *= b.conj();
    }
    inverse.process(&mut img_freq);

    let scale = 1.0 / n as f64;
    let (rw, rh) = (rw as usize, rh as usize);
    let mut out = Vec::with_capacity(rw * rh);
    for y in 0..rh {
        for x in 0..rw {
            out.push(img_freq[y * iw + x].re * scale);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn textured(w: u32, h: u32, seed: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let v = x
                .wrapping_mul(7 + seed)
                .wrapping_add(y.wrapping_mul(13))
                .wrapping_add((x * y) % 11);
            Luma([(v % 256) as u8])
        })
    }

    fn paste(dst: &mut GrayImage, src: &GrayImage, ox: u32, oy: u32) {
        for (x, y, p) in src.enumerate_pixels() {
            dst.put_pixel(ox + x, oy + y, *p);
        }
    }

    #[test]
    fn test_self_match_fills_one_cell() {
        let img = textured(48, 48, 0);
        let map = match_template(&img, &PreparedTemplate::new(&img)).unwrap();
        assert_eq!((map.width, map.height), (1, 1));
        let (x, y, s) = map.max_location().unwrap();
        assert_eq!((x, y), (0, 0));
        assert!((s - 1.0).abs() < 1e-3, "got {s}");
    }

    #[test]
    fn test_ncc_different() {
        let img1 = GrayImage::from_fn(48, 48, |x, _| Luma([(x % 256) as u8]));
        let img2 = GrayImage::from_fn(48, 48, |_, y| Luma([(y % 256) as u8]));
        let map = match_template(&img1, &PreparedTemplate::new(&img2)).unwrap();
        assert!(map.scores[0] < 0.5, "got {}", map.scores[0]);
    }

    #[test]
    fn test_locates_pasted_template() {
        let tmpl = textured(12, 9, 3);
        let mut img = GrayImage::from_pixel(60, 40, Luma([90]));
        paste(&mut img, &tmpl, 31, 17);
        let map = match_template(&img, &PreparedTemplate::new(&tmpl)).unwrap();
        let (x, y, s) = map.max_location().unwrap();
        assert_eq!((x, y), (31, 17));
        assert!(s > 0.99);
    }

    #[test]
    fn test_fft_matches_direct() {
        let img = textured(70, 50, 1);
        let tmpl_img = image::imageops::crop_imm(&img, 20, 10, 16, 12).to_image();
        let tmpl = PreparedTemplate::new(&tmpl_img);
        let (rw, rh) = (70 - 16 + 1, 50 - 12 + 1);
        let direct = cross_direct(&img, &tmpl, rw, rh);
        let fft = cross_fft(&img, &tmpl, rw, rh);
        assert_eq!(direct.len(), fft.len());
        for (a, b) in direct.iter().zip(&fft) {
            assert!((a - b).abs() < 1e-3 * (1.0 + a.abs()), "{a} vs {b}");
        }
    }

    #[test]
    fn test_flat_window_scores_zero() {
        let img = GrayImage::from_pixel(30, 30, Luma([128]));
        let map = match_template(&img, &PreparedTemplate::new(&textured(8, 8, 0))).unwrap();
        assert!(map.scores.iter().all(|&s| s == 0.0));
        assert!(!map.any_above(0.1));
    }

    #[test]
    fn test_template_larger_than_image() {
        let img = GrayImage::new(10, 10);
        assert!(match_template(&img, &PreparedTemplate::new(&textured(11, 5, 0))).is_none());
    }

    #[test]
    fn test_above_is_row_major() {
        let map = ScoreMap {
            width: 3,
            height: 2,
            scores: vec![0.1, 0.9, 0.2, 0.95, 0.0, 0.9],
        };
        let hits: Vec<_> = map.above(0.9).map(|(x, y, _)| (x, y)).collect();
        assert_eq!(hits, vec![(1, 0), (0, 1), (2, 1)]);
        assert_eq!(map.max_location().map(|(x, y, _)| (x, y)), Some((0, 1)));
    }
}
