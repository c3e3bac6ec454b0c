//! Image conditioning shared by slides and frames before feature extraction:
//! downscale to a working size, equalize the histogram to normalize contrast
//! between projector and camera, then blur lightly to suppress compression
//! noise that would otherwise turn into spurious keypoints.

use image::imageops::{self, FilterType};
use image::GrayImage;

/// Blur kernel for compression-noise suppression.
pub const NOISE_KERNEL_SIZE: usize = 5;

/// Runs the full preprocessing chain and returns a new image.
pub fn preprocess(image: &GrayImage, max_dimension: u32) -> GrayImage {
    let mut out = fit_within(image, max_dimension);
    condition(&mut out);
    out
}

/// Equalization and noise blur without any resizing.
pub fn condition(image: &mut GrayImage) {
    equalize_histogram(image);
    let kernel = gaussian_kernel_1d(NOISE_KERNEL_SIZE);
    let (w, h) = (image.width() as usize, image.height() as usize);
    let mut temp = Vec::new();
    separable_gaussian_blur(image, w, h, &kernel, &mut temp);
}

/// Downscales so the longer side is at most `max_dimension`, keeping aspect.
/// Images already small enough are copied unchanged.
pub fn fit_within(image: &GrayImage, max_dimension: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    if longest <= max_dimension || longest == 0 {
        return image.clone();
    }
    let scale = max_dimension as f64 / longest as f64;
    let new_w = ((w as f64 * scale).round() as u32).max(1);
    let new_h = ((h as f64 * scale).round() as u32).max(1);
    imageops::resize(image, new_w, new_h, FilterType::Triangle)
}

/// Global histogram equalization in place.
///
/// A constant image has nothing to stretch and is left as is.
pub fn equalize_histogram(image: &mut GrayImage) {
    let mut histogram = [0u64; 256];
    for &v in image.as_raw() {
        histogram[v as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    let mut cdf = [0u64; 256];
    let mut running = 0u64;
    for (i, &count) in histogram.iter().enumerate() {
        running += count;
        cdf[i] = running;
    }

    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    if total == cdf_min {
        return;
    }

    let span = (total - cdf_min) as f64;
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        let scaled = (cdf[i].saturating_sub(cdf_min)) as f64 / span * 255.0;
        *entry = scaled.round().clamp(0.0, 255.0) as u8;
    }

    for v in image.iter_mut() {
        *v = lut[*v as usize];
    }
}

/// Precompute a 1D Gaussian kernel of the given size.
///
/// `kernel_size` must be odd and >= 1. Sigma follows OpenCV's sigma=0
/// convention: `0.3 * ((k - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel_1d(kernel_size: usize) -> Vec<f32> {
    debug_assert!(kernel_size >= 1 && kernel_size % 2 == 1);
    let sigma = 0.3 * ((kernel_size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (kernel_size / 2) as f64;
    let mut kernel_f64: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel_f64.iter().sum();
    for v in &mut kernel_f64 {
        *v /= sum;
    }
    kernel_f64.iter().map(|&v| v as f32).collect()
}

/// Single-channel separable Gaussian blur with a precomputed kernel,
/// reusing `temp` between calls. Borders are clamped.
pub fn separable_gaussian_blur(
    data: &mut [u8],
    width: usize,
    height: usize,
    kernel: &[f32],
    temp: &mut Vec<f32>,
) {
    let kernel_size = kernel.len();
    if kernel_size <= 1 || width == 0 || height == 0 {
        return;
    }
    let half = kernel_size / 2;
    temp.resize(width * height, 0.0);

    // Horizontal pass: data → temp
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - half as isize).clamp(0, width as isize - 1)
                    as usize;
                sum += data[y * width + sx] as f32 * w;
            }
            temp[y * width + x] = sum;
        }
    }

    // Vertical pass: temp → data
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - half as isize).clamp(0, height as isize - 1)
                    as usize;
                sum += temp[sy * width + x] * w;
            }
            data[y * width + x] = sum.round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gradient(width: u32, height: u32, lo: u8, hi: u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            let t = x as f32 / (width - 1).max(1) as f32;
            Luma([(lo as f32 + t * (hi - lo) as f32).round() as u8])
        })
    }

    #[test]
    fn test_kernel_sums_to_one() {
        let k = gaussian_kernel_1d(5);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_kernel_is_symmetric_and_peaked() {
        let k = gaussian_kernel_1d(5);
        for i in 0..k.len() / 2 {
            assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-6);
            assert!(k[2] > k[i]);
        }
    }

    #[test]
    fn test_blur_uniform_image_unchanged() {
        let mut data = vec![128u8; 10 * 10];
        let kernel = gaussian_kernel_1d(5);
        separable_gaussian_blur(&mut data, 10, 10, &kernel, &mut Vec::new());
        assert!(data.iter().all(|&v| (v as i32 - 128).abs() <= 1));
    }

    #[test]
    fn test_blur_spreads_single_bright_pixel() {
        let mut data = vec![0u8; 10 * 10];
        data[5 * 10 + 5] = 255;
        let kernel = gaussian_kernel_1d(5);
        separable_gaussian_blur(&mut data, 10, 10, &kernel, &mut Vec::new());
        assert!(data[5 * 10 + 5] < 255);
        assert!(data[5 * 10 + 6] > 0);
        assert!(data[6 * 10 + 5] > 0);
    }

    #[test]
    fn test_kernel_size_1_is_identity() {
        let mut data: Vec<u8> = (0..25).collect();
        let original = data.clone();
        separable_gaussian_blur(&mut data, 5, 5, &[1.0], &mut Vec::new());
        assert_eq!(data, original);
    }

    #[test]
    fn test_equalize_stretches_low_contrast() {
        let mut img = gradient(64, 4, 100, 140);
        equalize_histogram(&mut img);
        let min = *img.as_raw().iter().min().unwrap();
        let max = *img.as_raw().iter().max().unwrap();
        assert_eq!(min, 0);
        assert_eq!(max, 255);
    }

    #[test]
    fn test_equalize_preserves_order() {
        let mut img = gradient(32, 1, 50, 90);
        equalize_histogram(&mut img);
        let row = img.as_raw();
        assert!(row.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_equalize_constant_image_untouched() {
        let mut img = GrayImage::from_pixel(8, 8, Luma([77]));
        equalize_histogram(&mut img);
        assert!(img.as_raw().iter().all(|&v| v == 77));
    }

    #[test]
    fn test_fit_within_downscales_longest_side() {
        let img = GrayImage::new(2000, 1000);
        let fitted = fit_within(&img, 1000);
        assert_eq!(fitted.dimensions(), (1000, 500));
    }

    #[test]
    fn test_fit_within_keeps_small_images() {
        let img = GrayImage::new(320, 240);
        assert_eq!(fit_within(&img, 1280).dimensions(), (320, 240));
    }

    #[test]
    fn test_preprocess_keeps_dimensions_under_limit() {
        let img = gradient(200, 100, 10, 60);
        let out = preprocess(&img, 1280);
        assert_eq!(out.dimensions(), (200, 100));
        assert!(*out.as_raw().iter().max().unwrap() > 200);
    }
}
