// ============================================================
// Layer 4 — Image Transforms
// ============================================================
// Turns a decoded image into a normalised CHW float vector.
//
//   Train:  resize shorter side → random sized crop → random
//           horizontal flip → [0,1] → normalise
//   Eval:   resize shorter side → centre crop → [0,1] → normalise
//
// Decoding and pixel resampling are done by the `image` crate;
// this module only decides WHICH rectangle to keep.
//
// Normalisation uses the ImageNet statistics the pretrained
// backbones were trained with.
//
// Reference: image crate documentation (imageops)

use image::{
    imageops::{self, FilterType},
    DynamicImage, RgbImage,
};
use rand::Rng;

/// Shorter side after the initial resize
pub const RESIZE_SIZE: u32 = 240;
/// Height and width fed to the network
pub const CROP_SIZE: u32 = 224;

pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const STD:  [f32; 3] = [0.229, 0.224, 0.225];

/// Random sized crop parameters
const CROP_ATTEMPTS: usize = 10;
const MIN_AREA_FRACTION: f64 = 0.08;
const MIN_ASPECT: f64 = 3.0 / 4.0;
const MAX_ASPECT: f64 = 4.0 / 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Random augmentation for the training split
    Train,
    /// Deterministic centre crop for validation and test
    Eval,
}

impl Transform {
    /// Number of floats produced per image: 3 × CROP_SIZE × CROP_SIZE
    pub fn output_len() -> usize {
        3 * (CROP_SIZE as usize) * (CROP_SIZE as usize)
    }

    pub fn apply<R: Rng>(self, img: DynamicImage, rng: &mut R) -> Vec<f32> {
        let img = resize_shorter_side(&img.to_rgb8(), RESIZE_SIZE);
        let img = match self {
            Transform::Train => random_flip(random_sized_crop(&img, CROP_SIZE, rng), rng),
            Transform::Eval => center_crop(&img, CROP_SIZE),
        };
        to_normalised_chw(&img)
    }
}

/// Resize so the shorter side equals `size`, keeping the aspect ratio
pub fn resize_shorter_side(img: &RgbImage, size: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    if (w <= h && w == size) || (h <= w && h == size) {
        return img.clone();
    }
    let (ow, oh) = if w < h {
        (size, ((size as u64 * h as u64) / w.max(1) as u64) as u32)
    } else {
        (((size as u64 * w as u64) / h.max(1) as u64) as u32, size)
    };
    imageops::resize(img, ow.max(1), oh.max(1), FilterType::Triangle)
}

/// Cut the central `size`×`size` square. Images smaller than `size`
/// are scaled up first so the result always has the requested shape.
pub fn center_crop(img: &RgbImage, size: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    if w < size || h < size {
        return center_crop(&resize_shorter_side(img, size), size);
    }
    let x = centred_offset(w - size);
    let y = centred_offset(h - size);
    imageops::crop_imm(img, x, y, size, size).to_image()
}

/// `margin / 2` rounded half to even, so an odd margin of 17 gives 8
/// and one of 19 gives 10
fn centred_offset(margin: u32) -> u32 {
    let half = margin / 2;
    if margin % 2 == 1 && half % 2 == 1 {
        half + 1
    } else {
        half
    }
}

/// Mirror left to right with probability 0.5
pub fn random_flip<R: Rng>(img: RgbImage, rng: &mut R) -> RgbImage {
    if rng.gen_bool(0.5) {
        imageops::flip_horizontal(&img)
    } else {
        img
    }
}

/// Crop a random region covering 8–100 % of the area with an aspect
/// ratio in [3/4, 4/3], then resize it to `size`×`size`.
/// Falls back to resize + centre crop when no attempt fits.
pub fn random_sized_crop<R: Rng>(img: &RgbImage, size: u32, rng: &mut R) -> RgbImage {
    let (w, h) = img.dimensions();
    match sample_crop_rect(w, h, rng) {
        Some(CropRect { x, y, width, height }) => {
            let region = imageops::crop_imm(img, x, y, width, height).to_image();
            imageops::resize(&region, size, size, FilterType::Triangle)
        }
        None => center_crop(&resize_shorter_side(img, size), size),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x:      u32,
    pub y:      u32,
    pub width:  u32,
    pub height: u32,
}

/// Up to `CROP_ATTEMPTS` tries at a rectangle inside a `w`×`h` image.
/// `None` means every try overflowed the image.
pub fn sample_crop_rect<R: Rng>(w: u32, h: u32, rng: &mut R) -> Option<CropRect> {
    let area = (w as f64) * (h as f64);

    for _ in 0..CROP_ATTEMPTS {
        let target_area = rng.gen_range(MIN_AREA_FRACTION..=1.0) * area;
        let aspect      = rng.gen_range(MIN_ASPECT..=MAX_ASPECT);

        let mut width  = (target_area * aspect).sqrt().round() as u32;
        let mut height = (target_area / aspect).sqrt().round() as u32;
        if rng.gen_bool(0.5) {
            std::mem::swap(&mut width, &mut height);
        }

        if width >= 1 && height >= 1 && width <= w && height <= h {
            let x = rng.gen_range(0..=w - width);
            let y = rng.gen_range(0..=h - height);
            return Some(CropRect { x, y, width, height });
        }
    }
    None
}

/// RGB bytes → channel-major floats normalised per channel
pub fn to_normalised_chw(img: &RgbImage) -> Vec<f32> {
    let (w, h) = img.dimensions();
    let plane = (w * h) as usize;
    let mut out = vec![0.0f32; 3 * plane];

    for (i, pixel) in img.pixels().enumerate() {
        for c in 0..3 {
            out[c * plane + i] = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::{rngs::StdRng, SeedableRng};

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, _| Rgb([(x % 256) as u8, 0, 255]))
    }

    #[test]
    fn test_resize_shorter_side() {
        assert_eq!(resize_shorter_side(&gradient(480, 320), 240).dimensions(), (360, 240));
        assert_eq!(resize_shorter_side(&gradient(100, 400), 240).dimensions(), (240, 960));
        assert_eq!(resize_shorter_side(&gradient(240, 300), 240).dimensions(), (240, 300));
    }

    #[test]
    fn test_center_crop_takes_the_middle() {
        let img     = gradient(240, 240);
        let cropped = center_crop(&img, 224);
        assert_eq!(cropped.dimensions(), (224, 224));
        // Offset is (240 - 224) / 2 = 8
        assert_eq!(cropped.get_pixel(0, 0)[0], 8);
    }

    #[test]
    fn test_centred_offset_rounds_half_to_even() {
        assert_eq!(centred_offset(16), 8);
        assert_eq!(centred_offset(17), 8);
        assert_eq!(centred_offset(19), 10);
        assert_eq!(centred_offset(1), 0);
        assert_eq!(centred_offset(3), 2);
    }

    #[test]
    fn test_center_crop_odd_margin() {
        // Margin 241 - 224 = 17 → offset 8
        let cropped = center_crop(&gradient(241, 224), 224);
        assert_eq!(cropped.get_pixel(0, 0)[0], 8);
        // Margin 243 - 224 = 19 → offset 10
        let cropped = center_crop(&gradient(243, 224), 224);
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
    }

    #[test]
    fn test_center_crop_upscales_small_images() {
        assert_eq!(center_crop(&gradient(48, 48), 224).dimensions(), (224, 224));
    }

    #[test]
    fn test_random_sized_crop_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let img = gradient(300, 240);
        for _ in 0..20 {
            assert_eq!(random_sized_crop(&img, 224, &mut rng).dimensions(), (224, 224));
        }
    }

    #[test]
    fn test_crop_rect_stays_inside_non_square_images() {
        let mut rng = StdRng::seed_from_u64(11);
        for (w, h) in [(300, 120), (120, 300), (257, 240)] {
            let mut wide = false;
            let mut tall = false;
            for _ in 0..200 {
                let Some(r) = sample_crop_rect(w, h, &mut rng) else { continue };
                assert!(r.width >= 1 && r.height >= 1);
                assert!(r.x + r.width <= w, "{r:?} in {w}x{h}");
                assert!(r.y + r.height <= h, "{r:?} in {w}x{h}");
                wide |= r.width > r.height;
                tall |= r.height > r.width;
            }
            assert!(wide && tall, "both orientations expected for {w}x{h}");
        }
    }

    #[test]
    fn test_crop_rect_gives_up_on_thin_strips() {
        // 100×2: every rectangle with aspect in [3/4, 4/3] and at least
        // 8% of the area is at least 3 pixels tall
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(sample_crop_rect(100, 2, &mut rng), None);
        let out = random_sized_crop(&gradient(100, 2), 224, &mut rng);
        assert_eq!(out.dimensions(), (224, 224));
    }

    #[test]
    fn test_random_flip_mirrors_columns() {
        let img = gradient(224, 4);
        let mut flipped = 0;
        let mut kept = 0;
        for seed in 0..32 {
            let out = random_flip(img.clone(), &mut StdRng::seed_from_u64(seed));
            if out == img {
                kept += 1;
            } else {
                flipped += 1;
                for y in 0..4 {
                    assert_eq!(out.get_pixel(0, y), img.get_pixel(223, y));
                    assert_eq!(out.get_pixel(223, y), img.get_pixel(0, y));
                }
            }
        }
        assert!(flipped > 0 && kept > 0);
    }

    #[test]
    fn test_train_transform_flips_some_outputs() {
        // A left-to-right ramp still rises after any crop, so an output
        // that falls from its first to its last column was flipped.
        let img = DynamicImage::ImageRgb8(gradient(240, 240));
        let side = CROP_SIZE as usize;
        let mut rising = 0;
        let mut falling = 0;
        for seed in 0..32 {
            let out = Transform::Train.apply(img.clone(), &mut StdRng::seed_from_u64(seed));
            let (first, last) = (out[0], out[side - 1]);
            if first < last {
                rising += 1;
            } else if first > last {
                falling += 1;
            }
        }
        assert!(rising > 0 && falling > 0);
    }

    #[test]
    fn test_normalisation_values() {
        let img = RgbImage::from_pixel(2, 1, Rgb([255, 0, 0]));
        let out = to_normalised_chw(&img);
        assert_eq!(out.len(), 6);
        let red = (1.0 - MEAN[0]) / STD[0];
        let green = (0.0 - MEAN[1]) / STD[1];
        assert!((out[0] - red).abs() < 1e-6);
        assert!((out[1] - red).abs() < 1e-6);
        assert!((out[2] - green).abs() < 1e-6);
    }

    #[test]
    fn test_apply_output_length() {
        let mut rng = StdRng::seed_from_u64(1);
        let img = DynamicImage::ImageRgb8(gradient(64, 48));
        assert_eq!(Transform::Eval.apply(img.clone(), &mut rng).len(), Transform::output_len());
        assert_eq!(Transform::Train.apply(img, &mut rng).len(), Transform::output_len());
    }

    #[test]
    fn test_eval_is_deterministic() {
        let mut a = StdRng::seed_from_u64(1);
        let mut b = StdRng::seed_from_u64(2);
        let img = DynamicImage::ImageRgb8(gradient(320, 260));
        assert_eq!(Transform::Eval.apply(img.clone(), &mut a), Transform::Eval.apply(img, &mut b));
    }
}
