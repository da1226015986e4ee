//! Perceptual image hashing
//!
//! Average hash: the image is flattened onto a white background, reduced to
//! 8×8 luma and each pixel brighter than the mean sets one bit. Visually close
//! images differ in few bits, so the Hamming distance between two hashes is a
//! cheap similarity measure.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use std::fmt;
use std::str::FromStr;

/// Side length of the reduced image
pub const HASH_SIDE: u32 = 8;

/// 64-bit average hash; bit 63 is the top-left pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerceptualHash(u64);

impl PerceptualHash {
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Hash an image; `None` for images without pixels
    pub fn of(image: &DynamicImage) -> Option<Self> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }

        let luma = flatten_to_luma(image);
        let reduced = if luma.dimensions() == (HASH_SIDE, HASH_SIDE) {
            luma
        } else {
            imageops::resize(&luma, HASH_SIDE, HASH_SIDE, FilterType::Lanczos3)
        };

        let pixels = reduced.into_raw();
        let mean = pixels.iter().map(|&p| p as u32).sum::<u32>() as f32 / pixels.len() as f32;

        let bits = pixels
            .iter()
            .fold(0u64, |acc, &p| (acc << 1) | u64::from(p as f32 > mean));
        Some(Self(bits))
    }

    /// Number of differing bits
    pub fn distance(&self, other: &PerceptualHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for PerceptualHash {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s.trim(), 16).map(Self)
    }
}

/// Luma conversion with ITU-R 601 weights, alpha composited over white
fn flatten_to_luma(image: &DynamicImage) -> GrayImage {
    let rgba = image.to_rgba8();
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let luma = (r as f32 * 299.0 + g as f32 * 587.0 + b as f32 * 114.0) / 1000.0;
        let alpha = a as f32 / 255.0;
        let value = luma * alpha + 255.0 * (1.0 - alpha);
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}
