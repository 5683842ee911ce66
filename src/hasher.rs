// src/hasher.rs

//! Gradient-direction ("difference") hash of a rendered page.
//!
//! The image is reduced to `(hash_size + 1) x hash_size` grayscale pixels and
//! every horizontally adjacent pair contributes one bit: set when the right
//! pixel is brighter than the left one. Bit `i` is the `i`-th comparison in
//! row-major order, so the value equals `sum(2^i)` over the set bits.
//!
//! The hash ignores uniform brightness shifts but follows edge positions, so
//! two near-identical renders can still differ by a few bits.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use std::fmt;

pub const DEFAULT_HASH_SIZE: u32 = 8;

/// Largest accepted hash size (4096 bits)
pub const MAX_HASH_SIZE: u32 = 64;

/// Perceptual fingerprint of `hash_size²` bits
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    hash_size: u32,
    /// Little-endian words: bit `i` lives in `words[i / 64]`
    words: Vec<u64>,
}

impl Fingerprint {
    fn zeroed(hash_size: u32) -> Self {
        let bits = hash_size as usize * hash_size as usize;
        Self {
            hash_size,
            words: vec![0; bits.div_ceil(64).max(1)],
        }
    }

    fn set(&mut self, bit: usize) {
        self.words[bit / 64] |= 1u64 << (bit % 64);
    }

    pub fn bit(&self, bit: usize) -> bool {
        self.words
            .get(bit / 64)
            .map_or(false, |w| (w >> (bit % 64)) & 1 == 1)
    }

    pub fn hash_size(&self) -> u32 {
        self.hash_size
    }

    pub fn bit_len(&self) -> u32 {
        self.hash_size * self.hash_size
    }

    /// The value as a single integer, when it fits in 64 bits
    pub fn as_u64(&self) -> Option<u64> {
        match self.words.as_slice() {
            [word] => Some(*word),
            _ => None,
        }
    }

    /// Number of differing bits; `None` for fingerprints of different sizes
    pub fn distance(&self, other: &Fingerprint) -> Option<u32> {
        if self.hash_size != other.hash_size {
            return None;
        }
        Some(
            self.words
                .iter()
                .zip(&other.words)
                .map(|(a, b)| (a ^ b).count_ones())
                .sum(),
        )
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_digits = (self.bit_len() as usize).div_ceil(4).max(1);
        let mut out = String::with_capacity(self.words.len() * 16);
        for word in self.words.iter().rev() {
            out.push_str(&format!("{word:016x}"));
        }
        let start = out.len().saturating_sub(hex_digits);
        f.write_str(&out[start..])
    }
}

/// ITU-R 601 luma in integer form, alpha ignored
fn to_gray(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }
    let rgb = image.to_rgb8();
    let mut gray = GrayImage::new(rgb.width(), rgb.height());
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000;
        gray.put_pixel(x, y, Luma([luma as u8]));
    }
    gray
}

/// Computes the fingerprint of `image`.
///
/// `hash_size` is clamped to `1..=MAX_HASH_SIZE`; configurations outside that
/// range are rejected before a run starts.
pub fn fingerprint(image: &DynamicImage, hash_size: u32) -> Fingerprint {
    let hash_size = hash_size.clamp(1, MAX_HASH_SIZE);
    let gray = to_gray(image);
    let small = imageops::resize(&gray, hash_size + 1, hash_size, FilterType::Lanczos3);

    let mut fp = Fingerprint::zeroed(hash_size);
    for row in 0..hash_size {
        for col in 0..hash_size {
            let left = small.get_pixel(col, row)[0];
            let right = small.get_pixel(col + 1, row)[0];
            if right > left {
                fp.set((row * hash_size + col) as usize);
            }
        }
    }
    fp
}
