/// Color-histogram feature extraction.
///
/// Each image is reduced to a normalized occupancy histogram over RGB space:
/// every channel is divided into `blocks` equal-width bins, giving
/// `blocks^3` combined bins, and each pixel increments the bin addressed by
/// its three channel indices. The counts are divided by the pixel count, so
/// the resulting vector is a discrete probability distribution.

use image::DynamicImage;

use crate::error::{Error, Result};

/// A normalized color histogram, `blocks^3` values summing to 1.0.
pub type FeatureVector = Vec<f32>;

pub const DEFAULT_BLOCKS: u32 = 4;

/// Computes feature vectors for decoded images. Construction validates the
/// block count; extraction itself is a pure function of the pixel data.
#[derive(Debug, Clone, Copy)]
pub struct HistogramExtractor {
    blocks: u32,
    bin_width: u32,
}

impl HistogramExtractor {
    /// The bin index formula truncates `256 / blocks`, so block counts that
    /// do not divide 256 evenly would produce unevenly sized bins and an
    /// out-of-range index for channel values near 255. Such counts are
    /// rejected here rather than silently changing the formula.
    pub fn new(blocks: u32) -> Result<Self> {
        if blocks == 0 || 256 % blocks != 0 {
            return Err(Error::InvalidBlockCount(blocks));
        }
        Ok(HistogramExtractor {
            blocks,
            bin_width: 256 / blocks,
        })
    }

    pub fn blocks(&self) -> u32 {
        self.blocks
    }

    /// Length of every vector this extractor produces.
    pub fn bins(&self) -> usize {
        (self.blocks as usize).pow(3)
    }

    /// Extracts the feature vector of a decoded image.
    ///
    /// Only 8-bit RGB input is accepted; no color conversion is performed
    /// here. Callers that want to feed RGBA or grayscale images must convert
    /// them explicitly first.
    pub fn extract(&self, image: &DynamicImage) -> Result<FeatureVector> {
        let rgb = match image {
            DynamicImage::ImageRgb8(rgb) => rgb,
            _ => {
                return Err(Error::UnsupportedImageFormat {
                    mode: format!("{:?}", image.color()),
                })
            }
        };

        let mut counts = vec![0u64; self.bins()];
        for pixel in rgb.pixels() {
            let [r, g, b] = pixel.0;
            counts[self.bin_index(r, g, b)] += 1;
        }

        let total: u64 = counts.iter().sum();
        if total == 0 {
            return Err(Error::EmptyImage);
        }

        Ok(counts
            .iter()
            .map(|&count| count as f32 / total as f32)
            .collect())
    }

    fn bin_index(&self, r: u8, g: u8, b: u8) -> usize {
        let width = self.bin_width as usize;
        let blocks = self.blocks as usize;
        let r_idx = r as usize / width;
        let g_idx = g as usize / width;
        let b_idx = b as usize / width;
        r_idx + g_idx * blocks + b_idx * blocks * blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::RgbImage;

    fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    #[test]
    fn rejects_block_counts_that_do_not_divide_256() {
        for blocks in [0, 3, 5, 6, 7, 10, 100] {
            assert!(matches!(
                HistogramExtractor::new(blocks),
                Err(Error::InvalidBlockCount(b)) if b == blocks
            ));
        }
        for blocks in [1, 2, 4, 8, 16] {
            assert!(HistogramExtractor::new(blocks).is_ok());
        }
    }

    #[test]
    fn vector_has_cubed_length_and_sums_to_one() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(13, 7, |x, y| {
            image::Rgb([(x * 19) as u8, (y * 37) as u8, ((x + y) * 11) as u8])
        }));
        for blocks in [1, 2, 4, 8] {
            let extractor = HistogramExtractor::new(blocks).unwrap();
            let vector = extractor.extract(&image).unwrap();
            assert_eq!(vector.len(), (blocks as usize).pow(3));
            assert!(vector.iter().all(|&v| (0.0..=1.0).contains(&v)));
            assert_relative_eq!(vector.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn pure_black_lands_in_bin_zero() {
        let extractor = HistogramExtractor::new(4).unwrap();
        let vector = extractor.extract(&solid_image(1, 1, [0, 0, 0])).unwrap();
        assert_eq!(vector[0], 1.0);
        assert!(vector[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn pure_white_lands_in_the_highest_bin() {
        // 256 % 4 == 0, so 255 / 64 == 3 on every channel and the combined
        // index is 3 + 3*4 + 3*16 = 63, the last bin.
        let extractor = HistogramExtractor::new(4).unwrap();
        let vector = extractor
            .extract(&solid_image(1, 1, [255, 255, 255]))
            .unwrap();
        assert_eq!(vector[63], 1.0);
        assert!(vector[..63].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn mixed_image_splits_mass_between_bins() {
        let mut buffer = RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 0]));
        buffer.put_pixel(0, 0, image::Rgb([255, 255, 255]));
        let extractor = HistogramExtractor::new(4).unwrap();
        let vector = extractor.extract(&DynamicImage::ImageRgb8(buffer)).unwrap();
        assert_eq!(vector[0], 0.75);
        assert_eq!(vector[63], 0.25);
    }

    #[test]
    fn rejects_non_rgb_color_modes() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(2, 2, image::Luma([128])));
        let extractor = HistogramExtractor::new(4).unwrap();
        assert!(matches!(
            extractor.extract(&gray),
            Err(Error::UnsupportedImageFormat { .. })
        ));

        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            2,
            2,
            image::Rgba([1, 2, 3, 255]),
        ));
        assert!(matches!(
            extractor.extract(&rgba),
            Err(Error::UnsupportedImageFormat { .. })
        ));
    }

    #[test]
    fn rejects_images_with_no_pixels() {
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        let extractor = HistogramExtractor::new(4).unwrap();
        assert!(matches!(extractor.extract(&empty), Err(Error::EmptyImage)));
    }
}
