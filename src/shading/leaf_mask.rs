//! Tiled foliage mask that breaks up the sphere silhouettes.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ConfigurationError;

/// Single-channel (R8) mask, sampled with bilinear filtering and repeat
/// addressing like the GPU copy uploaded by
/// [`LeafTexture`](crate::gpu::texture::LeafTexture).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafMask {
    width: u32,
    height: u32,
    texels: Vec<u8>,
}

impl LeafMask {
    /// Mask from row-major texels.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::LeafMaskSize`] when `texels` does not
    /// hold exactly `width * height` values or either dimension is zero.
    pub fn new(
        width: u32,
        height: u32,
        texels: Vec<u8>,
    ) -> Result<Self, ConfigurationError> {
        let expected = width as usize * height as usize;
        if expected == 0 || texels.len() != expected {
            return Err(ConfigurationError::LeafMaskSize {
                expected,
                actual: texels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// 1×1 white mask: a solid sphere silhouette.
    #[must_use]
    pub fn solid() -> Self {
        Self {
            width: 1,
            height: 1,
            texels: vec![u8::MAX],
        }
    }

    /// Square mask of `clusters` random leaf blobs on a transparent
    /// background. Blobs wrap around the edges so the mask tiles cleanly.
    #[must_use]
    pub fn procedural(size: u32, seed: u64, clusters: u32) -> Self {
        let size = size.max(1);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut texels = vec![0u8; size as usize * size as usize];
        let extent = size as f32;
        let min_radius = (extent / 16.0).max(0.5);
        let max_radius = (extent / 6.0).max(min_radius + 0.5);

        for _ in 0..clusters {
            let cx = rng.random_range(0.0..extent);
            let cy = rng.random_range(0.0..extent);
            let radius = rng.random_range(min_radius..max_radius);
            let reach = radius.ceil() as i64;
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let px = (cx.floor() as i64 + dx).rem_euclid(size as i64);
                    let py = (cy.floor() as i64 + dy).rem_euclid(size as i64);
                    let ox = dx as f32 + cx.floor() + 0.5 - cx;
                    let oy = dy as f32 + cy.floor() + 0.5 - cy;
                    if ox * ox + oy * oy <= radius * radius {
                        texels[py as usize * size as usize + px as usize] =
                            u8::MAX;
                    }
                }
            }
        }

        Self {
            width: size,
            height: size,
            texels,
        }
    }

    /// Width in texels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major texels.
    #[must_use]
    pub fn texels(&self) -> &[u8] {
        &self.texels
    }

    fn texel(&self, x: i64, y: i64) -> f32 {
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        f32::from(self.texels[y * self.width as usize + x]) / 255.0
    }

    /// Bilinear sample at `uv` with repeat addressing, in `[0, 1]`.
    #[must_use]
    pub fn sample(&self, uv: Vec2) -> f32 {
        let x = uv.x * self.width as f32 - 0.5;
        let y = uv.y * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (ix, iy) = (x0 as i64, y0 as i64);

        let top = self.texel(ix, iy) * (1.0 - fx) + self.texel(ix + 1, iy) * fx;
        let bottom = self.texel(ix, iy + 1) * (1.0 - fx)
            + self.texel(ix + 1, iy + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_texels() {
        let err = LeafMask::new(4, 4, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::LeafMaskSize {
                expected: 16,
                actual: 15
            }
        );
        assert!(LeafMask::new(0, 4, Vec::new()).is_err());
    }

    #[test]
    fn solid_mask_samples_one_everywhere() {
        let mask = LeafMask::solid();
        for uv in [Vec2::ZERO, Vec2::new(0.3, 0.9), Vec2::new(-17.2, 4.5)] {
            assert!((mask.sample(uv) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn sampling_repeats() {
        let mask = LeafMask::new(2, 2, vec![0, 255, 255, 0]).unwrap();
        let uv = Vec2::new(0.25, 0.25);
        let shifted = uv + Vec2::new(3.0, -2.0);
        assert!((mask.sample(uv) - mask.sample(shifted)).abs() < 1e-5);
        assert!(mask.sample(uv) < 1e-5);
        assert!((mask.sample(Vec2::new(0.75, 0.25)) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn procedural_mask_is_deterministic_and_mixed() {
        let a = LeafMask::procedural(64, 7, 6);
        let b = LeafMask::procedural(64, 7, 6);
        assert_eq!(a, b);

        let lit = a.texels().iter().filter(|&&t| t == u8::MAX).count();
        assert!(lit > 0);
        assert!(lit < a.texels().len());
    }
}
