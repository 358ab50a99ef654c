//! Sphere proxy construction from terrain tree placements.
//!
//! Every tree instance is replaced by one bounding sphere in world space.
//! All spheres of a build share a single radius and center offset; the set
//! is built in one go and never edited afterwards.

use glam::{Mat4, Vec3};

use crate::error::ConfigurationError;

/// Byte stride of one [`Sphere`] record, shared with the WGSL `Sphere`
/// struct (`vec3<f32>` center followed by `f32` squared radius).
pub const SPHERE_STRIDE: usize = 16;

const _: () = assert!(std::mem::size_of::<Sphere>() == SPHERE_STRIDE);

/// One tree instance as placed on the terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreePlacement {
    /// Position normalized to the terrain extent, nominally `[0, 1]` per axis.
    pub position: Vec3,
}

impl TreePlacement {
    /// Placement at the given normalized position.
    #[must_use]
    pub const fn new(position: Vec3) -> Self {
        Self { position }
    }
}

/// Host-side terrain description: extent, placement transform, and trees.
#[derive(Debug, Clone)]
pub struct TerrainData {
    /// Terrain extent in local units (width, height, length).
    pub size: Vec3,
    /// Terrain local-to-world transform.
    pub to_world: Mat4,
    /// Tree instances in placement order.
    pub trees: Vec<TreePlacement>,
}

impl TerrainData {
    /// Terrain with an identity transform and no trees.
    #[must_use]
    pub fn new(size: Vec3) -> Self {
        Self {
            size,
            to_world: Mat4::IDENTITY,
            trees: Vec::new(),
        }
    }

    /// Replace the local-to-world transform.
    #[must_use]
    pub fn with_transform(mut self, to_world: Mat4) -> Self {
        self.to_world = to_world;
        self
    }

    /// Replace the tree list.
    #[must_use]
    pub fn with_trees(mut self, trees: Vec<TreePlacement>) -> Self {
        self.trees = trees;
        self
    }
}

/// Uniform sphere shape applied to every tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereProxyConfig {
    /// Offset added to the world-space tree position to get the center.
    pub center_offset: Vec3,
    /// Sphere radius in world units.
    pub radius: f32,
}

impl SphereProxyConfig {
    /// Check offset and radius.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidRadius`] for a negative or
    /// non-finite radius and [`ConfigurationError::InvalidCenterOffset`]
    /// for a non-finite offset.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(ConfigurationError::InvalidRadius(self.radius));
        }
        if !self.center_offset.is_finite() {
            return Err(ConfigurationError::InvalidCenterOffset(
                self.center_offset.to_array(),
            ));
        }
        Ok(())
    }
}

/// World-space bounding sphere, laid out for a GPU storage buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Sphere {
    /// World-space center.
    pub center: [f32; 3],
    /// Squared radius, so the per-pixel test needs no square root.
    pub sqr_radius: f32,
}

impl Sphere {
    /// World-space center as a vector.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        Vec3::from_array(self.center)
    }

    /// Whether `point` lies inside or on the sphere.
    #[inline]
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.distance_squared(self.center()) <= self.sqr_radius
    }
}

/// Ordered, immutable set of sphere proxies, one per tree instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProxySet {
    spheres: Vec<Sphere>,
    radius: f32,
}

impl ProxySet {
    /// Build the proxy set for a terrain. See [`build`].
    ///
    /// # Errors
    ///
    /// See [`build`].
    pub fn build(
        terrain: &TerrainData,
        config: &SphereProxyConfig,
    ) -> Result<Self, ConfigurationError> {
        build(terrain, config)
    }

    /// Number of spheres (equals the tree count at build time).
    #[must_use]
    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    /// `true` when the terrain had no trees.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// Sphere for the tree at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Sphere> {
        self.spheres.get(index)
    }

    /// Spheres in tree order.
    pub fn iter(&self) -> std::slice::Iter<'_, Sphere> {
        self.spheres.iter()
    }

    /// Spheres in tree order, as a slice ready for upload.
    #[must_use]
    pub fn as_slice(&self) -> &[Sphere] {
        &self.spheres
    }

    /// Radius every sphere was built with.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl<'a> IntoIterator for &'a ProxySet {
    type Item = &'a Sphere;
    type IntoIter = std::slice::Iter<'a, Sphere>;

    fn into_iter(self) -> Self::IntoIter {
        self.spheres.iter()
    }
}

/// Build one sphere per tree: scale the normalized position by the terrain
/// size, transform it to world space, then add the center offset.
///
/// Output order matches `terrain.trees`. A terrain without trees yields an
/// empty set.
///
/// # Errors
///
/// Returns [`ConfigurationError::InvalidTerrainSize`] if any size component
/// is not strictly positive, and the errors of
/// [`SphereProxyConfig::validate`].
pub fn build(
    terrain: &TerrainData,
    config: &SphereProxyConfig,
) -> Result<ProxySet, ConfigurationError> {
    let size = terrain.size;
    if !size.is_finite() || size.min_element() <= 0.0 {
        return Err(ConfigurationError::InvalidTerrainSize(size.to_array()));
    }
    config.validate()?;

    let sqr_radius = config.radius * config.radius;
    let spheres = terrain
        .trees
        .iter()
        .map(|tree| {
            let local = tree.position * size;
            let world = terrain.to_world.transform_point3(local);
            Sphere {
                center: (world + config.center_offset).to_array(),
                sqr_radius,
            }
        })
        .collect();

    Ok(ProxySet {
        spheres,
        radius: config.radius,
    })
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;

    fn config(offset: Vec3, radius: f32) -> SphereProxyConfig {
        SphereProxyConfig {
            center_offset: offset,
            radius,
        }
    }

    #[test]
    fn single_tree_scenario() {
        let terrain = TerrainData::new(Vec3::new(100.0, 10.0, 100.0))
            .with_trees(vec![TreePlacement::new(Vec3::new(0.5, 0.0, 0.5))]);
        let proxy = build(&terrain, &config(Vec3::Y, 2.0)).unwrap();

        assert_eq!(proxy.len(), 1);
        let sphere = proxy.get(0).unwrap();
        assert_eq!(sphere.center, [50.0, 1.0, 50.0]);
        assert_eq!(sphere.sqr_radius, 4.0);
        assert!(sphere.contains(Vec3::new(50.0, 1.0, 50.0)));
        assert!(!sphere.contains(Vec3::new(60.0, 1.0, 50.0)));
    }

    #[test]
    fn centers_follow_terrain_transform() {
        let to_world = Mat4::from_scale_rotation_translation(
            Vec3::ONE,
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::new(-200.0, 5.0, 30.0),
        );
        let size = Vec3::new(500.0, 80.0, 250.0);
        let offset = Vec3::new(0.0, 3.5, 0.0);
        let placements = vec![
            TreePlacement::new(Vec3::new(0.1, 0.2, 0.3)),
            TreePlacement::new(Vec3::new(0.9, 0.0, 0.4)),
            TreePlacement::new(Vec3::ZERO),
        ];
        let terrain = TerrainData::new(size)
            .with_transform(to_world)
            .with_trees(placements.clone());

        let proxy = build(&terrain, &config(offset, 4.0)).unwrap();

        assert_eq!(proxy.len(), placements.len());
        for (sphere, tree) in proxy.iter().zip(&placements) {
            let expected =
                to_world.transform_point3(tree.position * size) + offset;
            assert_eq!(sphere.center(), expected);
        }
    }

    #[test]
    fn radius_is_uniform_and_squared() {
        let terrain = TerrainData::new(Vec3::splat(64.0)).with_trees(
            (0..10)
                .map(|i| TreePlacement::new(Vec3::splat(i as f32 / 10.0)))
                .collect(),
        );

        let small = build(&terrain, &config(Vec3::ZERO, 1.5)).unwrap();
        let large = build(&terrain, &config(Vec3::ZERO, 3.0)).unwrap();

        assert!(small.iter().all(|s| s.sqr_radius == 2.25));
        assert!(large.iter().all(|s| s.sqr_radius == 9.0));
        assert_eq!(small.radius(), 1.5);
        for (a, b) in small.iter().zip(&large) {
            assert_eq!(a.center, b.center);
        }
    }

    #[test]
    fn no_trees_builds_empty_set() {
        let terrain = TerrainData::new(Vec3::splat(10.0));
        let proxy = build(&terrain, &config(Vec3::ZERO, 2.0)).unwrap();
        assert!(proxy.is_empty());
        assert_eq!(proxy.as_slice().len(), 0);
    }

    #[test]
    fn rejects_non_positive_terrain_size() {
        for size in [
            Vec3::new(0.0, 10.0, 10.0),
            Vec3::new(10.0, -1.0, 10.0),
            Vec3::new(10.0, 10.0, f32::NAN),
        ] {
            let terrain = TerrainData::new(size);
            let err = build(&terrain, &config(Vec3::ZERO, 1.0)).unwrap_err();
            assert!(matches!(err, ConfigurationError::InvalidTerrainSize(_)));
        }
    }

    #[test]
    fn rejects_negative_radius() {
        let terrain = TerrainData::new(Vec3::splat(10.0))
            .with_trees(vec![TreePlacement::new(Vec3::ZERO)]);
        let err = build(&terrain, &config(Vec3::ZERO, -2.0)).unwrap_err();
        assert_eq!(err, ConfigurationError::InvalidRadius(-2.0));
    }

    #[test]
    fn zero_radius_is_allowed() {
        let terrain = TerrainData::new(Vec3::splat(10.0))
            .with_trees(vec![TreePlacement::new(Vec3::splat(0.5))]);
        let proxy = build(&terrain, &config(Vec3::ZERO, 0.0)).unwrap();
        assert_eq!(proxy.get(0).unwrap().sqr_radius, 0.0);
    }

    #[test]
    fn sphere_is_sixteen_bytes() {
        let spheres = [Sphere {
            center: [1.0, 2.0, 3.0],
            sqr_radius: 4.0,
        }];
        let bytes: &[u8] = bytemuck::cast_slice(&spheres);
        assert_eq!(bytes.len(), SPHERE_STRIDE);
        assert_eq!(&bytes[12..16], &4.0f32.to_ne_bytes());
    }
}
