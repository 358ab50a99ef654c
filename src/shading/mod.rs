//! Per-fragment tree shadow evaluation.
//!
//! CPU reference of the kernel in `assets/shaders/screen/tree_shadows.wgsl`:
//! reconstruct the fragment position from depth, test it against every
//! sphere, then scale the shadow by the distance fade and the leaf mask.
//! Both sides must agree; the GPU tests compare them pixel by pixel.

mod leaf_mask;

use glam::{Mat4, Vec2, Vec3};
pub use leaf_mask::LeafMask;

use crate::camera::FrameCamera;
use crate::options::{CompositeTarget, TreeShadowOptions};
use crate::proxy::Sphere;

/// Rec. 709 luma weights used to collapse the tint into a mask value.
const LUMA: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

/// Per-frame compositor inputs, rebuilt from live camera and light state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositorParams {
    /// View-to-world matrix (inverse view).
    pub camera_to_world: Mat4,
    /// Clip-to-view matrix.
    pub inverse_projection: Mat4,
    /// Sun direction. Carried to the kernel, not used to offset the test.
    pub sun_direction: Vec3,
    /// Tint at full shadow strength.
    pub shadow_color: Vec3,
    /// View distance up to which shadows are fully visible.
    pub fade_start: f32,
    /// Width of the linear fade-out beyond `fade_start`.
    pub fade_distance: f32,
    /// World-to-mask UV scale of the leaf texture.
    pub leaf_texture_scale: f32,
    /// Width of the leaf mask threshold transition, in `[0, 1]`.
    pub leaf_texture_softness: f32,
}

impl CompositorParams {
    /// Parameters for one frame.
    ///
    /// `sun_forward` is the light's forward vector; the shadow-mask target
    /// receives it negated (pointing toward the sun).
    #[must_use]
    pub fn from_frame(
        camera: &FrameCamera,
        sun_forward: Vec3,
        options: &TreeShadowOptions,
    ) -> Self {
        let sun_direction = match options.target {
            CompositeTarget::PostEffect => sun_forward,
            CompositeTarget::ShadowMask => -sun_forward,
        };
        Self {
            camera_to_world: camera.camera_to_world(),
            inverse_projection: camera.inverse_projection(),
            sun_direction,
            shadow_color: Vec3::from_array(options.shadow_color),
            fade_start: options.fade_start(),
            fade_distance: options.shadow_fade,
            leaf_texture_scale: options.leaf_texture_scale,
            leaf_texture_softness: options.leaf_texture_softness,
        }
    }
}

/// Shadow contribution for one fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadeResult {
    /// Multiplier applied to the scene color.
    pub color_multiplier: Vec3,
    /// Shadow strength in `[0, 1]`.
    pub alpha: f32,
}

impl ShadeResult {
    /// No shadow: the scene color passes through unchanged.
    pub const NONE: Self = Self {
        color_multiplier: Vec3::ONE,
        alpha: 0.0,
    };

    /// Value written into a screen-space shadow mask (1 = lit).
    #[must_use]
    pub fn mask_value(&self, shadow_color: Vec3) -> f32 {
        1.0 + (shadow_color.dot(LUMA) - 1.0) * self.alpha
    }
}

/// Borrowing view of a sphere set plus an optional leaf mask.
#[derive(Debug, Clone, Copy)]
pub struct ShadowCompositor<'a> {
    spheres: &'a [Sphere],
    leaf_mask: Option<&'a LeafMask>,
}

impl<'a> ShadowCompositor<'a> {
    /// Compositor over `spheres` with no leaf mask (solid silhouettes).
    #[must_use]
    pub fn new(spheres: &'a [Sphere]) -> Self {
        Self {
            spheres,
            leaf_mask: None,
        }
    }

    /// Attach a leaf mask.
    #[must_use]
    pub fn with_leaf_mask(mut self, leaf_mask: &'a LeafMask) -> Self {
        self.leaf_mask = Some(leaf_mask);
        self
    }

    /// Whether `world` lies in at least one sphere.
    #[must_use]
    pub fn inside_any(&self, world: Vec3) -> bool {
        self.spheres.iter().any(|sphere| sphere.contains(world))
    }

    /// Shade the fragment at screen `uv` (origin top-left) with scene depth
    /// `depth`. Far-plane depth is sky and never shadowed.
    #[must_use]
    pub fn shade(
        &self,
        depth: f32,
        uv: Vec2,
        params: &CompositorParams,
    ) -> ShadeResult {
        if depth >= 1.0 {
            return ShadeResult::NONE;
        }
        let view = reconstruct_view_position(uv, depth, params.inverse_projection);
        let world = params.camera_to_world.transform_point3(view);
        self.shade_world(world, view.length(), params)
    }

    /// Shade a fragment whose world position and distance from the camera
    /// are already known.
    #[must_use]
    pub fn shade_world(
        &self,
        world: Vec3,
        view_distance: f32,
        params: &CompositorParams,
    ) -> ShadeResult {
        if !self.inside_any(world) {
            return ShadeResult::NONE;
        }

        let fade = fade_factor(view_distance, params.fade_start, params.fade_distance);
        let leaf = self.leaf_mask.map_or(1.0, |mask| {
            let uv = Vec2::new(world.x, world.z) * params.leaf_texture_scale;
            leaf_alpha(mask.sample(uv), params.leaf_texture_softness)
        });
        let alpha = fade * leaf;

        ShadeResult {
            color_multiplier: Vec3::ONE.lerp(params.shadow_color, alpha),
            alpha,
        }
    }
}

/// View-space position of a fragment from its screen UV and `[0, 1]` depth.
#[must_use]
pub fn reconstruct_view_position(
    uv: Vec2,
    depth: f32,
    inverse_projection: Mat4,
) -> Vec3 {
    let ndc = Vec3::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, depth);
    inverse_projection.project_point3(ndc)
}

/// 1 up to `fade_start`, falling linearly to 0 at
/// `fade_start + fade_distance`. A non-positive width is a hard cut.
#[must_use]
pub fn fade_factor(view_distance: f32, fade_start: f32, fade_distance: f32) -> f32 {
    if fade_distance <= 0.0 {
        return if view_distance <= fade_start { 1.0 } else { 0.0 };
    }
    ((fade_start + fade_distance - view_distance) / fade_distance).clamp(0.0, 1.0)
}

/// Threshold a leaf mask sample at 0.5, softened over `softness`.
#[must_use]
pub fn leaf_alpha(mask: f32, softness: f32) -> f32 {
    let softness = softness.clamp(0.0, 1.0);
    if softness <= 0.0 {
        return if mask >= 0.5 { 1.0 } else { 0.0 };
    }
    let half = softness * 0.5;
    smoothstep(0.5 - half, 0.5 + half, mask)
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::{build, SphereProxyConfig, TerrainData, TreePlacement};

    fn scenario_spheres() -> Vec<Sphere> {
        let terrain = TerrainData::new(Vec3::new(100.0, 10.0, 100.0))
            .with_trees(vec![TreePlacement::new(Vec3::new(0.5, 0.0, 0.5))]);
        let config = SphereProxyConfig {
            center_offset: Vec3::Y,
            radius: 2.0,
        };
        build(&terrain, &config).unwrap().as_slice().to_vec()
    }

    fn camera() -> FrameCamera {
        FrameCamera::look_at(
            Vec3::new(40.0, 12.0, 40.0),
            Vec3::new(50.0, 1.0, 50.0),
            Vec3::Y,
            60f32.to_radians(),
            16.0 / 9.0,
            0.3,
            1000.0,
        )
    }

    fn params(camera: &FrameCamera) -> CompositorParams {
        CompositorParams {
            camera_to_world: camera.camera_to_world(),
            inverse_projection: camera.inverse_projection(),
            sun_direction: Vec3::new(0.3, -1.0, 0.2).normalize(),
            shadow_color: Vec3::new(0.2, 0.25, 0.3),
            fade_start: 100.0,
            fade_distance: 20.0,
            leaf_texture_scale: 0.1,
            leaf_texture_softness: 0.2,
        }
    }

    #[test]
    fn scenario_inside_and_outside() {
        let spheres = scenario_spheres();
        let compositor = ShadowCompositor::new(&spheres);
        assert!(compositor.inside_any(Vec3::new(50.0, 1.0, 50.0)));
        assert!(!compositor.inside_any(Vec3::new(60.0, 1.0, 50.0)));
    }

    #[test]
    fn fade_scenario() {
        assert_eq!(fade_factor(15.0, 20.0, 10.0), 1.0);
        assert!((fade_factor(25.0, 20.0, 10.0) - 0.5).abs() < 1e-6);
        assert_eq!(fade_factor(35.0, 20.0, 10.0), 0.0);
    }

    #[test]
    fn fade_is_monotonic() {
        let mut previous = f32::INFINITY;
        for step in 0..=200 {
            let distance = step as f32 * 0.25;
            let fade = fade_factor(distance, 20.0, 10.0);
            assert!((0.0..=1.0).contains(&fade));
            assert!(fade <= previous);
            previous = fade;
        }
        assert_eq!(fade_factor(20.0, 20.0, 10.0), 1.0);
        assert_eq!(fade_factor(30.0, 20.0, 10.0), 0.0);
    }

    #[test]
    fn zero_fade_width_is_hard_cut() {
        assert_eq!(fade_factor(20.0, 20.0, 0.0), 1.0);
        assert_eq!(fade_factor(20.01, 20.0, 0.0), 0.0);
    }

    #[test]
    fn leaf_alpha_thresholds() {
        assert_eq!(leaf_alpha(1.0, 0.0), 1.0);
        assert_eq!(leaf_alpha(0.49, 0.0), 0.0);
        assert_eq!(leaf_alpha(0.5, 0.0), 1.0);
        assert!((leaf_alpha(0.5, 0.4) - 0.5).abs() < 1e-5);
        assert_eq!(leaf_alpha(0.2, 0.4), 0.0);
        assert_eq!(leaf_alpha(1.0, 1.0), 1.0);
        assert!(leaf_alpha(0.6, 0.4) > leaf_alpha(0.55, 0.4));
    }

    #[test]
    fn fragment_at_center_is_shadowed() {
        let spheres = scenario_spheres();
        let compositor = ShadowCompositor::new(&spheres);
        let camera = camera();
        let params = params(&camera);

        let (uv, depth) = camera.project_depth(Vec3::new(50.0, 1.0, 50.0)).unwrap();
        let result = compositor.shade(depth, uv, &params);

        assert!((result.alpha - 1.0).abs() < 1e-6);
        assert!((result.color_multiplier - params.shadow_color).length() < 1e-5);
    }

    #[test]
    fn fragment_outside_is_unchanged() {
        let spheres = scenario_spheres();
        let compositor = ShadowCompositor::new(&spheres);
        let camera = camera();
        let params = params(&camera);

        let (uv, depth) = camera.project_depth(Vec3::new(60.0, 1.0, 50.0)).unwrap();
        assert_eq!(compositor.shade(depth, uv, &params), ShadeResult::NONE);
    }

    #[test]
    fn empty_set_never_shadows() {
        let compositor = ShadowCompositor::new(&[]);
        let camera = camera();
        let params = params(&camera);
        for y in 0..8 {
            for x in 0..8 {
                let uv = Vec2::new(x as f32 / 7.0, y as f32 / 7.0);
                for depth in [0.0, 0.5, 0.99, 1.0] {
                    assert_eq!(compositor.shade(depth, uv, &params).alpha, 0.0);
                }
            }
        }
    }

    #[test]
    fn sky_is_never_shadowed() {
        let spheres = [Sphere {
            center: [0.0; 3],
            sqr_radius: 1.0e12,
        }];
        let compositor = ShadowCompositor::new(&spheres);
        let camera = camera();
        let params = params(&camera);
        assert_eq!(
            compositor.shade(1.0, Vec2::splat(0.5), &params),
            ShadeResult::NONE
        );
    }

    #[test]
    fn distance_fades_shadow() {
        let spheres = scenario_spheres();
        let compositor = ShadowCompositor::new(&spheres);
        let mut params = params(&camera());
        params.fade_start = 20.0;
        params.fade_distance = 10.0;
        let center = Vec3::new(50.0, 1.0, 50.0);

        assert_eq!(compositor.shade_world(center, 15.0, &params).alpha, 1.0);
        assert!((compositor.shade_world(center, 25.0, &params).alpha - 0.5).abs() < 1e-6);
        assert_eq!(compositor.shade_world(center, 35.0, &params).alpha, 0.0);
    }

    #[test]
    fn leaf_mask_modulates_alpha() {
        let spheres = [Sphere {
            center: [0.0; 3],
            sqr_radius: 400.0,
        }];
        let mask = LeafMask::new(2, 1, vec![0, 255]).unwrap();
        let compositor = ShadowCompositor::new(&spheres).with_leaf_mask(&mask);
        let mut params = params(&camera());
        params.leaf_texture_scale = 1.0;
        params.leaf_texture_softness = 0.0;

        // Texel centers of the 2×1 mask sit at u = 0.25 and u = 0.75.
        let bare = compositor.shade_world(Vec3::new(0.25, 0.0, 0.5), 1.0, &params);
        let leafy = compositor.shade_world(Vec3::new(0.75, 0.0, 0.5), 1.0, &params);
        assert_eq!(bare.alpha, 0.0);
        assert_eq!(leafy.alpha, 1.0);
        assert_eq!(bare.color_multiplier, Vec3::ONE);
    }

    #[test]
    fn solid_leaf_mask_matches_no_mask() {
        let spheres = scenario_spheres();
        let solid = LeafMask::solid();
        let plain = ShadowCompositor::new(&spheres);
        let masked = ShadowCompositor::new(&spheres).with_leaf_mask(&solid);
        let params = params(&camera());
        let point = Vec3::new(50.5, 1.5, 49.0);

        let a = plain.shade_world(point, 30.0, &params);
        let b = masked.shade_world(point, 30.0, &params);
        assert!((a.alpha - b.alpha).abs() < 1e-5);
    }

    #[test]
    fn mask_value_uses_tint_luminance() {
        let full = ShadeResult {
            color_multiplier: Vec3::ZERO,
            alpha: 1.0,
        };
        assert!(full.mask_value(Vec3::ZERO).abs() < 1e-6);
        assert_eq!(ShadeResult::NONE.mask_value(Vec3::ZERO), 1.0);
        assert!((full.mask_value(Vec3::ONE) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sun_direction_flips_for_shadow_mask() {
        let forward = Vec3::new(0.0, -1.0, 0.5).normalize();
        let mut options = TreeShadowOptions::default();
        let post = CompositorParams::from_frame(&camera(), forward, &options);
        options.target = CompositeTarget::ShadowMask;
        let mask = CompositorParams::from_frame(&camera(), forward, &options);
        assert_eq!(post.sun_direction, forward);
        assert_eq!(mask.sun_direction, -forward);
    }
}
