//! Per-frame camera state consumed by the shadow pass.

use glam::{Mat4, Vec2, Vec3};

/// View and projection of the camera that rendered the scene depth.
///
/// Projection follows the wgpu convention: right-handed view space,
/// `[0, 1]` depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCamera {
    /// World-to-view matrix.
    pub view: Mat4,
    /// View-to-clip matrix.
    pub projection: Mat4,
}

impl FrameCamera {
    /// Camera from explicit matrices.
    #[must_use]
    pub const fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }

    /// Perspective camera at `eye` looking at `target`. `fovy` is in
    /// radians.
    #[must_use]
    pub fn look_at(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fovy: f32,
        aspect: f32,
        znear: f32,
        zfar: f32,
    ) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, up),
            projection: Mat4::perspective_rh(fovy, aspect, znear, zfar),
        }
    }

    /// View-to-world matrix (the inverse view matrix).
    #[must_use]
    pub fn camera_to_world(&self) -> Mat4 {
        self.view.inverse()
    }

    /// Clip-to-view matrix used for depth reconstruction.
    #[must_use]
    pub fn inverse_projection(&self) -> Mat4 {
        self.projection.inverse()
    }

    /// World-space eye position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.camera_to_world().w_axis.truncate()
    }

    /// Screen UV (origin top-left) and depth of a world-space point, or
    /// `None` when the point is behind the camera.
    #[must_use]
    pub fn project_depth(&self, world: Vec3) -> Option<(Vec2, f32)> {
        let clip = self.projection * self.view * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let uv = Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
        Some((uv, ndc.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_matches_eye() {
        let eye = Vec3::new(12.0, 30.0, -4.0);
        let camera = FrameCamera::look_at(
            eye,
            Vec3::ZERO,
            Vec3::Y,
            60f32.to_radians(),
            1.5,
            0.1,
            500.0,
        );
        assert!(camera.position().distance(eye) < 1e-4);
    }

    #[test]
    fn target_projects_to_screen_center() {
        let camera = FrameCamera::look_at(
            Vec3::new(0.0, 10.0, 10.0),
            Vec3::ZERO,
            Vec3::Y,
            45f32.to_radians(),
            1.0,
            0.1,
            100.0,
        );
        let (uv, depth) = camera.project_depth(Vec3::ZERO).unwrap();
        assert!((uv - Vec2::splat(0.5)).length() < 1e-5);
        assert!(depth > 0.0 && depth < 1.0);

        assert!(camera.project_depth(Vec3::new(0.0, 20.0, 20.0)).is_none());
    }
}
