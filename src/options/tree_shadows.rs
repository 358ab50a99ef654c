use glam::Vec3;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::proxy::SphereProxyConfig;

/// Where the shadow contribution is composited.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CompositeTarget {
    /// Full-screen pass over the scene color, before transparents.
    #[default]
    PostEffect,
    /// Injected into the sun's screen-space shadow mask.
    ShadowMask,
}

/// Tree shadow settings: sphere shape, tint, fade, and leaf texture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Tree Shadows", inline)]
#[serde(default)]
pub struct TreeShadowOptions {
    /// Offset from the tree base to the sphere center, in world units.
    #[schemars(title = "Sphere Center Offset")]
    pub sphere_center_offset: [f32; 3],
    /// Sphere radius shared by every tree.
    #[schemars(title = "Sphere Radius", range(min = 0.0, max = 50.0), extend("step" = 0.1))]
    pub sphere_radius: f32,
    /// Tint at full shadow strength (linear RGB).
    #[schemars(title = "Shadow Color")]
    pub shadow_color: [f32; 3],
    /// Distance at which shadows have fully faded out.
    #[schemars(title = "Shadow Distance", range(min = 0.0, max = 2000.0), extend("step" = 5.0))]
    pub shadow_distance: f32,
    /// Width of the fade-out band ending at `shadow_distance`.
    #[schemars(title = "Shadow Fade", range(min = 0.0, max = 500.0), extend("step" = 1.0))]
    pub shadow_fade: f32,
    /// Explicit fade start; overrides `shadow_distance - shadow_fade`.
    #[schemars(skip)]
    pub fade_start_override: Option<f32>,
    /// World-to-UV scale of the leaf mask.
    #[schemars(title = "Leaf Texture Scale", range(min = 0.0, max = 4.0), extend("step" = 0.01))]
    pub leaf_texture_scale: f32,
    /// Softness of the leaf mask threshold.
    #[schemars(title = "Leaf Texture Softness", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub leaf_texture_softness: f32,
    /// Compositing point.
    #[schemars(skip)]
    pub target: CompositeTarget,
}

impl Default for TreeShadowOptions {
    fn default() -> Self {
        Self {
            sphere_center_offset: [0.0, 4.0, 0.0],
            sphere_radius: 3.0,
            shadow_color: [0.0, 0.0, 0.0],
            shadow_distance: 150.0,
            shadow_fade: 20.0,
            fade_start_override: None,
            leaf_texture_scale: 0.25,
            leaf_texture_softness: 0.1,
            target: CompositeTarget::PostEffect,
        }
    }
}

impl TreeShadowOptions {
    /// View distance at which the fade-out begins.
    #[must_use]
    pub fn fade_start(&self) -> f32 {
        self.fade_start_override
            .unwrap_or(self.shadow_distance - self.shadow_fade)
    }

    /// Sphere shape for the proxy builder.
    #[must_use]
    pub fn proxy_config(&self) -> SphereProxyConfig {
        SphereProxyConfig {
            center_offset: Vec3::from_array(self.sphere_center_offset),
            radius: self.sphere_radius,
        }
    }

    /// Check every value before activation.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting as a [`ConfigurationError`].
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.proxy_config().validate()?;

        let checks: [(&'static str, f32, bool); 5] = [
            (
                "shadow_fade",
                self.shadow_fade,
                self.shadow_fade >= 0.0,
            ),
            ("fade_start", self.fade_start(), true),
            ("leaf_texture_scale", self.leaf_texture_scale, true),
            (
                "leaf_texture_softness",
                self.leaf_texture_softness,
                (0.0..=1.0).contains(&self.leaf_texture_softness),
            ),
            (
                "shadow_color",
                self.shadow_color.iter().sum(),
                self.shadow_color.iter().all(|c| (0.0..=1.0).contains(c)),
            ),
        ];
        for (name, value, in_range) in checks {
            if !value.is_finite() || !in_range {
                return Err(ConfigurationError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}
