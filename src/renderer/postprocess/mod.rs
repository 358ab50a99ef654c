//! Screen-space passes that composite into host-owned targets.
//!
//! Provides the sphere-proxy tree shadow pass, usable as a post effect over
//! the scene color or as an input to a light's shadow mask.

pub(crate) mod screen_pass;
pub mod tree_shadow;

pub use screen_pass::ScreenPass;
pub use tree_shadow::{TreeShadowPass, TreeShadowUniform};
