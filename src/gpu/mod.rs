//! GPU resource management utilities.
//!
//! Provides the wgpu device wrapper, pipeline boilerplate, shader
//! composition, and the sphere and leaf mask uploads the shadow pass binds.

/// Shared wgpu boilerplate helpers for screen-space pipelines.
pub mod pipeline_helpers;
/// wgpu device and queue wrapper with headless construction.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Read-only storage buffer holding the sphere proxies.
pub mod sphere_buffer;
/// Leaf mask texture upload.
pub mod texture;
