use crate::gpu::render_context::RenderContext;

/// Uniform interface for fullscreen passes that composite into a
/// host-owned target.
pub trait ScreenPass {
    /// Encode GPU commands for this pass, blending into `target`.
    fn render(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView);
    /// Recreate resolution-dependent resources.
    /// External texture views must be updated via pass-specific setters
    /// BEFORE calling this.
    fn resize(&mut self, context: &RenderContext);
}
