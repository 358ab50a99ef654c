//! Leaf mask upload.

use crate::gpu::render_context::RenderContext;
use crate::shading::LeafMask;

/// Single-channel leaf mask texture sampled with repeat addressing.
///
/// Bound even when the host supplies no mask: the fallback is a 1x1 white
/// texel, which leaves the shadow alpha unchanged.
pub struct LeafTexture {
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// A default full-texture view.
    pub view: wgpu::TextureView,
}

impl LeafTexture {
    /// Upload `mask` as an `R8Unorm` texture.
    #[must_use]
    pub fn new(context: &RenderContext, mask: &LeafMask) -> Self {
        let size = wgpu::Extent3d {
            width: mask.width(),
            height: mask.height(),
            depth_or_array_layers: 1,
        };
        let texture = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Leaf Mask"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            mask.texels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(mask.width()),
                rows_per_image: Some(mask.height()),
            },
            size,
        );

        log::debug!("leaf mask uploaded ({}x{})", mask.width(), mask.height());

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// The no-mask fallback.
    #[must_use]
    pub fn white(context: &RenderContext) -> Self {
        Self::new(context, &LeafMask::solid())
    }
}
