use super::screen_pass::ScreenPass;
use crate::error::TreeShadowError;
use crate::gpu::pipeline_helpers::{
    create_screen_space_pipeline, depth_texture_2d, filtering_sampler,
    read_only_storage_buffer, repeat_sampler, texture_2d, uniform_buffer,
    ScreenSpacePipelineDef, MULTIPLY_BLEND,
};
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::gpu::sphere_buffer::SphereBuffer;
use crate::gpu::texture::LeafTexture;
use crate::options::CompositeTarget;
use crate::proxy::ProxySet;
use crate::shading::{CompositorParams, LeafMask};

/// Tree shadow parameters uniform - must match WGSL struct
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TreeShadowUniform {
    /// Clip-to-view matrix.
    pub inv_proj: [[f32; 4]; 4],
    /// View-to-world matrix.
    pub camera_to_world: [[f32; 4]; 4],
    /// Shadow tint (rgb, w unused).
    pub shadow_color: [f32; 4],
    /// Sun direction.
    pub sun_direction: [f32; 3],
    /// View distance where the fade begins.
    pub fade_start: f32,
    /// Width of the fade band.
    pub fade_distance: f32,
    /// World-to-UV scale of the leaf mask.
    pub leaf_texture_scale: f32,
    /// Leaf threshold softness.
    pub leaf_texture_softness: f32,
    /// Number of valid records in the sphere buffer.
    pub sphere_count: u32,
}

const _: () = assert!(std::mem::size_of::<TreeShadowUniform>() == 176);

impl TreeShadowUniform {
    fn new(params: &CompositorParams, sphere_count: u32) -> Self {
        Self {
            inv_proj: params.inverse_projection.to_cols_array_2d(),
            camera_to_world: params.camera_to_world.to_cols_array_2d(),
            shadow_color: params.shadow_color.extend(1.0).to_array(),
            sun_direction: params.sun_direction.to_array(),
            fade_start: params.fade_start,
            fade_distance: params.fade_distance,
            leaf_texture_scale: params.leaf_texture_scale,
            leaf_texture_softness: params.leaf_texture_softness,
            sphere_count,
        }
    }
}

/// Inputs for creating the tree shadow bind group.
struct TreeShadowBindings<'a> {
    depth: &'a wgpu::TextureView,
    leaf: &'a wgpu::TextureView,
    sampler: &'a wgpu::Sampler,
    params_buffer: &'a wgpu::Buffer,
    spheres: &'a wgpu::Buffer,
}

/// GPU shadow compositor: one full-screen triangle that multiplies the
/// tree shadow term into a host target.
pub struct TreeShadowPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    params_buffer: wgpu::Buffer,
    spheres: SphereBuffer,
    leaf_texture: LeafTexture,
    leaf_sampler: wgpu::Sampler,
    /// Stored depth view for bind group recreation.
    depth_view: wgpu::TextureView,
    target: CompositeTarget,
}

impl TreeShadowPass {
    /// Upload `proxy` and build the pipeline for `target`.
    ///
    /// `leaf_mask` of `None` binds a white texel (solid silhouettes).
    ///
    /// # Errors
    ///
    /// Returns [`TreeShadowError::Configuration`] when the device cannot bind
    /// the sphere set and [`TreeShadowError::Shader`] when the kernel fails to
    /// compose.
    pub fn new(
        context: &RenderContext,
        shader_composer: &mut ShaderComposer,
        proxy: &ProxySet,
        leaf_mask: Option<&LeafMask>,
        depth_view: &wgpu::TextureView,
        target: CompositeTarget,
    ) -> Result<Self, TreeShadowError> {
        context.check_tree_shadow_support(proxy.len())?;

        let bind_group_layout = Self::create_bind_group_layout(context);
        let pipeline = Self::create_pipeline(
            context,
            shader_composer,
            &bind_group_layout,
            target,
        )?;

        let params_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Tree Shadow Params"),
            size: std::mem::size_of::<TreeShadowUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let spheres = SphereBuffer::upload(context, proxy)?;
        let leaf_texture = leaf_mask.map_or_else(
            || LeafTexture::white(context),
            |mask| LeafTexture::new(context, mask),
        );
        let leaf_sampler = repeat_sampler(&context.device, "Leaf Mask Sampler");

        let bind_group = Self::create_bind_group(
            context,
            &bind_group_layout,
            &TreeShadowBindings {
                depth: depth_view,
                leaf: &leaf_texture.view,
                sampler: &leaf_sampler,
                params_buffer: &params_buffer,
                spheres: spheres.buffer(),
            },
        );

        Ok(Self {
            pipeline,
            bind_group_layout,
            bind_group,
            params_buffer,
            spheres,
            leaf_texture,
            leaf_sampler,
            depth_view: depth_view.clone(),
            target,
        })
    }

    fn create_bind_group_layout(context: &RenderContext) -> wgpu::BindGroupLayout {
        context
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Tree Shadow Bind Group Layout"),
                entries: &[
                    depth_texture_2d(0),
                    texture_2d(1),
                    filtering_sampler(2),
                    uniform_buffer(3),
                    read_only_storage_buffer(4),
                ],
            })
    }

    fn create_pipeline(
        context: &RenderContext,
        shader_composer: &mut ShaderComposer,
        layout: &wgpu::BindGroupLayout,
        target: CompositeTarget,
    ) -> Result<wgpu::RenderPipeline, TreeShadowError> {
        let shader = shader_composer.compose(&context.device, Shader::TreeShadows)?;
        let fragment_entry = match target {
            CompositeTarget::PostEffect => "fs_main",
            CompositeTarget::ShadowMask => "fs_mask",
        };
        Ok(create_screen_space_pipeline(
            &context.device,
            &ScreenSpacePipelineDef {
                label: "Tree Shadow",
                shader: &shader,
                fragment_entry,
                format: context.format,
                blend: Some(MULTIPLY_BLEND),
                bind_group_layouts: &[layout],
            },
        ))
    }

    fn create_bind_group(
        context: &RenderContext,
        layout: &wgpu::BindGroupLayout,
        inputs: &TreeShadowBindings<'_>,
    ) -> wgpu::BindGroup {
        context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Tree Shadow Bind Group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(
                            inputs.depth,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(
                            inputs.leaf,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(
                            inputs.sampler,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: inputs.params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: inputs.spheres.as_entire_binding(),
                    },
                ],
            })
    }

    fn rebuild_bind_group(&mut self, context: &RenderContext) {
        self.bind_group = Self::create_bind_group(
            context,
            &self.bind_group_layout,
            &TreeShadowBindings {
                depth: &self.depth_view,
                leaf: &self.leaf_texture.view,
                sampler: &self.leaf_sampler,
                params_buffer: &self.params_buffer,
                spheres: self.spheres.buffer(),
            },
        );
    }

    /// Upload this frame's camera, light, and shadow parameters (call
    /// before [`render`](ScreenPass::render)).
    pub fn update(&self, queue: &wgpu::Queue, params: &CompositorParams) {
        let uniform = TreeShadowUniform::new(params, self.sphere_count());
        queue.write_buffer(
            &self.params_buffer,
            0,
            bytemuck::cast_slice(&[uniform]),
        );
    }

    /// Rebind the scene depth, e.g. after the host recreated its depth
    /// target.
    pub fn set_depth_view(
        &mut self,
        context: &RenderContext,
        depth_view: &wgpu::TextureView,
    ) {
        self.depth_view = depth_view.clone();
        self.rebuild_bind_group(context);
    }

    /// Replace the sphere set with a freshly uploaded one. The previous
    /// buffer is released after the new one is bound.
    ///
    /// # Errors
    ///
    /// Returns [`TreeShadowError::Configuration`] when the device cannot bind
    /// the new set; the old set stays bound in that case.
    pub fn replace_spheres(
        &mut self,
        context: &RenderContext,
        proxy: &ProxySet,
    ) -> Result<(), TreeShadowError> {
        context.check_tree_shadow_support(proxy.len())?;
        let spheres = SphereBuffer::upload(context, proxy)?;
        let previous = std::mem::replace(&mut self.spheres, spheres);
        self.rebuild_bind_group(context);
        previous.release();
        Ok(())
    }

    /// Number of spheres the kernel loops over.
    #[must_use]
    pub fn sphere_count(&self) -> u32 {
        self.spheres.len() as u32
    }

    /// The uploaded sphere buffer.
    #[must_use]
    pub fn spheres(&self) -> &SphereBuffer {
        &self.spheres
    }

    /// Where this pass composites.
    #[must_use]
    pub fn target(&self) -> CompositeTarget {
        self.target
    }

    /// Drop the pass's handles to its GPU resources. Encoders that already
    /// recorded [`render`](ScreenPass::render) keep them alive until their
    /// command buffers retire.
    pub fn release(self) {
        log::debug!("releasing tree shadow pass ({:?})", self.target);
        self.spheres.release();
    }
}

impl ScreenPass for TreeShadowPass {
    fn render(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Tree Shadow Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Nothing here depends on frame size; a resized depth target is
    /// rebound through [`TreeShadowPass::set_depth_view`].
    fn resize(&mut self, _context: &RenderContext) {}
}
