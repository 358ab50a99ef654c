//! Tree shadow lifecycle.
//!
//! [`TreeShadows`] owns the proxy set and the GPU pass for one terrain. It is
//! either inactive (nothing allocated, every per-frame call is a no-op) or
//! active (spheres uploaded, pass ready). Hosts hold it like any other
//! renderer; there is no global instance.

use glam::Vec3;

use crate::camera::FrameCamera;
use crate::error::{ConfigurationError, TreeShadowError};
use crate::gpu::render_context::{tree_shadow_support, RenderContext};
use crate::gpu::shader_composer::ShaderComposer;
use crate::options::TreeShadowOptions;
use crate::proxy::{ProxySet, TerrainData};
use crate::renderer::postprocess::{ScreenPass, TreeShadowPass};
use crate::shading::{CompositorParams, LeafMask};

/// The directional light casting tree shadows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunLight {
    /// Forward vector of the light (direction the light travels).
    pub forward: Vec3,
}

impl SunLight {
    /// Sun travelling along `forward`. Zero vectors fall back to straight
    /// down.
    #[must_use]
    pub fn new(forward: Vec3) -> Self {
        Self {
            forward: forward.try_normalize().unwrap_or(Vec3::NEG_Y),
        }
    }
}

/// Host-owned resources the pass needs at activation.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostResources<'a> {
    /// Terrain whose trees cast shadows.
    pub terrain: Option<&'a TerrainData>,
    /// The shadow-casting light.
    pub sun: Option<SunLight>,
    /// Scene depth, sampled by the pass.
    pub depth_view: Option<&'a wgpu::TextureView>,
    /// Optional foliage mask; `None` gives solid silhouettes.
    pub leaf_mask: Option<&'a LeafMask>,
}

impl<'a> HostResources<'a> {
    /// Resources with nothing supplied yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the terrain.
    #[must_use]
    pub fn with_terrain(mut self, terrain: &'a TerrainData) -> Self {
        self.terrain = Some(terrain);
        self
    }

    /// Set the sun.
    #[must_use]
    pub fn with_sun(mut self, sun: SunLight) -> Self {
        self.sun = Some(sun);
        self
    }

    /// Set the scene depth view.
    #[must_use]
    pub fn with_depth_view(mut self, depth_view: &'a wgpu::TextureView) -> Self {
        self.depth_view = Some(depth_view);
        self
    }

    /// Set the leaf mask.
    #[must_use]
    pub fn with_leaf_mask(mut self, leaf_mask: &'a LeafMask) -> Self {
        self.leaf_mask = Some(leaf_mask);
        self
    }
}

struct ActiveShadows {
    proxy: ProxySet,
    pass: TreeShadowPass,
    sun: SunLight,
}

enum State {
    Inactive,
    Active(Box<ActiveShadows>),
}

/// Owner of the proxy set and GPU pass for one terrain.
pub struct TreeShadows {
    options: TreeShadowOptions,
    state: State,
}

impl TreeShadows {
    /// Inactive controller with `options`.
    #[must_use]
    pub fn new(options: TreeShadowOptions) -> Self {
        Self {
            options,
            state: State::Inactive,
        }
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> &TreeShadowOptions {
        &self.options
    }

    /// Whether spheres are uploaded and the pass will draw.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    /// The live proxy set, if active.
    #[must_use]
    pub fn proxy(&self) -> Option<&ProxySet> {
        match &self.state {
            State::Active(active) => Some(&active.proxy),
            State::Inactive => None,
        }
    }

    /// The GPU pass, if active.
    #[must_use]
    pub fn pass(&self) -> Option<&TreeShadowPass> {
        match &self.state {
            State::Active(active) => Some(&active.pass),
            State::Inactive => None,
        }
    }

    /// Validate the host resources, build the proxy set, upload it, and
    /// create the pass. An already active controller is rebuilt from
    /// scratch.
    ///
    /// # Errors
    ///
    /// Returns the first missing resource, invalid option, or unsupported
    /// capability. The controller is inactive afterwards.
    pub fn activate(
        &mut self,
        context: &RenderContext,
        shader_composer: &mut ShaderComposer,
        host: &HostResources<'_>,
    ) -> Result<(), TreeShadowError> {
        self.deactivate();

        match self.try_activate(context, shader_composer, host) {
            Ok(active) => {
                log::info!(
                    "tree shadows active: {} spheres, radius {}",
                    active.proxy.len(),
                    active.proxy.radius()
                );
                self.state = State::Active(Box::new(active));
                Ok(())
            }
            Err(e) => {
                log::error!("tree shadows failed to activate: {e}");
                Err(e)
            }
        }
    }

    fn try_activate(
        &self,
        context: &RenderContext,
        shader_composer: &mut ShaderComposer,
        host: &HostResources<'_>,
    ) -> Result<ActiveShadows, TreeShadowError> {
        let (proxy, sun, depth_view) = build_proxies(&self.options, host)?;
        let pass = TreeShadowPass::new(
            context,
            shader_composer,
            &proxy,
            host.leaf_mask,
            depth_view,
            self.options.target,
        )?;
        Ok(ActiveShadows { proxy, pass, sun })
    }

    /// Release the pass and the proxy set. No-op while inactive.
    pub fn deactivate(&mut self) {
        if let State::Active(active) =
            std::mem::replace(&mut self.state, State::Inactive)
        {
            log::info!(
                "tree shadows inactive: released {} spheres",
                active.proxy.len()
            );
            active.pass.release();
        }
    }

    /// Deactivate if `context` can no longer run the pass. Returns whether
    /// the controller is still active.
    pub fn revalidate(&mut self, context: &RenderContext) -> bool {
        self.revalidate_limits(&context.device.limits())
    }

    /// [`revalidate`](Self::revalidate) against explicit device limits.
    pub fn revalidate_limits(&mut self, limits: &wgpu::Limits) -> bool {
        let Some(proxy) = self.proxy() else {
            return false;
        };
        if let Err(e) = tree_shadow_support(limits, proxy.len()) {
            log::warn!("tree shadows disabled: {e}");
            self.deactivate();
            return false;
        }
        true
    }

    /// Apply new options. An active controller rebuilds its proxy set and
    /// pass; an inactive one only stores them.
    ///
    /// # Errors
    ///
    /// Returns [`TreeShadowError::Configuration`] if `options` are invalid
    /// (the previous options and state are kept), or any activation error
    /// (the controller is inactive afterwards).
    pub fn reconfigure(
        &mut self,
        options: TreeShadowOptions,
        context: &RenderContext,
        shader_composer: &mut ShaderComposer,
        host: &HostResources<'_>,
    ) -> Result<(), TreeShadowError> {
        options.validate()?;
        self.options = options;
        if self.is_active() {
            self.activate(context, shader_composer, host)?;
        }
        Ok(())
    }

    /// Update the light. Takes effect on the next [`prepare`](Self::prepare).
    pub fn set_sun(&mut self, sun: SunLight) {
        if let State::Active(active) = &mut self.state {
            active.sun = sun;
        }
    }

    /// Rebind the scene depth after the host recreated it.
    pub fn set_depth_view(
        &mut self,
        context: &RenderContext,
        depth_view: &wgpu::TextureView,
    ) {
        if let State::Active(active) = &mut self.state {
            active.pass.set_depth_view(context, depth_view);
        }
    }

    /// Follow a resized frame. Call after [`set_depth_view`](Self::set_depth_view);
    /// the pass keeps nothing sized to the frame, so the depth rebind is the
    /// only work a resize needs.
    pub fn resize(&mut self, context: &RenderContext) {
        if let State::Active(active) = &mut self.state {
            active.pass.resize(context);
        }
    }

    /// Per-frame parameters for `camera`, if active.
    #[must_use]
    pub fn frame_params(&self, camera: &FrameCamera) -> Option<CompositorParams> {
        match &self.state {
            State::Active(active) => Some(CompositorParams::from_frame(
                camera,
                active.sun.forward,
                &self.options,
            )),
            State::Inactive => None,
        }
    }

    /// Upload this frame's camera and light. No-op while inactive.
    pub fn prepare(&self, queue: &wgpu::Queue, camera: &FrameCamera) {
        if let (State::Active(active), Some(params)) =
            (&self.state, self.frame_params(camera))
        {
            active.pass.update(queue, &params);
        }
    }

    /// Composite the shadows into `target`. No-op while inactive.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
    ) {
        if let State::Active(active) = &self.state {
            active.pass.render(encoder, target);
        }
    }
}

impl Drop for TreeShadows {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Check that the host supplied everything and build the proxy set.
fn build_proxies<'a>(
    options: &TreeShadowOptions,
    host: &HostResources<'a>,
) -> Result<(ProxySet, SunLight, &'a wgpu::TextureView), ConfigurationError> {
    let terrain = host.terrain.ok_or(ConfigurationError::MissingTerrain)?;
    let sun = host.sun.ok_or(ConfigurationError::MissingSun)?;
    let depth_view = host.depth_view.ok_or(ConfigurationError::MissingDepth)?;
    options.validate()?;
    let proxy = ProxySet::build(terrain, &options.proxy_config())?;
    Ok((proxy, sun, depth_view))
}
