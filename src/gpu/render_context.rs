use std::fmt;

use crate::error::ConfigurationError;
use crate::proxy::SPHERE_STRIDE;

/// Errors that can occur during GPU context initialization.
#[derive(Debug)]
pub enum RenderContextError {
    /// No compatible GPU adapter found.
    AdapterRequest(wgpu::RequestAdapterError),
    /// GPU device request failed (limits or features not met).
    DeviceRequest(wgpu::RequestDeviceError),
}

impl fmt::Display for RenderContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdapterRequest(e) => {
                write!(f, "no compatible GPU adapter found: {e}")
            }
            Self::DeviceRequest(e) => write!(f, "device request failed: {e}"),
        }
    }
}

impl std::error::Error for RenderContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AdapterRequest(e) => Some(e),
            Self::DeviceRequest(e) => Some(e),
        }
    }
}

/// The host's wgpu device and queue plus the color format and size of the
/// frame the shadow pass composites into.
pub struct RenderContext {
    /// The wgpu logical device.
    pub device: wgpu::Device,
    /// The wgpu command queue.
    pub queue: wgpu::Queue,
    /// Format of the composite target (scene color or shadow mask).
    pub format: wgpu::TextureFormat,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

impl RenderContext {
    /// Create a render context from an externally-owned device and queue.
    #[must_use]
    pub fn from_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            device,
            queue,
            format,
            width,
            height,
        }
    }

    /// Create a surfaceless context on the default adapter, for offscreen
    /// rendering and tests.
    ///
    /// # Errors
    ///
    /// Returns `RenderContextError` if no adapter is available or the device
    /// request fails.
    pub async fn headless(
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::AdapterRequest)?;

        log::debug!("headless adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Headless Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::DeviceRequest)?;

        Ok(Self::from_device(device, queue, format, width, height))
    }

    /// Update the frame size. Ignores zero-sized dimensions.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    /// Check that the device can bind `sphere_count` spheres as a read-only
    /// storage buffer in the fragment stage.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Unsupported`] naming the missing
    /// capability.
    pub fn check_tree_shadow_support(
        &self,
        sphere_count: usize,
    ) -> Result<(), ConfigurationError> {
        tree_shadow_support(&self.device.limits(), sphere_count)
    }

    /// Create a new command encoder for recording GPU commands.
    pub fn create_encoder(&self) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Tree Shadow Encoder"),
            })
    }

    /// Finish the encoder and submit its command buffer to the GPU queue.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        let _ = self.queue.submit(std::iter::once(encoder.finish()));
    }
}

/// Check `limits` against what binding `sphere_count` spheres needs.
///
/// # Errors
///
/// Returns [`ConfigurationError::Unsupported`] when the fragment stage has no
/// storage buffers or the sphere records exceed the binding size limit.
pub fn tree_shadow_support(
    limits: &wgpu::Limits,
    sphere_count: usize,
) -> Result<(), ConfigurationError> {
    if limits.max_storage_buffers_per_shader_stage == 0 {
        return Err(ConfigurationError::Unsupported(
            "no storage buffers in the fragment stage".to_owned(),
        ));
    }
    let bytes = (sphere_count.max(1) * SPHERE_STRIDE) as u64;
    if bytes > u64::from(limits.max_storage_buffer_binding_size) {
        return Err(ConfigurationError::Unsupported(format!(
            "{sphere_count} spheres need {bytes} bytes, binding limit is {}",
            limits.max_storage_buffer_binding_size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downlevel_limits_support_a_forest() {
        let limits = wgpu::Limits::downlevel_defaults();
        assert!(tree_shadow_support(&limits, 0).is_ok());
        assert!(tree_shadow_support(&limits, 10_000).is_ok());
    }

    #[test]
    fn no_fragment_storage_buffers_is_unsupported() {
        let limits = wgpu::Limits {
            max_storage_buffers_per_shader_stage: 0,
            ..wgpu::Limits::downlevel_defaults()
        };
        let err = tree_shadow_support(&limits, 1).unwrap_err();
        assert!(matches!(err, ConfigurationError::Unsupported(_)));
        assert!(err.to_string().contains("storage buffers"));
    }

    #[test]
    fn binding_size_limit_caps_sphere_count() {
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: 32,
            ..wgpu::Limits::downlevel_defaults()
        };
        assert!(tree_shadow_support(&limits, 2).is_ok());
        let err = tree_shadow_support(&limits, 3).unwrap_err();
        assert!(matches!(err, ConfigurationError::Unsupported(_)));
        assert!(err.to_string().contains("48 bytes"));
    }

    #[test]
    fn empty_set_still_needs_one_record() {
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: 8,
            ..wgpu::Limits::downlevel_defaults()
        };
        assert!(tree_shadow_support(&limits, 0).is_err());
    }
}
