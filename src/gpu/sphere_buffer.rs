//! GPU-resident, read-only copy of a [`ProxySet`].
//!
//! The buffer is written once at creation and never updated; a rebuilt proxy
//! set gets a fresh buffer. [`SphereBuffer::release`] consumes the handle, so
//! a released buffer cannot be bound again.

use std::sync::mpsc::{self, TryRecvError};

use wgpu::util::DeviceExt;

use crate::error::TreeShadowError;
use crate::gpu::render_context::RenderContext;
use crate::proxy::{ProxySet, Sphere, SPHERE_STRIDE};

/// Storage buffer holding one 16-byte record per sphere.
pub struct SphereBuffer {
    buffer: wgpu::Buffer,
    len: usize,
}

impl SphereBuffer {
    /// Allocate a storage buffer sized for `proxy` and copy the spheres in.
    ///
    /// An empty set still allocates one zeroed record, because wgpu rejects
    /// zero-sized bindings; [`len`](Self::len) reports zero and the kernel
    /// loops over nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TreeShadowError::Shader`] if the host `Sphere` layout does
    /// not match the kernel's 16-byte record.
    pub fn upload(
        context: &RenderContext,
        proxy: &ProxySet,
    ) -> Result<Self, TreeShadowError> {
        let stride = std::mem::size_of::<Sphere>();
        if stride != SPHERE_STRIDE {
            return Err(TreeShadowError::Shader(format!(
                "sphere record is {stride} bytes, kernel expects {SPHERE_STRIDE}"
            )));
        }

        let placeholder = [Sphere {
            center: [0.0; 3],
            sqr_radius: 0.0,
        }];
        let spheres = if proxy.is_empty() {
            &placeholder[..]
        } else {
            proxy.as_slice()
        };

        let buffer = context.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Tree Shadow Spheres"),
                contents: bytemuck::cast_slice(spheres),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC,
            },
        );

        log::debug!(
            "uploaded {} tree shadow spheres ({} bytes)",
            proxy.len(),
            proxy.len() * SPHERE_STRIDE
        );

        Ok(Self {
            buffer,
            len: proxy.len(),
        })
    }

    /// Number of spheres.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when the uploaded set was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes occupied by sphere records.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        (self.len * SPHERE_STRIDE) as u64
    }

    /// The underlying storage buffer.
    #[must_use]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Copy the spheres back to the host. Blocks until the GPU is done.
    ///
    /// # Errors
    ///
    /// Returns [`TreeShadowError::Readback`] if mapping the staging buffer
    /// fails.
    pub fn read_back(
        &self,
        context: &RenderContext,
    ) -> Result<Vec<Sphere>, TreeShadowError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let size = self.size_bytes();
        let staging = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Tree Shadow Sphere Readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = context.create_encoder();
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, size);
        context.submit(encoder);

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        loop {
            let _ = context.device.poll(wgpu::PollType::Poll);
            match receiver.try_recv() {
                Ok(result) => {
                    result.map_err(|e| TreeShadowError::Readback(e.to_string()))?;
                    break;
                }
                Err(TryRecvError::Empty) => std::thread::yield_now(),
                Err(TryRecvError::Disconnected) => {
                    return Err(TreeShadowError::Readback(
                        "map callback dropped".to_owned(),
                    ));
                }
            }
        }

        let spheres = {
            let data = slice.get_mapped_range();
            bytemuck::pod_collect_to_vec::<u8, Sphere>(&data)
        };
        staging.unmap();

        log::debug!("read back {} tree shadow spheres", spheres.len());
        Ok(spheres)
    }

    /// Drop this handle to the GPU buffer. Bind groups and command buffers
    /// recorded earlier hold their own references, so frames that are still
    /// pending submission stay valid; nothing new can bind it.
    pub fn release(self) {
        let Self { buffer, len } = self;
        log::debug!("releasing {len} tree shadow spheres");
        drop(buffer);
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::proxy::{SphereProxyConfig, TerrainData, TreePlacement};

    #[allow(clippy::print_stderr)]
    fn headless() -> Option<RenderContext> {
        let context = pollster::block_on(RenderContext::headless(
            wgpu::TextureFormat::Rgba8Unorm,
            4,
            4,
        ))
        .ok();
        if context.is_none() {
            eprintln!("skipping GPU test: no adapter available");
        }
        context
    }

    fn forest(count: usize) -> ProxySet {
        let trees = (0..count)
            .map(|i| {
                let t = i as f32 / count.max(1) as f32;
                TreePlacement::new(Vec3::new(t, 0.0, 1.0 - t))
            })
            .collect();
        let terrain = TerrainData::new(Vec3::new(256.0, 40.0, 256.0))
            .with_transform(Mat4::from_translation(Vec3::new(-128.0, 0.0, -128.0)))
            .with_trees(trees);
        ProxySet::build(
            &terrain,
            &SphereProxyConfig {
                center_offset: Vec3::new(0.0, 5.0, 0.0),
                radius: 3.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn upload_then_read_back_round_trips() {
        let Some(context) = headless() else {
            return;
        };
        let proxy = forest(37);
        let buffer = SphereBuffer::upload(&context, &proxy).unwrap();

        assert_eq!(buffer.len(), 37);
        assert_eq!(buffer.size_bytes(), 37 * 16);
        assert_eq!(buffer.read_back(&context).unwrap(), proxy.as_slice());
        buffer.release();
    }

    #[test]
    fn empty_set_uploads() {
        let Some(context) = headless() else {
            return;
        };
        let buffer = SphereBuffer::upload(&context, &forest(0)).unwrap();

        assert!(buffer.is_empty());
        assert_eq!(buffer.buffer().size(), SPHERE_STRIDE as u64);
        assert!(buffer.read_back(&context).unwrap().is_empty());
        buffer.release();
    }
}
