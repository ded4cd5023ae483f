use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::error::FxError;
use crate::types::{ImageDimensions, GPU_BYTES_PER_PIXEL};

use super::context::capture_errors;

/// Format shared by the source, target, and staging resources.
pub(crate) const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Row pitch `wgpu` requires for a texture-to-buffer copy of `width` texels.
///
/// Rows are padded up to [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`], so the pitch
/// is usually larger than the logical row.
pub fn padded_row_pitch(width: u32) -> u32 {
    let unpadded = width * GPU_BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Shared count of per-call GPU resources that have not been released yet.
#[derive(Clone, Default)]
pub(crate) struct ResourceCounter(Arc<AtomicUsize>);

impl ResourceCounter {
    pub(crate) fn live(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

pub(crate) trait GpuResource {
    fn release(&self);
}

impl GpuResource for wgpu::Texture {
    fn release(&self) {
        self.destroy();
    }
}

impl GpuResource for wgpu::Buffer {
    fn release(&self) {
        self.destroy();
    }
}

/// Owns one GPU object for the span of a single apply call and frees its
/// memory when dropped, on success and error paths alike.
pub(crate) struct Tracked<T: GpuResource> {
    inner: T,
    counter: ResourceCounter,
}

impl<T: GpuResource> Tracked<T> {
    fn new(inner: T, counter: &ResourceCounter) -> Self {
        counter.0.fetch_add(1, Ordering::AcqRel);
        Self {
            inner,
            counter: counter.clone(),
        }
    }
}

impl<T: GpuResource> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T: GpuResource> Drop for Tracked<T> {
    fn drop(&mut self) {
        self.inner.release();
        self.counter.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// The three resources one apply call renders through.
pub(crate) struct GpuTextureSet {
    /// Sampled by the pixel stage; holds the uploaded input.
    pub source: Tracked<wgpu::Texture>,
    /// Sole colour attachment of the pass.
    pub target: Tracked<wgpu::Texture>,
    /// CPU-mappable copy of `target`, rows padded to `row_pitch`.
    pub staging: Tracked<wgpu::Buffer>,
    pub row_pitch: u32,
    pub extent: wgpu::Extent3d,
}

impl GpuTextureSet {
    /// Allocates all three resources, uploading `pixels` into the source.
    ///
    /// `pixels` holds exactly the tightly packed RGBA8 bytes of `dimensions`.
    pub(crate) fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &[u8],
        dimensions: ImageDimensions,
        max_dimension: u32,
        counter: &ResourceCounter,
    ) -> Result<Self, FxError> {
        if dimensions.is_empty() {
            return Err(FxError::resource(
                "source texture",
                format!(
                    "zero-sized extent {}x{}",
                    dimensions.width, dimensions.height
                ),
            ));
        }
        if dimensions.width > max_dimension || dimensions.height > max_dimension {
            return Err(FxError::resource(
                "source texture",
                format!(
                    "{}x{} exceeds the GPU limit of {max_dimension} texels per side",
                    dimensions.width, dimensions.height
                ),
            ));
        }

        let extent = wgpu::Extent3d {
            width: dimensions.width,
            height: dimensions.height,
            depth_or_array_layers: 1,
        };
        let (source, error) = capture_errors(device, || {
            device.create_texture_with_data(
                queue,
                &texture_descriptor(
                    "effect source texture",
                    extent,
                    wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                ),
                TextureDataOrder::LayerMajor,
                pixels,
            )
        });
        let source = Tracked::new(source, counter);
        if let Some(error) = error {
            return Err(FxError::resource("source texture", error));
        }

        let (target, error) = capture_errors(device, || {
            device.create_texture(&texture_descriptor(
                "effect target texture",
                extent,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            ))
        });
        let target = Tracked::new(target, counter);
        if let Some(error) = error {
            return Err(FxError::resource("render target texture", error));
        }

        let row_pitch = padded_row_pitch(dimensions.width);
        let (staging, error) = capture_errors(device, || {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("effect staging buffer"),
                size: row_pitch as u64 * dimensions.height as u64,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            })
        });
        let staging = Tracked::new(staging, counter);
        if let Some(error) = error {
            return Err(FxError::resource("staging buffer", error));
        }

        Ok(Self {
            source,
            target,
            staging,
            row_pitch,
            extent,
        })
    }
}

fn texture_descriptor(
    label: &'static str,
    size: wgpu::Extent3d,
    usage: wgpu::TextureUsages,
) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage,
        view_formats: &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_pitch_rounds_up_to_copy_alignment() {
        assert_eq!(padded_row_pitch(1), 256);
        assert_eq!(padded_row_pitch(64), 256);
        assert_eq!(padded_row_pitch(65), 512);
        assert_eq!(padded_row_pitch(1920), 7680);
    }

    struct Probe;

    impl GpuResource for Probe {
        fn release(&self) {}
    }

    #[test]
    fn tracked_resources_update_live_count() {
        let counter = ResourceCounter::default();
        let first = Tracked::new(Probe, &counter);
        {
            let _second = Tracked::new(Probe, &counter);
            assert_eq!(counter.live(), 2);
        }
        assert_eq!(counter.live(), 1);
        drop(first);
        assert_eq!(counter.live(), 0);
    }
}
