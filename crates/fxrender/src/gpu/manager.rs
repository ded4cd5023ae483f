use std::iter;
use std::time::Instant;

use crate::backend::EffectBackend;
use crate::compile::compile_stage;
use crate::error::FxError;
use crate::source::ShaderStore;
use crate::types::{
    AdapterProfile, ImageDimensions, ManagerConfig, ProgramStage, ShaderIdentity,
    GPU_BYTES_PER_PIXEL,
};

use super::context::{capture_errors, GpuContext};
use super::pipeline::{PipelineLayouts, ShaderProgram};
use super::quad::QuadGeometry;
use super::readback::read_staging;
use super::textures::{GpuTextureSet, ResourceCounter};

/// Coarse lifecycle of a [`PipelineManager`] as seen between calls.
///
/// Device bring-up happens inside a single `&mut self` call, so callers only
/// ever observe the two settled states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerStatus {
    Uninitialized,
    Ready,
}

enum ManagerState {
    Uninitialized,
    Initializing,
    Ready(Box<ReadyDevice>),
}

/// Everything that lives for as long as the device does.
struct ReadyDevice {
    gpu: GpuContext,
    quad: QuadGeometry,
    layouts: PipelineLayouts,
}

impl ReadyDevice {
    fn create(config: &ManagerConfig) -> Result<Self, FxError> {
        let gpu = GpuContext::new(config.power, config.allow_software)?;
        let quad = QuadGeometry::new(&gpu.device)?;
        let layouts = PipelineLayouts::new(&gpu.device)?;
        Ok(Self { gpu, quad, layouts })
    }
}

/// Owns the GPU device and runs single-pass shader programs over pixel buffers.
///
/// The manager starts `Uninitialized` and brings the device up lazily on the
/// first [`compile_program`](Self::compile_program) or [`apply`](Self::apply).
/// Programs remember the device generation that linked them; once the device
/// is torn down with [`shutdown`](Self::shutdown) they stop being valid.
pub struct PipelineManager {
    config: ManagerConfig,
    store: ShaderStore,
    state: ManagerState,
    generation: u64,
    counter: ResourceCounter,
}

impl PipelineManager {
    pub fn new(config: ManagerConfig) -> Self {
        let store = ShaderStore::new(config.shader_root.clone());
        Self {
            config,
            store,
            state: ManagerState::Uninitialized,
            generation: 0,
            counter: ResourceCounter::default(),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn store(&self) -> &ShaderStore {
        &self.store
    }

    pub fn status(&self) -> ManagerStatus {
        match self.state {
            ManagerState::Uninitialized | ManagerState::Initializing => {
                ManagerStatus::Uninitialized
            }
            ManagerState::Ready(_) => ManagerStatus::Ready,
        }
    }

    /// Adapter chosen by the last successful initialization.
    pub fn adapter_profile(&self) -> Option<&AdapterProfile> {
        match &self.state {
            ManagerState::Ready(ready) => Some(&ready.gpu.adapter_profile),
            _ => None,
        }
    }

    /// Increments every time the device is created or torn down.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Per-call GPU resources currently alive. Zero whenever no apply is running.
    pub fn live_resources(&self) -> usize {
        self.counter.live()
    }

    /// Acquires adapter, device, queue, quad geometry, and shared layouts.
    ///
    /// A no-op when already ready. On failure every partially acquired object
    /// is dropped and the manager goes back to `Uninitialized`.
    pub fn initialize(&mut self) -> Result<(), FxError> {
        if matches!(self.state, ManagerState::Ready(_)) {
            return Ok(());
        }

        self.state = ManagerState::Initializing;
        match ReadyDevice::create(&self.config) {
            Ok(ready) => {
                self.generation += 1;
                tracing::info!(
                    adapter = %ready.gpu.adapter_profile.name,
                    backend = ?ready.gpu.adapter_profile.backend,
                    generation = self.generation,
                    "GPU pipeline ready"
                );
                self.state = ManagerState::Ready(Box::new(ready));
                Ok(())
            }
            Err(err) => {
                self.state = ManagerState::Uninitialized;
                tracing::warn!(error = %err, "GPU initialization failed");
                Err(err)
            }
        }
    }

    /// Releases the device and everything created from it.
    pub fn shutdown(&mut self) {
        if matches!(self.state, ManagerState::Ready(_)) {
            self.state = ManagerState::Uninitialized;
            self.generation += 1;
            tracing::debug!(generation = self.generation, "GPU pipeline shut down");
        }
    }

    /// Compiles both stages of `identity` and links them into a program.
    ///
    /// Either stage failing, or the link failing, yields
    /// [`FxError::Compile`]; no partially built program is returned.
    pub fn compile_program(&mut self, identity: &ShaderIdentity) -> Result<ShaderProgram, FxError> {
        self.initialize()?;
        let ready = self.ready_device()?;
        let device = &ready.gpu.device;
        let started = Instant::now();

        let vertex_code = self.store.load(ProgramStage::Vertex, &identity.vertex)?;
        let vertex = compile_stage(device, ProgramStage::Vertex, &vertex_code)?;
        let pixel_code = self.store.load(ProgramStage::Pixel, &identity.pixel)?;
        let pixel = compile_stage(device, ProgramStage::Pixel, &pixel_code)?;

        let program = ShaderProgram::link(
            device,
            &ready.layouts,
            identity.clone(),
            vertex,
            pixel,
            self.generation,
        )?;
        tracing::debug!(
            %identity,
            elapsed = ?started.elapsed(),
            "linked shader program"
        );
        Ok(program)
    }

    pub fn is_program_valid(&self, program: &ShaderProgram) -> bool {
        matches!(self.state, ManagerState::Ready(_)) && program.generation() == self.generation
    }

    /// Runs `program` over `pixels` and writes the result back into it.
    ///
    /// `pixels` holds tightly packed RGBA8 rows as described by `dimensions`.
    /// The per-call textures and staging buffer are released before this
    /// returns, whatever the outcome.
    pub fn apply(
        &mut self,
        pixels: &mut [u8],
        dimensions: ImageDimensions,
        program: &ShaderProgram,
    ) -> Result<(), FxError> {
        let byte_len = validate_buffer(pixels, dimensions)?;
        self.initialize()?;
        if !self.is_program_valid(program) {
            return Err(FxError::InvalidProgram(format!(
                "`{}` was linked by device generation {}, current is {}",
                program.identity(),
                program.generation(),
                self.generation
            )));
        }

        let started = Instant::now();
        let ready = self.ready_device()?;
        let device = &ready.gpu.device;
        let textures = GpuTextureSet::create(
            device,
            &ready.gpu.queue,
            &pixels[..byte_len],
            dimensions,
            ready.gpu.adapter_profile.max_texture_dimension,
            &self.counter,
        )?;

        let ((source_view, target_view), error) = capture_errors(device, || {
            let view = wgpu::TextureViewDescriptor::default();
            (
                textures.source.create_view(&view),
                textures.target.create_view(&view),
            )
        });
        if let Some(error) = error {
            return Err(FxError::resource("texture views", error));
        }
        let bind_group = ready.layouts.bind_source(device, &source_view)?;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("effect encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("effect pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_viewport(
                0.0,
                0.0,
                dimensions.width as f32,
                dimensions.height as f32,
                0.0,
                1.0,
            );
            render_pass.set_pipeline(program.pipeline());
            render_pass.set_bind_group(0, &bind_group, &[]);
            render_pass.set_vertex_buffer(0, ready.quad.slice());
            render_pass.draw(0..QuadGeometry::vertex_count(), 0..1);
        }
        encoder.copy_texture_to_buffer(
            textures.target.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &textures.staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(textures.row_pitch),
                    rows_per_image: Some(dimensions.height),
                },
            },
            textures.extent,
        );

        let (_, error) = capture_errors(device, || {
            ready.gpu.queue.submit(iter::once(encoder.finish()))
        });
        if let Some(error) = error {
            return Err(FxError::resource("render pass", error));
        }

        let row_bytes = dimensions.row_bytes().ok_or_else(|| oversize(dimensions))?;
        read_staging(
            device,
            &textures.staging,
            textures.row_pitch,
            pixels,
            row_bytes,
            dimensions.height as usize,
        )?;

        tracing::debug!(
            %dimensions,
            program = %program.identity(),
            row_pitch = textures.row_pitch,
            elapsed = ?started.elapsed(),
            "applied shader program"
        );
        Ok(())
    }

    fn ready_device(&self) -> Result<&ReadyDevice, FxError> {
        match &self.state {
            ManagerState::Ready(ready) => Ok(ready),
            _ => Err(FxError::DeviceCreation(
                "GPU device is not initialized".into(),
            )),
        }
    }
}

impl EffectBackend for PipelineManager {
    type Program = ShaderProgram;

    fn compile_program(&mut self, identity: &ShaderIdentity) -> Result<ShaderProgram, FxError> {
        PipelineManager::compile_program(self, identity)
    }

    fn is_program_valid(&self, program: &ShaderProgram) -> bool {
        PipelineManager::is_program_valid(self, program)
    }

    fn apply(
        &mut self,
        pixels: &mut [u8],
        dimensions: ImageDimensions,
        program: &ShaderProgram,
    ) -> Result<(), FxError> {
        PipelineManager::apply(self, pixels, dimensions, program)
    }
}

/// Rejects buffers whose layout the GPU pass cannot consume.
///
/// Returns the number of bytes the pass reads from `pixels`.
pub(crate) fn validate_buffer(
    pixels: &[u8],
    dimensions: ImageDimensions,
) -> Result<usize, FxError> {
    if dimensions.channels != GPU_BYTES_PER_PIXEL {
        return Err(FxError::BufferLayout {
            dimensions,
            message: format!(
                "expected {GPU_BYTES_PER_PIXEL} channels per pixel, got {}",
                dimensions.channels
            ),
        });
    }
    let byte_len = dimensions.byte_len().ok_or_else(|| oversize(dimensions))?;
    if pixels.len() < byte_len {
        return Err(FxError::BufferLayout {
            dimensions,
            message: format!("buffer holds {} bytes, {byte_len} required", pixels.len()),
        });
    }
    Ok(byte_len)
}

fn oversize(dimensions: ImageDimensions) -> FxError {
    FxError::resource(
        "source texture",
        format!(
            "{}x{} exceeds the GPU limit of addressable bytes",
            dimensions.width, dimensions.height
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_manager_starts_uninitialized() {
        let manager = PipelineManager::new(ManagerConfig::default());
        assert_eq!(manager.status(), ManagerStatus::Uninitialized);
        assert_eq!(manager.generation(), 0);
        assert_eq!(manager.live_resources(), 0);
        assert!(manager.adapter_profile().is_none());
        assert_eq!(manager.store().root(), std::path::Path::new("shaders"));
    }

    #[test]
    fn device_bring_up_reports_as_uninitialized() {
        let mut manager = PipelineManager::new(ManagerConfig::default());
        manager.state = ManagerState::Initializing;
        assert_eq!(manager.status(), ManagerStatus::Uninitialized);
        assert!(manager.adapter_profile().is_none());
    }

    #[test]
    fn shutdown_without_device_is_a_no_op() {
        let mut manager = PipelineManager::new(ManagerConfig::default());
        manager.shutdown();
        assert_eq!(manager.status(), ManagerStatus::Uninitialized);
        assert_eq!(manager.generation(), 0);
    }

    #[test]
    fn buffer_with_wrong_channel_count_is_rejected() {
        let pixels = vec![0u8; 12];
        let err = validate_buffer(&pixels, ImageDimensions::new(2, 2, 3)).unwrap_err();
        assert!(matches!(err, FxError::BufferLayout { .. }), "{err}");
        assert!(err.to_string().contains("got 3"));
    }

    #[test]
    fn short_buffer_is_rejected() {
        let pixels = vec![0u8; 15];
        let err = validate_buffer(&pixels, ImageDimensions::rgba(2, 2)).unwrap_err();
        assert!(err.to_string().contains("15 bytes, 16 required"), "{err}");
    }

    #[test]
    fn zero_sized_buffer_passes_layout_check() {
        assert_eq!(validate_buffer(&[], ImageDimensions::rgba(0, 0)).unwrap(), 0);
        assert_eq!(validate_buffer(&[0; 32], ImageDimensions::rgba(2, 2)).unwrap(), 16);
    }

    #[test]
    fn unaddressable_dimensions_are_a_resource_error() {
        let err = validate_buffer(&[], ImageDimensions::rgba(u32::MAX, u32::MAX)).unwrap_err();
        assert!(matches!(err, FxError::ResourceCreation { .. }), "{err}");
        assert!(err.to_string().contains("exceeds the GPU limit"), "{err}");
    }
}
