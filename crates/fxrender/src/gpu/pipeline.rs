use std::fmt;

use crate::compile::ENTRY_POINT;
use crate::error::{CompileStep, FxError};
use crate::types::ShaderIdentity;

use super::context::capture_errors;
use super::quad::QuadGeometry;
use super::textures::TEXTURE_FORMAT;

/// Layout objects shared by every program the manager links.
pub(crate) struct PipelineLayouts {
    pub texture_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub sampler: wgpu::Sampler,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Result<Self, FxError> {
        let (layouts, error) = capture_errors(device, || {
            let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("source texture layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("effect pipeline layout"),
                bind_group_layouts: &[&texture_layout],
                push_constant_ranges: &[],
            });
            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("source sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            });
            Self {
                texture_layout,
                pipeline_layout,
                sampler,
            }
        });
        if let Some(error) = error {
            return Err(FxError::resource("pipeline layouts", error));
        }
        Ok(layouts)
    }

    /// Binds `source` and the shared sampler for one pass.
    pub fn bind_source(
        &self,
        device: &wgpu::Device,
        source: &wgpu::TextureView,
    ) -> Result<wgpu::BindGroup, FxError> {
        let (bind_group, error) = capture_errors(device, || {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("source bind group"),
                layout: &self.texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            })
        });
        match error {
            Some(error) => Err(FxError::resource("bind group", error)),
            None => Ok(bind_group),
        }
    }
}

/// A linked vertex + pixel program ready to be drawn with the quad.
///
/// Built by [`PipelineManager::compile_program`](crate::PipelineManager::compile_program);
/// only usable with the device generation that created it.
pub struct ShaderProgram {
    identity: ShaderIdentity,
    generation: u64,
    pipeline: wgpu::RenderPipeline,
    _vertex: wgpu::ShaderModule,
    _pixel: wgpu::ShaderModule,
}

impl ShaderProgram {
    pub fn identity(&self) -> &ShaderIdentity {
        &self.identity
    }

    /// Device generation this program was linked against.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    /// Links both stages with the quad's vertex input layout.
    pub(crate) fn link(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        identity: ShaderIdentity,
        vertex: wgpu::ShaderModule,
        pixel: wgpu::ShaderModule,
        generation: u64,
    ) -> Result<Self, FxError> {
        let label = format!("effect pipeline: {identity}");
        let (pipeline, error) = capture_errors(device, || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(&layouts.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some(ENTRY_POINT),
                    buffers: &[QuadGeometry::vertex_layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &pixel,
                    entry_point: Some(ENTRY_POINT),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TEXTURE_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            })
        });
        if let Some(error) = error {
            return Err(FxError::Compile {
                step: CompileStep::Link,
                origin: identity.to_string(),
                diagnostic: error.to_string(),
            });
        }

        Ok(Self {
            identity,
            generation,
            pipeline,
            _vertex: vertex,
            _pixel: pixel,
        })
    }
}

impl fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("identity", &self.identity)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
