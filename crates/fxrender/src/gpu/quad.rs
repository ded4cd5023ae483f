use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::FxError;

use super::context::capture_errors;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct QuadVertex {
    pub position: [f32; 4],
    pub tex_coord: [f32; 2],
}

/// Full-frame rectangle in triangle-strip order: top-left, top-right,
/// bottom-left, bottom-right. Texture row 0 maps to the top edge.
pub(crate) const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex {
        position: [-1.0, 1.0, 0.0, 1.0],
        tex_coord: [0.0, 0.0],
    },
    QuadVertex {
        position: [1.0, 1.0, 0.0, 1.0],
        tex_coord: [1.0, 0.0],
    },
    QuadVertex {
        position: [-1.0, -1.0, 0.0, 1.0],
        tex_coord: [0.0, 1.0],
    },
    QuadVertex {
        position: [1.0, -1.0, 0.0, 1.0],
        tex_coord: [1.0, 1.0],
    },
];

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x2];

/// The one vertex buffer shared by every pass for the manager's lifetime.
pub(crate) struct QuadGeometry {
    buffer: wgpu::Buffer,
}

impl QuadGeometry {
    pub(crate) fn new(device: &wgpu::Device) -> Result<Self, FxError> {
        let (buffer, error) = capture_errors(device, || {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("full-screen quad"),
                contents: bytemuck::cast_slice(&QUAD_VERTICES),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
        if let Some(error) = error {
            return Err(FxError::resource("quad vertex buffer", error));
        }
        Ok(Self { buffer })
    }

    /// Input layout every vertex stage is linked against.
    pub(crate) fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &QUAD_ATTRIBUTES,
        }
    }

    pub(crate) fn vertex_count() -> u32 {
        QUAD_VERTICES.len() as u32
    }

    pub(crate) fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_vertex_struct() {
        let layout = QuadGeometry::vertex_layout();
        assert_eq!(layout.array_stride, 24);
        assert_eq!(layout.attributes.len(), 2);
        assert_eq!(layout.attributes[0].format, wgpu::VertexFormat::Float32x4);
        assert_eq!(layout.attributes[1].offset, 16);
        assert_eq!(layout.attributes[1].shader_location, 1);
        assert_eq!(QuadGeometry::vertex_count(), 4);
    }

    #[test]
    fn quad_covers_full_frame_with_matching_uvs() {
        for vertex in QUAD_VERTICES {
            let [x, y, _, w] = vertex.position;
            assert_eq!(x.abs(), 1.0);
            assert_eq!(y.abs(), 1.0);
            assert_eq!(w, 1.0);
            assert_eq!(vertex.tex_coord[0], (x + 1.0) * 0.5);
            assert_eq!(vertex.tex_coord[1], (1.0 - y) * 0.5);
        }
    }
}
