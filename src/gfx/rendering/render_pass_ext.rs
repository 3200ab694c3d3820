//! Render pass helpers for the engine's indexed meshes

use wgpu::*;

/// GPU buffers of one procedurally generated mesh
pub struct MeshBuffers {
    pub vertex_buffer: Buffer,
    pub index_buffer: Buffer,
    pub index_count: u32,
}

impl MeshBuffers {
    pub fn new<V: bytemuck::Pod>(
        device: &Device,
        label: &str,
        vertices: &[V],
        indices: &[u32],
    ) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = device.create_buffer_init(&util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }

    pub fn byte_size(&self) -> u64 {
        self.vertex_buffer.size() + self.index_buffer.size()
    }
}

/// Draw calls and triangles actually submitted while encoding a frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrawTally {
    pub draw_calls: u32,
    pub triangles: u32,
}

impl DrawTally {
    /// Counts an indexed triangle-list draw.
    pub fn triangles(&mut self, index_count: u32) {
        self.draw_calls += 1;
        self.triangles += index_count / 3;
    }

    /// Counts a line-list draw, which adds no triangles.
    pub fn lines(&mut self) {
        self.draw_calls += 1;
    }
}

/// Extension trait for RenderPass to draw a [`MeshBuffers`]
pub trait DrawMesh {
    fn draw_mesh(&mut self, mesh: &MeshBuffers);
}

impl DrawMesh for RenderPass<'_> {
    fn draw_mesh(&mut self, mesh: &MeshBuffers) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
        self.draw_indexed(0..mesh.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_triangles_per_draw() {
        let mut tally = DrawTally::default();
        tally.triangles(6);
        tally.lines();
        tally.triangles(6);
        assert_eq!(
            tally,
            DrawTally {
                draw_calls: 3,
                triangles: 4,
            }
        );
    }
}
