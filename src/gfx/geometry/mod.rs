//! # Procedural Geometry
//!
//! The scene only needs flat shapes: the card carrying the code image, the
//! shadow-catching ground and the debug grid. All are generated here in a
//! Y-up coordinate system.

pub mod primitives;

pub use primitives::*;

use crate::gfx::scene::vertex::Vertex3D;

/// Triangle geometry ready for GPU upload
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    pub vertices: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Interleaves the attribute streams into GPU vertices.
    pub fn to_vertices(&self) -> Vec<Vertex3D> {
        self.vertices
            .iter()
            .zip(&self.normals)
            .zip(&self.tex_coords)
            .map(|((position, normal), uv)| Vertex3D {
                position: *position,
                normal: *normal,
                uv: *uv,
            })
            .collect()
    }
}

/// Line-list geometry (pairs of indices)
#[derive(Debug, Clone, Default)]
pub struct LineGeometry {
    pub vertices: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl LineGeometry {
    pub fn line_count(&self) -> usize {
        self.indices.len() / 2
    }

    pub fn to_vertices(&self) -> Vec<Vertex3D> {
        self.vertices
            .iter()
            .map(|position| Vertex3D {
                position: *position,
                normal: [0.0, 1.0, 0.0],
                uv: [0.0, 0.0],
            })
            .collect()
    }
}
