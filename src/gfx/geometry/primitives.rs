//! Flat primitives used by the scene

use super::{GeometryData, LineGeometry};

/// Square card in the XY plane facing +Z, centred on the origin.
///
/// Texture row 0 maps to the top edge so images appear upright.
pub fn generate_card(size: f32) -> GeometryData {
    let h = size * 0.5;
    GeometryData {
        vertices: vec![[-h, -h, 0.0], [h, -h, 0.0], [h, h, 0.0], [-h, h, 0.0]],
        tex_coords: vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

/// Horizontal square at height `y` facing +Y.
pub fn generate_ground(size: f32, y: f32) -> GeometryData {
    let h = size * 0.5;
    GeometryData {
        vertices: vec![[-h, y, h], [h, y, h], [h, y, -h], [-h, y, -h]],
        tex_coords: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        normals: vec![[0.0, 1.0, 0.0]; 4],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

/// Square grid of `divisions` cells per side at height `y`.
pub fn generate_grid_lines(size: f32, divisions: u32, y: f32) -> LineGeometry {
    let divisions = divisions.max(1);
    let h = size * 0.5;
    let step = size / divisions as f32;
    let mut grid = LineGeometry::default();

    for i in 0..=divisions {
        let offset = -h + i as f32 * step;
        let base = grid.vertices.len() as u32;
        // Line parallel to X, then line parallel to Z
        grid.vertices.push([-h, y, offset]);
        grid.vertices.push([h, y, offset]);
        grid.vertices.push([offset, y, -h]);
        grid.vertices.push([offset, y, h]);
        grid.indices.extend_from_slice(&[base, base + 1, base + 2, base + 3]);
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_generation() {
        let card = generate_card(2.0);
        assert_eq!(card.vertex_count(), 4);
        assert_eq!(card.triangle_count(), 2);
        assert_eq!(card.vertices[2], [1.0, 1.0, 0.0]);
        // Top-right corner samples the first texture row
        assert_eq!(card.tex_coords[2], [1.0, 0.0]);
    }

    #[test]
    fn test_ground_generation() {
        let ground = generate_ground(20.0, -2.0);
        assert!(ground.vertices.iter().all(|v| v[1] == -2.0));
        assert_eq!(ground.to_vertices().len(), 4);
    }

    #[test]
    fn test_grid_generation() {
        let grid = generate_grid_lines(20.0, 20, -2.0);
        assert_eq!(grid.line_count(), 42); // 21 lines each way
        assert_eq!(grid.vertices.len(), 84);
    }
}
