//! # Primitive Shape Generation
//!
//! Grid-based generators. Every generator lays out a `(W + 1) x (H + 1)`
//! vertex grid addressed as `i * (W + 1) + j`, row `i` along Y and column
//! `j` along X. The rectangle variants share the exact same vertices and
//! differ only in how they index them:
//!
//! - **surface**: two triangles per cell, `6 * W * H` indices
//! - **edges**: the three edges of both triangles of a cell as line pairs,
//!   `12 * W * H` indices. Edges shared by neighbouring cells are emitted
//!   once per cell that owns them.
//! - **points**: one index per vertex

use std::f32::consts::PI;

use super::{GeometryData, Vertex};

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Corner indices `(a, b, c, d)` of every grid cell, row by row.
///
/// `a` is the cell's lower-left vertex, `b` its right neighbour, `c` the
/// vertex above `a` and `d` the vertex above `b`.
fn grid_cells(w_segs: u32, h_segs: u32) -> impl Iterator<Item = (u32, u32, u32, u32)> {
    (0..h_segs).flat_map(move |i| {
        (0..w_segs).map(move |j| {
            let a = i * (w_segs + 1) + j;
            let b = a + 1;
            let c = a + (w_segs + 1);
            let d = c + 1;
            (a, b, c, d)
        })
    })
}

/// A flat grid in the XY plane centred on the origin, normals along +Z.
fn grid_vertices(width: f32, height: f32, w_segs: u32, h_segs: u32) -> Vec<Vertex> {
    let half_width = width * 0.5;
    let half_height = height * 0.5;
    let segment_width = width / w_segs as f32;
    let segment_height = height / h_segs as f32;

    let mut vertices = Vec::with_capacity(((w_segs + 1) * (h_segs + 1)) as usize);
    for i in 0..=h_segs {
        let y = i as f32 * segment_height - half_height;
        let v = 1.0 - i as f32 / h_segs as f32;
        for j in 0..=w_segs {
            let x = j as f32 * segment_width - half_width;
            let u = j as f32 / w_segs as f32;
            vertices.push(Vertex::new([x, y, 0.0], [0.0, 0.0, 1.0], WHITE, [u, v]));
        }
    }
    vertices
}

/// Filled rectangle for [`PrimitiveTopology::Triangles`](crate::gfx::device::PrimitiveTopology).
///
/// Segment counts below one are raised to one.
pub fn generate_rectangle_surface(
    width: f32,
    height: f32,
    width_segments: u32,
    height_segments: u32,
) -> GeometryData {
    let w_segs = width_segments.max(1);
    let h_segs = height_segments.max(1);

    let mut data = GeometryData::new();
    data.vertices = grid_vertices(width, height, w_segs, h_segs);
    for (a, b, c, d) in grid_cells(w_segs, h_segs) {
        data.indices.extend_from_slice(&[a, b, c, b, d, c]);
    }
    data
}

/// Wireframe rectangle for [`PrimitiveTopology::Lines`](crate::gfx::device::PrimitiveTopology).
pub fn generate_rectangle_edges(
    width: f32,
    height: f32,
    width_segments: u32,
    height_segments: u32,
) -> GeometryData {
    let w_segs = width_segments.max(1);
    let h_segs = height_segments.max(1);

    let mut data = GeometryData::new();
    data.vertices = grid_vertices(width, height, w_segs, h_segs);
    for (a, b, c, d) in grid_cells(w_segs, h_segs) {
        // First triangle: a-b, b-c, c-a
        data.indices.extend_from_slice(&[a, b, b, c, c, a]);
        // Second triangle: b-d, d-c, c-b
        data.indices.extend_from_slice(&[b, d, d, c, c, b]);
    }
    data
}

/// Point cloud of the rectangle grid for [`PrimitiveTopology::Points`](crate::gfx::device::PrimitiveTopology).
pub fn generate_rectangle_points(
    width: f32,
    height: f32,
    width_segments: u32,
    height_segments: u32,
) -> GeometryData {
    let w_segs = width_segments.max(1);
    let h_segs = height_segments.max(1);

    let mut data = GeometryData::new();
    data.vertices = grid_vertices(width, height, w_segs, h_segs);
    data.indices = (0..data.vertices.len() as u32).collect();
    data
}

/// UV sphere over the same grid addressing.
///
/// Columns wrap around the Y axis, rows run from the north pole (`+Y`) to
/// the south pole. The degenerate triangle of each pole cell is skipped, so
/// the index count is `6 * W * (H - 1)`.
pub fn generate_sphere(radius: f32, width_segments: u32, height_segments: u32) -> GeometryData {
    let w_segs = width_segments.max(3);
    let h_segs = height_segments.max(2);

    let mut data = GeometryData::new();
    for ring in 0..=h_segs {
        let v = ring as f32 / h_segs as f32;
        let (sin_phi, cos_phi) = (v * PI).sin_cos();

        for segment in 0..=w_segs {
            let u = segment as f32 / w_segs as f32;
            let (sin_theta, cos_theta) = (u * 2.0 * PI).sin_cos();

            let x = sin_phi * cos_theta;
            let y = cos_phi;
            let z = sin_phi * sin_theta;
            data.vertices.push(Vertex::new(
                [x * radius, y * radius, z * radius],
                [x, y, z],
                WHITE,
                [1.0 - u, v],
            ));
        }
    }

    for (a, b, c, d) in grid_cells(w_segs, h_segs) {
        let ring = a / (w_segs + 1);
        if ring != 0 {
            data.indices.extend_from_slice(&[a, b, c]);
        }
        if ring != h_segs - 1 {
            data.indices.extend_from_slice(&[b, d, c]);
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_counts() {
        let surface = generate_rectangle_surface(1.0, 1.0, 5, 5);
        let edges = generate_rectangle_edges(1.0, 1.0, 5, 5);
        let points = generate_rectangle_points(1.0, 1.0, 5, 5);

        assert_eq!(surface.vertex_count(), 36); // (5 + 1) x (5 + 1)
        assert_eq!(surface.index_count(), 150); // 6 * 5 * 5
        assert_eq!(edges.index_count(), 300); // 12 * 5 * 5
        assert_eq!(points.index_count(), 36);
        assert_eq!(points.index_count(), points.vertex_count());
    }

    #[test]
    fn test_patterns_share_vertices() {
        let surface = generate_rectangle_surface(2.0, 1.0, 4, 3);
        let edges = generate_rectangle_edges(2.0, 1.0, 4, 3);
        let points = generate_rectangle_points(2.0, 1.0, 4, 3);

        assert_eq!(surface.vertices, edges.vertices);
        assert_eq!(surface.vertices, points.vertices);
    }

    #[test]
    fn test_grid_vertex_layout() {
        let data = generate_rectangle_surface(2.0, 4.0, 2, 2);

        let first = data.vertices[0];
        assert_eq!(first.position, [-1.0, -2.0, 0.0]);
        assert_eq!(first.uv, [0.0, 1.0]);

        // i = 1, j = 2 -> index 1 * 3 + 2
        let v = data.vertices[5];
        assert_eq!(v.position, [1.0, 0.0, 0.0]);
        assert_eq!(v.uv, [1.0, 0.5]);

        assert!(data
            .vertices
            .iter()
            .all(|v| v.normal == [0.0, 0.0, 1.0] && v.color == WHITE));
    }

    #[test]
    fn test_surface_cell_winding() {
        let data = generate_rectangle_surface(1.0, 1.0, 1, 1);
        assert_eq!(data.indices, vec![0, 1, 2, 1, 3, 2]);
    }

    #[test]
    fn test_edges_keep_shared_edges_per_cell() {
        let data = generate_rectangle_edges(1.0, 1.0, 2, 1);
        let segments: Vec<(u32, u32)> = data
            .indices
            .chunks(2)
            .map(|pair| (pair[0].min(pair[1]), pair[0].max(pair[1])))
            .collect();

        // The interior edge 1-4 is owned by both cells.
        assert_eq!(segments.iter().filter(|s| **s == (1, 4)).count(), 2);
        // The diagonal b-c of a cell is drawn by both of its triangles.
        assert_eq!(segments.iter().filter(|s| **s == (1, 3)).count(), 2);
    }

    #[test]
    fn test_indices_address_valid_vertices() {
        for data in [
            generate_rectangle_surface(1.0, 1.0, 7, 3),
            generate_rectangle_edges(1.0, 1.0, 7, 3),
            generate_rectangle_points(1.0, 1.0, 7, 3),
            generate_sphere(0.5, 20, 20),
        ] {
            let count = data.vertex_count() as u32;
            assert!(data.indices.iter().all(|i| *i < count));
        }
    }

    #[test]
    fn test_sphere_generation() {
        let sphere = generate_sphere(0.5, 20, 20);
        assert_eq!(sphere.vertex_count(), 21 * 21);
        assert_eq!(sphere.index_count(), 6 * 20 * 19);

        for v in &sphere.vertices {
            let r = (v.position[0].powi(2) + v.position[1].powi(2) + v.position[2].powi(2)).sqrt();
            assert!((r - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_zero_segments_are_clamped() {
        let data = generate_rectangle_surface(1.0, 1.0, 0, 0);
        assert_eq!(data.vertex_count(), 4);
        assert_eq!(data.index_count(), 6);
    }
}
