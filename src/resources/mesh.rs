//! Procedural geometry: the room box.

use crate::data_structures::mesh::{MeshData, ModelVertex};

/// An axis-aligned box with per-face UVs in [0, 1], wound counter-clockwise
/// as seen from outside. The room pipeline culls front faces, so the box is
/// rendered from the inside without flipping any geometry here.
pub fn box_mesh(name: &str, width: f32, height: f32, depth: f32) -> MeshData {
    let (hw, hh, hd) = (width / 2.0, height / 2.0, depth / 2.0);

    // Four corners per face so each face gets its own normals and UVs.
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        // (normal, tangent u-direction, tangent v-direction) per face
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),   // +z
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), // -z
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),  // +x
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),  // -x
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),  // +y
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),  // -y
    ];

    let half = [hw, hh, hd];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, u_dir, v_dir) in faces {
        let base = vertices.len() as u32;
        for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            let mut position = [0.0f32; 3];
            for axis in 0..3 {
                position[axis] = (normal[axis]
                    + u_dir[axis] * (u * 2.0 - 1.0)
                    + v_dir[axis] * (v * 2.0 - 1.0))
                    * half[axis];
            }
            vertices.push(ModelVertex {
                position,
                tex_coords: [u, 1.0 - v],
                normal,
            });
        }
        // CCW from outside: 0-1-2, 0-2-3
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData {
        name: name.to_string(),
        vertices,
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_has_expected_counts_and_extents() {
        let mesh = box_mesh("room", 10.0, 14.0, 14.0);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        for vertex in &mesh.vertices {
            assert!(vertex.position[0].abs() <= 5.0 + 1e-6);
            assert!(vertex.position[1].abs() <= 7.0 + 1e-6);
            assert!(vertex.position[2].abs() <= 7.0 + 1e-6);
        }
        let max_x = mesh
            .vertices
            .iter()
            .map(|v| v.position[0])
            .fold(f32::MIN, f32::max);
        assert_eq!(max_x, 5.0);
    }

    #[test]
    fn all_indices_are_in_range() {
        let mesh = box_mesh("room", 1.0, 1.0, 1.0);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }
}
