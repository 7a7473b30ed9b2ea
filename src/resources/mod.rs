//! Asset fetching and decoding.
//!
//! All model loads go through one [`LoaderPool`] so decoder and fetcher
//! setup happens once. This is a resource-pool optimization; correctness
//! does not depend on the sharing.

use crate::data_structures::mesh::{MeshData, ModelVertex};
use crate::error::ViewerError;

pub mod mesh;
pub mod texture;

pub use texture::{TextureFetcher, load_binary};

/// Fetches and decodes binary glTF models.
///
/// Only self-contained files (`.glb` with an embedded BIN chunk) are
/// supported; models referencing external buffer files are rejected.
#[derive(Clone, Debug, Default)]
pub struct ModelDecoder;

impl ModelDecoder {
    pub async fn fetch(&self, file_name: &str) -> Result<MeshData, ViewerError> {
        let data = load_binary(file_name)
            .await
            .map_err(|e| ViewerError::load(file_name, e))?;
        self.decode(&data, file_name)
    }

    /// Decode the first mesh-carrying node of the model's first scene.
    pub fn decode(&self, bytes: &[u8], name: &str) -> Result<MeshData, ViewerError> {
        let gltf = gltf::Gltf::from_slice(bytes).map_err(|e| ViewerError::load(name, e))?;

        let mut buffer_data: Vec<Vec<u8>> = Vec::new();
        for buffer in gltf.buffers() {
            match buffer.source() {
                gltf::buffer::Source::Bin => {
                    if let Some(blob) = gltf.blob.as_deref() {
                        buffer_data.push(blob.into());
                    }
                }
                gltf::buffer::Source::Uri(uri) => {
                    return Err(ViewerError::load(
                        name,
                        anyhow::anyhow!("external buffer `{uri}` is not supported"),
                    ));
                }
            }
        }

        let scene = gltf
            .default_scene()
            .or_else(|| gltf.scenes().next())
            .ok_or_else(|| ViewerError::load(name, anyhow::anyhow!("model contains no scene")))?;

        // The usable mesh is the first child of the scene that carries one.
        let node = first_mesh_node(scene.nodes()).ok_or_else(|| {
            ViewerError::load(name, anyhow::anyhow!("model contains no mesh node"))
        })?;
        let mesh = node.mesh().expect("node was selected for carrying a mesh");
        let primitive = mesh.primitives().next().ok_or_else(|| {
            ViewerError::load(name, anyhow::anyhow!("mesh contains no primitives"))
        })?;

        let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(|b| &b[..]));

        let mut vertices = Vec::new();
        if let Some(positions) = reader.read_positions() {
            positions.for_each(|position| {
                vertices.push(ModelVertex {
                    position,
                    tex_coords: Default::default(),
                    normal: Default::default(),
                })
            });
        }
        if let Some(normals) = reader.read_normals() {
            for (index, normal) in normals.enumerate() {
                if let Some(vertex) = vertices.get_mut(index) {
                    vertex.normal = normal;
                }
            }
        }
        if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
            for (index, tex_coord) in tex_coords.enumerate() {
                if let Some(vertex) = vertices.get_mut(index) {
                    vertex.tex_coords = tex_coord;
                }
            }
        }

        let indices = match reader.read_indices() {
            Some(raw) => raw.into_u32().collect(),
            // Non-indexed primitives are drawn in vertex order.
            None => (0..vertices.len() as u32).collect(),
        };

        if vertices.is_empty() {
            return Err(ViewerError::load(
                name,
                anyhow::anyhow!("mesh primitive has no positions"),
            ));
        }

        Ok(MeshData {
            name: mesh.name().unwrap_or(name).to_string(),
            vertices,
            indices,
        })
    }
}

fn first_mesh_node<'a>(
    nodes: impl Iterator<Item = gltf::Node<'a>>,
) -> Option<gltf::Node<'a>> {
    for node in nodes {
        if node.mesh().is_some() {
            return Some(node);
        }
        if let Some(found) = first_mesh_node(node.children()) {
            return Some(found);
        }
    }
    None
}

/// The shared loader utilities: one model decoder and one texture fetcher,
/// constructed once and passed into each load operation.
#[derive(Clone, Debug, Default)]
pub struct LoaderPool {
    pub textures: TextureFetcher,
    pub models: ModelDecoder,
}

impl LoaderPool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_GLB: &[u8] = include_bytes!("../../tests/fixtures/triangle.glb");

    #[test]
    fn decodes_first_mesh_of_a_glb() {
        let decoder = ModelDecoder;
        let mesh = decoder.decode(TRIANGLE_GLB, "triangle.glb").unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        // normals and uvs came along with the positions
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn rejects_garbage_bytes() {
        let decoder = ModelDecoder;
        let err = decoder.decode(b"not a model", "junk.glb").unwrap_err();
        assert!(matches!(err, ViewerError::Load { .. }));
    }
}
