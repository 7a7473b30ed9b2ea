//! Engine data structures: meshes, instances, textures and the scene graph.
//!
//! - `mesh` contains CPU-side geometry and its GPU buffer form
//! - `instance` holds per-object transformation data
//! - `scene_graph` is the tree of renderable nodes traversed each frame
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod instance;
pub mod mesh;
pub mod scene_graph;
pub mod texture;
