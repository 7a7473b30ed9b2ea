//! The scene graph: the tree of renderable nodes traversed every frame.
//!
//! The graph stores root-level subtrees in insertion order; in this viewer
//! every subtree is a single mesh with its material, so the container is a
//! flat list of nodes with stable ids. Ids are never reused, which makes
//! detach/attach cycles by stale handles harmless.

use std::cell::RefCell;
use std::rc::Rc;

use crate::data_structures::mesh::Mesh;

/// Handle to a node in a [`SceneGraph`]. Stays invalid after removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

/// Generic over the node payload so the attach/detach bookkeeping can be
/// exercised without GPU resources.
#[derive(Debug)]
pub struct SceneGraph<T> {
    next_id: u64,
    nodes: Vec<(NodeId, T)>,
}

impl<T> SceneGraph<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            nodes: Vec::new(),
        }
    }

    pub fn insert(&mut self, value: T) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push((id, value));
        id
    }

    /// Detach a node. Removing an unknown or already removed id is a no-op.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        let position = self.nodes.iter().position(|(node_id, _)| *node_id == id)?;
        Some(self.nodes.remove(position).1)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|(node_id, _)| *node_id == id)
    }

    /// Nodes in insertion order, the order they are drawn in.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.nodes.iter().map(|(id, value)| (*id, value))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<T> Default for SceneGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Which pipeline a node is drawn with.
#[derive(Debug)]
pub enum MaterialBinding {
    /// Unlit textured geometry seen from the inside (the room).
    Room { bind_group: wgpu::BindGroup },
    /// The alpha-blended physical material (the loaded model).
    Physical { bind_group: wgpu::BindGroup },
}

/// One renderable subtree: a mesh, its placement and its material.
#[derive(Debug)]
pub struct RenderObject {
    pub mesh: Mesh,
    pub instance_buffer: wgpu::Buffer,
    pub material: MaterialBinding,
}

/// The scene as rendered each frame. Nodes are shared so a detached model
/// keeps its GPU resources alive for re-attachment.
pub type Scene = SceneGraph<Rc<RenderObject>>;

/// Shared handle to the scene. Everything runs on the event-loop thread,
/// so interior mutability is enough; there is no locking.
pub type SharedScene = Rc<RefCell<Scene>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_remove_round_trips() {
        let mut graph = SceneGraph::new();
        let a = graph.insert("a");
        let b = graph.insert("b");
        assert!(graph.contains(a));
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.remove(a), Some("a"));
        assert!(!graph.contains(a));
        assert!(graph.contains(b));
    }

    #[test]
    fn removing_twice_is_a_noop() {
        let mut graph = SceneGraph::new();
        let id = graph.insert(1);
        assert_eq!(graph.remove(id), Some(1));
        assert_eq!(graph.remove(id), None);
        assert!(graph.is_empty());
    }

    #[test]
    fn ids_are_never_reused() {
        let mut graph = SceneGraph::new();
        let a = graph.insert("a");
        graph.remove(a);
        let b = graph.insert("b");
        assert_ne!(a, b);
        assert!(!graph.contains(a));
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut graph = SceneGraph::new();
        graph.insert("room");
        graph.insert("vase");
        let names: Vec<_> = graph.iter().map(|(_, v)| *v).collect();
        assert_eq!(names, vec!["room", "vase"]);
    }
}
