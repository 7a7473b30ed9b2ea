//! Asynchronous model loading and scene attachment.
//!
//! A [`Model`] is constructed with a descriptor naming the model file and
//! up to two optional textures. The fetches run concurrently and are
//! joined before anything touches the scene; results are bound to their
//! roles by position in the join, never by completion order. Any single
//! failure aborts the whole load and the model stays out of the scene.
//!
//! The GPU upload and scene mutation happen on the event-loop thread once
//! the decoded payload arrives, so the renderer never observes a
//! half-initialized node.

use std::cell::RefCell;
use std::rc::Rc;

use crate::data_structures::mesh::MeshData;
use crate::data_structures::scene_graph::{NodeId, RenderObject, SceneGraph};
use crate::error::ViewerError;
use crate::resources::LoaderPool;

/// Construction parameters for a model.
///
/// `place_on_load` defaults to true; an explicit `false` is honored and
/// leaves the model detached until [`Model::add_to_scene`] is called.
#[derive(Clone, Debug)]
pub struct ModelDescriptor {
    pub name: String,
    pub file: String,
    pub place_on_load: bool,
    pub map: Option<String>,
    pub env_map: Option<String>,
}

impl ModelDescriptor {
    pub fn new(name: &str, file: &str) -> Self {
        Self {
            name: name.to_string(),
            file: file.to_string(),
            place_on_load: true,
            map: None,
            env_map: None,
        }
    }

    pub fn with_map(mut self, path: &str) -> Self {
        self.map = Some(path.to_string());
        self
    }

    pub fn with_env_map(mut self, path: &str) -> Self {
        self.env_map = Some(path.to_string());
        self
    }

    pub fn with_place_on_load(mut self, place_on_load: bool) -> Self {
        self.place_on_load = place_on_load;
        self
    }
}

/// The role a fetched asset fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetSlot {
    ColorMap,
    EnvMap,
    Geometry,
}

/// The fixed fetch set for a descriptor, in join order. Geometry is always
/// present; the texture slots only when requested.
pub fn fetch_plan(descriptor: &ModelDescriptor) -> Vec<(AssetSlot, &str)> {
    let mut plan = Vec::with_capacity(3);
    if let Some(map) = &descriptor.map {
        plan.push((AssetSlot::ColorMap, map.as_str()));
    }
    if let Some(env_map) = &descriptor.env_map {
        plan.push((AssetSlot::EnvMap, env_map.as_str()));
    }
    plan.push((AssetSlot::Geometry, descriptor.file.as_str()));
    plan
}

/// Everything a successful load produced, decoded but not yet on the GPU.
#[derive(Debug)]
pub struct LoadedAssets {
    pub map: Option<image::DynamicImage>,
    pub env_map: Option<image::DynamicImage>,
    pub mesh: MeshData,
}

/// Run the fan-in join over the descriptor's fetch set.
///
/// Each branch resolves its own slot, so the association between result
/// and role cannot shift no matter which fetch settles first. The first
/// error cancels the join and fails the load.
pub async fn fetch_assets(
    descriptor: &ModelDescriptor,
    pool: &LoaderPool,
) -> Result<LoadedAssets, ViewerError> {
    let map_fut = async {
        match &descriptor.map {
            Some(path) => pool.textures.fetch(path).await.map(Some),
            None => Ok(None),
        }
    };
    let env_fut = async {
        match &descriptor.env_map {
            Some(path) => pool.textures.fetch(path).await.map(Some),
            None => Ok(None),
        }
    };
    let mesh_fut = pool.models.fetch(&descriptor.file);

    let (map, env_map, mesh) = futures::try_join!(map_fut, env_fut, mesh_fut)?;
    Ok(LoadedAssets { map, env_map, mesh })
}

/// Lifecycle of a model: loading, usable, or permanently failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    /// Terminal; a failed model never gains scene presence.
    Failed,
}

/// A loaded (or loading) model and its attachment bookkeeping.
///
/// Generic over the scene payload so the attach/detach state machine can
/// be tested without GPU resources; the viewer uses [`Model`].
#[derive(Debug)]
pub struct ModelHandle<T: Clone> {
    name: String,
    place_on_load: bool,
    state: LoadState,
    scene: Rc<RefCell<SceneGraph<T>>>,
    mesh: Option<T>,
    geometry: Option<MeshData>,
    node: Option<NodeId>,
    is_active: bool,
}

/// The concrete model type used by the viewer.
pub type Model = ModelHandle<Rc<RenderObject>>;

impl<T: Clone> ModelHandle<T> {
    pub fn new(name: &str, place_on_load: bool, scene: Rc<RefCell<SceneGraph<T>>>) -> Self {
        Self {
            name: name.to_string(),
            place_on_load,
            state: LoadState::Loading,
            scene,
            mesh: None,
            geometry: None,
            node: None,
            is_active: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Whether the mesh is currently part of the scene graph.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Decoded geometry of the usable mesh, available once loaded.
    pub fn geometry(&self) -> Option<&MeshData> {
        self.geometry.as_ref()
    }

    /// Invoked on the event-loop thread once the load join resolved and
    /// the GPU resources exist. Attaches immediately if requested.
    pub(crate) fn complete(&mut self, mesh: T, geometry: MeshData) {
        self.state = LoadState::Ready;
        self.mesh = Some(mesh);
        self.geometry = Some(geometry);
        if self.place_on_load {
            self.add_to_scene();
        }
    }

    pub(crate) fn fail(&mut self) {
        self.state = LoadState::Failed;
    }

    /// Attach the mesh to the scene graph and mark the model active.
    ///
    /// A second call while attached changes nothing. Before the load has
    /// completed there is no mesh to attach; that is a caller error and
    /// is guarded with a warning.
    pub fn add_to_scene(&mut self) {
        let Some(mesh) = &self.mesh else {
            log::warn!("model `{}` cannot be attached before its load completes", self.name);
            return;
        };
        if self.is_active {
            return;
        }
        let id = self.scene.borrow_mut().insert(mesh.clone());
        self.node = Some(id);
        self.is_active = true;
    }

    /// Detach the mesh from the scene graph and clear the active flag.
    /// Calling this twice (or before the load completes) is harmless.
    pub fn remove_from_scene(&mut self) {
        if let Some(id) = self.node.take() {
            self.scene.borrow_mut().remove(id);
        }
        self.is_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Rc<RefCell<SceneGraph<&'static str>>> {
        Rc::new(RefCell::new(SceneGraph::new()))
    }

    fn descriptor(map: bool, env: bool) -> ModelDescriptor {
        let mut descriptor = ModelDescriptor::new("vase", "models/vase.glb");
        if map {
            descriptor = descriptor.with_map("maps/color.jpg");
        }
        if env {
            descriptor = descriptor.with_env_map("textures/env.jpg");
        }
        descriptor
    }

    #[test]
    fn plan_covers_all_texture_combinations() {
        let descriptor_both = descriptor(true, true);
        let plan = fetch_plan(&descriptor_both);
        assert_eq!(
            plan.iter().map(|(slot, _)| *slot).collect::<Vec<_>>(),
            vec![AssetSlot::ColorMap, AssetSlot::EnvMap, AssetSlot::Geometry]
        );
        assert_eq!(plan[0].1, "maps/color.jpg");
        assert_eq!(plan[1].1, "textures/env.jpg");
        assert_eq!(plan[2].1, "models/vase.glb");

        let descriptor_map = descriptor(true, false);
        let plan = fetch_plan(&descriptor_map);
        assert_eq!(
            plan.iter().map(|(slot, _)| *slot).collect::<Vec<_>>(),
            vec![AssetSlot::ColorMap, AssetSlot::Geometry]
        );

        let descriptor_env = descriptor(false, true);
        let plan = fetch_plan(&descriptor_env);
        assert_eq!(
            plan.iter().map(|(slot, _)| *slot).collect::<Vec<_>>(),
            vec![AssetSlot::EnvMap, AssetSlot::Geometry]
        );
        assert_eq!(plan[0].1, "textures/env.jpg");
    }

    #[test]
    fn geometry_only_load_plans_exactly_one_fetch() {
        let descriptor_geometry = descriptor(false, false);
        let plan = fetch_plan(&descriptor_geometry);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0], (AssetSlot::Geometry, "models/vase.glb"));
    }

    #[test]
    fn explicit_place_on_load_false_is_honored() {
        // the original scripting prototype had `placeOnLoad || true`, which
        // silently discarded an explicit false
        let descriptor = ModelDescriptor::new("vase", "models/vase.glb").with_place_on_load(false);
        assert!(!descriptor.place_on_load);
    }

    #[test]
    fn place_on_load_attaches_exactly_once() {
        let scene = scene();
        let mut model = ModelHandle::new("vase", true, scene.clone());
        assert_eq!(model.state(), LoadState::Loading);
        assert!(!model.is_active());
        model.complete("mesh", MeshData::default());
        assert_eq!(model.state(), LoadState::Ready);
        assert!(model.is_active());
        assert_eq!(scene.borrow().len(), 1);
        // a second attach while active changes nothing
        model.add_to_scene();
        assert_eq!(scene.borrow().len(), 1);
    }

    #[test]
    fn without_place_on_load_nothing_is_attached() {
        let scene = scene();
        let mut model = ModelHandle::new("vase", false, scene.clone());
        model.complete("mesh", MeshData::default());
        assert_eq!(model.state(), LoadState::Ready);
        assert!(!model.is_active());
        assert!(scene.borrow().is_empty());
        model.add_to_scene();
        assert!(model.is_active());
        assert_eq!(scene.borrow().len(), 1);
    }

    #[test]
    fn remove_then_add_restores_the_mesh() {
        let scene = scene();
        let mut model = ModelHandle::new("vase", true, scene.clone());
        model.complete("mesh", MeshData::default());
        model.remove_from_scene();
        assert!(!model.is_active());
        assert!(scene.borrow().is_empty());
        model.add_to_scene();
        assert!(model.is_active());
        assert_eq!(scene.borrow().len(), 1);
    }

    #[test]
    fn double_remove_is_harmless() {
        let scene = scene();
        let mut model = ModelHandle::new("vase", true, scene.clone());
        model.complete("mesh", MeshData::default());
        model.remove_from_scene();
        model.remove_from_scene();
        assert!(!model.is_active());
        assert!(scene.borrow().is_empty());
    }

    #[test]
    fn attach_before_load_is_guarded() {
        let scene = scene();
        let mut model: ModelHandle<&str> = ModelHandle::new("vase", true, scene.clone());
        model.add_to_scene();
        assert!(!model.is_active());
        assert!(scene.borrow().is_empty());
        model.remove_from_scene();
        assert!(!model.is_active());
    }

    #[test]
    fn failed_models_never_gain_scene_presence() {
        let scene = scene();
        let mut model: ModelHandle<&str> = ModelHandle::new("vase", true, scene.clone());
        model.fail();
        assert_eq!(model.state(), LoadState::Failed);
        model.add_to_scene();
        assert!(!model.is_active());
        assert!(scene.borrow().is_empty());
    }
}
