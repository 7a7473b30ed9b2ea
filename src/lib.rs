//! vitrine
//!
//! A small cross-platform 3D viewer focused on native and WASM
//! compatibility. The crate renders one interactive scene: a compressed
//! glTF model placed inside a textured room, lit by a single directional
//! light, with an orbit camera driven by mouse and touch input.
//!
//! High-level modules
//! - `app`: the viewer singleton, event loop and continuous render loop
//! - `camera`: orbit camera, projection and uniforms for view/projection
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: scene graph, meshes, instances and GPU textures
//! - `model`: asynchronous model loading (fan-in over model + textures)
//! - `pipelines`: render pipeline definitions (room, physical, light)
//! - `resources`: asset fetching and decoding (the shared loader pool)
//! - `tween`: time-based easing for smoothed pointer input
//!

pub mod app;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod model;
pub mod pipelines;
pub mod resources;
pub mod tween;

pub use app::run;
pub use error::ViewerError;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::WindowEvent;
