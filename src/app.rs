//! The viewer application: window, event loop and per-frame driving.
//!
//! Startup follows the platform split of the event loop: on native the GPU
//! context is built with `block_on` before the loop starts handling events,
//! on the web it is built in a `spawn_local` future and handed back through
//! the event-loop proxy. Model loads always run off the handler and report
//! back as user events, so the scene is only ever mutated on the loop
//! thread.

use std::rc::Rc;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use cgmath::{Vector2, Vector3};
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    context::{Context, CLEAR_COLOR},
    data_structures::{
        instance::Instance,
        scene_graph::{MaterialBinding, RenderObject, Scene, SharedScene},
        texture::Texture,
    },
    error::ViewerError,
    model::{self, LoadedAssets, Model, ModelDescriptor},
    pipelines::{basic, physical},
    resources::{mesh::box_mesh, LoaderPool},
    tween::PointerState,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
pub(crate) const CANVAS_ID: &str = "canvas";

const ROOM_TEXTURE: &str = "textures/geometric_texture.jpg";
const VASE_MODEL: &str = "models/vase.glb";

/// Window dimensions with the derived aspect ratio. Degenerate sizes are
/// clamped to one pixel so the ratio stays finite during minimization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            aspect_ratio: width as f32 / height as f32,
        }
    }
}

static VIEWER_LIVE: AtomicBool = AtomicBool::new(false);

/// Token enforcing that at most one [`Viewer`] exists per process.
///
/// There is intentionally no `Drop` release: the viewer lives for the
/// whole run and gives the token back explicitly on shutdown, so an
/// accidentally dropped half-built viewer cannot unlock a second one.
#[derive(Debug)]
pub struct ViewerGuard {
    _private: (),
}

impl ViewerGuard {
    pub fn acquire() -> Result<Self, ViewerError> {
        if VIEWER_LIVE.swap(true, Ordering::SeqCst) {
            Err(ViewerError::AlreadyInitialized)
        } else {
            Ok(Self { _private: () })
        }
    }

    pub fn release(self) {
        VIEWER_LIVE.store(false, Ordering::SeqCst);
    }
}

/// Events delivered to the loop thread via the [`EventLoopProxy`].
pub enum ViewerEvent {
    /// Web only: the async context build finished. On native the build is
    /// blocked on instead, which keeps this enum `Send` there.
    #[cfg(target_arch = "wasm32")]
    Ready(Box<Viewer>),
    ModelLoaded {
        name: String,
        assets: LoadedAssets,
    },
    LoadFailed {
        name: String,
        error: ViewerError,
    },
}

impl std::fmt::Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Ready(_) => f.write_str("Ready(Viewer)"),
            Self::ModelLoaded { name, .. } => f.debug_struct("ModelLoaded").field("name", name).finish(),
            Self::LoadFailed { name, error } => f
                .debug_struct("LoadFailed")
                .field("name", name)
                .field("error", error)
                .finish(),
        }
    }
}

fn vase_descriptor() -> ModelDescriptor {
    // the env map reuses the wall texture, the glass reflects the room
    ModelDescriptor::new("vase", VASE_MODEL).with_env_map(ROOM_TEXTURE)
}

/// Resolve a descriptor's assets and report the outcome as a user event.
async fn load_and_notify(
    descriptor: ModelDescriptor,
    pool: LoaderPool,
    proxy: EventLoopProxy<ViewerEvent>,
) {
    let name = descriptor.name.clone();
    let event = match model::fetch_assets(&descriptor, &pool).await {
        Ok(assets) => ViewerEvent::ModelLoaded { name, assets },
        Err(error) => ViewerEvent::LoadFailed { name, error },
    };
    if proxy.send_event(event).is_err() {
        log::error!("event loop closed before the model load could report back");
    }
}

/// The scene controller: GPU context, scene graph, the loaded model and
/// the smoothed pointer.
pub struct Viewer {
    guard: ViewerGuard,
    ctx: Context,
    scene: SharedScene,
    vase: Model,
    pointer: PointerState,
    loaders: LoaderPool,
    is_surface_configured: bool,
}

impl Viewer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        // claim the singleton before any GPU work happens
        let guard = ViewerGuard::acquire()?;
        let ctx = Context::new(window).await?;
        let loaders = LoaderPool::new();

        let scene: SharedScene = Rc::new(std::cell::RefCell::new(Scene::new()));

        // The room is available immediately; a failed texture fetch keeps
        // the walls as a flat placeholder instead of aborting startup.
        let room_texture = match loaders.textures.fetch(ROOM_TEXTURE).await {
            Ok(image) => Texture::from_image(&ctx.device, &ctx.queue, &image, Some("room texture"))?,
            Err(error) => {
                log::warn!("room texture unavailable, using placeholder: {error}");
                Texture::create_placeholder([104, 104, 104, 255], &ctx.device, &ctx.queue)
            }
        };
        let bind_group = basic::mk_room_texture_bind_group(&ctx.device, &room_texture);
        let room = RenderObject {
            mesh: box_mesh("room", 10.0, 14.0, 14.0).upload(&ctx.device),
            instance_buffer: Instance::from(Vector3::new(3.0, 0.0, 0.0))
                .to_buffer(&ctx.device, "room instance"),
            material: MaterialBinding::Room { bind_group },
        };
        scene.borrow_mut().insert(Rc::new(room));

        let vase = Model::new("vase", true, scene.clone());

        Ok(Self {
            guard,
            ctx,
            scene,
            vase,
            pointer: PointerState::new(),
            loaders,
            is_surface_configured: false,
        })
    }

    pub fn shutdown(self) {
        self.guard.release();
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            let viewport = Viewport::new(width, height);
            self.ctx.config.width = viewport.width;
            self.ctx.config.height = viewport.height;
            self.is_surface_configured = true;
            self.ctx.projection.resize(viewport.width, viewport.height);
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
            self.ctx.depth_texture = Texture::create_depth_texture(
                &self.ctx.device,
                [self.ctx.config.width, self.ctx.config.height],
                "depth_texture",
            );
        }
    }

    fn handle_window_event(&mut self, event: &WindowEvent) {
        self.ctx
            .camera
            .controller
            .handle_window_events(&mut self.ctx.camera.camera, event);

        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer
                    .retarget(Vector2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::Touch(touch) if touch.phase == TouchPhase::Moved => {
                self.pointer
                    .retarget(Vector2::new(touch.location.x as f32, touch.location.y as f32));
            }
            _ => (),
        }
    }

    /// GPU upload for a resolved load, then hand the node to the model.
    /// Absent optional maps become 1x1 placeholders so the physical
    /// pipeline binds the same layout either way.
    fn finish_model_load(&mut self, assets: LoadedAssets) -> anyhow::Result<()> {
        let device = &self.ctx.device;
        let queue = &self.ctx.queue;

        let has_map = assets.map.is_some();
        let has_env = assets.env_map.is_some();
        let color_map = match &assets.map {
            Some(image) => Texture::from_image(device, queue, image, Some("model color map"))?,
            None => Texture::create_placeholder([255, 255, 255, 255], device, queue),
        };
        let env_map = match &assets.env_map {
            Some(image) => Texture::from_image(device, queue, image, Some("model env map"))?,
            None => Texture::create_placeholder([0, 0, 0, 255], device, queue),
        };

        let uniform = physical::MaterialUniform::vase(has_map, has_env);
        let bind_group = physical::mk_material_bind_group(device, uniform, &color_map, &env_map);

        let object = RenderObject {
            mesh: assets.mesh.upload(device),
            instance_buffer: Instance::new().to_buffer(device, "model instance"),
            material: MaterialBinding::Physical { bind_group },
        };
        self.vase.complete(Rc::new(object), assets.mesh);
        log::info!("model `{}` loaded", self.vase.name());
        Ok(())
    }

    fn fail_model_load(&mut self, name: &str, error: ViewerError) {
        log::error!("loading model `{name}` failed: {error}");
        self.vase.fail();
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // schedule the next frame before drawing this one, the loop must
        // not stall when an error short-circuits below
        self.ctx.window.request_redraw();

        if !self.is_surface_configured {
            return Ok(());
        }

        self.pointer.advance(Instant::now());

        self.ctx
            .camera
            .uniform
            .update_view_proj(&self.ctx.camera.camera, &self.ctx.projection);
        self.ctx.queue.write_buffer(
            &self.ctx.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.ctx.camera.uniform]),
        );

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Clone the node handles out so the pass does not borrow the scene.
        let objects: Vec<Rc<RenderObject>> = self
            .scene
            .borrow()
            .iter()
            .map(|(_, object)| object.clone())
            .collect();

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            // Opaque room first, then the alpha-blended model on top.
            render_pass.set_pipeline(&self.ctx.pipelines.room);
            for object in &objects {
                if let MaterialBinding::Room { bind_group } = &object.material {
                    render_pass.set_bind_group(0, bind_group, &[]);
                    render_pass.set_bind_group(1, &self.ctx.camera.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, object.mesh.vertex_buffer.slice(..));
                    render_pass.set_vertex_buffer(1, object.instance_buffer.slice(..));
                    render_pass
                        .set_index_buffer(object.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..object.mesh.num_elements, 0, 0..1);
                }
            }

            render_pass.set_pipeline(&self.ctx.pipelines.physical);
            for object in &objects {
                if let MaterialBinding::Physical { bind_group } = &object.material {
                    render_pass.set_bind_group(0, bind_group, &[]);
                    render_pass.set_bind_group(1, &self.ctx.camera.bind_group, &[]);
                    render_pass.set_bind_group(2, &self.ctx.light.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, object.mesh.vertex_buffer.slice(..));
                    render_pass.set_vertex_buffer(1, object.instance_buffer.slice(..));
                    render_pass
                        .set_index_buffer(object.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..object.mesh.num_elements, 0, 0..1);
                }
            }
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    viewer: Option<Viewer>,
}

impl App {
    fn new(event_loop: &EventLoop<ViewerEvent>) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            viewer: None,
        })
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes();

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let Some(canvas) = document.get_element_by_id(CANVAS_ID) else {
                log::error!(
                    "{}",
                    ViewerError::MissingSurface(CANVAS_ID.to_string())
                );
                event_loop.exit();
                return;
            };
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(error) => {
                log::error!("window creation failed: {error}");
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let viewer = match self.runtime.block_on(Viewer::new(window)) {
                Ok(viewer) => viewer,
                Err(error) => panic!("viewer initialization failed: {error}"),
            };
            self.runtime.spawn(load_and_notify(
                vase_descriptor(),
                viewer.loaders.clone(),
                self.proxy.clone(),
            ));
            self.viewer = Some(viewer);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let viewer = match Viewer::new(window).await {
                    Ok(viewer) => viewer,
                    Err(error) => {
                        log::error!("viewer initialization failed: {error}");
                        return;
                    }
                };
                let pool = viewer.loaders.clone();
                assert!(proxy
                    .send_event(ViewerEvent::Ready(Box::new(viewer)))
                    .is_ok());
                wasm_bindgen_futures::spawn_local(load_and_notify(
                    vase_descriptor(),
                    pool,
                    proxy,
                ));
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            ViewerEvent::Ready(viewer) => {
                // This is the message from our wasm `spawn_local`
                self.viewer = Some(*viewer);
                let viewer = self.viewer.as_mut().unwrap_throw();
                let size = viewer.ctx.window.inner_size();
                viewer.resize(size.width, size.height);
                viewer.ctx.window.request_redraw();
            }
            ViewerEvent::ModelLoaded { name, assets } => {
                if let Some(viewer) = &mut self.viewer {
                    if let Err(error) = viewer.finish_model_load(assets) {
                        viewer.fail_model_load(&name, ViewerError::load(&name, error));
                    }
                }
            }
            ViewerEvent::LoadFailed { name, error } => {
                if let Some(viewer) = &mut self.viewer {
                    viewer.fail_model_load(&name, error);
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let viewer = match &mut self.viewer {
            Some(viewer) => viewer,
            None => return,
        };

        viewer.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                if let Some(viewer) = self.viewer.take() {
                    viewer.shutdown();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => viewer.resize(size.width, size.height),
            WindowEvent::RedrawRequested => match viewer.render() {
                Ok(_) => {}
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = viewer.ctx.window.inner_size();
                    viewer.resize(size.width, size.height);
                }
                Err(error) => {
                    log::error!("unable to render: {error}");
                }
            },
            _ => {}
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run().map_err(|error| JsValue::from_str(&error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_derives_the_aspect_ratio() {
        let viewport = Viewport::new(1920, 1080);
        assert!((viewport.aspect_ratio - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn viewport_clamps_degenerate_sizes() {
        let viewport = Viewport::new(800, 0);
        assert_eq!(viewport.height, 1);
        assert!(viewport.aspect_ratio.is_finite());
    }

    // Single test so the global flag is not raced by the parallel runner.
    #[test]
    fn guard_admits_one_viewer_at_a_time() {
        let first = ViewerGuard::acquire().unwrap();
        assert!(matches!(
            ViewerGuard::acquire(),
            Err(ViewerError::AlreadyInitialized)
        ));
        first.release();
        let second = ViewerGuard::acquire().unwrap();
        second.release();
    }
}
