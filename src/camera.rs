//! Orbit camera, projection and the camera uniform.
//!
//! The camera rotates and zooms around a fixed target point in spherical
//! coordinates. All mutation goes through clamped setters so the pose can
//! never leave the allowed ranges, regardless of input magnitude.

use std::f32::consts::PI;

use cgmath::{Deg, Matrix4, Point3, Rad, Vector3};
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};

pub const MIN_POLAR: f32 = 0.0;
pub const MAX_POLAR: f32 = PI;
pub const MIN_AZIMUTH: f32 = 0.0;
pub const MAX_AZIMUTH: f32 = PI;
pub const MIN_DISTANCE: f32 = 1.5;
pub const MAX_DISTANCE: f32 = 8.0;

/// wgpu clip space is z in [0, 1] while cgmath produces OpenGL-style
/// [-1, 1], so projection matrices get remapped with this.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A camera orbiting a fixed target.
///
/// `polar` is measured from the +Y axis, `azimuth` around it. Both angles
/// and the zoom distance are clamped, never rejected: an update past a
/// bound lands exactly on the bound. Panning is not supported.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    pub target: Point3<f32>,
    polar: f32,
    azimuth: f32,
    distance: f32,
}

impl OrbitCamera {
    pub fn new(target: Point3<f32>, polar: f32, azimuth: f32, distance: f32) -> Self {
        let mut camera = Self {
            target,
            polar: 0.0,
            azimuth: 0.0,
            distance: MIN_DISTANCE,
        };
        camera.set_polar(polar);
        camera.set_azimuth(azimuth);
        camera.set_distance(distance);
        camera
    }

    pub fn polar(&self) -> f32 {
        self.polar
    }

    pub fn azimuth(&self) -> f32 {
        self.azimuth
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn set_polar(&mut self, polar: f32) {
        self.polar = polar.clamp(MIN_POLAR, MAX_POLAR);
    }

    pub fn set_azimuth(&mut self, azimuth: f32) {
        self.azimuth = azimuth.clamp(MIN_AZIMUTH, MAX_AZIMUTH);
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn rotate(&mut self, d_azimuth: f32, d_polar: f32) {
        self.set_azimuth(self.azimuth + d_azimuth);
        self.set_polar(self.polar + d_polar);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.set_distance(self.distance + delta);
    }

    /// Eye position derived from the spherical pose.
    pub fn position(&self) -> Point3<f32> {
        let x = self.distance * self.polar.sin() * self.azimuth.sin();
        let y = self.distance * self.polar.cos();
        let z = self.distance * self.polar.sin() * self.azimuth.cos();
        self.target + Vector3::new(x, y, z)
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position(), self.target, Vector3::unit_y())
    }
}

/// Perspective projection parameters, resized together with the window.
#[derive(Clone, Debug)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/**
 * The camera data as it lives on the GPU. Uniforms require 16 byte
 * spacing so the view position is padded to a vec4.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &OrbitCamera, projection: &Projection) {
        let position = camera.position();
        self.view_position = [position.x, position.y, position.z, 1.0];
        self.view_proj = (projection.calc_matrix() * camera.view_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Camera state plus the GPU resources derived from it.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: OrbitCamera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Translates winit window events into clamped orbit updates.
///
/// Left-drag (or a single touch) rotates, the scroll wheel zooms. There is
/// deliberately no pan handling.
#[derive(Debug)]
pub struct OrbitController {
    rotate_speed: f32,
    zoom_speed: f32,
    dragging: bool,
    last_cursor: Option<PhysicalPosition<f64>>,
}

impl OrbitController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            dragging: false,
            last_cursor: None,
        }
    }

    pub fn handle_window_events(&mut self, camera: &mut OrbitCamera, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
                if !self.dragging {
                    self.last_cursor = None;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.drag_to(camera, *position);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * self.zoom_speed,
                    MouseScrollDelta::PixelDelta(pos) => -pos.y as f32 * 0.01 * self.zoom_speed,
                };
                camera.zoom(amount);
            }
            WindowEvent::Touch(touch) => match touch.phase {
                TouchPhase::Started => {
                    self.dragging = true;
                    self.last_cursor = Some(touch.location);
                }
                TouchPhase::Moved => self.drag_to(camera, touch.location),
                TouchPhase::Ended | TouchPhase::Cancelled => {
                    self.dragging = false;
                    self.last_cursor = None;
                }
            },
            _ => (),
        }
    }

    fn drag_to(&mut self, camera: &mut OrbitCamera, position: PhysicalPosition<f64>) {
        if self.dragging {
            if let Some(last) = self.last_cursor {
                let dx = (position.x - last.x) as f32;
                let dy = (position.y - last.y) as f32;
                camera.rotate(-dx * self.rotate_speed, -dy * self.rotate_speed);
            }
        }
        self.last_cursor = Some(position);
    }
}

/// Fixed starting pose: eye at (5, 0, 0) looking at the origin.
pub fn default_camera() -> OrbitCamera {
    OrbitCamera::new(
        Point3::new(0.0, 0.0, 0.0),
        std::f32::consts::FRAC_PI_2,
        std::f32::consts::FRAC_PI_2,
        5.0,
    )
}

/// Fixed projection: 50 degree field of view, near 0.1, far 100.
pub fn default_projection(width: u32, height: u32) -> Projection {
    Projection::new(width, height, Deg(50.0), 0.1, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_pose_is_on_the_x_axis() {
        let camera = default_camera();
        let position = camera.position();
        assert!((position.x - 5.0).abs() < 1e-5);
        assert!(position.y.abs() < 1e-5);
        assert!(position.z.abs() < 1e-5);
    }

    #[test]
    fn angles_clamp_instead_of_rejecting() {
        let mut camera = default_camera();
        camera.rotate(10.0, 0.0);
        assert_eq!(camera.azimuth(), MAX_AZIMUTH);
        camera.rotate(-100.0, 0.0);
        assert_eq!(camera.azimuth(), MIN_AZIMUTH);
        camera.rotate(0.0, 10.0);
        assert_eq!(camera.polar(), MAX_POLAR);
        camera.rotate(0.0, -10.0);
        assert_eq!(camera.polar(), MIN_POLAR);
    }

    #[test]
    fn distance_clamps_to_zoom_range() {
        let mut camera = default_camera();
        camera.zoom(100.0);
        assert_eq!(camera.distance(), MAX_DISTANCE);
        camera.zoom(-100.0);
        assert_eq!(camera.distance(), MIN_DISTANCE);
        camera.zoom(1.0);
        assert_eq!(camera.distance(), 2.5);
    }

    #[test]
    fn construction_clamps_out_of_range_pose() {
        let camera = OrbitCamera::new(Point3::new(0.0, 0.0, 0.0), -1.0, 7.0, 100.0);
        assert_eq!(camera.polar(), MIN_POLAR);
        assert_eq!(camera.azimuth(), MAX_AZIMUTH);
        assert_eq!(camera.distance(), MAX_DISTANCE);
    }

    #[test]
    fn resize_sets_exact_aspect_ratio() {
        let mut projection = default_projection(800, 600);
        assert_eq!(projection.aspect, 800.0 / 600.0);
        projection.resize(1920, 1080);
        assert_eq!(projection.aspect, 1920.0 / 1080.0);
    }
}
