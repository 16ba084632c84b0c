//! Orbit camera that always faces the cube at the origin.

use std::f32::consts::PI;

use iced::Size;
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

const ZOOM_SENSITIVITY: f32 = 1.0;
const MIN_DISTANCE: f32 = 3.0;
const MAX_DISTANCE: f32 = 300.0;

/// Initial horizontal offset, a little to the right of +Z.
const INITIAL_HORIZONTAL: f32 = 5.0 * PI / 16.0;
/// Initial vertical offset, looking down on the top face.
const INITIAL_VERTICAL: f32 = PI / 4.0;
/// Vertical motion stops once `sin(vertical)` passes this value.
const VERTICAL_LIMIT: f32 = PI / 4.0;

/// nalgebra builds OpenGL clip space (z in -1..1); wgpu wants z in 0..1.
#[rustfmt::skip]
fn opengl_to_wgpu() -> Matrix4<f32> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Camera placed by two angular offsets around the origin.
///
/// The vertical offset only controls elevation; it does not pull the camera
/// in horizontally, so the eye sits on `distance * (sin h, sin v, cos h)`.
#[derive(Debug, Clone)]
pub(crate) struct OrbitCamera {
    horizontal: f32,
    vertical: f32,
    distance: f32,
    /// Closest zoom; keeps the eye outside the cube.
    min_distance: f32,
    position: Point3<f32>,
    forward: Vector3<f32>,
    up: Vector3<f32>,
}

impl OrbitCamera {
    pub(crate) fn new(distance: f32) -> Self {
        let mut camera = Self {
            horizontal: INITIAL_HORIZONTAL,
            vertical: INITIAL_VERTICAL,
            distance,
            min_distance: MIN_DISTANCE,
            position: Point3::origin(),
            forward: Vector3::z(),
            up: Vector3::y(),
        };
        camera.position_camera();
        camera
    }

    /// Camera far enough out to frame a cube of `size` blocks per edge.
    pub(crate) fn framing(size: usize) -> Self {
        let mut camera = Self::new((size as f32 + 1.0) * 3.0);
        // The eye stays outside the cube at full zoom.
        camera.min_distance = (size as f32 * 2.0).max(MIN_DISTANCE);
        camera
    }

    /// Recomputes position and forward vector from the offsets.
    pub(crate) fn position_camera(&mut self) {
        let (sin_horiz, cos_horiz) = self.horizontal.sin_cos();
        let sin_vert = self.vertical.sin();

        self.position = Point3::new(
            self.distance * sin_horiz,
            self.distance * sin_vert,
            self.distance * cos_horiz,
        );
        self.forward = Vector3::new(-sin_horiz, -sin_vert, -cos_horiz);
    }

    pub(crate) fn position(&self) -> Point3<f32> {
        self.position
    }

    pub(crate) fn forward(&self) -> Vector3<f32> {
        self.forward
    }

    pub(crate) fn build_view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &(self.position + self.forward), &self.up)
    }

    /// Orbits by a mouse drag of `(delta_x, delta_y)` pixels.
    pub(crate) fn process_mouse_motion(&mut self, delta_x: f32, delta_y: f32, sensitivity: f32) {
        self.horizontal -= delta_x * sensitivity;

        let sin_vert = self.vertical.sin();
        let can_lower = delta_y < 0.0 && sin_vert > -VERTICAL_LIMIT;
        let can_raise = delta_y > 0.0 && sin_vert < VERTICAL_LIMIT;
        if can_lower || can_raise {
            self.vertical += delta_y * sensitivity;
        }

        self.position_camera();
    }

    pub(crate) fn process_scroll(&mut self, delta: f32) {
        self.distance -= delta * ZOOM_SENSITIVITY;
        self.distance = self.distance.clamp(self.min_distance, MAX_DISTANCE);
        self.position_camera();
    }

    /// Unprojects a screen point onto the far plane and returns the unit
    /// direction from the camera toward it.
    pub(crate) fn pick_ray(
        &self,
        x: f32,
        y: f32,
        viewport: Size,
        projection: &Projection,
    ) -> Option<Vector3<f32>> {
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return None;
        }

        let ndc_x = (2.0 * x / viewport.width) - 1.0;
        let ndc_y = 1.0 - (2.0 * y / viewport.height);

        let view_proj = projection.build_projection_matrix() * self.build_view_matrix();
        let inv_view_proj = view_proj.try_inverse()?;

        let far = inv_view_proj * Vector4::new(ndc_x, ndc_y, 1.0, 1.0);
        if far.w == 0.0 {
            return None;
        }
        let far = Point3::new(far.x / far.w, far.y / far.w, far.z / far.w);

        Some((far - self.position).normalize())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Projection {
    pub(crate) aspect: f32,
    /// Vertical field of view in radians.
    pub(crate) fovy: f32,
    pub(crate) znear: f32,
    pub(crate) zfar: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            aspect: 800.0 / 600.0,
            fovy: 70.0_f32.to_radians(),
            znear: 0.01,
            zfar: 1000.0,
        }
    }
}

impl Projection {
    pub(crate) fn build_projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fovy, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct CameraUniform {
    pub(crate) view_proj: [[f32; 4]; 4],
    pub(crate) render_mode: u32,
    _padding: [u32; 3],
}

impl CameraUniform {
    pub(crate) fn new() -> Self {
        Self {
            view_proj: Matrix4::identity().into(),
            render_mode: 0,
            _padding: [0; 3],
        }
    }

    pub(crate) fn update_view_proj(&mut self, camera: &OrbitCamera, projection: &Projection) {
        let view_proj = projection.build_projection_matrix() * camera.build_view_matrix();
        self.view_proj = (opengl_to_wgpu() * view_proj).into();
    }
}
