//! Orbit camera producing reverse-Z view and projection matrices.

use glam::{Mat4, Quat, Vec3};

use crate::pipeline::CameraUniform;

/// A perspective camera with reverse-Z projection.
///
/// Reverse-Z maps the near plane to depth 1 and the far plane to depth 0,
/// which keeps floating-point depth precision where distant terrain needs
/// it.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// View matrix: inverse of the camera's world transform.
    pub fn view_matrix(&self) -> Mat4 {
        (Mat4::from_translation(self.position) * Mat4::from_quat(self.rotation)).inverse()
    }

    /// Reverse-Z perspective projection (near and far swapped).
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.far, self.near)
    }

    /// Combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Place the camera at `distance` along `direction` from `target`,
    /// looking back at it.
    pub fn orbit(&mut self, target: Vec3, direction: Vec3, distance: f32) {
        let direction = direction.normalize_or(Vec3::Z);
        self.position = target + direction * distance;
        self.rotation = Quat::from_mat4(&Mat4::look_at_rh(self.position, target, Vec3::Y).inverse());
    }

    /// Update the aspect ratio after a window resize.
    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) {
        self.aspect_ratio = width / height.max(1.0);
    }

    /// Pack the camera state for GPU upload, pre-multiplied with a model
    /// matrix so the shader sees a single transform.
    pub fn to_uniform(&self, model: Mat4) -> CameraUniform {
        CameraUniform {
            view_proj: (self.view_projection_matrix() * model).to_cols_array_2d(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect_ratio: 16.0 / 9.0,
            near: 0.1,
            far: 10_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_matrix_inverts_transform() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(0.0, 0.0, 100.0);
        let view = camera.view_matrix();
        let origin_in_view = view.transform_point3(Vec3::new(0.0, 0.0, 100.0));
        assert!(origin_in_view.length() < 1e-4);
    }

    #[test]
    fn test_orbit_looks_at_target() {
        let mut camera = Camera::default();
        camera.orbit(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), 50.0);
        assert!((camera.position - Vec3::new(0.0, 0.0, 50.0)).length() < 1e-4);
        // The target should project in front of the camera (negative view z).
        let target_in_view = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(target_in_view.z < 0.0);
        assert!(target_in_view.truncate().length() < 1e-3);
    }

    #[test]
    fn test_reverse_z_depth_ordering() {
        let mut camera = Camera::default();
        camera.orbit(Vec3::ZERO, Vec3::Z, 10.0);
        let view_proj = camera.view_projection_matrix();
        let near_point = view_proj.project_point3(Vec3::new(0.0, 0.0, 9.0));
        let far_point = view_proj.project_point3(Vec3::new(0.0, 0.0, -90.0));
        // Reverse-Z: closer geometry has larger depth.
        assert!(near_point.z > far_point.z);
    }

    #[test]
    fn test_aspect_ratio_guard() {
        let mut camera = Camera::default();
        camera.set_aspect_ratio(1280.0, 0.0);
        assert!(camera.aspect_ratio.is_finite());
    }
}
