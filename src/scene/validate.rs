use crate::foundation::core::{Axis, Vec3};
use crate::scene::model::{Scene, Shape};

/// Material name the renderer reserves for its own fallback material.
pub const RESERVED_MATERIAL: &str = "default";

/// One invariant violation found in a [`Scene`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Defect {
    #[error("object #{object} references missing material '{material}'")]
    DanglingMaterial { object: usize, material: String },

    #[error("scene bounds are degenerate on the {} axis (min {min} >= max {max})", .axis.name())]
    DegenerateBounds { axis: Axis, min: f64, max: f64 },

    #[error("{field} must be >= 0 (got {value})")]
    Negative { field: String, value: f64 },

    #[error("{field} is not a finite number")]
    NonFinite { field: String },

    #[error("material name 'default' is reserved by the renderer")]
    ReservedMaterialName,

    #[error("window width/height must be > 0")]
    ZeroWindowSize,
}

/// Check every invariant of `scene` and return all defects found.
///
/// Never fails; an empty list means the scene is safe to hand to the renderer.
pub fn validate(scene: &Scene) -> Vec<Defect> {
    let mut out = Vec::new();

    for (i, obj) in scene.objects.iter().enumerate() {
        if !scene.materials.contains_key(&obj.material) {
            out.push(Defect::DanglingMaterial {
                object: i,
                material: obj.material.clone(),
            });
        }
    }

    for axis in Axis::ALL {
        let (min, max) = (scene.bounds.min.get(axis), scene.bounds.max.get(axis));
        // NaN bounds are reported as non-finite below.
        if min >= max {
            out.push(Defect::DegenerateBounds { axis, min, max });
        }
    }

    if scene.window.width == 0 || scene.window.height == 0 {
        out.push(Defect::ZeroWindowSize);
    }
    if scene.materials.contains_key(RESERVED_MATERIAL) {
        out.push(Defect::ReservedMaterialName);
    }

    let mut nums = NumberCheck { out: &mut out };
    nums.scalar_nonneg(
        "raytracer.photon_search_radius",
        scene.raytracer.photon_search_radius,
    );
    nums.vec("bounds.min", scene.bounds.min);
    nums.vec("bounds.max", scene.bounds.max);

    let cam = &scene.camera;
    nums.vec("camera.eye", cam.eye);
    nums.vec("camera.look_at", cam.look_at);
    nums.vec("camera.view_plane", cam.view_plane);
    if let Some(fov) = cam.fov_deg {
        nums.scalar_nonneg("camera.fov_deg", fov);
    }
    nums.scalar_nonneg("camera.focal_plane_dist", cam.focal_plane_dist);
    nums.scalar_nonneg("camera.lens_aperture", cam.lens_aperture);

    for (i, light) in scene.lights.iter().enumerate() {
        nums.vec(&format!("lights[{i}].position"), light.position);
        nums.vec(&format!("lights[{i}].power"), light.power);
        nums.scalar(&format!("lights[{i}].fov_deg"), light.fov_deg);
        nums.scalar_nonneg(&format!("lights[{i}].radius"), light.radius);
    }

    for (i, obj) in scene.objects.iter().enumerate() {
        match &obj.shape {
            Shape::Plane { normal, distance } => {
                nums.vec(&format!("objects[{i}].normal"), *normal);
                nums.scalar(&format!("objects[{i}].distance"), *distance);
            }
            Shape::Ellipsoid { position, radii } => {
                nums.vec(&format!("objects[{i}].position"), *position);
                nums.vec(&format!("objects[{i}].radii"), *radii);
            }
            Shape::Box { position, size } | Shape::Cylinder { position, size, .. } => {
                nums.vec(&format!("objects[{i}].position"), *position);
                nums.vec(&format!("objects[{i}].size"), *size);
            }
        }
    }

    for (name, mat) in &scene.materials {
        nums.scalar(
            &format!("materials.{name}.refraction_index"),
            mat.refraction_index,
        );
        nums.scalar(
            &format!("materials.{name}.specular_exponent"),
            mat.specular_exponent,
        );
        if let Some(beer) = mat.beer_coefficient {
            nums.scalar_nonneg(&format!("materials.{name}.beer_coefficient"), beer);
        }
        nums.vec(
            &format!("materials.{name}.diffuse_reflectiveness"),
            mat.diffuse_reflectiveness,
        );
        nums.vec(
            &format!("materials.{name}.specular_reflectiveness"),
            mat.specular_reflectiveness,
        );
        nums.vec(
            &format!("materials.{name}.specular_refractiveness"),
            mat.specular_refractiveness,
        );
    }

    out
}

struct NumberCheck<'a> {
    out: &'a mut Vec<Defect>,
}

impl NumberCheck<'_> {
    fn scalar(&mut self, field: &str, v: f64) {
        if !v.is_finite() {
            self.out.push(Defect::NonFinite {
                field: field.to_string(),
            });
        }
    }

    fn scalar_nonneg(&mut self, field: &str, v: f64) {
        if !v.is_finite() {
            self.scalar(field, v);
        } else if v < 0.0 {
            self.out.push(Defect::Negative {
                field: field.to_string(),
                value: v,
            });
        }
    }

    fn vec(&mut self, field: &str, v: Vec3) {
        if !v.is_finite() {
            self.scalar(field, f64::NAN);
        }
    }
}
