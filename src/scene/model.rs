use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Axis, Rgb, Vec3};

/// Ray tracer and photon-mapping settings (`raytracer` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaytracerSettings {
    pub num_threads: u32,
    pub max_ray_depth: u32,
    pub anti_aliasing: bool,
    pub incremental_render: bool,
    pub max_photon_depth: u32,
    pub photon_search_count: u32,
    pub photon_search_radius: f64,
}

impl Default for RaytracerSettings {
    fn default() -> Self {
        Self {
            num_threads: 4,
            max_ray_depth: 4,
            anti_aliasing: true,
            incremental_render: true,
            max_photon_depth: 4,
            photon_search_count: 2000,
            photon_search_radius: 7.0,
        }
    }
}

/// Output window settings (`window` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub auto_show: bool,
    pub keep_open: bool,
    /// Whether the renderer writes the finished image to disk.
    pub dump_to_file: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            title: "Kiran".to_string(),
            auto_show: true,
            keep_open: true,
            dump_to_file: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub eye: Vec3,
    pub look_at: Vec3,
    /// View-plane width/height in world units; the third component is ignored.
    pub view_plane: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fov_deg: Option<f64>,
    #[serde(default)]
    pub depth_of_field: bool,
    pub focal_plane_dist: f64,
    pub lens_aperture: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 50.0),
            look_at: Vec3::ZERO,
            view_plane: Vec3::new(16.0, 12.0, 0.0),
            fov_deg: None,
            depth_of_field: false,
            focal_plane_dist: 150.0,
            lens_aperture: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    #[default]
    Positional,
}

impl LightKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LightKind::Positional => "positional",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    #[serde(default)]
    pub kind: LightKind,
    pub position: Vec3,
    pub power: Rgb,
    pub num_photons: u32,
    #[serde(default = "default_light_fov")]
    pub fov_deg: f64,
    /// Zero makes a point light, anything larger an area light.
    #[serde(default)]
    pub radius: f64,
}

fn default_light_fov() -> f64 {
    360.0
}

impl Light {
    pub fn positional(position: Vec3, power: Rgb, num_photons: u32) -> Self {
        Self {
            kind: LightKind::Positional,
            position,
            power,
            num_photons,
            fov_deg: default_light_fov(),
            radius: 0.0,
        }
    }

    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }
}

/// Geometric primitive of an [`Object`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Plane {
        normal: Vec3,
        /// Signed distance from the origin along `normal`.
        distance: f64,
    },
    #[serde(alias = "ellipse")]
    Ellipsoid { position: Vec3, radii: Vec3 },
    Box { position: Vec3, size: Vec3 },
    Cylinder {
        position: Vec3,
        size: Vec3,
        axis: Axis,
    },
}

impl Shape {
    /// Type name understood by the renderer.
    pub fn type_name(&self) -> &'static str {
        match self {
            Shape::Plane { .. } => "plane",
            Shape::Ellipsoid { .. } => "ellipse",
            Shape::Box { .. } => "box",
            Shape::Cylinder { .. } => "cylinder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(flatten)]
    pub shape: Shape,
    pub material: String,
    /// Free-form note, written as a comment next to the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Object {
    pub fn new(shape: Shape, material: impl Into<String>) -> Self {
        Self {
            shape,
            material: material.into(),
            label: None,
        }
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn plane(normal: Vec3, distance: f64, material: impl Into<String>) -> Self {
        Self::new(Shape::Plane { normal, distance }, material)
    }

    pub fn ellipsoid(position: Vec3, radii: Vec3, material: impl Into<String>) -> Self {
        Self::new(Shape::Ellipsoid { position, radii }, material)
    }

    pub fn cuboid(position: Vec3, size: Vec3, material: impl Into<String>) -> Self {
        Self::new(Shape::Box { position, size }, material)
    }

    pub fn cylinder(position: Vec3, size: Vec3, axis: Axis, material: impl Into<String>) -> Self {
        Self::new(
            Shape::Cylinder {
                position,
                size,
                axis,
            },
            material,
        )
    }
}

/// Surface description. The name is the key in [`Scene::materials`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    #[serde(default)]
    pub refraction_index: f64,
    #[serde(default = "default_specular_exponent")]
    pub specular_exponent: f64,
    /// Beer-Lambert absorption; only meaningful for refractive materials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beer_coefficient: Option<f64>,
    #[serde(default)]
    pub diffuse_reflectiveness: Rgb,
    #[serde(default)]
    pub specular_reflectiveness: Rgb,
    #[serde(default)]
    pub specular_refractiveness: Rgb,
}

fn default_specular_exponent() -> f64 {
    1.0
}

impl Material {
    /// Purely diffuse surface.
    pub fn matte(diffuse: Rgb, specular_exponent: f64) -> Self {
        Self {
            refraction_index: 0.0,
            specular_exponent,
            beer_coefficient: None,
            diffuse_reflectiveness: diffuse,
            specular_reflectiveness: Rgb::ZERO,
            specular_refractiveness: Rgb::ZERO,
        }
    }

    pub fn specular(mut self, reflect: Rgb) -> Self {
        self.specular_reflectiveness = reflect;
        self
    }

    /// Make the material transmit light: refraction index, Beer-Lambert absorption and the
    /// refracted share per channel.
    pub fn refractive(mut self, index: f64, beer: f64, refract: Rgb) -> Self {
        self.refraction_index = index;
        self.beer_coefficient = Some(beer);
        self.specular_refractiveness = refract;
        self
    }

    pub fn refraction_index(mut self, index: f64) -> Self {
        self.refraction_index = index;
        self
    }
}

/// Axis-aligned scene bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn cube(half_extent: f64) -> Self {
        Self {
            min: Vec3::splat(-half_extent),
            max: Vec3::splat(half_extent),
        }
    }
}

/// One renderable frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub raytracer: RaytracerSettings,
    #[serde(default)]
    pub window: WindowSettings,
    pub bounds: Bounds,
    #[serde(default)]
    pub camera: Camera,
    #[serde(default)]
    pub lights: Vec<Light>,
    #[serde(default)]
    pub objects: Vec<Object>,
    #[serde(default)]
    pub materials: BTreeMap<String, Material>,
}

impl Scene {
    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_json_is_flat_and_tagged() {
        let obj = Object::cylinder(
            Vec3::new(0.0, -16.0, 4.0),
            Vec3::new(6.0, 1.5, 1.5),
            Axis::Y,
            "Goldenrod",
        );
        let v = serde_json::to_value(&obj).unwrap();
        assert_eq!(v["type"], "cylinder");
        assert_eq!(v["axis"], "y");
        assert_eq!(v["material"], "Goldenrod");
        assert!(v.get("label").is_none());
    }

    #[test]
    fn ellipse_alias_is_accepted() {
        let obj: Object = serde_json::from_str(
            r#"{"type":"ellipse","position":[1,2,3],"radii":[7,7,7],"material":"glass"}"#,
        )
        .unwrap();
        assert_eq!(obj.shape.type_name(), "ellipse");
    }

    #[test]
    fn light_defaults_fill_missing_fields() {
        let light: Light = serde_json::from_str(
            r#"{"position":[0,14,15],"power":[1000,1000,1000],"num_photons":250000}"#,
        )
        .unwrap();
        assert_eq!(light.kind, LightKind::Positional);
        assert_eq!(light.fov_deg, 360.0);
        assert_eq!(light.radius, 0.0);
    }

    #[test]
    fn negative_photon_count_is_rejected_at_parse_time() {
        let res: Result<Light, _> = serde_json::from_str(
            r#"{"position":[0,0,0],"power":[1,1,1],"num_photons":-5}"#,
        );
        assert!(res.is_err());
    }
}
