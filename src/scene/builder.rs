use std::collections::BTreeMap;

use crate::foundation::error::{PhotonError, PhotonResult};
use crate::scene::model::{
    Bounds, Camera, Light, Material, Object, RaytracerSettings, Scene, WindowSettings,
};
use crate::scene::validate::{Defect, validate};

/// Incremental [`Scene`] construction that resolves every material reference once, in `build`.
pub struct SceneBuilder {
    raytracer: RaytracerSettings,
    window: WindowSettings,
    bounds: Bounds,
    camera: Camera,
    lights: Vec<Light>,
    objects: Vec<Object>,
    materials: BTreeMap<String, Material>,
}

impl SceneBuilder {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            raytracer: RaytracerSettings::default(),
            window: WindowSettings::default(),
            bounds,
            camera: Camera::default(),
            lights: Vec::new(),
            objects: Vec::new(),
            materials: BTreeMap::new(),
        }
    }

    pub fn raytracer(mut self, raytracer: RaytracerSettings) -> Self {
        self.raytracer = raytracer;
        self
    }

    pub fn window(mut self, window: WindowSettings) -> Self {
        self.window = window;
        self
    }

    pub fn camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    pub fn light(mut self, light: Light) -> Self {
        self.lights.push(light);
        self
    }

    pub fn object(mut self, object: Object) -> Self {
        self.objects.push(object);
        self
    }

    pub fn objects(mut self, objects: impl IntoIterator<Item = Object>) -> Self {
        self.objects.extend(objects);
        self
    }

    pub fn material(mut self, name: impl Into<String>, material: Material) -> PhotonResult<Self> {
        let name = name.into();
        if self.materials.contains_key(&name) {
            return Err(PhotonError::validation(format!(
                "duplicate material name '{name}'"
            )));
        }
        self.materials.insert(name, material);
        Ok(self)
    }

    /// Finish the scene, failing on the first batch of defects.
    pub fn build(self) -> PhotonResult<Scene> {
        let scene = Scene {
            raytracer: self.raytracer,
            window: self.window,
            bounds: self.bounds,
            camera: self.camera,
            lights: self.lights,
            objects: self.objects,
            materials: self.materials,
        };
        ensure_valid(&scene)?;
        Ok(scene)
    }
}

/// `Err` listing every defect of `scene`, or `Ok` when there are none.
pub fn ensure_valid(scene: &Scene) -> PhotonResult<()> {
    let defects = validate(scene);
    if defects.is_empty() {
        return Ok(());
    }
    Err(PhotonError::validation(
        defects
            .iter()
            .map(Defect::to_string)
            .collect::<Vec<_>>()
            .join("; "),
    ))
}
