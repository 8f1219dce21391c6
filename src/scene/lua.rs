//! Scene serializer for the renderer's Lua scene format.
//!
//! The renderer evaluates the file as a Lua chunk and reads the global `root` table. Material
//! scalars, material colour vectors and plane normals are divided by 100 on load, so those are
//! written as `<value> * 100` expressions rather than pre-multiplied literals.

use serde::{Deserialize, Serialize};

use crate::foundation::core::Vec3;
use crate::foundation::error::{PhotonError, PhotonResult};
use crate::scene::model::{
    Camera, Light, Material, Object, RaytracerSettings, Scene, Shape, WindowSettings,
};
use crate::scene::validate::{Defect, validate};

/// Fixed-point scale the renderer divides material values and plane normals by.
pub const PERCENT_SCALE: u32 = 100;

/// What to do when the scene has defects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializeMode {
    /// Refuse to serialize and return every defect.
    #[default]
    Strict,
    /// Log each defect as a warning and serialize as-is.
    Lenient,
}

/// Render `scene` as a renderer scene file.
///
/// Output is a pure function of the scene value: materials are written in name order, lights and
/// objects in model order.
pub fn serialize(scene: &Scene, mode: SerializeMode) -> PhotonResult<String> {
    Serializer::new(mode).serialize(scene)
}

/// Serializer for a sequence of scenes. In lenient mode each distinct defect is logged once,
/// however many frames carry it.
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    mode: SerializeMode,
    reported: Vec<Defect>,
}

impl Serializer {
    pub fn new(mode: SerializeMode) -> Self {
        Self {
            mode,
            reported: Vec::new(),
        }
    }

    pub fn serialize(&mut self, scene: &Scene) -> PhotonResult<String> {
        let defects = validate(scene);
        if !defects.is_empty() {
            match self.mode {
                SerializeMode::Strict => return Err(PhotonError::defects(defects)),
                SerializeMode::Lenient => {
                    for d in defects {
                        if !self.reported.contains(&d) {
                            tracing::warn!(defect = %d, "serializing scene with defect");
                            self.reported.push(d);
                        }
                    }
                }
            }
        }
        Ok(write_scene(scene))
    }

    /// Defects logged so far, in first-seen order.
    pub fn reported(&self) -> &[Defect] {
        &self.reported
    }
}

fn write_scene(scene: &Scene) -> String {
    let mut w = LuaWriter::default();
    w.open("root");
    write_raytracer(&mut w, &scene.raytracer);
    w.blank();
    write_window(&mut w, &scene.window);
    w.blank();

    w.open("scene");
    w.field("minBounds", &vec3(scene.bounds.min));
    w.field("maxBounds", &vec3(scene.bounds.max));
    w.blank();
    write_camera(&mut w, &scene.camera);
    w.blank();

    w.open("lights");
    for (i, light) in scene.lights.iter().enumerate() {
        write_light(&mut w, i + 1, light);
    }
    w.close();
    w.blank();

    w.open("objects");
    for (i, obj) in scene.objects.iter().enumerate() {
        write_object(&mut w, i + 1, obj);
    }
    w.close();
    w.blank();

    w.open("materials");
    for (i, (name, mat)) in scene.materials.iter().enumerate() {
        write_material(&mut w, i + 1, name, mat);
    }
    w.close();

    w.close(); // scene
    w.close(); // root
    w.finish()
}

fn write_raytracer(w: &mut LuaWriter, rt: &RaytracerSettings) {
    w.open("raytracer");
    w.field("numThreads", &rt.num_threads.to_string());
    w.field("maxRayDepth", &rt.max_ray_depth.to_string());
    w.field("antiAliasing", flag(rt.anti_aliasing));
    w.field("incrementalRender", flag(rt.incremental_render));
    w.field("maxPhotonDepth", &rt.max_photon_depth.to_string());
    w.field("photonSearchCount", &rt.photon_search_count.to_string());
    w.field("photonSearchRadius", &num(rt.photon_search_radius));
    w.close();
}

fn write_window(w: &mut LuaWriter, win: &WindowSettings) {
    w.open("window");
    w.field("xsize", &win.width.to_string());
    w.field("ysize", &win.height.to_string());
    w.field("title", &string(&win.title));
    w.field("autoShow", flag(win.auto_show));
    w.field("keepOpen", flag(win.keep_open));
    w.field("makeDump", flag(win.dump_to_file));
    w.close();
}

fn write_camera(w: &mut LuaWriter, cam: &Camera) {
    w.open("camera");
    w.field("pos", &vec3(cam.eye));
    w.field("vrp", &vec3(cam.look_at));
    w.field("vplane", &vec3(cam.view_plane));
    if let Some(fov) = cam.fov_deg {
        w.field("vfov", &num(fov));
    }
    w.field("renderDOF", flag(cam.depth_of_field));
    w.field("fplaneDist", &num(cam.focal_plane_dist));
    w.field("lensAperture", &num(cam.lens_aperture));
    w.close();
}

fn write_light(w: &mut LuaWriter, index: usize, light: &Light) {
    w.open_index(index);
    w.field("type", &string(light.kind.as_str()));
    w.field("position", &vec3(light.position));
    w.field("power", &vec3(light.power));
    w.field("numPhotons", &light.num_photons.to_string());
    w.field("fov", &num(light.fov_deg));
    w.field("radius", &num(light.radius));
    w.close();
}

fn write_object(w: &mut LuaWriter, index: usize, obj: &Object) {
    w.open_index(index);
    if let Some(label) = &obj.label {
        w.comment(label);
    }
    w.field("type", &string(obj.shape.type_name()));
    match &obj.shape {
        Shape::Plane { normal, distance } => {
            w.field("normal", &scaled_vec3(*normal));
            w.field("distance", &num(*distance));
        }
        Shape::Ellipsoid { position, radii } => {
            w.field("position", &vec3(*position));
            w.field("size", &vec3(*radii));
        }
        Shape::Box { position, size } => {
            w.field("position", &vec3(*position));
            w.field("size", &vec3(*size));
        }
        Shape::Cylinder {
            position,
            size,
            axis,
        } => {
            w.field("position", &vec3(*position));
            w.field("size", &vec3(*size));
            w.field("axis", &axis.index().to_string());
        }
    }
    w.field("material", &string(&obj.material));
    w.close();
}

fn write_material(w: &mut LuaWriter, index: usize, name: &str, mat: &Material) {
    w.open_index(index);
    w.field("type", &string(name));
    w.field("refractionIndex", &scaled(mat.refraction_index));
    if let Some(beer) = mat.beer_coefficient {
        w.field("beerCoefficient", &scaled(beer));
    }
    w.field("specularExponent", &scaled(mat.specular_exponent));
    w.field(
        "diffuseReflectiveness",
        &scaled_vec3(mat.diffuse_reflectiveness),
    );
    w.field(
        "specularReflectiveness",
        &scaled_vec3(mat.specular_reflectiveness),
    );
    w.field(
        "specularRefractiveness",
        &scaled_vec3(mat.specular_refractiveness),
    );
    w.close();
}

#[derive(Default)]
struct LuaWriter {
    buf: String,
    depth: usize,
}

impl LuaWriter {
    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.buf.push('\t');
        }
    }

    fn open(&mut self, key: &str) {
        self.indent();
        self.buf.push_str(key);
        self.buf.push_str(" = {\n");
        self.depth += 1;
    }

    fn open_index(&mut self, index: usize) {
        self.indent();
        self.buf.push_str(&format!("[{index}] = {{\n"));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        // The outermost table is a statement, not a field.
        self.buf.push_str(if self.depth == 0 { "}\n" } else { "},\n" });
    }

    fn field(&mut self, key: &str, value: &str) {
        self.indent();
        self.buf.push_str(key);
        self.buf.push_str(" = ");
        self.buf.push_str(value);
        self.buf.push_str(",\n");
    }

    fn comment(&mut self, text: &str) {
        self.indent();
        self.buf.push_str("-- ");
        for c in text.chars() {
            self.buf.push(if c == '\n' || c == '\r' { ' ' } else { c });
        }
        self.buf.push('\n');
    }

    fn blank(&mut self) {
        self.buf.push('\n');
    }

    fn finish(self) -> String {
        self.buf
    }
}

fn flag(v: bool) -> &'static str {
    if v { "1" } else { "0" }
}

/// Shortest representation that parses back to the same `f64`, always with a decimal point or
/// exponent so it reads as a float.
fn num(v: f64) -> String {
    format!("{v:?}")
}

fn scaled(v: f64) -> String {
    format!("{} * {PERCENT_SCALE}", num(v))
}

fn vec3(v: Vec3) -> String {
    format!("{{{}, {}, {}}}", num(v.x), num(v.y), num(v.z))
}

fn scaled_vec3(v: Vec3) -> String {
    format!("{{{}, {}, {}}}", scaled(v.x), scaled(v.y), scaled(v.z))
}

fn string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\{:03}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Axis;
    use crate::scene::model::{Bounds, Material};
    use crate::scene::presets;

    fn two_material_scene() -> Scene {
        let mut scene = Scene {
            raytracer: Default::default(),
            window: Default::default(),
            bounds: Bounds::cube(25.0),
            camera: Default::default(),
            lights: vec![Light::positional(
                Vec3::new(0.0, 14.0, 15.0),
                Vec3::splat(1000.0),
                250_000,
            )
            .radius(1.0)],
            objects: vec![
                Object::plane(Vec3::new(0.0, 1.0, 0.0), -20.0, "mattWhite").labelled("floor"),
                Object::cylinder(
                    Vec3::new(0.0, -16.0, 4.0),
                    Vec3::new(6.0, 1.5, 1.5),
                    Axis::Y,
                    "glassRefract",
                ),
            ],
            materials: Default::default(),
        };
        scene.materials.insert(
            "mattWhite".to_string(),
            Material::matte(Vec3::splat(0.9), 12.0),
        );
        scene.materials.insert(
            "glassRefract".to_string(),
            Material::matte(Vec3::ZERO, 12.0)
                .specular(Vec3::splat(0.1))
                .refractive(1.33, 20.0, Vec3::splat(0.9)),
        );
        scene
    }

    #[test]
    fn numbers_round_trip_exactly() {
        for v in [0.05, 1.0 / 3.0, -20.0, 6.25, 1e-7, 123456.789] {
            let s = num(v);
            assert_eq!(s.parse::<f64>().unwrap(), v);
        }
        assert_eq!(num(15.0), "15.0");
    }

    #[test]
    fn strings_are_quoted_and_escaped() {
        assert_eq!(string("Kiran"), "\"Kiran\"");
        assert_eq!(string("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
    }

    #[test]
    fn output_contains_expected_fields() {
        let out = serialize(&two_material_scene(), SerializeMode::Strict).unwrap();
        assert!(out.starts_with("root = {\n\traytracer = {\n"));
        assert!(out.ends_with("\t},\n}\n"));
        assert!(out.contains("\t\t\t\t-- floor\n\t\t\t\ttype = \"plane\",\n"));
        assert!(out.contains("normal = {0.0 * 100, 1.0 * 100, 0.0 * 100},"));
        assert!(out.contains("axis = 1,"));
        assert!(out.contains("antiAliasing = 1,"));
        assert!(out.contains("minBounds = {-25.0, -25.0, -25.0},"));
        assert!(out.contains("beerCoefficient = 20.0 * 100,"));
        assert!(out.contains("specularRefractiveness = {0.9 * 100, 0.9 * 100, 0.9 * 100},"));
        assert!(!out.contains("vfov"));
    }

    #[test]
    fn materials_are_written_in_name_order() {
        let out = serialize(&two_material_scene(), SerializeMode::Strict).unwrap();
        let glass = out.find("type = \"glassRefract\"").unwrap();
        let white = out.find("type = \"mattWhite\",\n\t\t\t\trefractionIndex").unwrap();
        assert!(glass < white);
    }

    #[test]
    fn every_material_has_three_distinct_colour_fields() {
        let out = serialize(&two_material_scene(), SerializeMode::Strict).unwrap();
        assert_eq!(out.matches("diffuseReflectiveness").count(), 2);
        assert_eq!(out.matches("specularReflectiveness").count(), 2);
        assert_eq!(out.matches("specularRefractiveness").count(), 2);
    }

    #[test]
    fn serialization_is_deterministic() {
        let a = serialize(&presets::room1().unwrap().scene, SerializeMode::Strict).unwrap();
        let b = serialize(&presets::room1().unwrap().scene, SerializeMode::Strict).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn strict_mode_rejects_defects_and_lenient_mode_writes_anyway() {
        let mut scene = two_material_scene();
        scene.objects[1].material = "nope".to_string();

        let err = serialize(&scene, SerializeMode::Strict).unwrap_err();
        match err {
            PhotonError::Serialization { defects } => assert_eq!(defects.len(), 1),
            other => panic!("unexpected error: {other}"),
        }

        let out = serialize(&scene, SerializeMode::Lenient).unwrap();
        assert!(out.contains("material = \"nope\","));
    }

    #[test]
    fn lenient_serializer_reports_each_defect_once() {
        let mut scene = two_material_scene();
        scene.objects[1].material = "nope".to_string();

        let mut serializer = Serializer::new(SerializeMode::Lenient);
        for _ in 0..3 {
            serializer.serialize(&scene).unwrap();
        }
        assert_eq!(serializer.reported().len(), 1);

        scene.objects[0].material = "gone".to_string();
        serializer.serialize(&scene).unwrap();
        assert_eq!(serializer.reported().len(), 2);
    }

    #[test]
    fn optional_camera_fov_is_written_when_set() {
        let mut scene = two_material_scene();
        scene.camera.fov_deg = Some(110.0);
        let out = serialize(&scene, SerializeMode::Strict).unwrap();
        assert!(out.contains("vfov = 110.0,"));
    }
}
