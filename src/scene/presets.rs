//! Built-in room templates, each paired with the sweep it was designed for.

use std::f64::consts::TAU;

use crate::foundation::core::{Axis, FrameIndex, FrameRange, Vec3};
use crate::foundation::error::{PhotonError, PhotonResult};
use crate::scene::builder::SceneBuilder;
use crate::scene::model::{
    Bounds, Camera, Light, Material, Object, RaytracerSettings, Scene, WindowSettings,
};
use crate::sweep::{SweepConfig, SweepParam};

/// Names accepted by [`by_name`], in listing order.
pub const PRESET_NAMES: [&str; 3] = ["room1", "room2", "gallery"];

/// Upper bound on generated frames for presets whose sweep stops on its value bound.
const OPEN_FRAME_CAP: u64 = 100_000;

#[derive(Debug, Clone)]
pub struct Preset {
    pub name: &'static str,
    pub summary: &'static str,
    pub scene: Scene,
    pub sweep: SweepConfig,
}

pub fn by_name(name: &str) -> PhotonResult<Preset> {
    match name {
        "room1" => room1(),
        "room2" => room2(),
        "gallery" => gallery(),
        _ => Err(unknown_preset(name)),
    }
}

pub(crate) fn unknown_preset(name: &str) -> PhotonError {
    PhotonError::validation(format!(
        "unknown preset '{name}' (available: {})",
        PRESET_NAMES.join(", ")
    ))
}

pub fn is_known(name: &str) -> bool {
    PRESET_NAMES.contains(&name)
}

/// Closed six-plane room with two glass spheres; the light orbits the room once.
pub fn room1() -> PhotonResult<Preset> {
    let objects = vec![
        Object::plane(Vec3::new(0.0, 1.0, 0.0), -20.0, "mattWhite").labelled("floor"),
        Object::plane(Vec3::new(0.0, -1.0, 0.0), -20.0, "mattWhite").labelled("ceiling"),
        Object::plane(Vec3::new(1.0, 0.0, 0.0), -20.0, "mattGreen").labelled("left wall"),
        Object::plane(Vec3::new(-1.0, 0.0, 0.0), -20.0, "mattRed").labelled("right wall"),
        Object::plane(Vec3::new(0.0, 0.0, 1.0), -20.0, "mattWhite").labelled("rear wall"),
        Object::plane(Vec3::new(0.0, 0.0, -1.0), 20.0, "mattBlack")
            .labelled("front wall, behind the camera"),
        Object::ellipsoid(Vec3::new(-10.0, -12.0, -2.0), Vec3::splat(7.0), "glassWhite")
            .labelled("left sphere"),
        Object::ellipsoid(Vec3::new(10.0, -10.0, 2.0), Vec3::splat(7.0), "glassRefract")
            .labelled("right sphere"),
    ];

    let scene = SceneBuilder::new(Bounds::cube(25.0))
        .light(
            Light::positional(Vec3::new(0.0, 14.0, 15.0), Vec3::splat(1000.0), 250_000)
                .radius(1.0),
        )
        .objects(objects);
    let scene = palette(
        scene,
        &[
            "mattBlue",
            "mattGreen",
            "mattRed",
            "mattWhite",
            "mattBlack",
            "glassWhite",
            "glassRefract",
        ],
    )?;

    Ok(Preset {
        name: "room1",
        summary: "six-plane room, two glass spheres, light orbiting once at height 14",
        scene,
        sweep: SweepConfig {
            frames: open_frames(),
            param: SweepParam::LightOrbit {
                light: 0,
                center: Vec3::new(0.0, 14.0, 0.0),
                radius: 15.0,
            },
            start: 0.0,
            step: 0.05,
            bound: TAU,
        },
    })
}

/// Gold-walled room with glass spheres and boxes under a fixed light.
pub fn room2() -> PhotonResult<Preset> {
    let objects = vec![
        Object::plane(Vec3::new(0.0, 1.0, 0.0), -20.0, "Wheat").labelled("floor"),
        Object::plane(Vec3::new(0.0, -1.0, 0.0), -20.0, "mattWhite").labelled("ceiling"),
        Object::plane(Vec3::new(1.0, 0.0, 0.0), -20.0, "Goldenrod").labelled("left wall"),
        Object::plane(Vec3::new(-1.0, 0.0, 0.0), -20.0, "Wheat").labelled("right wall"),
        Object::plane(Vec3::new(0.0, 0.0, 1.0), -20.0, "Gold").labelled("rear wall"),
        Object::plane(Vec3::new(0.0, 0.0, -1.0), -20.0, "Gold").labelled("front wall"),
        Object::ellipsoid(Vec3::new(-5.0, -10.0, 5.0), Vec3::splat(5.0), "glassWhite")
            .labelled("left sphere"),
        Object::ellipsoid(Vec3::new(5.0, -10.0, -5.0), Vec3::splat(5.0), "glassRefract")
            .labelled("right sphere"),
        Object::cuboid(
            Vec3::new(0.0, -15.0, 0.0),
            Vec3::new(30.0, 1.0, 30.0),
            "glassWhite2",
        ),
        Object::cuboid(
            Vec3::new(0.0, 0.0, -19.0),
            Vec3::new(30.0, 30.0, 1.0),
            "glassWhite",
        ),
        Object::cuboid(
            Vec3::new(-19.0, 0.0, 0.0),
            Vec3::new(1.0, 30.0, 30.0),
            "glassWhite",
        ),
    ];

    let scene = SceneBuilder::new(Bounds::cube(25.0))
        .camera(Camera {
            eye: Vec3::new(30.0, 10.0, 30.0),
            ..Camera::default()
        })
        .light(Light::positional(
            Vec3::new(0.0, 18.0, 0.0),
            Vec3::splat(1000.0),
            0,
        ))
        .objects(objects);
    let scene = palette(
        scene,
        &[
            "Goldenrod",
            "Wheat",
            "Gold",
            "mattWhite",
            "glassWhite",
            "glassRefract",
            "glassWhite2",
        ],
    )?;

    Ok(Preset {
        name: "room2",
        summary: "gold room with glass spheres and panes, static light",
        scene,
        sweep: SweepConfig {
            frames: FrameRange {
                start: FrameIndex(0),
                end: FrameIndex(1),
            },
            param: SweepParam::Fixed,
            start: 0.0,
            step: 1.0,
            bound: 0.0,
        },
    })
}

/// Box-built hall with two benches and a glass table; the third light slides along x.
pub fn gallery() -> PhotonResult<Preset> {
    let mut objects = vec![
        Object::plane(Vec3::new(0.0, 1.0, 0.0), -20.0, "Wheat").labelled("floor"),
        Object::cuboid(
            Vec3::new(0.0, 20.0, 0.0),
            Vec3::new(50.0, 1.0, 90.0),
            "mattWhite",
        )
        .labelled("ceiling"),
        Object::cuboid(
            Vec3::new(-25.0, -5.0, -10.0),
            Vec3::new(1.0, 40.0, 100.0),
            "mattWhite",
        )
        .labelled("left wall"),
        Object::cuboid(
            Vec3::new(25.0, -5.0, -10.0),
            Vec3::new(1.0, 40.0, 100.0),
            "mattWhite",
        )
        .labelled("right wall"),
    ];
    objects.extend(bench(1.0, "mattRed"));
    objects.extend(bench(-1.0, "mattBlue"));
    objects.extend(wall_stripes(-24.0));
    objects.extend(wall_stripes(24.0));
    objects.extend([
        Object::cuboid(
            Vec3::new(-24.0, 0.0, 0.0),
            Vec3::new(1.0, 25.0, 35.0),
            "glassWhite",
        )
        .labelled("left mirror"),
        Object::cuboid(
            Vec3::new(24.0, 0.0, 0.0),
            Vec3::new(1.0, 25.0, 35.0),
            "glassWhite",
        )
        .labelled("right mirror"),
        Object::cuboid(
            Vec3::new(0.0, -12.0, 0.0),
            Vec3::new(10.0, 1.0, 20.0),
            "glassRefract",
        )
        .labelled("table top"),
        Object::cylinder(
            Vec3::new(0.0, -16.0, 4.0),
            Vec3::new(6.0, 1.5, 1.5),
            Axis::Y,
            "Goldenrod",
        ),
        Object::cylinder(
            Vec3::new(0.0, -16.0, -4.0),
            Vec3::new(6.0, 1.5, 1.5),
            Axis::Y,
            "Goldenrod",
        ),
        Object::ellipsoid(Vec3::new(0.0, -8.5, 0.0), Vec3::splat(3.0), "glassWhite")
            .labelled("sphere on the table"),
        Object::cuboid(
            Vec3::new(0.0, -16.0, 0.0),
            Vec3::new(8.0, 1.0, 18.0),
            "glassRefract",
        )
        .labelled("table shelf"),
        Object::cuboid(
            Vec3::new(-20.0, 0.0, -40.0),
            Vec3::new(20.0, 40.0, 40.0),
            "Wheat",
        ),
        Object::cuboid(
            Vec3::new(20.0, 0.0, -40.0),
            Vec3::new(20.0, 40.0, 40.0),
            "Wheat",
        ),
        Object::cuboid(
            Vec3::new(0.0, 20.0, -40.0),
            Vec3::new(50.0, 20.0, 40.0),
            "Wheat",
        )
        .labelled("rear arch"),
        Object::cuboid(
            Vec3::new(15.0, -2.0, -20.0),
            Vec3::new(5.0, 20.0, 1.0),
            "glassWhite",
        ),
        Object::cuboid(
            Vec3::new(-15.0, -2.0, -20.0),
            Vec3::new(5.0, 20.0, 1.0),
            "glassWhite",
        ),
    ]);

    let scene = SceneBuilder::new(Bounds::cube(85.0))
        .raytracer(RaytracerSettings {
            anti_aliasing: false,
            max_photon_depth: 10,
            ..RaytracerSettings::default()
        })
        .window(WindowSettings {
            keep_open: false,
            ..WindowSettings::default()
        })
        .camera(Camera {
            eye: Vec3::new(-10.0, 0.0, 32.0),
            look_at: Vec3::new(0.0, 0.0, 80.0),
            fov_deg: Some(110.0),
            ..Camera::default()
        })
        .light(Light::positional(Vec3::new(0.0, 10.0, 50.0), Vec3::splat(1000.0), 0))
        .light(Light::positional(Vec3::new(-32.0, 19.0, 2.0), Vec3::splat(1000.0), 0))
        .light(Light::positional(
            Vec3::new(-35.0, 19.0, 2.0),
            Vec3::splat(1000.0),
            2_000_000,
        ))
        .objects(objects);
    let scene = palette(
        scene,
        &[
            "Wheat",
            "mattWhite",
            "mattRed",
            "mattBlue",
            "Goldenrod",
            "glassWhite",
            "glassRefract",
        ],
    )?;

    Ok(Preset {
        name: "gallery",
        summary: "hall with benches and a glass table, light sliding from x=-35 to x=35",
        scene,
        sweep: SweepConfig {
            frames: open_frames(),
            param: SweepParam::LightAxis {
                light: 2,
                axis: Axis::X,
            },
            start: -35.0,
            step: 0.2,
            bound: 35.0,
        },
    })
}

fn open_frames() -> FrameRange {
    FrameRange {
        start: FrameIndex(0),
        end: FrameIndex(OPEN_FRAME_CAP),
    }
}

/// Seat, back and two side panels. `side` is +1 for the right bench, -1 for the left.
fn bench(side: f64, material: &str) -> [Object; 4] {
    [
        Object::cuboid(
            Vec3::new(15.0 * side, -15.0, 0.0),
            Vec3::new(10.0, 1.0, 15.0),
            material,
        ),
        Object::cuboid(
            Vec3::new(18.0 * side, -12.0, 0.0),
            Vec3::new(4.0, 4.0, 15.0),
            material,
        ),
        Object::cuboid(
            Vec3::new(16.0 * side, -15.0, 7.0),
            Vec3::new(8.0, 10.0, 1.0),
            material,
        ),
        Object::cuboid(
            Vec3::new(16.0 * side, -15.0, -7.0),
            Vec3::new(8.0, 10.0, 1.0),
            material,
        ),
    ]
}

fn wall_stripes(x: f64) -> [Object; 3] {
    [0.0, -12.0, 12.0].map(|z| {
        Object::cuboid(
            Vec3::new(x, 0.0, z),
            Vec3::new(3.0, 50.0, 2.0),
            "Goldenrod",
        )
    })
}

/// Register the named library materials and finish the scene.
fn palette(mut builder: SceneBuilder, names: &[&str]) -> PhotonResult<Scene> {
    for name in names {
        let material = library_material(name).ok_or_else(|| {
            PhotonError::validation(format!("no library material named '{name}'"))
        })?;
        builder = builder.material(*name, material)?;
    }
    builder.build()
}

fn library_material(name: &str) -> Option<Material> {
    let m = match name {
        "mattBlue" => Material::matte(Vec3::new(0.1, 0.1, 0.8), 3.0),
        "mattGreen" => Material::matte(Vec3::new(0.4, 0.8, 0.4), 3.0),
        "mattRed" => Material::matte(Vec3::new(0.8, 0.4, 0.4), 3.0),
        "mattWhite" => Material::matte(Vec3::splat(0.9), 12.0),
        "mattBlack" => Material::matte(Vec3::ZERO, 0.0),
        "Goldenrod" => Material::matte(Vec3::new(0.85, 0.64, 0.12), 3.0),
        "Wheat" => Material::matte(Vec3::new(0.96, 0.87, 0.70), 3.0),
        "Gold" => Material::matte(Vec3::new(1.0, 0.84, 0.0), 3.0),
        "glassWhite" => Material::matte(Vec3::splat(0.4), 12.0)
            .specular(Vec3::splat(0.6))
            .refraction_index(1.0),
        "glassWhite2" => Material::matte(Vec3::splat(0.8), 12.0)
            .specular(Vec3::splat(0.2))
            .refraction_index(1.0),
        "glassRefract" => Material::matte(Vec3::ZERO, 12.0)
            .specular(Vec3::splat(0.1))
            .refractive(1.33, 20.0, Vec3::splat(0.9)),
        _ => return None,
    };
    Some(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::validate::validate;

    #[test]
    fn every_preset_is_well_formed() {
        for name in PRESET_NAMES {
            let preset = by_name(name).unwrap();
            assert_eq!(preset.name, name);
            assert!(validate(&preset.scene).is_empty(), "preset {name}");
        }
        let err = by_name("room9").unwrap_err().to_string();
        assert!(err.contains("room1, room2, gallery"), "{err}");
        assert!(is_known("gallery"));
        assert!(!is_known("room9"));
    }

    #[test]
    fn palettes_contain_every_requested_material() {
        assert_eq!(room1().unwrap().scene.materials.len(), 7);
        assert_eq!(room2().unwrap().scene.materials.len(), 7);
        assert_eq!(gallery().unwrap().scene.materials.len(), 7);
    }

    #[test]
    fn palette_fails_on_objects_without_a_material() {
        let builder = SceneBuilder::new(Bounds::cube(10.0))
            .object(Object::cuboid(Vec3::ZERO, Vec3::splat(1.0), "Marble"));
        let err = palette(builder, &["Wheat"]).unwrap_err();
        assert!(err.to_string().contains("missing material 'Marble'"), "{err}");

        let builder = SceneBuilder::new(Bounds::cube(10.0));
        assert!(palette(builder, &["Marble"]).is_err());
    }

    #[test]
    fn glass_refract_keeps_three_distinct_colour_terms() {
        let scene = room1().unwrap().scene;
        let glass = scene.material("glassRefract").unwrap();
        assert_eq!(glass.diffuse_reflectiveness, Vec3::ZERO);
        assert_eq!(glass.specular_reflectiveness, Vec3::splat(0.1));
        assert_eq!(glass.specular_refractiveness, Vec3::splat(0.9));
        assert_eq!(glass.beer_coefficient, Some(20.0));
    }

    #[test]
    fn gallery_sweeps_the_third_light() {
        let preset = gallery().unwrap();
        assert_eq!(preset.scene.lights.len(), 3);
        match preset.sweep.param {
            SweepParam::LightAxis { light, axis } => {
                assert_eq!(light, 2);
                assert_eq!(axis, Axis::X);
            }
            other => panic!("unexpected sweep {other:?}"),
        }
    }
}
