use std::f64::consts::TAU;

use photonreel::{FrameIndex, FrameSweep, SerializeMode, Vec3, scene::presets, serialize};

#[test]
fn orbit_sweep_over_one_turn_yields_126_frames() {
    let preset = presets::room1().unwrap();
    let sweep = FrameSweep::new(preset.scene, preset.sweep).unwrap();
    assert_eq!(sweep.planned_len(), 126);

    let frames: Vec<_> = sweep.iter().collect();
    assert_eq!(frames.len(), 126);

    let first = &frames[0];
    assert_eq!(first.index, FrameIndex(0));
    assert_eq!(first.scene.lights[0].position, Vec3::new(0.0, 14.0, 15.0));

    let last = &frames[125];
    assert_eq!(last.index, FrameIndex(125));
    assert!(last.value <= TAU);
    assert!(last.value + 0.05 > TAU);
    let expected = Vec3::new(15.0 * last.value.sin(), 14.0, 15.0 * last.value.cos());
    assert_eq!(last.scene.lights[0].position, expected);
}

#[test]
fn swept_values_increase_strictly() {
    let preset = presets::room1().unwrap();
    let sweep = FrameSweep::new(preset.scene, preset.sweep).unwrap();
    let values: Vec<f64> = sweep.iter().map(|f| f.value).collect();
    assert!(values.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn only_the_swept_field_changes() {
    let preset = presets::room1().unwrap();
    let template = preset.scene.clone();
    let sweep = FrameSweep::new(preset.scene, preset.sweep).unwrap();
    for frame in sweep.iter().step_by(25) {
        let mut scene = frame.scene.clone();
        scene.lights[0].position = template.lights[0].position;
        assert_eq!(scene, template);
    }
}

#[test]
fn sweeps_are_restartable_and_deterministic() {
    let preset = presets::gallery().unwrap();
    let sweep = FrameSweep::new(preset.scene, preset.sweep).unwrap();
    let a: Vec<String> = sweep
        .iter()
        .take(5)
        .map(|f| serialize(&f.scene, SerializeMode::Strict).unwrap())
        .collect();
    let b: Vec<String> = (&sweep)
        .into_iter()
        .take(5)
        .map(|f| serialize(&f.scene, SerializeMode::Strict).unwrap())
        .collect();
    assert_eq!(a, b);
    assert_ne!(a[0], a[1]);
}

#[test]
fn gallery_light_slides_along_x() {
    let preset = presets::gallery().unwrap();
    let sweep = FrameSweep::new(preset.scene, preset.sweep).unwrap();
    let frames: Vec<_> = sweep.iter().collect();
    assert_eq!(frames[0].scene.lights[2].position, Vec3::new(-35.0, 19.0, 2.0));
    let last = frames.last().unwrap();
    assert!(last.value <= 35.0 && last.value > 34.5);
    assert_eq!(last.scene.lights[2].position.y, 19.0);
    assert_eq!(last.scene.lights[1], frames[0].scene.lights[1]);
}
