use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use photonreel::encode::assemble::frame_number;
use photonreel::{
    CommandOutput, FrameIndex, FrameStatus, FrameSweep, PhotonResult, RenderFailure, RunOpts, run,
    scene::presets,
};

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("pipeline_report").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn frames(n: u64) -> FrameSweep {
    let mut preset = presets::room1().unwrap();
    preset.sweep.frames.end = FrameIndex(n);
    FrameSweep::new(preset.scene, preset.sweep).unwrap()
}

#[test]
fn failure_set_matches_the_failing_frames_and_nothing_aborts() {
    let failing: BTreeSet<u64> = [1, 4, 5].into();
    let mut invoked = Vec::new();

    let mut renderer = |scene: &Path| -> PhotonResult<CommandOutput> {
        let index = frame_number(scene).unwrap();
        invoked.push(index);
        if failing.contains(&index) {
            return Ok(CommandOutput::exited(1).with_stderr("photon map overflow"));
        }
        std::fs::write(scene.with_extension("ppm"), "P3\n1 1\n255\n1 2 3\n").unwrap();
        Ok(CommandOutput::exited(0))
    };

    let opts = RunOpts::new(scratch("subset"));
    let report = run(&frames(8), &mut renderer, &opts).unwrap();

    assert_eq!(invoked, (0..8).collect::<Vec<_>>());
    let failed: BTreeSet<u64> = report.failures().iter().map(|f| f.index.0).collect();
    assert_eq!(failed, failing);

    for f in report.failures() {
        assert_eq!(
            f.status,
            FrameStatus::Failed(RenderFailure::Exit {
                code: Some(1),
                stderr: "photon map overflow".to_string()
            })
        );
    }

    let s = report.summary();
    assert_eq!((s.total, s.rendered, s.failed), (8, 5, 3));
    assert!(!s.is_clean());
    assert_eq!(report.rendered_images().len(), 5);
}

#[test]
fn every_frame_gets_its_own_scene_file() {
    let opts = RunOpts::new(scratch("files"));
    let mut renderer = |scene: &Path| -> PhotonResult<CommandOutput> {
        std::fs::write(scene.with_extension("ppm"), "P3\n1 1\n255\n0 0 0\n").unwrap();
        Ok(CommandOutput::exited(0))
    };
    let report = run(&frames(4), &mut renderer, &opts).unwrap();

    let mut texts = Vec::new();
    for (i, f) in report.frames.iter().enumerate() {
        let path = f.scene_path.as_ref().unwrap();
        assert_eq!(path, &opts.work_dir.join(format!("scene{i}.lua")));
        texts.push(std::fs::read_to_string(path).unwrap());
    }
    assert!(texts[0].starts_with("root = {"));
    assert_ne!(texts[0], texts[1]);
}
