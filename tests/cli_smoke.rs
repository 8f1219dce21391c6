use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use photonreel::{ProjectConfig, RendererConfig};

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_photonreel")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "photonreel.exe"
            } else {
                "photonreel"
            });
            p
        })
}

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("cli_smoke").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn photonreel(args: &[&str]) -> Output {
    Command::new(exe()).args(args).output().unwrap()
}

fn arg(p: &Path) -> String {
    p.to_string_lossy().to_string()
}

#[test]
fn cli_lists_presets() {
    let out = photonreel(&["presets"]);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    for name in photonreel::PRESET_NAMES {
        assert!(stdout.contains(name), "{stdout}");
    }
}

#[test]
fn cli_init_then_generate_writes_scene_files() {
    let dir = scratch("generate");
    let project = dir.join("project.json");
    let scenes = dir.join("scenes");

    let out = photonreel(&["init", "--preset", "room1", "--out", &arg(&project)]);
    assert!(out.status.success());
    let cfg = ProjectConfig::load(&project).unwrap();
    assert_eq!(cfg.preset.as_deref(), Some("room1"));

    let out = photonreel(&[
        "generate",
        "--config",
        &arg(&project),
        "--out-dir",
        &arg(&scenes),
        "--end-frame",
        "3",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    for i in 0..3 {
        let text = std::fs::read_to_string(scenes.join(format!("scene{i}.lua"))).unwrap();
        assert!(text.contains("root = {"));
    }
    assert!(!scenes.join("scene3.lua").exists());
}

#[test]
fn cli_unknown_preset_fails() {
    let dir = scratch("unknown_preset");
    let out = photonreel(&[
        "init",
        "--preset",
        "attic",
        "--out",
        &arg(&dir.join("p.json")),
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("room1"));
}

#[cfg(unix)]
fn project_with_renderer(dir: &Path, script: &str) -> PathBuf {
    let mut cfg = ProjectConfig::for_preset("room2").unwrap();
    cfg.renderer = RendererConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string(), "sh".to_string()],
        ..RendererConfig::default()
    };
    let path = dir.join("project.json");
    cfg.save(&path).unwrap();
    path
}

#[cfg(unix)]
#[test]
fn cli_render_runs_the_renderer_per_frame() {
    let dir = scratch("render_ok");
    let project = project_with_renderer(
        &dir,
        r#"printf 'P3\n1 1\n255\n10 20 30\n' > "${1%.lua}.ppm""#,
    );
    let work = dir.join("work");

    let out = photonreel(&[
        "render",
        "--config",
        &arg(&project),
        "--work-dir",
        &arg(&work),
        "--no-movie",
    ]);

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(work.join("scene0.lua").is_file());
    assert!(work.join("scene0.ppm").is_file());
}

#[cfg(unix)]
#[test]
fn cli_render_fails_when_a_frame_fails() {
    let dir = scratch("render_fail");
    let project = project_with_renderer(&dir, "exit 3");
    let work = dir.join("work");

    let out = photonreel(&[
        "render",
        "--config",
        &arg(&project),
        "--work-dir",
        &arg(&work),
        "--no-movie",
    ]);

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("failed"));
    assert!(!work.join("scene0.ppm").exists());
}
