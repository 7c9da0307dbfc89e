use std::path::PathBuf;
use std::process::Command;

use runtime::{run, Args, BackendChoice};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("raymarch-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

fn args(scene: PathBuf, output: PathBuf) -> Args {
    Args {
        scene,
        frames: 3,
        width: Some(48),
        height: Some(27),
        backend: BackendChoice::Cpu,
        output,
        time_step: 0.25,
    }
}

#[test]
fn demo_scene_renders_to_png() {
    let output = scratch("demo.png");
    let summary = run(&args(workspace_root().join("scenes/demo.json"), output.clone())).unwrap();

    assert_eq!(summary.frames_rendered, 3);
    assert_eq!(summary.frames_dropped, 0);
    assert_eq!(summary.size, (48, 27));

    let png = image::open(&output).unwrap().to_rgba8();
    assert_eq!(png.dimensions(), (48, 27));
    let top_left = png.get_pixel(0, 0).0;
    let centre = png.get_pixel(24, 13).0;
    assert_ne!(top_left, centre, "the centre of the demo scene is covered by shapes");
    assert_eq!(top_left[3], 255);
}

#[test]
fn scene_without_light_or_shapes_renders_sky() {
    let scene = scratch("empty.json");
    std::fs::write(&scene, r#"{ "camera": { "width": 8, "height": 4 } }"#).unwrap();
    let output = scratch("empty.png");
    let mut args = args(scene, output.clone());
    args.width = None;
    args.height = None;

    let summary = run(&args).unwrap();
    assert_eq!(summary.size, (8, 4));
    let png = image::open(&output).unwrap().to_rgba8();
    let expected = runtime::sky_gradient(8, 4);
    for (y, row) in expected.chunks(8).enumerate() {
        let px = png.get_pixel(0, y as u32).0;
        for c in 0..3 {
            let want = (row[0][c] * 255.0).round() as u8;
            assert!(px[c].abs_diff(want) <= 1, "row {y} channel {c}: {} vs {want}", px[c]);
        }
    }
}

#[test]
fn missing_scene_file_is_an_error() {
    let err = run(&args(scratch("does-not-exist.json"), scratch("never.png"))).unwrap_err();
    assert!(format!("{err:#}").contains("reading scene"), "{err:#}");
}

#[test]
fn malformed_scene_is_an_error() {
    let scene = scratch("bad.json");
    std::fs::write(&scene, r#"{ "shapes": [{ "shape_type": "cone" }] }"#).unwrap();
    let err = run(&args(scene, scratch("bad.png"))).unwrap_err();
    assert!(format!("{err:#}").contains("parsing scene"), "{err:#}");
}

#[test]
fn binary_writes_output() {
    let output = scratch("bin.png");
    let status = Command::new(env!("CARGO_BIN_EXE_raymarch"))
        .current_dir(workspace_root())
        .args(["--scene", "scenes/demo.json", "--frames", "2", "--width", "16", "--height", "9", "--backend", "cpu"])
        .arg("--output")
        .arg(&output)
        .env("RUST_LOG", "info")
        .status()
        .expect("Failed to spawn raymarch process");

    assert!(status.success(), "raymarch exited with {status}");
    assert!(output.exists(), "no PNG at {output:?}");
}
