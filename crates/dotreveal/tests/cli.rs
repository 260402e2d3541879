use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const RGB_CONFIG: &str = r#"
[effect]
colors = [[255, 0, 0], [0, 255, 0], [0, 0, 255]]
opacities = [1, 1, 1, 1, 1, 1, 1, 1, 1, 1]

[surface]
width = 320
height = 200
"#;

fn dotreveal(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dotreveal"))
        .env("DOTREVEAL_CONFIG_DIR", config_dir)
        .env_remove("DOTREVEAL_CONFIG")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run dotreveal")
}

fn layer<'a>(report: &'a Value, label: &str) -> &'a Value {
    report["layers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|layer| layer["label"] == label)
        .unwrap_or_else(|| panic!("missing layer {label}"))
}

fn uniform<'a>(layer: &'a Value, name: &str) -> &'a Value {
    layer["uniforms"]
        .as_array()
        .unwrap()
        .iter()
        .find(|uniform| uniform["name"] == name)
        .unwrap_or_else(|| panic!("missing uniform {name}"))
}

#[test]
fn uniforms_reflect_discovered_config() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("effect.toml"), RGB_CONFIG).unwrap();

    let output = dotreveal(root.path(), &["uniforms"]);
    assert!(output.status.success(), "{output:?}");
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(report["resolution"], serde_json::json!([640.0, 400.0]));
    let matrix = layer(&report, "dot matrix");
    assert_eq!(matrix["blend"], "additive");

    let colors = uniform(matrix, "u_colors");
    assert_eq!(colors["type"], "uniform3fv");
    assert_eq!(
        colors["value"],
        serde_json::json!([
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0]
        ])
    );
    let opacities = uniform(matrix, "u_opacities");
    assert_eq!(opacities["type"], "uniform1fv");
    assert_eq!(opacities["value"], serde_json::json!(vec![1.0; 10]));

    assert_eq!(layer(&report, "gradient overlay")["blend"], "premultiplied");
}

#[test]
fn uniforms_use_defaults_without_config() {
    let root = TempDir::new().unwrap();
    let output = dotreveal(root.path(), &["uniforms", "--no-gradient", "--dot-size", "6"]);
    assert!(output.status.success(), "{output:?}");
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();

    let layers = report["layers"].as_array().unwrap();
    assert_eq!(layers.len(), 1);
    assert_eq!(uniform(&layers[0], "u_dot_size")["value"], 6.0);
    assert_eq!(
        uniform(&layers[0], "u_opacities")["value"]
            .as_array()
            .unwrap()
            .len(),
        10
    );
}

#[test]
fn shader_prints_generated_source() {
    let root = TempDir::new().unwrap();
    let output = dotreveal(root.path(), &["shader", "--speed", "2"]);
    assert!(output.status.success(), "{output:?}");
    let fragment = String::from_utf8(output.stdout).unwrap();
    assert!(fragment.contains("float animation_speed_factor = 2.0;"));
    assert!(fragment.contains("fragColor.rgb *= fragColor.a;"));

    let output = dotreveal(root.path(), &["shader", "--vertex"]);
    assert!(output.status.success(), "{output:?}");
    let vertex = String::from_utf8(output.stdout).unwrap();
    assert!(vertex.contains("gl_VertexIndex"));
}

#[test]
fn export_writes_png_of_requested_size() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("frames/still.png");
    let output = dotreveal(
        root.path(),
        &[
            "export",
            "--time",
            "10",
            "--size",
            "64x32",
            "--output",
            target.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{output:?}");

    let image = image::open(&target).unwrap().to_rgb8();
    assert_eq!(image.dimensions(), (64, 32));
    assert!(image.pixels().any(|pixel| pixel.0 != [0, 0, 0]));
}

#[test]
fn export_rejects_custom_reveal() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("effect.toml"),
        "[effect]\nreveal = \"opacity *= 0.5;\"\n",
    )
    .unwrap();
    let target = root.path().join("still.png");
    let output = dotreveal(
        root.path(),
        &["export", "--output", target.to_str().unwrap()],
    );
    assert!(!output.status.success());
    assert!(!target.exists());
}

#[test]
fn export_refuses_oversized_frames() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("huge.png");
    let output = dotreveal(
        root.path(),
        &[
            "export",
            "--size",
            "100000x100000",
            "--output",
            target.to_str().unwrap(),
        ],
    );
    assert!(!output.status.success());
    assert!(!target.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("exceeds the limit"), "{stderr}");
}

#[test]
fn invalid_config_is_reported() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("broken.toml");
    fs::write(&config, "[surface]\nmax_fps = -1\n").unwrap();

    let output = dotreveal(
        root.path(),
        &["uniforms", "--config", config.to_str().unwrap()],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("max_fps"), "{stderr}");
}
