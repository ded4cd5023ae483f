use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Runs the binary with an isolated config directory and no `SHADERFX_CONFIG`.
fn shaderfx(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_shaderfx"))
        .env_remove("SHADERFX_CONFIG")
        .env("SHADERFX_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run shaderfx")
}

#[test]
fn effects_lists_builtin_catalog_without_config() {
    let root = TempDir::new().unwrap();
    let output = shaderfx(root.path(), &["effects"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for suffix in ["blur", "inverted", "mirror", "shrink", "edges", "equalize", "fish_eye", "waves"] {
        assert!(stdout.contains(&format!("suffix={suffix}")), "{suffix} missing:\n{stdout}");
    }
    assert!(stdout.contains("Fish-Eye Effect"));
}

#[test]
fn effects_reads_catalog_from_config_dir() {
    let root = TempDir::new().unwrap();
    let shaders = root.path().join("shaders");
    fs::create_dir_all(&shaders).unwrap();
    fs::write(
        root.path().join("config.toml"),
        format!(
            r#"
version = 1
shader_root = "{}"

[[effects]]
name = "Sepia"
suffix = "sepia"
pixel = "sepia.frag"
"#,
            shaders.display().to_string().replace('\\', "/")
        ),
    )
    .unwrap();

    let output = shaderfx(root.path(), &["effects"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Sepia"));
    assert!(stdout.contains("[missing shader]"));
    assert!(!stdout.contains("Fish-Eye"));
}

#[test]
fn explicit_config_flag_wins_over_config_dir() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("config.toml"), "version = 7").unwrap();
    let explicit = root.path().join("explicit.toml");
    fs::write(&explicit, "version = 1").unwrap();

    let output = shaderfx(
        root.path(),
        &["--config", explicit.to_str().unwrap(), "effects"],
    );
    assert!(output.status.success());

    let broken = shaderfx(root.path(), &["effects"]);
    assert!(!broken.status.success());
    assert!(String::from_utf8_lossy(&broken.stderr).contains("unsupported config version 7"));
}

#[test]
fn apply_rejects_unknown_effect_before_touching_the_gpu() {
    let root = TempDir::new().unwrap();
    let output = shaderfx(
        root.path(),
        &["apply", "whatever.png", "--effect", "sepia"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown effect 'sepia'"), "{stderr}");
    assert!(stderr.contains("fish_eye"));
}

#[test]
fn apply_reports_missing_image() {
    let root = TempDir::new().unwrap();
    let output = shaderfx(
        root.path(),
        &[
            "apply",
            root.path().join("absent.png").to_str().unwrap(),
            "--effect",
            "Color Inversion",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent.png"), "{stderr}");
}

#[test]
fn apply_writes_suffixed_output() {
    let root = TempDir::new().unwrap();
    let input = root.path().join("cat.png");
    image::RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]))
        .save(&input)
        .unwrap();
    let out_dir = root.path().join("Output Images");
    let shaders = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../shaders");

    let output = shaderfx(
        root.path(),
        &[
            "--allow-software",
            "--shader-root",
            shaders.to_str().unwrap(),
            "--output-dir",
            out_dir.to_str().unwrap(),
            "apply",
            input.to_str().unwrap(),
            "--effect",
            "inverted",
        ],
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("failed to create GPU device") {
        eprintln!("skipping GPU test: {stderr}");
        return;
    }
    assert!(output.status.success(), "{stderr}");

    let written = out_dir.join("cat_inverted.png");
    let result = image::open(&written).unwrap();
    assert!(!result.color().has_alpha());
    assert!(result.into_rgb8().pixels().all(|pixel| pixel.0 == [0, 0, 0]));
}

#[test]
fn interactive_mode_exits_on_end_of_input_after_a_failed_round() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("no such dir");
    let output = shaderfx(
        root.path(),
        &["--input-dir", missing.to_str().unwrap(), "--failure-pause", "0s"],
    );
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("failed to read input directory").count(), 1, "{stderr}");
    assert!(String::from_utf8_lossy(&output.stdout).contains("Goodbye."));
}
