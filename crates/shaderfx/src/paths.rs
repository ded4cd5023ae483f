use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;
use fxconfig::AppConfig;

pub const ENV_CONFIG_DIR: &str = "SHADERFX_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "shaderfx";
const APPLICATION: &str = "shaderfx";

/// Per-user configuration directory, honouring `SHADERFX_CONFIG_DIR`.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(value) = env_override(ENV_CONFIG_DIR) {
        return Ok(value);
    }
    let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .ok_or_else(|| anyhow!("failed to determine user directories"))?;
    Ok(project_dirs.config_dir().to_path_buf())
}

pub fn default_config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

/// Images directly inside `dir` whose extension the config accepts, sorted by name.
pub fn list_images(dir: &Path, config: &AppConfig) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read input directory {}", dir.display()))?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list {}", dir.display()))?
            .path();
        if path.is_file() && config.accepts_extension(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// `<output_dir>/<stem>_<suffix><.ext>`; the input's extension is kept.
pub fn output_path(output_dir: &Path, input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let mut name = format!("{stem}_{suffix}");
    if let Some(ext) = input.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    output_dir.join(name)
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn output_name_appends_suffix_before_extension() {
        assert_eq!(
            output_path(Path::new("Output Images"), Path::new("in/cat.png"), "blur"),
            PathBuf::from("Output Images/cat_blur.png")
        );
        assert_eq!(
            output_path(Path::new("out"), Path::new("archive.tar.png"), "fish_eye"),
            PathBuf::from("out/archive.tar_fish_eye.png")
        );
        assert_eq!(
            output_path(Path::new("out"), Path::new("noext"), "mirror"),
            PathBuf::from("out/noext_mirror")
        );
    }

    #[test]
    fn lists_only_accepted_files_in_order() {
        let dir = TempDir::new().unwrap();
        for name in ["b.png", "a.PNG", "notes.txt", "c.jpg"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let config = AppConfig::default();
        let images = list_images(dir.path(), &config).unwrap();
        let names: Vec<_> = images.iter().map(|path| display_name(path)).collect();
        assert_eq!(names, ["a.PNG", "b.png"]);
    }

    #[test]
    fn missing_input_directory_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = list_images(&dir.path().join("absent"), &AppConfig::default()).unwrap_err();
        assert!(err.to_string().contains("failed to read input directory"));
    }
}
