use anyhow::{Context, Result};
use fxconfig::{AppConfig, EffectEntry, PowerSetting};
use fxrender::{EffectCatalog, EffectDescriptor, GpuPowerPreference, ManagerConfig, ShaderProgram};

use crate::cli::Overrides;
use crate::paths;

/// Loads the configuration file, if any, and applies command-line overrides.
///
/// Lookup order: `--config`/`SHADERFX_CONFIG`, then `<config dir>/config.toml`,
/// then built-in defaults.
pub fn load(overrides: &Overrides) -> Result<AppConfig> {
    let mut config = match &overrides.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let path = paths::default_config_file()?;
            if path.is_file() {
                AppConfig::load(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?
            } else {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                AppConfig::default()
            }
        }
    };
    apply_overrides(&mut config, overrides);
    Ok(config)
}

fn apply_overrides(config: &mut AppConfig, overrides: &Overrides) {
    if let Some(dir) = &overrides.input_dir {
        config.input_dir = dir.clone();
    }
    if let Some(dir) = &overrides.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(dir) = &overrides.shader_root {
        config.shader_root = dir.clone();
    }
    if let Some(power) = overrides.power {
        config.gpu.power = power;
    }
    if overrides.allow_software {
        config.gpu.allow_software = true;
    }
    if let Some(pause) = overrides.failure_pause {
        config.failure_pause = pause;
    }
}

pub fn manager_config(config: &AppConfig) -> ManagerConfig {
    ManagerConfig {
        shader_root: config.shader_root.clone(),
        power: match config.gpu.power {
            PowerSetting::High => GpuPowerPreference::High,
            PowerSetting::Low => GpuPowerPreference::Low,
        },
        allow_software: config.gpu.allow_software,
    }
}

/// Configured effects, or the built-in list when the config names none.
pub fn catalog(config: &AppConfig) -> EffectCatalog<ShaderProgram> {
    if config.effects.is_empty() {
        EffectCatalog::builtin()
    } else {
        EffectCatalog::new(config.effects.iter().map(descriptor))
    }
}

fn descriptor(entry: &EffectEntry) -> EffectDescriptor {
    let mut descriptor = EffectDescriptor::new(entry.name.clone(), entry.suffix.clone());
    descriptor.vertex = entry.vertex.clone();
    descriptor.pixel = entry.pixel.clone();
    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn overrides_replace_file_values() {
        let mut config = AppConfig::default();
        let overrides = Overrides {
            output_dir: Some(PathBuf::from("elsewhere")),
            power: Some(PowerSetting::Low),
            allow_software: true,
            failure_pause: Some(Duration::from_millis(10)),
            ..Overrides::default()
        };
        apply_overrides(&mut config, &overrides);

        assert_eq!(config.output_dir, PathBuf::from("elsewhere"));
        assert_eq!(config.input_dir, PathBuf::from("Input Images"));
        assert_eq!(config.failure_pause, Duration::from_millis(10));

        let manager = manager_config(&config);
        assert_eq!(manager.power, GpuPowerPreference::Low);
        assert!(manager.allow_software);
        assert_eq!(manager.shader_root, PathBuf::from("shaders"));
    }

    #[test]
    fn empty_effect_list_uses_builtin_catalog() {
        let catalog = catalog(&AppConfig::default());
        assert_eq!(catalog.len(), 8);
        assert!(catalog.find("waves").is_some());
    }

    #[test]
    fn configured_effects_replace_builtin_catalog() {
        let config = AppConfig::from_toml_str(
            r#"
version = 1

[[effects]]
name = "Sepia"
suffix = "sepia"
pixel = "sepia.frag"
"#,
        )
        .unwrap();
        let catalog = catalog(&config);
        assert_eq!(catalog.len(), 1);
        let identity = catalog.get(0).unwrap().identity();
        assert_eq!(identity.pixel, PathBuf::from("sepia.frag"));
        assert_eq!(identity.vertex, PathBuf::from(fxrender::DEFAULT_VERTEX_SHADER));
    }
}
