use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    Low,
    #[default]
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct GpuSettings {
    #[serde(default)]
    pub power: PowerSetting,
    #[serde(default)]
    pub allow_software: bool,
}

/// One `[[effects]]` table. Omitted stages fall back to the default shaders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EffectEntry {
    pub name: String,
    pub suffix: String,
    #[serde(default)]
    pub vertex: Option<PathBuf>,
    #[serde(default)]
    pub pixel: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    pub version: u32,
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_shader_root")]
    pub shader_root: PathBuf,
    #[serde(
        default = "default_failure_pause",
        deserialize_with = "deserialize_duration"
    )]
    pub failure_pause: Duration,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub gpu: GpuSettings,
    #[serde(default)]
    pub effects: Vec<EffectEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            shader_root: default_shader_root(),
            failure_pause: default_failure_pause(),
            extensions: default_extensions(),
            gpu: GpuSettings::default(),
            effects: Vec::new(),
        }
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("Input Images")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("Output Images")
}

fn default_shader_root() -> PathBuf {
    PathBuf::from("shaders")
}

fn default_failure_pause() -> Duration {
    Duration::from_secs(5)
}

fn default_extensions() -> Vec<String> {
    vec!["png".to_string()]
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() || v.is_infinite() {
                return Err(E::custom("duration must be a finite non-negative number"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl AppConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: AppConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Whether `path` carries one of the configured image extensions.
    pub fn accepts_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "extensions must list at least one image extension".into(),
            ));
        }
        if let Some(ext) = self
            .extensions
            .iter()
            .find(|ext| ext.trim_start_matches('.').trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "extension '{ext}' is empty"
            )));
        }

        for (index, entry) in self.effects.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "effect #{} has an empty name",
                    index + 1
                )));
            }
            validate_suffix(&entry.name, &entry.suffix)?;

            let duplicate = self.effects[..index]
                .iter()
                .find(|other| other.suffix.eq_ignore_ascii_case(&entry.suffix));
            if let Some(other) = duplicate {
                return Err(ConfigError::Invalid(format!(
                    "effects '{}' and '{}' share the suffix '{}'",
                    other.name, entry.name, entry.suffix
                )));
            }
        }

        Ok(())
    }
}

/// Suffixes end up in file names, so they are restricted to a portable set.
fn validate_suffix(name: &str, suffix: &str) -> Result<(), ConfigError> {
    if suffix.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "effect '{name}' must have a non-empty suffix"
        )));
    }
    if let Some(bad) = suffix
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '-'))
    {
        return Err(ConfigError::Invalid(format!(
            "effect '{name}' suffix '{suffix}' contains '{bad}'; use letters, digits, '_' or '-'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1
input_dir = "photos"
output_dir = "out"
shader_root = "/usr/share/shaderfx/shaders"
failure_pause = "1500ms"
extensions = ["png", ".JPG"]

[gpu]
power = "low"
allow_software = true

[[effects]]
name = "Blur"
suffix = "blur"
pixel = "blur.frag"

[[effects]]
name = "Mirror"
suffix = "mirror"
vertex = "mirror.vert"
"#;

    #[test]
    fn parses_sample_config() {
        let config = AppConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.input_dir, PathBuf::from("photos"));
        assert_eq!(config.failure_pause, Duration::from_millis(1500));
        assert_eq!(config.gpu.power, PowerSetting::Low);
        assert!(config.gpu.allow_software);
        assert_eq!(config.effects.len(), 2);
        assert_eq!(config.effects[0].pixel, Some(PathBuf::from("blur.frag")));
        assert_eq!(config.effects[1].pixel, None);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = AppConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.output_dir, PathBuf::from("Output Images"));
        assert_eq!(config.failure_pause, Duration::from_secs(5));
        assert!(config.effects.is_empty());
    }

    #[test]
    fn numeric_pause_is_seconds() {
        let config = AppConfig::from_toml_str("version = 1\nfailure_pause = 2").unwrap();
        assert_eq!(config.failure_pause, Duration::from_secs(2));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = AppConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_duplicate_suffixes() {
        let config = r#"
version = 1

[[effects]]
name = "Blur"
suffix = "soft"
pixel = "blur.frag"

[[effects]]
name = "Waves"
suffix = "SOFT"
pixel = "waves.frag"
"#;
        let err = AppConfig::from_toml_str(config).unwrap_err();
        assert!(err.to_string().contains("share the suffix"), "{err}");
    }

    #[test]
    fn rejects_suffix_with_path_separator() {
        let config = r#"
version = 1

[[effects]]
name = "Sneaky"
suffix = "../up"
"#;
        let err = AppConfig::from_toml_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_duration() {
        let err = AppConfig::from_toml_str("version = 1\nfailure_pause = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn extension_match_ignores_case_and_dot() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert!(config.accepts_extension(Path::new("a/cat.png")));
        assert!(config.accepts_extension(Path::new("a/cat.jpg")));
        assert!(!config.accepts_extension(Path::new("a/cat.bmp")));
        assert!(!config.accepts_extension(Path::new("a/README")));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = AppConfig::load(&dir.path().join("config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let path = dir.path().join("present.toml");
        fs::write(&path, SAMPLE).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap().effects.len(), 2);
    }
}
