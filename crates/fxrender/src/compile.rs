use std::borrow::Cow;
use std::path::Path;

use crate::error::{CompileStep, FxError};
use crate::gpu::capture_errors;
use crate::source::ShaderCode;
use crate::types::ProgramStage;

/// Entry point every stage must define.
pub(crate) const ENTRY_POINT: &str = "main";

/// Source language of a shader file, inferred from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderLanguage {
    /// Vulkan-flavoured GLSL 450 (`.vert`, `.frag`, `.glsl`, anything else).
    Glsl,
    /// WGSL (`.wgsl`).
    Wgsl,
}

impl ShaderLanguage {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("wgsl") => ShaderLanguage::Wgsl,
            _ => ShaderLanguage::Glsl,
        }
    }
}

/// Compiles one stage into a shader module.
///
/// `wgpu` reports parse and validation failures through its error sink, so the
/// call runs inside an error scope and the captured diagnostic becomes a
/// [`FxError::Compile`]. The half-built module is dropped on that path.
pub(crate) fn compile_stage(
    device: &wgpu::Device,
    stage: ProgramStage,
    code: &ShaderCode,
) -> Result<wgpu::ShaderModule, FxError> {
    let origin = code.path.display().to_string();
    let fail = |diagnostic: String| FxError::Compile {
        step: CompileStep::Stage(stage),
        origin: origin.clone(),
        diagnostic,
    };

    if code.text.trim().is_empty() {
        return Err(fail("shader source is empty".into()));
    }
    if !declares_entry_point(&code.text) {
        return Err(fail(format!("missing entry point `{ENTRY_POINT}`")));
    }

    let label = format!("{stage} stage: {origin}");
    let source = match code.language {
        ShaderLanguage::Glsl => wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(code.text.as_str()),
            stage: stage.naga_stage(),
            defines: &[],
        },
        ShaderLanguage::Wgsl => wgpu::ShaderSource::Wgsl(Cow::Borrowed(code.text.as_str())),
    };

    let (module, error) = capture_errors(device, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source,
        })
    });
    if let Some(error) = error {
        return Err(fail(error.to_string()));
    }

    tracing::debug!(%stage, path = %origin, language = ?code.language, "compiled shader stage");
    Ok(module)
}

/// Cheap textual check so a missing `main` is reported as such rather than as
/// an opaque pipeline-creation failure.
fn declares_entry_point(text: &str) -> bool {
    text.lines()
        .map(|line| line.split("//").next().unwrap_or_default())
        .any(|line| {
            let mut words = line
                .split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
                .filter(|word| !word.is_empty());
            while let Some(word) = words.next() {
                if matches!(word, "void" | "fn") && words.next() == Some(ENTRY_POINT) {
                    return true;
                }
            }
            false
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_follows_extension() {
        assert_eq!(
            ShaderLanguage::from_path(Path::new("shaders/invert.frag")),
            ShaderLanguage::Glsl
        );
        assert_eq!(
            ShaderLanguage::from_path(Path::new("shaders/invert.WGSL")),
            ShaderLanguage::Wgsl
        );
        assert_eq!(
            ShaderLanguage::from_path(Path::new("shaders/noext")),
            ShaderLanguage::Glsl
        );
    }

    #[test]
    fn entry_point_detection_handles_both_languages() {
        assert!(declares_entry_point("#version 450\nvoid main() {\n}\n"));
        assert!(declares_entry_point("@fragment\nfn main(@location(0) uv: vec2<f32>) {}"));
        assert!(!declares_entry_point("void mainImage(out vec4 c) {}"));
        assert!(!declares_entry_point("// void main() {}\nvoid other() {}"));
    }
}
