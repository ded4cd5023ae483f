use std::fmt;

use crate::types::{ImageDimensions, ProgramStage};

/// Which part of program creation a [`FxError::Compile`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStep {
    Stage(ProgramStage),
    /// Combining both stages with the quad's vertex layout into a pipeline.
    Link,
}

impl fmt::Display for CompileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileStep::Stage(stage) => write!(f, "{stage} shader"),
            CompileStep::Link => f.write_str("program link"),
        }
    }
}

/// Every way the effect pipeline can fail.
///
/// Nothing is retried internally; callers decide whether to try again.
#[derive(Debug, thiserror::Error)]
pub enum FxError {
    /// No usable GPU adapter or device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(String),

    /// Shader source could not be read, parsed, validated, or linked.
    #[error("{step} failed for `{origin}`: {diagnostic}")]
    Compile {
        step: CompileStep,
        origin: String,
        diagnostic: String,
    },

    /// A texture, view, bind group, or buffer could not be allocated.
    #[error("failed to create {step}: {message}")]
    ResourceCreation { step: &'static str, message: String },

    /// Readback of the rendered pixels failed.
    #[error("failed to read back rendered pixels: {0}")]
    Map(String),

    /// A cached program can no longer be used with the active device.
    #[error("effect program is invalid: {0}")]
    InvalidProgram(String),

    /// The pixel slice does not match the dimensions it was declared with.
    #[error("pixel buffer does not match {dimensions}: {message}")]
    BufferLayout {
        dimensions: ImageDimensions,
        message: String,
    },
}

impl FxError {
    pub(crate) fn resource(step: &'static str, message: impl fmt::Display) -> Self {
        FxError::ResourceCreation {
            step,
            message: message.to_string(),
        }
    }

    /// Errors after which the device should not be trusted again.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FxError::DeviceCreation(_) | FxError::Map(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_mentions_stage_and_origin() {
        let err = FxError::Compile {
            step: CompileStep::Stage(ProgramStage::Pixel),
            origin: "shaders/broken.frag".into(),
            diagnostic: "expected `;`".into(),
        };
        let text = err.to_string();
        assert!(text.contains("pixel shader"));
        assert!(text.contains("shaders/broken.frag"));
        assert!(text.contains("expected `;`"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn map_errors_are_fatal() {
        assert!(FxError::Map("device lost".into()).is_fatal());
        assert!(!FxError::resource("source texture", "zero-sized").is_fatal());
    }
}
