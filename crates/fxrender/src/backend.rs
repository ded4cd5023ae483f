use crate::error::FxError;
use crate::types::{ImageDimensions, ShaderIdentity};

/// The operations an effect needs from whatever executes it.
///
/// [`PipelineManager`](crate::PipelineManager) is the production
/// implementation; tests substitute counting doubles.
pub trait EffectBackend {
    /// Compiled program handle cached by each effect.
    type Program;

    /// Compiles and links both stages named by `identity`.
    fn compile_program(&mut self, identity: &ShaderIdentity) -> Result<Self::Program, FxError>;

    /// Whether `program` can still be used by this backend.
    fn is_program_valid(&self, program: &Self::Program) -> bool;

    /// Runs `program` over `pixels`, rewriting the buffer in place.
    fn apply(
        &mut self,
        pixels: &mut [u8],
        dimensions: ImageDimensions,
        program: &Self::Program,
    ) -> Result<(), FxError>;
}
