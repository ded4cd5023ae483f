//! The catalog of named image effects.
//!
//! An effect is data: a display name, the suffix appended to output file
//! names, and the shader pair it runs. The only behaviour is
//! [`apply_effect`], which compiles the pair on first use, keeps the result on
//! the effect, and hands it to an [`EffectBackend`].
use std::path::PathBuf;

use crate::backend::EffectBackend;
use crate::error::FxError;
use crate::types::{ImageDimensions, ShaderIdentity, DEFAULT_PIXEL_SHADER, DEFAULT_VERTEX_SHADER};

/// Static description of one effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectDescriptor {
    pub display_name: String,
    pub suffix: String,
    /// Custom vertex stage; `None` means the pass-through default.
    pub vertex: Option<PathBuf>,
    /// Custom pixel stage; `None` means the pass-through default.
    pub pixel: Option<PathBuf>,
}

impl EffectDescriptor {
    pub fn new(display_name: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            suffix: suffix.into(),
            vertex: None,
            pixel: None,
        }
    }

    pub fn with_vertex(mut self, path: impl Into<PathBuf>) -> Self {
        self.vertex = Some(path.into());
        self
    }

    pub fn with_pixel(mut self, path: impl Into<PathBuf>) -> Self {
        self.pixel = Some(path.into());
        self
    }

    /// The shader pair, with each missing stage replaced by its default.
    pub fn identity(&self) -> ShaderIdentity {
        ShaderIdentity::new(
            self.vertex
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_VERTEX_SHADER)),
            self.pixel
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PIXEL_SHADER)),
        )
    }
}

/// An effect together with the program compiled for it, if any.
#[derive(Debug)]
pub struct Effect<P> {
    descriptor: EffectDescriptor,
    program: Option<P>,
}

impl<P> Effect<P> {
    pub fn new(descriptor: EffectDescriptor) -> Self {
        Self {
            descriptor,
            program: None,
        }
    }

    pub fn descriptor(&self) -> &EffectDescriptor {
        &self.descriptor
    }

    pub fn display_name(&self) -> &str {
        &self.descriptor.display_name
    }

    pub fn suffix(&self) -> &str {
        &self.descriptor.suffix
    }

    pub fn identity(&self) -> ShaderIdentity {
        self.descriptor.identity()
    }

    pub fn is_compiled(&self) -> bool {
        self.program.is_some()
    }

    pub fn program(&self) -> Option<&P> {
        self.program.as_ref()
    }

    /// Drops the cached program so the next application recompiles.
    pub fn discard_program(&mut self) -> Option<P> {
        self.program.take()
    }
}

/// Runs `effect` over `pixels` through `backend`.
///
/// Compiles the effect's program on first use and caches it; a failed compile
/// caches nothing, so the next call tries again. A cached program the backend
/// no longer accepts is reported as [`FxError::InvalidProgram`] and left in
/// place for the caller to discard.
pub fn apply_effect<B: EffectBackend>(
    effect: &mut Effect<B::Program>,
    backend: &mut B,
    pixels: &mut [u8],
    dimensions: ImageDimensions,
) -> Result<(), FxError> {
    let program = match effect.program.take() {
        Some(program) => program,
        None => {
            tracing::debug!(effect = %effect.descriptor.display_name, "compiling effect program");
            backend.compile_program(&effect.descriptor.identity())?
        }
    };
    let program = effect.program.insert(program);

    if !backend.is_program_valid(program) {
        return Err(FxError::InvalidProgram(format!(
            "cached program for `{}` belongs to a device that no longer exists",
            effect.descriptor.display_name
        )));
    }
    backend.apply(pixels, dimensions, program)
}

/// Ordered collection of effects offered to the user.
#[derive(Debug)]
pub struct EffectCatalog<P> {
    effects: Vec<Effect<P>>,
}

impl<P> EffectCatalog<P> {
    pub fn new(descriptors: impl IntoIterator<Item = EffectDescriptor>) -> Self {
        Self {
            effects: descriptors.into_iter().map(Effect::new).collect(),
        }
    }

    /// The effects shipped with the `shaders/` directory.
    pub fn builtin() -> Self {
        Self::new(builtin_descriptors())
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect<P>> {
        self.effects.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Effect<P>> {
        self.effects.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Effect<P>> {
        self.effects.get_mut(index)
    }

    /// Index of the effect whose suffix or display name matches `key`,
    /// ignoring ASCII case.
    pub fn find(&self, key: &str) -> Option<usize> {
        let key = key.trim();
        self.effects.iter().position(|effect| {
            effect.suffix().eq_ignore_ascii_case(key)
                || effect.display_name().eq_ignore_ascii_case(key)
        })
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &EffectDescriptor> {
        self.effects.iter().map(Effect::descriptor)
    }

    /// Every shader file the catalog references, for existence checks.
    pub fn identities(&self) -> Vec<ShaderIdentity> {
        self.effects.iter().map(Effect::identity).collect()
    }

    /// Forgets every compiled program, e.g. after the device was recreated.
    pub fn discard_programs(&mut self) {
        for effect in &mut self.effects {
            effect.discard_program();
        }
    }
}

fn builtin_descriptors() -> Vec<EffectDescriptor> {
    vec![
        EffectDescriptor::new("Blur", "blur").with_pixel("blur.frag"),
        EffectDescriptor::new("Color Inversion", "inverted").with_pixel("invert.frag"),
        EffectDescriptor::new("Mirror", "mirror").with_vertex("mirror.vert"),
        EffectDescriptor::new("Shrink", "shrink").with_vertex("shrink.vert"),
        EffectDescriptor::new("Edge Detection", "edges").with_pixel("edges.frag"),
        EffectDescriptor::new("Equalization", "equalize").with_pixel("equalize.frag"),
        EffectDescriptor::new("Fish-Eye Effect", "fish_eye").with_pixel("fisheye.frag"),
        EffectDescriptor::new("Waves", "waves").with_pixel("waves.frag"),
    ]
}
