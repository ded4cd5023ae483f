//! GPU effect pipeline for shaderfx.
//!
//! The crate turns one CPU pixel buffer into one GPU-processed pixel buffer by
//! running a single full-screen shader pass through `wgpu`. The overall flow is:
//!
//! ```text
//!   EffectCatalog ──▶ apply_effect ──▶ (lazy) PipelineManager::compile_program
//!                          │
//!                          ▼
//!                 PipelineManager::apply
//!                          │ upload ─▶ draw quad ─▶ copy to staging ─▶ map
//!                          ▼
//!                  caller's buffer (rewritten in place)
//! ```
//!
//! `PipelineManager` owns every long-lived GPU object (device, queue, quad
//! geometry, shared layouts) and creates the per-call textures on demand.
//! Effects are plain descriptors naming a vertex/pixel shader pair; each keeps
//! the program it compiled on first use so later applications skip the
//! compiler entirely.

mod backend;
mod compile;
mod effect;
mod error;
mod gpu;
mod source;
mod types;

pub use backend::EffectBackend;
pub use compile::ShaderLanguage;
pub use effect::{apply_effect, Effect, EffectCatalog, EffectDescriptor};
pub use error::{CompileStep, FxError};
pub use gpu::{copy_rows, padded_row_pitch, ManagerStatus, PipelineManager, ShaderProgram};
pub use source::{ShaderCode, ShaderStore};
pub use types::{
    AdapterProfile, GpuPowerPreference, ImageDimensions, ManagerConfig, ProgramStage,
    ShaderIdentity, DEFAULT_PIXEL_SHADER, DEFAULT_VERTEX_SHADER, GPU_BYTES_PER_PIXEL,
};
