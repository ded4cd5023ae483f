//! GPU side of the effect pipeline.
//!
//! - `context` acquires the adapter/device/queue and owns the error-scope
//!   helper every fallible `wgpu` call goes through.
//! - `quad` holds the process-lifetime full-screen quad and its vertex layout.
//! - `pipeline` builds the shared bind-group/pipeline layouts and links
//!   compiled stages into a [`ShaderProgram`].
//! - `textures` allocates the per-call source/target/staging set and counts
//!   live resources so leaks are observable.
//! - `readback` maps the staging buffer and strips row padding.
//! - `manager` ties the above into the `Uninitialized → Ready` state machine.

mod context;
mod manager;
mod pipeline;
mod quad;
mod readback;
mod textures;

pub(crate) use context::capture_errors;
pub use manager::{ManagerStatus, PipelineManager};
pub use pipeline::ShaderProgram;
pub use readback::copy_rows;
pub use textures::padded_row_pitch;
