//! Resolves shader identities to files on disk so the manager can compile
//! them. The store never interprets shader contents; it only locates and reads
//! them, leaving parse and validation failures to `compile`.
//!
//! Types:
//!
//! - `ShaderStore` remembers the root directory relative identities hang off.
//! - `ShaderCode` carries a loaded source along with its resolved path and the
//!   language inferred from the file extension.
//!
//! Functions:
//!
//! - `ShaderStore::load` reads one stage, reporting unreadable files as
//!   compile errors so callers see them alongside syntax errors.
//! - `ShaderStore::missing_sources` checks a set of identities up front so the
//!   CLI can flag catalog entries whose files are absent.
use std::fs;
use std::path::{Path, PathBuf};

use crate::compile::ShaderLanguage;
use crate::error::{CompileStep, FxError};
use crate::types::{ProgramStage, ShaderIdentity};

#[derive(Debug, Clone)]
pub struct ShaderStore {
    root: PathBuf,
}

/// One loaded shader stage.
#[derive(Debug, Clone)]
pub struct ShaderCode {
    pub path: PathBuf,
    pub language: ShaderLanguage,
    pub text: String,
}

impl ShaderStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute identities are used as-is; relative ones hang off the root.
    pub fn resolve(&self, identity: &Path) -> PathBuf {
        if identity.is_absolute() {
            identity.to_path_buf()
        } else {
            self.root.join(identity)
        }
    }

    pub fn load(&self, stage: ProgramStage, identity: &Path) -> Result<ShaderCode, FxError> {
        let path = self.resolve(identity);
        let text = fs::read_to_string(&path).map_err(|err| FxError::Compile {
            step: CompileStep::Stage(stage),
            origin: path.display().to_string(),
            diagnostic: format!("failed to read shader source: {err}"),
        })?;
        let language = ShaderLanguage::from_path(&path);
        Ok(ShaderCode {
            path,
            language,
            text,
        })
    }

    /// Returns every resolved stage path that does not exist, deduplicated.
    pub fn missing_sources<'a>(
        &self,
        identities: impl IntoIterator<Item = &'a ShaderIdentity>,
    ) -> Vec<PathBuf> {
        let mut missing = Vec::new();
        for identity in identities {
            for stage in [ProgramStage::Vertex, ProgramStage::Pixel] {
                let path = self.resolve(identity.path(stage));
                if !path.is_file() && !missing.contains(&path) {
                    missing.push(path);
                }
            }
        }
        missing
    }
}
