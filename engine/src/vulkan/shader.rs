use std::fmt;
use std::path::PathBuf;

use log::*;

use super::error::InitError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Supplies raw SPIR-V per stage. The blob is not inspected here; malformed
/// bytecode only surfaces when the driver is asked to build a module from it.
pub trait ShaderSource {
    fn read(&self, stage: ShaderStage) -> Result<Vec<u8>, InitError>;
}

/// Reads `vert.spv` and `frag.spv` from a directory.
#[derive(Clone, Debug)]
pub struct ShaderDirectory {
    root: PathBuf,
}

impl ShaderDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, stage: ShaderStage) -> PathBuf {
        let file = match stage {
            ShaderStage::Vertex => "vert.spv",
            ShaderStage::Fragment => "frag.spv",
        };
        self.root.join(file)
    }
}

impl ShaderSource for ShaderDirectory {
    fn read(&self, stage: ShaderStage) -> Result<Vec<u8>, InitError> {
        let path = self.path(stage);
        match std::fs::read(&path) {
            Ok(bytes) => {
                debug!("Read {} bytes of {} shader from `{}`.", bytes.len(), stage, path.display());
                Ok(bytes)
            }
            Err(source) => Err(InitError::ShaderReadFailed { stage, path, source }),
        }
    }
}
