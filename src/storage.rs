//! Artifact persistence capability.
//!
//! The core never depends on persistence succeeding: every write is a
//! best-effort side effect and a load that fails simply yields nothing.
//! Stores receive opaque records (labeled examples, model weight blobs) and
//! return them unchanged on read. The trait is deliberately narrow so a
//! remote backend can be injected without the core branching on "is
//! persistence configured".

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AuthlexError, Result};
use crate::labeler::LabeledExample;

/// Narrow persistence capability injected into the analysis context.
pub trait ArtifactStore: Send + Sync {
    /// Persist a batch of labeled examples.
    fn save_examples(&self, examples: &[LabeledExample]) -> Result<()>;

    /// Persist a model weight blob, replacing any previous one.
    fn save_model(&self, blob: &[u8]) -> Result<()>;

    /// Load the most recently saved model blob, if any.
    fn load_model(&self) -> Result<Option<Vec<u8>>>;
}

/// File-backed store: JSON files in a single directory.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    dir: PathBuf,
}

const MODEL_FILE: &str = "model.json";
const EXAMPLES_FILE: &str = "training_examples.json";

impl FileArtifactStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| AuthlexError::storage(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl ArtifactStore for FileArtifactStore {
    fn save_examples(&self, examples: &[LabeledExample]) -> Result<()> {
        let json = serde_json::to_vec_pretty(examples)?;
        fs::write(self.path(EXAMPLES_FILE), json)?;
        Ok(())
    }

    fn save_model(&self, blob: &[u8]) -> Result<()> {
        fs::write(self.path(MODEL_FILE), blob)?;
        Ok(())
    }

    fn load_model(&self) -> Result<Option<Vec<u8>>> {
        let path = self.path(MODEL_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }
}
