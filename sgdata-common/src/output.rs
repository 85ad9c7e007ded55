//! Output artifacts and the metadata manifest
//!
//! Every processor produces [`DataFile`]s that are written below
//! `<output_dir>/<data_category>/`. After all processors ran, the manifest
//! (`metadata.json`) lists each processor with the files it emitted.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the manifest inside the output directory
pub const MANIFEST_FILE: &str = "metadata.json";

/// One named output artifact held in memory until written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    pub filename: String,
    pub content: String,
}

impl DataFile {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// Write to `<dest>/<data_category>/<filename>`, creating directories
    ///
    /// Returns the path written.
    pub fn write(&self, dest: &Path, data_category: &str) -> Result<PathBuf> {
        if self.filename.is_empty() || self.filename.contains(['/', '\\']) {
            return Err(Error::InvalidInput(format!(
                "Invalid output file name: {:?}",
                self.filename
            )));
        }

        let dir = dest.join(data_category);
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(&self.filename);
        std::fs::write(&path, self.content.as_bytes())?;
        debug!(path = %path.display(), bytes = self.content.len(), "Wrote data file");
        Ok(path)
    }
}

/// Manifest record for one processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorMeta {
    pub name: String,
    pub data_category: String,
    pub description: String,
    pub files: Vec<String>,
}

impl ProcessorMeta {
    pub fn new(name: &str, data_category: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            data_category: data_category.to_string(),
            description: description.to_string(),
            files: Vec::new(),
        }
    }

    /// Record an emitted file; the list stays sorted and free of duplicates
    pub fn add_file(&mut self, filename: &str) {
        if let Err(pos) = self.files.binary_search_by(|f| f.as_str().cmp(filename)) {
            self.files.insert(pos, filename.to_string());
        }
    }
}

/// Write `metadata.json` into `out_dir`
pub fn write_manifest(out_dir: &Path, metadata: &[ProcessorMeta]) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Read a manifest back
pub fn read_manifest(out_dir: &Path) -> Result<Vec<ProcessorMeta>> {
    let file = std::fs::File::open(out_dir.join(MANIFEST_FILE))?;
    Ok(serde_json::from_reader(file)?)
}
