use super::DocumentStore;
use super::state::log_repairs;
use crate::error::{EstimateError, Result};
use crate::storage::{parse_estimate, write_estimate, write_estimate_string};
use std::path::{Path, PathBuf};

impl DocumentStore {
    /// Save to current file path.
    /// Returns the path saved to.
    pub fn save_file(&mut self) -> Result<PathBuf> {
        let Some(path) = self.file_path.clone() else {
            return Err(EstimateError::NoFilePath);
        };
        self.flush();
        write_estimate(&path, &self.estimate)?;
        self.modified = false;
        tracing::debug!(path = %path.display(), "saved estimate");
        Ok(path)
    }

    /// Save to `path` and make it the current file path.
    pub fn save_as(&mut self, path: &Path) -> Result<PathBuf> {
        self.flush();
        write_estimate(path, &self.estimate)?;
        self.file_path = Some(path.to_path_buf());
        self.modified = false;
        Ok(path.to_path_buf())
    }

    /// Load from file, replacing the current document.
    ///
    /// The current document is only replaced once the file has parsed.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let loaded = parse_estimate(path)?;
        let mut estimate = loaded.estimate;
        let mut repairs = loaded.repairs;
        repairs.extend(estimate.normalize(&self.config.footer.label));
        log_repairs(&repairs);

        self.estimate = estimate;
        self.staged.clear();
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.file_path = Some(path.to_path_buf());
        self.recalculate_all();
        self.modified = false;
        tracing::debug!(
            path = %path.display(),
            sheets = self.estimate.sheets.len(),
            "loaded estimate"
        );
        Ok(())
    }

    /// Serialize the document as it stands after the last completed pass.
    pub fn to_json_string(&self) -> Result<String> {
        write_estimate_string(&self.estimate)
    }
}
