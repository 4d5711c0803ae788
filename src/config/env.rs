//! `.env` file handling

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load `.env` from the working directory if it exists
    ///
    /// Variables already present in the environment win over the file.
    pub fn load_env_file() -> Result<bool> {
        Self::load_from(Path::new(".env"))
    }

    pub fn load_from(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }

        dotenv::from_path(path)
            .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;
        Ok(true)
    }
}
