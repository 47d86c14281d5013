//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into
//! core services. Environment variables are read in the binaries only, never
//! during request handling.

use crate::error::{EngineError, EngineResult};
use std::path::{Path, PathBuf};

/// Practice name used on letters when none is configured.
pub const DEFAULT_PRACTICE_NAME: &str = "PhysioPraxis am Park";

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    dataset_path: Option<PathBuf>,
    practice_name: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidInput`] if the practice name is empty or
    /// unreasonably long for a letterhead.
    pub fn new(dataset_path: Option<PathBuf>, practice_name: String) -> EngineResult<Self> {
        const MAX_PRACTICE_NAME_LEN: usize = 120;

        let practice_name = practice_name.trim().to_owned();
        if practice_name.is_empty() {
            return Err(EngineError::InvalidInput(
                "practice name cannot be empty".into(),
            ));
        }
        if practice_name.len() > MAX_PRACTICE_NAME_LEN {
            return Err(EngineError::InvalidInput(format!(
                "practice name exceeds maximum length of {MAX_PRACTICE_NAME_LEN} characters"
            )));
        }

        Ok(Self {
            dataset_path,
            practice_name,
        })
    }

    pub fn dataset_path(&self) -> Option<&Path> {
        self.dataset_path.as_deref()
    }

    pub fn practice_name(&self) -> &str {
        &self.practice_name
    }
}

/// Resolve the practice name from an optional environment value.
///
/// `None` or empty/whitespace input falls back to [`DEFAULT_PRACTICE_NAME`].
pub fn practice_name_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_PRACTICE_NAME.to_owned())
}

/// Resolve the dataset path from an optional environment value.
///
/// `None` or empty/whitespace input means "use the built-in demo dataset".
pub fn dataset_path_from_env_value(value: Option<String>) -> Option<PathBuf> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
