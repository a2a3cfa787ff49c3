use std::path::{Path, PathBuf};

use log::*;
use serde::Deserialize;
use thiserror::Error;

use super::RandomSource;

/// Locations searched, in order, when no explicit catalogue path is configured.
pub const DEFAULT_CATALOGUE_PATHS: [&str; 3] = ["./data/error_messages.json", "./error_messages.json", "data/error_messages.json"];

const FALLBACK_MESSAGES: [&str; 5] = [
    "Invalid file ID format",
    "File not found in IRS system",
    "Processing timeout exceeded",
    "Invalid taxpayer information",
    "Duplicate submission detected",
];

const UNKNOWN_ERROR: &str = "Unknown error occurred";

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("Could not read the error catalogue. {0}")]
    Io(#[from] std::io::Error),
    #[error("The error catalogue is not valid JSON. {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct CatalogueFile {
    error_messages: Vec<String>,
}

/// The set of error messages the simulated oracle draws from when it reports an error.
///
/// The on-disk format is `{"error_messages": ["...", "..."]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCatalogue {
    messages: Vec<String>,
}

impl Default for ErrorCatalogue {
    fn default() -> Self {
        Self::fallback()
    }
}

impl ErrorCatalogue {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    pub fn fallback() -> Self {
        Self::new(FALLBACK_MESSAGES.iter().map(|s| s.to_string()).collect())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogueError> {
        let data = std::fs::read_to_string(path)?;
        let file = serde_json::from_str::<CatalogueFile>(&data)?;
        Ok(Self::new(file.error_messages))
    }

    /// Loads the first catalogue found in `paths`. If none of the files exist, the built-in messages are used.
    /// A file that exists but can't be parsed also results in the built-in messages.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Self {
        let Some(path) = paths.iter().map(|p| -> &Path { p.as_ref() }).find(|p| p.exists()) else {
            debug!("🔮️ No error catalogue found. Using the built-in error messages");
            return Self::fallback();
        };
        match Self::from_file(path) {
            Ok(catalogue) => {
                info!("🔮️ Loaded {} error messages from {}", catalogue.len(), path.display());
                catalogue
            },
            Err(e) => {
                warn!("🔮️ {e} ({}). Using the built-in error messages", path.display());
                Self::fallback()
            },
        }
    }

    /// Loads from `path` if given, otherwise from the default search locations.
    pub fn load_or_default(path: Option<&PathBuf>) -> Self {
        match path {
            Some(p) => Self::load(&[p]),
            None => Self::load(&DEFAULT_CATALOGUE_PATHS),
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Picks a message uniformly. An empty catalogue always yields "Unknown error occurred".
    pub fn pick(&self, random: &dyn RandomSource) -> String {
        if self.messages.is_empty() {
            return UNKNOWN_ERROR.to_string();
        }
        let n = u32::try_from(self.messages.len()).unwrap_or(u32::MAX);
        let idx = random.below(n) as usize;
        self.messages.get(idx).cloned().unwrap_or_else(|| UNKNOWN_ERROR.to_string())
    }
}
