use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One feed search the collector runs every pipeline period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    pub query: String,
    /// Category attached to every item this query collects.
    #[serde(default)]
    pub sport_type: Option<String>,
    /// Overrides the global per-query item cap.
    #[serde(default)]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub min_likes: i64,
}

impl QueryConfig {
    /// The configured sport type, or the query text without `#` markers.
    #[must_use]
    pub fn effective_sport_type(&self) -> String {
        match self.sport_type.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => self.query.replace('#', "").trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueriesFile {
    pub queries: Vec<QueryConfig>,
}

/// Load and validate a queries file from a YAML path.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_queries(path: &Path) -> Result<QueriesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::QueriesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let queries_file: QueriesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::QueriesFileParse)?;

    validate_queries(&queries_file)?;

    Ok(queries_file)
}

fn validate_queries(queries_file: &QueriesFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in &queries_file.queries {
        if entry.query.trim().is_empty() {
            return Err(ConfigError::Validation(
                "query must be non-empty".to_string(),
            ));
        }

        if entry.max_items == Some(0) {
            return Err(ConfigError::Validation(format!(
                "query '{}' has max_items 0",
                entry.query
            )));
        }

        if entry.min_likes < 0 {
            return Err(ConfigError::Validation(format!(
                "query '{}' has negative min_likes {}",
                entry.query, entry.min_likes
            )));
        }

        if !seen.insert(entry.query.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate query: '{}'",
                entry.query
            )));
        }
    }

    Ok(())
}
