//! Error types for configuration and manifest loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading configuration or definition manifests.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A bounded match cache needs a non-zero capacity.
	#[error("match_cache.capacity must be at least 1 when policy is \"bounded\"")]
	InvalidCapacity,

	/// The same aspect name appears twice in one manifest.
	#[error("aspect `{0}` is defined more than once")]
	DuplicateAspect(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

pub(crate) fn read(path: &std::path::Path) -> Result<String> {
	std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
		path: path.to_path_buf(),
		error,
	})
}
