use std::path::PathBuf;

/// Failures while reading the sample log
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
	#[error("failed to open sample file '{}': {source}", path.display())]
	Open {
		path: PathBuf,
		#[source]
		source: csv::Error,
	},

	#[error("failed to read CSV record: {0}")]
	Csv(#[from] csv::Error),

	#[error("sample file has no usable '{0}' column")]
	MissingColumn(&'static str),
}

/// Failures while loading or validating the scoring policy
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read policy file '{}': {source}", path.display())]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse policy file: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("invalid scoring policy: {0}")]
	Validation(String),
}
