use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::stats::PercentileMethod;

/// Scoring policy: every constant the scorer uses.
///
/// Defaults reproduce the reference leaderboard: linear decay of 1 point
/// per 2 ms from 100, equal P95/median weights, half score above 10%
/// errors and zero above 25%. Alternative policies are TOML files; any
/// field left out keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
	/// Latency assigned to resolvers with no successful sample
	pub sentinel_worst_ms: f64,
	/// Score of a 0 ms response
	pub score_ceiling: f64,
	/// Milliseconds of latency that cost one score point
	pub ms_per_point: f64,
	pub p95_weight: f64,
	pub median_weight: f64,
	/// Error rate (%) above which the degraded factor applies
	pub degraded_error_pct: f64,
	/// Multiplier for degraded resolvers
	pub degraded_factor: f64,
	/// Error rate (%) above which the final score is zero
	pub unusable_error_pct: f64,
	pub percentile_method: PercentileMethod,
}

impl Default for ScoringPolicy {
	fn default() -> Self {
		ScoringPolicy {
			sentinel_worst_ms: 9999.0,
			score_ceiling: 100.0,
			ms_per_point: 2.0,
			p95_weight: 0.5,
			median_weight: 0.5,
			degraded_error_pct: 10.0,
			degraded_factor: 0.5,
			unusable_error_pct: 25.0,
			percentile_method: PercentileMethod::Linear,
		}
	}
}

/// Individual policy fields set on the command line
#[derive(Debug, Clone, Default)]
pub struct PolicyOverrides {
	pub percentile_method: Option<PercentileMethod>,
	pub degraded_error_pct: Option<f64>,
	pub unusable_error_pct: Option<f64>,
	pub degraded_factor: Option<f64>,
	pub sentinel_worst_ms: Option<f64>,
}

impl ScoringPolicy {
	/// Load a policy from a TOML file, apply CLI overrides and validate.
	///
	/// Without a file the default policy is the starting point.
	pub fn load(path: Option<&Path>, overrides: &PolicyOverrides) -> Result<Self, ConfigError> {
		let mut policy = match path {
			Some(path) => Self::from_file(path)?,
			None => Self::default(),
		};
		policy.apply_overrides(overrides);
		policy.validate()?;
		Ok(policy)
	}

	fn from_file(path: &Path) -> Result<Self, ConfigError> {
		let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
			path: path.to_path_buf(),
			source,
		})?;
		let policy = Self::from_toml(&contents)?;
		tracing::debug!(path = %path.display(), "loaded scoring policy");
		Ok(policy)
	}

	pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(contents)?)
	}

	pub fn apply_overrides(&mut self, overrides: &PolicyOverrides) {
		if let Some(method) = overrides.percentile_method {
			self.percentile_method = method;
		}
		if let Some(pct) = overrides.degraded_error_pct {
			self.degraded_error_pct = pct;
		}
		if let Some(pct) = overrides.unusable_error_pct {
			self.unusable_error_pct = pct;
		}
		if let Some(factor) = overrides.degraded_factor {
			self.degraded_factor = factor;
		}
		if let Some(ms) = overrides.sentinel_worst_ms {
			self.sentinel_worst_ms = ms;
		}
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Validation(msg)) };

		if !(self.sentinel_worst_ms > 0.0) {
			return invalid(format!("sentinel_worst_ms must be positive, got {}", self.sentinel_worst_ms));
		}
		if !(self.score_ceiling > 0.0) {
			return invalid(format!("score_ceiling must be positive, got {}", self.score_ceiling));
		}
		if !(self.ms_per_point > 0.0) {
			return invalid(format!("ms_per_point must be positive, got {}", self.ms_per_point));
		}
		if !(self.p95_weight >= 0.0) || !(self.median_weight >= 0.0) {
			return invalid("score weights must be non-negative".to_string());
		}
		if self.p95_weight + self.median_weight <= 0.0 {
			return invalid("at least one score weight must be positive".to_string());
		}
		if !(0.0..=1.0).contains(&self.degraded_factor) {
			return invalid(format!("degraded_factor must be within [0, 1], got {}", self.degraded_factor));
		}
		for (name, pct) in [
			("degraded_error_pct", self.degraded_error_pct),
			("unusable_error_pct", self.unusable_error_pct),
		] {
			if !(0.0..=100.0).contains(&pct) {
				return invalid(format!("{} must be within [0, 100], got {}", name, pct));
			}
		}
		if self.degraded_error_pct > self.unusable_error_pct {
			return invalid(format!(
				"degraded_error_pct ({}) exceeds unusable_error_pct ({})",
				self.degraded_error_pct, self.unusable_error_pct,
			));
		}
		Ok(())
	}
}
