use std::path::PathBuf;

use clap::Parser;

use crate::config::PolicyOverrides;
use crate::stats::PercentileMethod;

/// Score and rank DNS resolvers from a CSV log of latency samples
#[derive(Parser, Debug)]
#[command(name = "dns-leaderboard")]
#[command(about = "Score and rank DNS resolvers from a CSV log of latency samples")]
pub struct Cli {
	/// CSV file of latency samples
	pub input: PathBuf,

	/// Output CSV file path for the ranking table
	#[arg(short = 'o', long = "output")]
	pub output: Option<PathBuf>,

	/// Output CSV file path for the domain winners table
	#[arg(long = "winners-output")]
	pub winners_output: Option<PathBuf>,

	/// Output JSON report path (ranking, domain winners, metadata)
	#[arg(short = 'j', long = "json")]
	pub json: Option<PathBuf>,

	/// Embed every raw sample in the JSON report
	#[arg(long = "history", requires = "json")]
	pub history: bool,

	/// TOML file with scoring policy constants
	#[arg(short = 'p', long = "policy")]
	pub policy: Option<PathBuf>,

	/// Percentile method used for P95
	#[arg(long = "percentile", value_enum)]
	pub percentile: Option<PercentileMethod>,

	/// Error rate (%) above which a resolver's score is scaled down
	#[arg(long = "degraded-error-pct")]
	pub degraded_error_pct: Option<f64>,

	/// Error rate (%) above which a resolver scores zero
	#[arg(long = "unusable-error-pct")]
	pub unusable_error_pct: Option<f64>,

	/// Score multiplier for degraded resolvers
	#[arg(long = "degraded-factor")]
	pub degraded_factor: Option<f64>,

	/// Latency (ms) assumed for resolvers that never answered
	#[arg(long = "sentinel-ms")]
	pub sentinel_ms: Option<f64>,

	/// Number of ranking rows to print (0 prints all)
	#[arg(long = "top", default_value = "0")]
	pub top: usize,

	/// Print the fastest resolver for each hour of the day
	#[arg(long = "hourly")]
	pub hourly: bool,

	/// Print per resolver/domain latency summaries
	#[arg(long = "pairs")]
	pub pairs: bool,

	/// Print data quality diagnostics (failures, suspected cache hits)
	#[arg(long = "diagnose")]
	pub diagnose: bool,

	/// Increase log verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
	pub verbose: u8,
}

impl Cli {
	pub fn policy_overrides(&self) -> PolicyOverrides {
		PolicyOverrides {
			percentile_method: self.percentile,
			degraded_error_pct: self.degraded_error_pct,
			unusable_error_pct: self.unusable_error_pct,
			degraded_factor: self.degraded_factor,
			sentinel_worst_ms: self.sentinel_ms,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_minimal_args() {
		let cli = Cli::try_parse_from(["dns-leaderboard", "samples.csv"]).unwrap();
		assert_eq!(cli.input, PathBuf::from("samples.csv"));
		assert_eq!(cli.top, 0);
		assert!(cli.output.is_none());
		assert!(cli.policy_overrides().percentile_method.is_none());
	}

	#[test]
	fn test_policy_flags() {
		let cli = Cli::try_parse_from([
			"dns-leaderboard", "samples.csv",
			"--percentile", "nearest-rank",
			"--unusable-error-pct", "40",
			"-vv",
		]).unwrap();
		let overrides = cli.policy_overrides();
		assert_eq!(overrides.percentile_method, Some(PercentileMethod::NearestRank));
		assert_eq!(overrides.unusable_error_pct, Some(40.0));
		assert_eq!(cli.verbose, 2);
	}

	#[test]
	fn test_verbose_help_matches_levels() {
		use clap::CommandFactory;

		let command = Cli::command();
		let verbose = command.get_arguments()
			.find(|arg| arg.get_id() == "verbose")
			.unwrap();
		let help = verbose.get_help().unwrap().to_string();
		for (flag, count) in [("-v ", 1u8), ("-vv ", 2), ("-vvv ", 3)] {
			let expected = format!("{}{}", flag, crate::logging::level_for(count));
			assert!(help.contains(&expected), "help '{}' lacks '{}'", help, expected);
		}
	}

	#[test]
	fn test_history_requires_json() {
		let result = Cli::try_parse_from(["dns-leaderboard", "samples.csv", "--history"]);
		assert!(result.is_err());
	}
}
