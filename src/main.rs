mod breakdown;
mod cli;
mod config;
mod error;
mod input;
mod logging;
mod output;
mod sample;
mod scorer;
mod stats;

use anyhow::Context;
use clap::Parser;

use crate::cli::Cli;
use crate::config::ScoringPolicy;
use crate::output::JsonReport;

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	logging::init(cli.verbose);

	// Policy: file (if any), then individual CLI overrides
	let policy = ScoringPolicy::load(cli.policy.as_deref(), &cli.policy_overrides())
		.context("invalid scoring policy")?;
	tracing::debug!(?policy, "scoring policy in effect");

	let (samples, load) = input::read_sample_file(&cli.input)?;
	let summary = breakdown::global_summary(&samples);

	output::print_run_summary(&cli.input, &load, &summary, &policy);

	let board = scorer::score(&samples, &policy);
	if board.ranking.is_empty() {
		println!("No samples found; nothing to rank.");
	} else {
		output::print_ranking_table(&board.ranking, cli.top);
		output::print_domain_winners(&board.domain_winners, &board.unanswered_domains);
	}

	if cli.hourly {
		output::print_hourly_winners(&breakdown::hourly_winners(&samples));
	}
	if cli.pairs {
		output::print_pair_summary(&breakdown::pair_summary(&samples));
	}
	if cli.diagnose {
		output::print_diagnostics(&breakdown::diagnose(
			&samples,
			breakdown::DEFAULT_CACHE_THRESHOLD_MS,
		));
	}

	// Write exports if requested
	if let Some(path) = &cli.output {
		output::write_csv(path, &board.ranking)?;
	}
	if let Some(path) = &cli.winners_output {
		output::write_winners(path, &board.domain_winners)?;
	}
	if let Some(path) = &cli.json {
		let history = cli.history.then_some(samples.as_slice());
		let report = JsonReport::new(
			&board, &summary, &policy,
			chrono::Local::now().naive_local(),
			history,
		);
		output::write_json(path, &report)?;
	}

	Ok(())
}
