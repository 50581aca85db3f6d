use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL};
use serde::Serialize;

use crate::breakdown::{Diagnostics, GlobalSummary, HourlyWinner, PairSummary};
use crate::config::ScoringPolicy;
use crate::input::LoadSummary;
use crate::sample::{ResolverKey, Sample, Status};
use crate::scorer::{Availability, DomainWinner, Leaderboard, RankedResolver};

fn new_table(header: Vec<&str>) -> Table {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(header);
	table
}

fn availability_label(tier: Availability) -> &'static str {
	match tier {
		Availability::Healthy => "",
		Availability::Degraded => " (degraded)",
		Availability::Unusable => " (unusable)",
	}
}

/// Print a summary of the input and the policy in effect before the results.
pub fn print_run_summary(
	input: &Path,
	load: &LoadSummary,
	summary: &GlobalSummary,
	policy: &ScoringPolicy,
) {
	println!("DNS Resolver Leaderboard");
	println!("========================");
	println!("Input:          {}", input.display());
	println!("Samples:        {}", load.samples);
	if load.skipped > 0 {
		println!("Skipped rows:   {}", load.skipped);
	}
	println!("Success rate:   {:.1}%", summary.success_rate_pct);
	println!("Avg latency:    {:.1} ms", summary.avg_latency_ms);
	let method = match policy.percentile_method {
		crate::stats::PercentileMethod::Linear => "linear interpolation",
		crate::stats::PercentileMethod::NearestRank => "nearest rank",
	};
	println!("P95 method:     {}", method);
	println!(
		"Penalties:      x{} above {}% errors, 0 above {}%",
		policy.degraded_factor, policy.degraded_error_pct, policy.unusable_error_pct,
	);
	println!();
}

/// Print the resolver ranking as a formatted table. `top` of 0 prints all rows.
pub fn print_ranking_table(ranking: &[RankedResolver], top: usize) {
	let mut table = new_table(vec![
		"Rank", "Resolver", "Address", "Requests",
		"P95", "Mean", "Median",
		"CV %", "Error %", "Score",
	]);

	let limit = if top == 0 { ranking.len() } else { top };
	for r in ranking.iter().take(limit) {
		let s = &r.stats;
		table.add_row(vec![
			format!("{}", r.rank),
			s.key.name.clone(),
			s.key.address.clone(),
			format!("{}", s.requests),
			format!("{:.2} ms", s.p95_ms),
			format!("{:.2} ms", s.mean_ms),
			format!("{:.2} ms", s.median_ms),
			format!("{:.1}", s.cv_pct),
			format!("{:.1}%{}", s.error_rate_pct, availability_label(s.availability)),
			format!("{:.1}", s.score),
		]);
	}

	println!("\nResolver Ranking");
	println!("================\n");
	println!("{table}");
	if limit < ranking.len() {
		println!("({} more resolver(s) not shown)", ranking.len() - limit);
	}
}

/// Print the fastest resolver per domain, then any domain without data.
pub fn print_domain_winners(winners: &[DomainWinner], unanswered: &[String]) {
	let mut table = new_table(vec!["Domain", "Best Resolver", "Address", "Median"]);
	for w in winners {
		table.add_row(vec![
			w.domain.clone(),
			w.resolver.name.clone(),
			w.resolver.address.clone(),
			format!("{:.1} ms", w.median_ms),
		]);
	}
	for domain in unanswered {
		table.add_row(vec![domain.clone(), "no data".to_string(), String::new(), String::new()]);
	}

	println!("\nDomain Winners");
	println!("==============\n");
	println!("{table}");
}

pub fn print_hourly_winners(hours: &[HourlyWinner]) {
	let mut table = new_table(vec!["Hour", "Winner", "Mean", "Runner-up", "Mean"]);
	for h in hours {
		let (runner, runner_ms) = match &h.runner_up {
			Some(c) => (c.resolver.to_string(), format!("{:.3} ms", c.mean_ms)),
			None => (String::new(), String::new()),
		};
		table.add_row(vec![
			format!("{:02}:00", h.hour),
			h.winner.resolver.to_string(),
			format!("{:.3} ms", h.winner.mean_ms),
			runner,
			runner_ms,
		]);
	}

	println!("\nHourly Winners");
	println!("==============\n");
	println!("{table}");
}

pub fn print_pair_summary(pairs: &[PairSummary]) {
	let mut table = new_table(vec![
		"Resolver", "Domain", "Requests", "Mean", "Median", "Min", "Max", "Delta",
	]);
	for p in pairs {
		table.add_row(vec![
			p.resolver.to_string(),
			p.domain.clone(),
			format!("{}", p.count),
			format!("{:.2}", p.mean_ms),
			format!("{:.2}", p.median_ms),
			format!("{:.2}", p.min_ms),
			format!("{:.2}", p.max_ms),
			format!("{:.2}", p.delta_ms),
		]);
	}

	println!("\nResolver / Domain Summary (ms)");
	println!("==============================\n");
	println!("{table}");
}

pub fn print_diagnostics(diag: &Diagnostics) {
	println!("\nDiagnostics");
	println!("===========\n");
	println!(
		"Failures:       {} of {} ({:.2}%)",
		diag.failures, diag.total_samples, diag.failure_rate_pct,
	);
	for (kind, count) in &diag.failure_kinds {
		println!("  - {}: {}", kind, count);
	}
	if !diag.worst_resolvers.is_empty() {
		println!("Most failures:");
		for (key, count) in &diag.worst_resolvers {
			println!("  - {}: {}", key, count);
		}
	}
	if diag.suspected_cache_hits.is_empty() {
		println!(
			"No responses under {} ms; queries appear to reach the network.",
			diag.cache_threshold_ms,
		);
	} else {
		println!("Responses under {} ms (possible local cache):", diag.cache_threshold_ms);
		for (key, count) in &diag.suspected_cache_hits {
			println!("  - {}: {}", key, count);
		}
	}
}

/// Write the ranking as CSV to any writer.
pub fn write_ranking_csv<W: io::Write>(writer: W, ranking: &[RankedResolver]) -> Result<()> {
	let mut writer = csv::Writer::from_writer(writer);

	// Write header
	writer.write_record([
		"rank", "name", "address", "requests",
		"p95_ms", "mean_ms", "median_ms",
		"cv_pct", "error_pct", "score",
	])?;

	for r in ranking {
		let s = &r.stats;
		writer.write_record([
			r.rank.to_string(),
			s.key.name.clone(),
			s.key.address.clone(),
			s.requests.to_string(),
			format!("{:.2}", s.p95_ms),
			format!("{:.2}", s.mean_ms),
			format!("{:.2}", s.median_ms),
			format!("{:.1}", s.cv_pct),
			format!("{:.1}", s.error_rate_pct),
			format!("{:.1}", s.score),
		])?;
	}

	writer.flush()?;
	Ok(())
}

/// Write domain winners as CSV to any writer.
pub fn write_winners_csv<W: io::Write>(writer: W, winners: &[DomainWinner]) -> Result<()> {
	let mut writer = csv::Writer::from_writer(writer);
	writer.write_record(["domain", "name", "address", "median_ms"])?;
	for w in winners {
		writer.write_record([
			w.domain.clone(),
			w.resolver.name.clone(),
			w.resolver.address.clone(),
			format!("{:.1}", w.median_ms),
		])?;
	}
	writer.flush()?;
	Ok(())
}

fn create_file(path: &Path) -> Result<std::fs::File> {
	std::fs::File::create(path)
		.with_context(|| format!("failed to create output file '{}'", path.display()))
}

/// Write the ranking table to a CSV file.
pub fn write_csv(path: &Path, ranking: &[RankedResolver]) -> Result<()> {
	write_ranking_csv(create_file(path)?, ranking)?;
	println!("\nRanking written to: {}", path.display());
	Ok(())
}

/// Write the domain winners table to a CSV file.
pub fn write_winners(path: &Path, winners: &[DomainWinner]) -> Result<()> {
	write_winners_csv(create_file(path)?, winners)?;
	println!("Domain winners written to: {}", path.display());
	Ok(())
}

#[derive(Debug, Serialize)]
pub struct Metadata<'a> {
	pub generated_at: String,
	pub total_requests: usize,
	pub success_rate: f64,
	pub avg_latency: f64,
	pub policy: &'a ScoringPolicy,
}

/// One raw sample as exported for timeline views
#[derive(Debug, Serialize)]
pub struct HistoryEntry<'a> {
	pub timestamp: String,
	#[serde(flatten)]
	pub resolver: &'a ResolverKey,
	pub domain: &'a str,
	pub latency_ms: Option<f64>,
	pub status: &'a Status,
}

/// Document consumed by dashboard renderers
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
	pub metadata: Metadata<'a>,
	pub ranking: &'a [RankedResolver],
	pub domain_winners: &'a [DomainWinner],
	pub unanswered_domains: &'a [String],
	#[serde(skip_serializing_if = "Option::is_none")]
	pub history: Option<Vec<HistoryEntry<'a>>>,
}

impl<'a> JsonReport<'a> {
	pub fn new(
		board: &'a Leaderboard,
		summary: &GlobalSummary,
		policy: &'a ScoringPolicy,
		generated_at: NaiveDateTime,
		history: Option<&'a [Sample]>,
	) -> Self {
		let history = history.map(|samples| {
			samples.iter()
				.map(|s| HistoryEntry {
					timestamp: s.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
					resolver: &s.resolver,
					domain: &s.domain,
					latency_ms: s.latency_ms,
					status: &s.status,
				})
				.collect()
		});
		JsonReport {
			metadata: Metadata {
				generated_at: generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
				total_requests: summary.total_requests,
				success_rate: summary.success_rate_pct,
				avg_latency: summary.avg_latency_ms,
				policy,
			},
			ranking: &board.ranking,
			domain_winners: &board.domain_winners,
			unanswered_domains: &board.unanswered_domains,
			history,
		}
	}
}

/// Write the JSON report to a file, pretty-printed.
pub fn write_json(path: &Path, report: &JsonReport<'_>) -> Result<()> {
	let file = io::BufWriter::new(create_file(path)?);
	serde_json::to_writer_pretty(file, report)
		.with_context(|| format!("failed to write JSON report '{}'", path.display()))?;
	println!("JSON report written to: {}", path.display());
	Ok(())
}
