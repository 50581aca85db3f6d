//! Secondary views over the sample log: overall totals, the fastest
//! resolver per hour of day, per resolver/domain summaries, and data
//! quality diagnostics.

use std::collections::{BTreeMap, HashMap};

use chrono::Timelike;
use serde::Serialize;

use crate::sample::{ResolverKey, Sample};
use crate::stats::{cmp_ms, mean, median, rate_pct, sorted};

/// Totals over the whole sample set
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GlobalSummary {
	pub total_requests: usize,
	pub successes: usize,
	pub success_rate_pct: f64,
	/// Mean over successful samples, 0 when there are none
	pub avg_latency_ms: f64,
}

/// A resolver's mean latency within some grouping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contender {
	#[serde(flatten)]
	pub resolver: ResolverKey,
	pub mean_ms: f64,
}

/// Fastest resolvers for one hour of the day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyWinner {
	pub hour: u32,
	pub winner: Contender,
	pub runner_up: Option<Contender>,
}

/// Latency summary for one resolver against one domain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairSummary {
	#[serde(flatten)]
	pub resolver: ResolverKey,
	pub domain: String,
	pub count: usize,
	pub mean_ms: f64,
	pub median_ms: f64,
	pub min_ms: f64,
	pub max_ms: f64,
	/// Spread between the slowest and fastest response
	pub delta_ms: f64,
}

/// Data quality report
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Diagnostics {
	pub total_samples: usize,
	pub failures: usize,
	pub failure_rate_pct: f64,
	/// Failure kind and how often it occurred, most frequent first
	pub failure_kinds: Vec<(String, usize)>,
	/// Resolvers with the most failures, at most three
	pub worst_resolvers: Vec<(ResolverKey, usize)>,
	pub cache_threshold_ms: f64,
	/// Successful responses faster than the cache threshold, per resolver
	pub suspected_cache_hits: Vec<(ResolverKey, usize)>,
}

/// Responses faster than this are unlikely to have left the host
pub const DEFAULT_CACHE_THRESHOLD_MS: f64 = 2.0;

pub fn global_summary(samples: &[Sample]) -> GlobalSummary {
	let latencies: Vec<f64> = samples.iter().filter_map(|s| s.success_latency()).collect();
	GlobalSummary {
		total_requests: samples.len(),
		successes: latencies.len(),
		success_rate_pct: rate_pct(latencies.len(), samples.len()),
		avg_latency_ms: mean(&latencies).unwrap_or(0.0),
	}
}

/// Rank resolvers by mean latency within each hour of the day.
///
/// Only successful samples count. Hours without any success are left
/// out; the result is ordered by hour.
pub fn hourly_winners(samples: &[Sample]) -> Vec<HourlyWinner> {
	let mut by_hour: BTreeMap<u32, BTreeMap<&ResolverKey, Vec<f64>>> = BTreeMap::new();
	for sample in samples {
		if let Some(ms) = sample.success_latency() {
			by_hour
				.entry(sample.timestamp.hour())
				.or_default()
				.entry(&sample.resolver)
				.or_default()
				.push(ms);
		}
	}

	by_hour.into_iter()
		.filter_map(|(hour, by_resolver)| {
			let mut contenders: Vec<Contender> = by_resolver.into_iter()
				.filter_map(|(key, lats)| {
					mean(&lats).map(|mean_ms| Contender {
						resolver: key.clone(),
						mean_ms,
					})
				})
				.collect();
			contenders.sort_by(|a, b| {
				cmp_ms(a.mean_ms, b.mean_ms).then_with(|| a.resolver.cmp(&b.resolver))
			});
			let mut ranked = contenders.into_iter();
			let winner = ranked.next()?;
			Some(HourlyWinner {
				hour,
				winner,
				runner_up: ranked.next(),
			})
		})
		.collect()
}

/// Summarise successful latencies per resolver and domain.
pub fn pair_summary(samples: &[Sample]) -> Vec<PairSummary> {
	let mut pairs: BTreeMap<(&ResolverKey, &str), Vec<f64>> = BTreeMap::new();
	for sample in samples {
		if let Some(ms) = sample.success_latency() {
			pairs.entry((&sample.resolver, sample.domain.as_str()))
				.or_default()
				.push(ms);
		}
	}

	pairs.into_iter()
		.filter_map(|((key, domain), lats)| {
			let ordered = sorted(&lats);
			let min_ms = *ordered.first()?;
			let max_ms = *ordered.last()?;
			Some(PairSummary {
				resolver: key.clone(),
				domain: domain.to_string(),
				count: ordered.len(),
				mean_ms: mean(&ordered)?,
				median_ms: median(&ordered)?,
				min_ms,
				max_ms,
				delta_ms: max_ms - min_ms,
			})
		})
		.collect()
}

/// Sort counted entries by count descending, then by key.
fn by_count_desc<K: Ord>(counts: HashMap<K, usize>) -> Vec<(K, usize)> {
	let mut entries: Vec<(K, usize)> = counts.into_iter().collect();
	entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
	entries
}

/// Inspect the sample log for failures and suspiciously fast responses.
pub fn diagnose(samples: &[Sample], cache_threshold_ms: f64) -> Diagnostics {
	let mut kinds: HashMap<String, usize> = HashMap::new();
	let mut failures_by_resolver: HashMap<ResolverKey, usize> = HashMap::new();
	let mut cache_hits: HashMap<ResolverKey, usize> = HashMap::new();
	let mut failures = 0;

	for sample in samples {
		match sample.success_latency() {
			Some(ms) => {
				if ms < cache_threshold_ms {
					*cache_hits.entry(sample.resolver.clone()).or_default() += 1;
				}
			}
			None => {
				failures += 1;
				let kind = if sample.status.is_ok() {
					// OK status but no usable latency value
					"NO_LATENCY".to_string()
				} else {
					sample.status.to_string()
				};
				*kinds.entry(kind).or_default() += 1;
				*failures_by_resolver.entry(sample.resolver.clone()).or_default() += 1;
			}
		}
	}

	let mut worst_resolvers = by_count_desc(failures_by_resolver);
	worst_resolvers.truncate(3);

	Diagnostics {
		total_samples: samples.len(),
		failures,
		failure_rate_pct: rate_pct(failures, samples.len()),
		failure_kinds: by_count_desc(kinds),
		worst_resolvers,
		cache_threshold_ms,
		suspected_cache_hits: by_count_desc(cache_hits),
	}
}
