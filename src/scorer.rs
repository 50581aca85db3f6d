use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::ScoringPolicy;
use crate::sample::{ResolverKey, Sample};
use crate::stats::{
	cmp_ms, coefficient_of_variation, mean, median, percentile, rate_pct, sorted, stddev,
};

/// Availability tier derived from a resolver's error rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
	/// Error rate at or below the degraded threshold; no penalty
	Healthy,
	/// Error rate above the degraded threshold; score scaled down
	Degraded,
	/// Error rate above the unusable threshold; score forced to zero
	Unusable,
}

/// Per-resolver statistics and composite score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolverStats {
	#[serde(flatten)]
	pub key: ResolverKey,
	pub requests: usize,
	pub successes: usize,
	pub error_rate_pct: f64,
	pub mean_ms: f64,
	pub median_ms: f64,
	pub p95_ms: f64,
	pub stddev_ms: f64,
	pub cv_pct: f64,
	/// Weighted latency score before the availability penalty
	pub base_score: f64,
	pub availability: Availability,
	pub score: f64,
}

/// Scored and ranked resolver
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResolver {
	pub rank: usize,
	#[serde(flatten)]
	pub stats: ResolverStats,
}

/// Fastest resolver (lowest median) for one domain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainWinner {
	pub domain: String,
	#[serde(flatten)]
	pub resolver: ResolverKey,
	pub median_ms: f64,
}

/// Everything one scoring pass produces
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Leaderboard {
	pub ranking: Vec<RankedResolver>,
	/// Sorted by domain name
	pub domain_winners: Vec<DomainWinner>,
	/// Domains seen in the input without a single successful sample
	pub unanswered_domains: Vec<String>,
}

/// Map a latency to a bounded quality score.
///
/// Linear decay: `ceiling - ms / ms_per_point`, floored at zero. With the
/// default policy 0 ms scores 100 and 200 ms or more scores 0. This is a
/// fixed policy, not fitted to data.
pub fn latency_score(ms: f64, policy: &ScoringPolicy) -> f64 {
	(policy.score_ceiling - ms / policy.ms_per_point).max(0.0)
}

/// Classify an error rate. Both thresholds are exclusive: a rate exactly
/// at a threshold stays in the milder tier.
pub fn availability(error_rate_pct: f64, policy: &ScoringPolicy) -> Availability {
	if error_rate_pct > policy.unusable_error_pct {
		Availability::Unusable
	} else if error_rate_pct > policy.degraded_error_pct {
		Availability::Degraded
	} else {
		Availability::Healthy
	}
}

/// Apply the availability penalty to a base score.
pub fn penalized_score(base: f64, tier: Availability, policy: &ScoringPolicy) -> f64 {
	match tier {
		Availability::Healthy => base,
		Availability::Degraded => base * policy.degraded_factor,
		Availability::Unusable => 0.0,
	}
}

/// Compute statistics and the composite score for one resolver.
///
/// Samples that are not successes still count as requests. When nothing
/// succeeded, latencies take the policy's sentinel value and the score
/// is zero regardless of the penalty tier.
pub fn compute_resolver_stats(
	key: ResolverKey,
	samples: &[&Sample],
	policy: &ScoringPolicy,
) -> ResolverStats {
	let latencies: Vec<f64> = samples.iter()
		.filter_map(|s| s.success_latency())
		.collect();
	let requests = samples.len();
	let successes = latencies.len();
	let error_rate_pct = rate_pct(requests - successes, requests);
	let tier = availability(error_rate_pct, policy);

	if latencies.is_empty() {
		let worst = policy.sentinel_worst_ms;
		return ResolverStats {
			key,
			requests,
			successes,
			error_rate_pct,
			mean_ms: worst,
			median_ms: worst,
			p95_ms: worst,
			stddev_ms: 0.0,
			cv_pct: 0.0,
			base_score: 0.0,
			availability: tier,
			score: 0.0,
		};
	}

	let ordered = sorted(&latencies);
	let p95_ms = percentile(&ordered, 95.0, policy.percentile_method).unwrap_or(policy.sentinel_worst_ms);
	let median_ms = median(&ordered).unwrap_or(policy.sentinel_worst_ms);
	let mean_ms = mean(&ordered).unwrap_or(policy.sentinel_worst_ms);
	let stddev_ms = stddev(&ordered).unwrap_or(0.0);

	let base_score = policy.p95_weight * latency_score(p95_ms, policy)
		+ policy.median_weight * latency_score(median_ms, policy);

	ResolverStats {
		key,
		requests,
		successes,
		error_rate_pct,
		mean_ms,
		median_ms,
		p95_ms,
		stddev_ms,
		cv_pct: coefficient_of_variation(stddev_ms, mean_ms),
		base_score,
		availability: tier,
		score: penalized_score(base_score, tier, policy),
	}
}

/// Rank resolvers by score, descending.
///
/// Ties go to resolvers that answered at all, then to the lower median
/// latency, then to the resolver key, so the order never depends on input
/// order. A resolver with no successes sorts after every resolver that
/// answered, whatever its sentinel latency.
pub fn rank_resolvers(mut resolvers: Vec<ResolverStats>) -> Vec<RankedResolver> {
	resolvers.sort_by(|a, b| {
		cmp_ms(b.score, a.score)
			.then_with(|| (a.successes == 0).cmp(&(b.successes == 0)))
			.then_with(|| cmp_ms(a.median_ms, b.median_ms))
			.then_with(|| a.key.cmp(&b.key))
	});
	resolvers.into_iter()
		.enumerate()
		.map(|(i, stats)| RankedResolver {
			rank: i + 1,
			stats,
		})
		.collect()
}

/// Pick the lowest-median resolver for every domain.
///
/// Only successful samples take part. Returns the winners sorted by
/// domain and, separately, the domains where nothing succeeded.
pub fn domain_winners(samples: &[Sample]) -> (Vec<DomainWinner>, Vec<String>) {
	let mut per_domain: BTreeMap<&str, BTreeMap<&ResolverKey, Vec<f64>>> = BTreeMap::new();
	let mut seen: BTreeSet<&str> = BTreeSet::new();

	for sample in samples {
		seen.insert(sample.domain.as_str());
		if let Some(ms) = sample.success_latency() {
			per_domain
				.entry(sample.domain.as_str())
				.or_default()
				.entry(&sample.resolver)
				.or_default()
				.push(ms);
		}
	}

	let mut winners = Vec::new();
	for (domain, by_resolver) in &per_domain {
		// BTreeMap iteration is key-ordered, so strict `<` keeps the
		// smallest key on equal medians
		let mut best: Option<(&ResolverKey, f64)> = None;
		for (key, latencies) in by_resolver {
			let Some(med) = median(&sorted(latencies)) else {
				continue;
			};
			if best.map_or(true, |(_, best_ms)| cmp_ms(med, best_ms).is_lt()) {
				best = Some((key, med));
			}
		}
		if let Some((key, median_ms)) = best {
			winners.push(DomainWinner {
				domain: domain.to_string(),
				resolver: key.clone(),
				median_ms,
			});
		}
	}

	let unanswered: Vec<String> = seen.into_iter()
		.filter(|d| !per_domain.contains_key(d))
		.map(String::from)
		.collect();

	(winners, unanswered)
}

/// Score every resolver in the sample set and pick domain winners.
///
/// Pure and deterministic: the same samples and policy always produce the
/// same leaderboard. An empty sample set yields an empty leaderboard.
pub fn score(samples: &[Sample], policy: &ScoringPolicy) -> Leaderboard {
	if samples.is_empty() {
		tracing::info!("no samples to score");
		return Leaderboard::default();
	}

	let mut by_resolver: BTreeMap<&ResolverKey, Vec<&Sample>> = BTreeMap::new();
	for sample in samples {
		by_resolver.entry(&sample.resolver).or_default().push(sample);
	}

	let stats_list: Vec<ResolverStats> = by_resolver.into_iter()
		.map(|(key, group)| {
			let stats = compute_resolver_stats(key.clone(), &group, policy);
			tracing::debug!(
				resolver = %stats.key,
				requests = stats.requests,
				error_rate_pct = stats.error_rate_pct,
				p95_ms = stats.p95_ms,
				median_ms = stats.median_ms,
				score = stats.score,
				"scored resolver"
			);
			stats
		})
		.collect();

	let ranking = rank_resolvers(stats_list);
	let (domain_winners, unanswered_domains) = domain_winners(samples);

	tracing::info!(
		samples = samples.len(),
		resolvers = ranking.len(),
		domains = domain_winners.len() + unanswered_domains.len(),
		"leaderboard computed"
	);
	if !unanswered_domains.is_empty() {
		tracing::warn!(
			count = unanswered_domains.len(),
			"some domains have no successful samples"
		);
	}

	Leaderboard {
		ranking,
		domain_winners,
		unanswered_domains,
	}
}
