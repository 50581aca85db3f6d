use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// How a percentile is picked from a sorted sample set.
///
/// The choice matters at small sample counts: with 10 values the
/// nearest-rank P95 is the maximum, while linear interpolation lands
/// between the two largest values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PercentileMethod {
	/// Interpolate between closest ranks: h = (N - 1) * p / 100
	#[default]
	Linear,
	/// Smallest value with at least p% of the data at or below it: rank = ceil(p/100 * N)
	NearestRank,
}

/// Sort a slice of latencies into a new vector, using a total order so NaN
/// never panics the sort.
pub fn sorted(values: &[f64]) -> Vec<f64> {
	let mut sorted = values.to_vec();
	sorted.sort_by(|a, b| a.total_cmp(b));
	sorted
}

/// Calculate the p-th percentile from a sorted slice.
///
/// Args:
///   sorted_values: Pre-sorted slice of f64 values.
///   p: Percentile between 0.0 and 100.0 (e.g. 95.0 for P95).
///   method: Rank selection rule.
///
/// Returns:
///   None if the slice is empty, otherwise the percentile value.
pub fn percentile(sorted_values: &[f64], p: f64, method: PercentileMethod) -> Option<f64> {
	if sorted_values.is_empty() {
		return None;
	}
	if sorted_values.len() == 1 {
		return Some(sorted_values[0]);
	}
	let n = sorted_values.len();
	let p = p.clamp(0.0, 100.0);
	match method {
		PercentileMethod::NearestRank => {
			let rank = ((p / 100.0) * n as f64).ceil() as usize;
			// Clamp rank to valid index range [1, n]
			let rank = rank.clamp(1, n);
			Some(sorted_values[rank - 1])
		}
		PercentileMethod::Linear => {
			let h = (n - 1) as f64 * p / 100.0;
			let lo = h.floor() as usize;
			let hi = h.ceil() as usize;
			let frac = h - lo as f64;
			Some(sorted_values[lo] + frac * (sorted_values[hi] - sorted_values[lo]))
		}
	}
}

/// Median of a sorted slice: the middle value, or the mean of the two
/// middle values for an even count.
pub fn median(sorted_values: &[f64]) -> Option<f64> {
	let n = sorted_values.len();
	if n == 0 {
		return None;
	}
	if n % 2 == 1 {
		Some(sorted_values[n / 2])
	} else {
		Some((sorted_values[n / 2 - 1] + sorted_values[n / 2]) / 2.0)
	}
}

/// Calculate the arithmetic mean of a slice of values.
pub fn mean(values: &[f64]) -> Option<f64> {
	if values.is_empty() {
		return None;
	}
	let sum: f64 = values.iter().sum();
	Some(sum / values.len() as f64)
}

/// Calculate the population standard deviation of a slice of values.
pub fn stddev(values: &[f64]) -> Option<f64> {
	let avg = mean(values)?;
	let variance = values.iter()
		.map(|v| (v - avg).powi(2))
		.sum::<f64>() / values.len() as f64;
	Some(variance.sqrt())
}

/// Coefficient of variation in percent. Zero when the mean is not positive.
pub fn coefficient_of_variation(stddev_ms: f64, mean_ms: f64) -> f64 {
	if mean_ms > 0.0 {
		stddev_ms / mean_ms * 100.0
	} else {
		0.0
	}
}

/// Percentage of `part` in `total`, zero for an empty total.
///
/// Whole percentages (10%, 25%) come out exact, so they compare cleanly
/// against penalty thresholds.
pub fn rate_pct(part: usize, total: usize) -> f64 {
	if total == 0 {
		return 0.0;
	}
	(part as f64 * 100.0) / total as f64
}

/// Compare two latencies ascending with a total order.
pub fn cmp_ms(a: f64, b: f64) -> Ordering {
	a.total_cmp(&b)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_nearest_rank_basic() {
		let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
		assert_eq!(percentile(&values, 50.0, PercentileMethod::NearestRank), Some(5.0));
		assert_eq!(percentile(&values, 95.0, PercentileMethod::NearestRank), Some(10.0));
		assert_eq!(percentile(&values, 10.0, PercentileMethod::NearestRank), Some(1.0));
	}

	#[test]
	fn test_linear_basic() {
		let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
		// h = 9 * 0.95 = 8.55 -> 9 + 0.55 * (10 - 9)
		let p95 = percentile(&values, 95.0, PercentileMethod::Linear).unwrap();
		assert!((p95 - 9.55).abs() < 1e-9);
		let p50 = percentile(&values, 50.0, PercentileMethod::Linear).unwrap();
		assert!((p50 - 5.5).abs() < 1e-9);
		assert_eq!(percentile(&values, 100.0, PercentileMethod::Linear), Some(10.0));
		assert_eq!(percentile(&values, 0.0, PercentileMethod::Linear), Some(1.0));
	}

	#[test]
	fn test_methods_differ_at_small_counts() {
		let values = vec![10.0, 20.0, 30.0];
		assert_eq!(percentile(&values, 95.0, PercentileMethod::NearestRank), Some(30.0));
		let linear = percentile(&values, 95.0, PercentileMethod::Linear).unwrap();
		assert!((linear - 29.0).abs() < 1e-9);
	}

	#[test]
	fn test_percentile_empty() {
		let values: Vec<f64> = vec![];
		assert_eq!(percentile(&values, 50.0, PercentileMethod::Linear), None);
		assert_eq!(percentile(&values, 50.0, PercentileMethod::NearestRank), None);
	}

	#[test]
	fn test_percentile_single() {
		let values = vec![42.0];
		assert_eq!(percentile(&values, 95.0, PercentileMethod::Linear), Some(42.0));
		assert_eq!(percentile(&values, 95.0, PercentileMethod::NearestRank), Some(42.0));
	}

	#[test]
	fn test_median_odd_even() {
		assert_eq!(median(&[1.0, 3.0, 9.0]), Some(3.0));
		assert_eq!(median(&[1.0, 3.0, 5.0, 9.0]), Some(4.0));
		assert_eq!(median(&[]), None);
	}

	#[test]
	fn test_sorted_handles_nan() {
		let s = sorted(&[3.0, f64::NAN, 1.0]);
		assert_eq!(s[0], 1.0);
		assert_eq!(s[1], 3.0);
		assert!(s[2].is_nan());
	}

	#[test]
	fn test_mean() {
		let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
		assert_eq!(mean(&values), Some(3.0));
		assert_eq!(mean(&[]), None);
	}

	#[test]
	fn test_stddev() {
		let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
		let sd = stddev(&values).unwrap();
		// Population stddev should be 2.0
		assert!((sd - 2.0).abs() < 0.01);
	}

	#[test]
	fn test_cv_guards_zero_mean() {
		assert_eq!(coefficient_of_variation(5.0, 0.0), 0.0);
		assert!((coefficient_of_variation(2.0, 5.0) - 40.0).abs() < 1e-9);
	}

	#[test]
	fn test_rate_pct() {
		assert_eq!(rate_pct(0, 0), 0.0);
		assert_eq!(rate_pct(2, 20), 10.0);
		assert_eq!(rate_pct(5, 20), 25.0);
	}
}
