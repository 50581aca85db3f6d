use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

/// Outcome reported for a single query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
	Ok,
	/// Any non-OK outcome, keeping the raw kind (e.g. "TIMEOUT")
	Failed(String),
}

impl Status {
	/// Parse a status column value. "OK" is case-insensitive; an empty
	/// value is treated as an unknown failure.
	pub fn parse(raw: &str) -> Status {
		let trimmed = raw.trim();
		if trimmed.eq_ignore_ascii_case("ok") {
			Status::Ok
		} else if trimmed.is_empty() {
			Status::Failed("UNKNOWN".to_string())
		} else {
			Status::Failed(trimmed.to_ascii_uppercase())
		}
	}

	pub fn is_ok(&self) -> bool {
		matches!(self, Status::Ok)
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Status::Ok => write!(f, "OK"),
			Status::Failed(kind) => write!(f, "{}", kind),
		}
	}
}

impl Serialize for Status {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

/// Resolver identity: name plus address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResolverKey {
	pub name: String,
	pub address: String,
}

impl ResolverKey {
	pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
		ResolverKey {
			name: name.into(),
			address: address.into(),
		}
	}
}

impl fmt::Display for ResolverKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.name == self.address {
			write!(f, "{}", self.name)
		} else {
			write!(f, "{} ({})", self.name, self.address)
		}
	}
}

/// One recorded latency probe
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
	pub timestamp: NaiveDateTime,
	pub resolver: ResolverKey,
	pub domain: String,
	/// None when the log held no usable number (timeouts, parse errors)
	pub latency_ms: Option<f64>,
	pub status: Status,
}

impl Sample {
	/// Latency of a successful probe, or None if this sample must be
	/// excluded from latency statistics.
	pub fn success_latency(&self) -> Option<f64> {
		if !self.status.is_ok() {
			return None;
		}
		self.latency_ms.filter(|ms| ms.is_finite() && *ms >= 0.0)
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use super::fixtures::sample;

	#[test]
	fn test_status_parse() {
		assert_eq!(Status::parse("OK"), Status::Ok);
		assert_eq!(Status::parse(" ok "), Status::Ok);
		assert_eq!(Status::parse("timeout"), Status::Failed("TIMEOUT".to_string()));
		assert_eq!(Status::parse(""), Status::Failed("UNKNOWN".to_string()));
	}

	#[test]
	fn test_success_requires_ok_and_latency() {
		assert_eq!(sample("a", "x.com", Some(10.0), "OK").success_latency(), Some(10.0));
		assert_eq!(sample("a", "x.com", None, "OK").success_latency(), None);
		assert_eq!(sample("a", "x.com", Some(10.0), "TIMEOUT").success_latency(), None);
		assert_eq!(sample("a", "x.com", Some(-1.0), "OK").success_latency(), None);
		assert_eq!(sample("a", "x.com", Some(f64::NAN), "OK").success_latency(), None);
	}

	#[test]
	fn test_key_ordering() {
		let a = ResolverKey::new("Cloudflare", "1.1.1.1");
		let b = ResolverKey::new("Cloudflare", "1.0.0.1");
		let c = ResolverKey::new("Google", "8.8.8.8");
		assert!(b < a);
		assert!(a < c);
	}

	#[test]
	fn test_key_display() {
		assert_eq!(ResolverKey::new("Google", "8.8.8.8").to_string(), "Google (8.8.8.8)");
		assert_eq!(ResolverKey::new("9.9.9.9", "9.9.9.9").to_string(), "9.9.9.9");
	}
}
