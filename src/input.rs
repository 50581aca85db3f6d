use std::io;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};

use crate::error::LoadError;
use crate::sample::{ResolverKey, Sample, Status};

const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "data_hora", "time"];
const NAME_ALIASES: &[&str] = &["resolver_name", "dns_name", "dns"];
const ADDRESS_ALIASES: &[&str] = &["resolver_address", "dns_ip", "ip"];
const DOMAIN_ALIASES: &[&str] = &["domain", "dominio"];
const LATENCY_ALIASES: &[&str] = &["latency_ms", "tempo_ms", "latency"];
const STATUS_ALIASES: &[&str] = &["status"];

/// Naive timestamp layouts accepted after RFC 3339
const TIMESTAMP_FORMATS: &[&str] = &[
	"%Y-%m-%d %H:%M:%S%.f",
	"%Y-%m-%dT%H:%M:%S%.f",
	"%d/%m/%Y %H:%M:%S",
	"%Y-%m-%d %H:%M",
];

/// Counts gathered while reading a sample log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
	/// Data rows seen (header rows excluded)
	pub rows: usize,
	pub samples: usize,
	/// Malformed rows that were dropped
	pub skipped: usize,
}

/// Positions of the columns the scorer needs
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnMap {
	timestamp: usize,
	name: usize,
	address: Option<usize>,
	domain: usize,
	latency: usize,
	status: Option<usize>,
}

impl ColumnMap {
	/// Column order of header-less logs
	fn positional() -> Self {
		ColumnMap {
			timestamp: 0,
			name: 1,
			address: Some(2),
			domain: 3,
			latency: 4,
			status: Some(5),
		}
	}

	/// Resolve column positions from a header row. Returns None when the
	/// row does not look like a header.
	fn from_header(header: &csv::StringRecord) -> Result<Option<Self>, LoadError> {
		let find = |aliases: &[&str]| {
			header.iter().position(|field| {
				aliases.iter().any(|alias| field.trim().eq_ignore_ascii_case(alias))
			})
		};

		let Some(domain) = find(DOMAIN_ALIASES) else {
			return Ok(None);
		};
		let name = find(NAME_ALIASES).ok_or(LoadError::MissingColumn("resolver_name"))?;
		Ok(Some(ColumnMap {
			timestamp: find(TIMESTAMP_ALIASES).ok_or(LoadError::MissingColumn("timestamp"))?,
			name,
			address: find(ADDRESS_ALIASES),
			domain,
			latency: find(LATENCY_ALIASES).ok_or(LoadError::MissingColumn("latency_ms"))?,
			status: find(STATUS_ALIASES),
		}))
	}

	fn min_fields(&self) -> usize {
		[
			Some(self.timestamp),
			Some(self.name),
			self.address,
			Some(self.domain),
			Some(self.latency),
			self.status,
		]
		.into_iter()
		.flatten()
		.max()
		.map_or(0, |max| max + 1)
	}
}

/// Parse a latency cell. Empty, "TIMEOUT", negative or non-numeric
/// values yield None.
pub fn parse_latency(raw: &str) -> Option<f64> {
	raw.trim()
		.parse::<f64>()
		.ok()
		.filter(|ms| ms.is_finite() && *ms >= 0.0)
}

/// Parse a timestamp cell in any of the accepted layouts.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
	let trimmed = raw.trim();
	if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
		return Some(dt.naive_local());
	}
	TIMESTAMP_FORMATS.iter()
		.find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

fn is_header_row(record: &csv::StringRecord, columns: &ColumnMap) -> bool {
	record.get(columns.timestamp)
		.map(|field| TIMESTAMP_ALIASES.iter().any(|alias| field.eq_ignore_ascii_case(alias)))
		.unwrap_or(false)
}

fn parse_row(record: &csv::StringRecord, columns: &ColumnMap) -> Result<Sample, String> {
	if record.len() < columns.min_fields() {
		return Err(format!("expected at least {} fields, got {}", columns.min_fields(), record.len()));
	}
	let field = |idx: usize| record.get(idx).unwrap_or("").trim();

	let raw_ts = field(columns.timestamp);
	let timestamp = parse_timestamp(raw_ts)
		.ok_or_else(|| format!("unrecognised timestamp '{}'", raw_ts))?;

	let name = field(columns.name);
	if name.is_empty() {
		return Err("empty resolver name".to_string());
	}
	let domain = field(columns.domain);
	if domain.is_empty() {
		return Err("empty domain".to_string());
	}
	let address = columns.address
		.map(field)
		.filter(|a| !a.is_empty())
		.unwrap_or(name);

	let latency_ms = parse_latency(field(columns.latency));
	let status = match columns.status {
		Some(idx) => Status::parse(field(idx)),
		// Logs without a status column mark failures by leaving out the latency
		None if latency_ms.is_some() => Status::Ok,
		None => Status::Failed("TIMEOUT".to_string()),
	};

	Ok(Sample {
		timestamp,
		resolver: ResolverKey::new(name, address),
		domain: domain.to_string(),
		latency_ms,
		status,
	})
}

/// Read samples from CSV data.
///
/// The first row is treated as a header when it names a domain column;
/// otherwise the data is read in the fixed order
/// `timestamp, resolver_name, resolver_address, domain, latency_ms, status`.
/// Header rows repeated further down (from appended logs) are ignored and
/// malformed rows are skipped with a warning.
pub fn read_samples<R: io::Read>(reader: R) -> Result<(Vec<Sample>, LoadSummary), LoadError> {
	let mut csv_reader = csv::ReaderBuilder::new()
		.has_headers(false)
		.flexible(true)
		.trim(csv::Trim::All)
		.from_reader(reader);

	let mut summary = LoadSummary::default();
	let mut samples = Vec::new();
	let mut columns: Option<ColumnMap> = None;

	for result in csv_reader.byte_records() {
		let raw = match result {
			Ok(raw) => raw,
			Err(e) if e.is_io_error() => return Err(e.into()),
			Err(e) => {
				summary.rows += 1;
				summary.skipped += 1;
				tracing::warn!(error = %e, "skipping unreadable row");
				continue;
			}
		};
		let line = raw.position().map(|p| p.line()).unwrap_or(0);
		// Decoded per row: invalid UTF-8 only drops the row it is in
		let record = match csv::StringRecord::from_byte_record(raw) {
			Ok(record) => record,
			Err(e) => {
				summary.rows += 1;
				summary.skipped += 1;
				tracing::warn!(line, error = %e, "skipping row with invalid UTF-8");
				continue;
			}
		};

		if columns.is_none() {
			let resolved = ColumnMap::from_header(&record)?;
			let has_header = resolved.is_some();
			let map = resolved.unwrap_or_else(ColumnMap::positional);
			tracing::debug!(columns = ?map, headerless = !has_header, "resolved sample columns");
			columns = Some(map);
			if has_header {
				continue;
			}
		}
		let Some(map) = columns.as_ref() else {
			continue;
		};

		if is_header_row(&record, map) {
			continue;
		}
		summary.rows += 1;
		match parse_row(&record, map) {
			Ok(sample) => samples.push(sample),
			Err(reason) => {
				summary.skipped += 1;
				tracing::warn!(line, %reason, "skipping malformed row");
			}
		}
	}

	summary.samples = samples.len();
	Ok((samples, summary))
}

/// Read samples from a CSV file on disk.
pub fn read_sample_file(path: &Path) -> Result<(Vec<Sample>, LoadSummary), LoadError> {
	let file = std::fs::File::open(path).map_err(|e| LoadError::Open {
		path: path.to_path_buf(),
		source: csv::Error::from(e),
	})?;
	let (samples, summary) = read_samples(io::BufReader::new(file))?;
	tracing::info!(
		path = %path.display(),
		rows = summary.rows,
		samples = summary.samples,
		skipped = summary.skipped,
		"loaded samples"
	);
	Ok((samples, summary))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn load(data: &str) -> (Vec<Sample>, LoadSummary) {
		read_samples(data.as_bytes()).unwrap()
	}

	#[test]
	fn test_named_header() {
		let data = "\
timestamp,resolver_name,resolver_address,domain,latency_ms,status
2025-01-10 08:00:00,Cloudflare,1.1.1.1,example.com,12.5,OK
2025-01-10 08:00:01,Google,8.8.8.8,example.com,,TIMEOUT
";
		let (samples, summary) = load(data);
		assert_eq!(summary, LoadSummary { rows: 2, samples: 2, skipped: 0 });
		assert_eq!(samples[0].resolver, ResolverKey::new("Cloudflare", "1.1.1.1"));
		assert_eq!(samples[0].latency_ms, Some(12.5));
		assert_eq!(samples[0].success_latency(), Some(12.5));
		assert_eq!(samples[1].latency_ms, None);
		assert_eq!(samples[1].status, Status::Failed("TIMEOUT".to_string()));
	}

	#[test]
	fn test_short_aliases_and_column_order() {
		let data = "\
status,dns,ip,domain,latency_ms,timestamp
OK,Quad9,9.9.9.9,a.com,20,2025-01-10T08:00:00
";
		let (samples, _) = load(data);
		assert_eq!(samples.len(), 1);
		assert_eq!(samples[0].resolver, ResolverKey::new("Quad9", "9.9.9.9"));
		assert_eq!(samples[0].domain, "a.com");
		assert_eq!(samples[0].latency_ms, Some(20.0));
	}

	#[test]
	fn test_headerless_with_repeated_header() {
		let data = "\
2025-01-10 08:00:00,Cloudflare,1.1.1.1,example.com,10,OK
timestamp,dns_name,dns_ip,domain,latency_ms,status
2025-01-10 09:00:00,Cloudflare,1.1.1.1,example.com,11,OK
";
		let (samples, summary) = load(data);
		assert_eq!(summary.rows, 2);
		assert_eq!(samples.len(), 2);
		assert_eq!(samples[1].latency_ms, Some(11.0));
	}

	#[test]
	fn test_log_without_status_or_address() {
		let data = "\
data_hora,dns,dominio,req,tempo_ms
2025-01-10 08:00:00,8.8.8.8,google.com,1,15.2
2025-01-10 08:00:05,8.8.8.8,google.com,2,timeout
";
		let (samples, _) = load(data);
		assert_eq!(samples[0].resolver, ResolverKey::new("8.8.8.8", "8.8.8.8"));
		assert_eq!(samples[0].status, Status::Ok);
		assert_eq!(samples[1].status, Status::Failed("TIMEOUT".to_string()));
		assert_eq!(samples[1].success_latency(), None);
	}

	#[test]
	fn test_malformed_rows_skipped() {
		let data = "\
timestamp,resolver_name,resolver_address,domain,latency_ms,status
not-a-time,Cloudflare,1.1.1.1,example.com,10,OK
2025-01-10 08:00:00,,1.1.1.1,example.com,10,OK
2025-01-10 08:00:00,Cloudflare
2025-01-10 08:00:00,Cloudflare,1.1.1.1,example.com,abc,OK
";
		let (samples, summary) = load(data);
		assert_eq!(summary.rows, 4);
		assert_eq!(summary.skipped, 3);
		// Bad latency keeps the row but not as a success
		assert_eq!(samples.len(), 1);
		assert_eq!(samples[0].latency_ms, None);
		assert_eq!(samples[0].success_latency(), None);
	}

	#[test]
	fn test_invalid_utf8_row_skipped() {
		let mut data = b"timestamp,resolver_name,resolver_address,domain,latency_ms,status\n".to_vec();
		data.extend_from_slice(b"2025-01-10 08:00:00,Cloudflare,1.1.1.1,example.com,10,OK\n");
		data.extend_from_slice(b"2025-01-10 08:00:01,Cloudflare,1.1.1.1,x\xff.com,11,OK\n");
		data.extend_from_slice(b"2025-01-10 08:00:02,Google,8.8.8.8,example.com,12,OK\n");

		let (samples, summary) = read_samples(data.as_slice()).unwrap();
		assert_eq!(summary, LoadSummary { rows: 3, samples: 2, skipped: 1 });
		assert_eq!(samples[0].resolver.name, "Cloudflare");
		assert_eq!(samples[1].resolver.name, "Google");
	}

	#[test]
	fn test_invalid_utf8_first_row_headerless() {
		let mut data = b"2025-01-10 08:00:00,Bad\xff,1.1.1.1,example.com,10,OK\n".to_vec();
		data.extend_from_slice(b"2025-01-10 08:00:01,Quad9,9.9.9.9,example.com,11,OK\n");

		let (samples, summary) = read_samples(data.as_slice()).unwrap();
		assert_eq!(summary, LoadSummary { rows: 2, samples: 1, skipped: 1 });
		assert_eq!(samples[0].resolver, ResolverKey::new("Quad9", "9.9.9.9"));
	}

	#[test]
	fn test_empty_domain_skipped() {
		let data = "\
timestamp,resolver_name,resolver_address,domain,latency_ms,status
2025-01-10 08:00:00,Cloudflare,1.1.1.1,,10,OK
2025-01-10 08:00:01,Cloudflare,1.1.1.1,example.com,10,OK
";
		let (samples, summary) = load(data);
		assert_eq!(summary.skipped, 1);
		assert_eq!(samples.len(), 1);
		assert_eq!(samples[0].domain, "example.com");
	}

	#[test]
	fn test_header_missing_latency_column() {
		let data = "timestamp,dns,domain,status\n";
		let result = read_samples(data.as_bytes());
		assert!(matches!(result, Err(LoadError::MissingColumn("latency_ms"))));
	}

	#[test]
	fn test_empty_input() {
		let (samples, summary) = load("");
		assert!(samples.is_empty());
		assert_eq!(summary, LoadSummary::default());
	}

	#[test]
	fn test_parse_latency() {
		assert_eq!(parse_latency(" 12.25 "), Some(12.25));
		assert_eq!(parse_latency("0"), Some(0.0));
		assert_eq!(parse_latency(""), None);
		assert_eq!(parse_latency("TIMEOUT"), None);
		assert_eq!(parse_latency("nan"), None);
		assert_eq!(parse_latency("-3"), None);
	}

	#[test]
	fn test_parse_timestamp_formats() {
		for raw in [
			"2025-01-10T08:30:00Z",
			"2025-01-10T08:30:00-03:00",
			"2025-01-10 08:30:00",
			"2025-01-10 08:30:00.125",
			"2025-01-10T08:30:00",
			"10/01/2025 08:30:00",
			"2025-01-10 08:30",
		] {
			let ts = parse_timestamp(raw).unwrap_or_else(|| panic!("failed to parse {}", raw));
			assert_eq!(ts.format("%Y-%m-%d %H:%M").to_string(), "2025-01-10 08:30");
		}
		assert_eq!(parse_timestamp("yesterday"), None);
	}

	#[test]
	fn test_missing_file() {
		let result = read_sample_file(Path::new("/nonexistent/samples.csv"));
		assert!(matches!(result, Err(LoadError::Open { .. })));
	}
}
