use tracing_subscriber::EnvFilter;

/// Log level for a `-v` count
pub fn level_for(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	}
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` takes precedence; otherwise verbosity 0 logs warnings,
/// 1 adds info, 2 debug and anything higher trace.
pub fn init(verbosity: u8) {
	let default_level = level_for(verbosity);
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("dns_leaderboard={}", default_level)));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}
