//! Shared helpers for the integration tests

// Not every test file uses every helper.
#![allow(dead_code)]

use std::collections::HashSet;

use mqtt_topic_feeds::TopicFilter;
use rand::Rng;

/// Installs a test-writer tracing subscriber once; `RUST_LOG` controls it.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

fn random_level(rng: &mut impl Rng) -> String {
	const CHARSET: &[u8] =
		b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
	match rng.random_range(0 .. 4) {
		| 0 => "+".to_string(),
		| 1 => "#".to_string(),
		| _ => {
			let len = rng.random_range(0 .. 15);
			(0 .. len)
				.map(|_| CHARSET[rng.random_range(0 .. CHARSET.len())] as char)
				.collect()
		}
	}
}

fn random_filter(rng: &mut impl Rng) -> String {
	let max_levels = rng.random_range(1 .. 15);
	let mut levels = Vec::with_capacity(max_levels);
	for _ in 0 .. max_levels {
		let level = random_level(rng);
		let is_hash = level == "#";
		levels.push(level);
		if is_hash {
			break;
		}
	}
	levels.join("/")
}

/// Generates `n` distinct valid filters mixing literals, `+` and `#`.
pub fn random_filters(n: usize) -> Vec<TopicFilter> {
	let mut rng = rand::rng();
	let mut seen = HashSet::with_capacity(n);
	let mut filters = Vec::with_capacity(n);
	while filters.len() < n {
		let filter = random_filter(&mut rng);
		// a single empty level is not a valid filter
		if filter.is_empty() || !seen.insert(filter.clone()) {
			continue;
		}
		filters.push(TopicFilter::parse(filter).expect("generated filter is valid"));
	}
	filters
}

/// Every filter obtained from `levels` by replacing any subset of levels
/// with `+`, plus every such prefix followed by `#`.
pub fn wildcard_permutations(levels: &[&str]) -> Vec<String> {
	fn traverse(levels: &[&str], current: &mut Vec<String>, out: &mut Vec<String>) {
		if let Some((first, rest)) = levels.split_first() {
			current.push(first.to_string());
			traverse(rest, current, out);
			current.pop();

			current.push("+".to_string());
			traverse(rest, current, out);
			current.pop();
		} else {
			out.push(current.join("/"));
		}
		current.push("#".to_string());
		out.push(current.join("/"));
		current.pop();
	}

	let mut out = Vec::new();
	traverse(levels, &mut Vec::new(), &mut out);
	out
}
