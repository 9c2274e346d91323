//! Concurrent access to a shared topic map

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

use mqtt_topic_feeds::{Feed, TopicFilter, TopicMap, TopicName};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

const N_FILTERS: usize = 10;
const N_THREADS: usize = 10;
const N_ATTEMPTS_PER_THREAD: usize = 1000;

#[test]
fn test_concurrent_init_creates_each_feed_once() {
	common::init_tracing();
	let filters = common::random_filters(N_FILTERS);
	let map = TopicMap::new();
	let creations: Vec<AtomicUsize> =
		(0 .. N_FILTERS).map(|_| AtomicUsize::new(0)).collect();
	let canonical: Vec<OnceLock<Arc<Feed>>> =
		(0 .. N_FILTERS).map(|_| OnceLock::new()).collect();

	thread::scope(|s| {
		for _ in 0 .. N_THREADS {
			s.spawn(|| {
				let mut rng = rand::rng();
				// every filter at least once, then random picks
				let mut order: Vec<usize> = (0 .. N_FILTERS).collect();
				order.shuffle(&mut rng);
				order.extend(
					(0 .. N_ATTEMPTS_PER_THREAD)
						.map(|_| rng.random_range(0 .. N_FILTERS)),
				);

				for index in order {
					let (feed, already_existed) =
						map.init_feed(&filters[index]);
					if !already_existed {
						creations[index].fetch_add(1, Ordering::SeqCst);
					}
					let winner = canonical[index].get_or_init(|| Arc::clone(&feed));
					assert!(
						Arc::ptr_eq(winner, &feed),
						"filter {} returned two different feeds",
						filters[index]
					);
				}
			});
		}
	});

	for (index, created) in creations.iter().enumerate() {
		assert_eq!(
			created.load(Ordering::SeqCst),
			1,
			"filter {} must be created exactly once",
			filters[index]
		);
	}
}

#[test]
fn test_concurrent_lookups_return_registered_feed() {
	common::init_tracing();
	let filters = common::random_filters(N_FILTERS);
	let map = TopicMap::new();
	let feeds: Vec<Arc<Feed>> = filters
		.iter()
		.map(|filter| {
			let (feed, already_existed) = map.init_feed(filter);
			assert!(!already_existed);
			feed
		})
		.collect();

	thread::scope(|s| {
		for _ in 0 .. N_THREADS {
			s.spawn(|| {
				let mut rng = rand::rng();
				for _ in 0 .. N_ATTEMPTS_PER_THREAD {
					let index = rng.random_range(0 .. N_FILTERS);
					let (feed, already_existed) =
						map.init_feed(&filters[index]);
					assert!(already_existed, "feed should already exist");
					assert!(Arc::ptr_eq(&feeds[index], &feed));
				}
			});
		}
	});

	for (filter, feed) in filters.iter().zip(&feeds) {
		let removed = map.remove_feed(filter).expect("feed is registered");
		assert!(Arc::ptr_eq(feed, &removed));
	}
	assert!(map.is_empty());
}

#[test]
fn test_init_and_remove_race_keeps_one_feed_per_filter() {
	common::init_tracing();
	let filters: Vec<TopicFilter> = ["a/b/c", "a/b", "a/+/c", "a/#", "+/b/#"]
		.into_iter()
		.map(|f| TopicFilter::parse(f).unwrap())
		.collect();
	let map = TopicMap::new();

	thread::scope(|s| {
		for _ in 0 .. N_THREADS {
			s.spawn(|| {
				let mut rng = rand::rng();
				for _ in 0 .. N_ATTEMPTS_PER_THREAD {
					let filter = filters.choose(&mut rng).unwrap();
					if rng.random_bool(0.3) {
						map.remove_feed(filter);
					} else {
						map.init_feed(filter);
					}
				}
			});
		}
	});

	// whatever survived, each filter resolves to exactly one feed
	for filter in &filters {
		let (feed, _) = map.init_feed(filter);
		let (again, already_existed) = map.init_feed(filter);
		assert!(already_existed);
		assert!(Arc::ptr_eq(&feed, &again));
		assert_eq!(feed.filter(), filter.as_str());
	}
	for filter in &filters {
		assert!(map.remove_feed(filter).is_some());
	}
	assert!(map.is_empty());
}

#[test]
fn test_matching_during_removal_sees_consistent_tree() {
	common::init_tracing();
	let filters: Vec<TopicFilter> =
		["x/y/z", "x/+/z", "x/#", "#", "+/y/+", "x/y/z/#"]
			.into_iter()
			.map(|f| TopicFilter::parse(f).unwrap())
			.collect();
	let topic = TopicName::parse("x/y/z").unwrap();
	let unrelated = TopicFilter::parse("q/r").unwrap();
	let map = TopicMap::new();
	let (stable, _) = map.init_feed(&unrelated);

	thread::scope(|s| {
		for _ in 0 .. 4 {
			s.spawn(|| {
				let mut rng = rand::rng();
				for _ in 0 .. N_ATTEMPTS_PER_THREAD {
					let filter = filters.choose(&mut rng).unwrap();
					if rng.random_bool(0.5) {
						map.remove_feed(filter);
					} else {
						map.init_feed(filter);
					}
				}
			});
		}
		for _ in 0 .. 4 {
			s.spawn(|| {
				for _ in 0 .. N_ATTEMPTS_PER_THREAD {
					// a feed being removed may or may not show up, but only
					// matching filters ever do and never twice
					let matched = map.matching_feeds(&topic);
					assert!(matched.len() <= filters.len());
					for feed in &matched {
						assert!(
							filters.iter().any(|f| f.as_str() == feed.filter()),
							"unexpected match {}",
							feed.filter()
						);
					}
					for (i, a) in matched.iter().enumerate() {
						for b in &matched[i + 1 ..] {
							assert!(!Arc::ptr_eq(a, b));
						}
					}
				}
			});
		}
	});

	let found = map.get_feed(&unrelated).unwrap();
	assert!(Arc::ptr_eq(&stable, &found));
}
