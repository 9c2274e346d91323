//! Every wildcard rendition of a six level topic receives exactly one copy

mod common;

use std::sync::Arc;

use mqtt_topic_feeds::{
	Feed, FeedRouter, PublishEvent, TopicFilter, TopicMap, TopicName,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const LEVELS: [&str; 6] = ["aaa", "bbb", "ccc", "ddd", "eee", "fff"];
const TOPIC: &str = "aaa/bbb/ccc/ddd/eee/fff";

// near misses that must never receive the event
const DECOYS: [&str; 6] = [
	"aaa/bbb/ccc/ddd/eee",
	"aaa/bbb/ccc/ddd/eee/fff/ggg",
	"aaa/bbb/ccc/ddd/eee/fff/",
	"+/+/+/+/+",
	"aaa/+/+/+/+/+/+",
	"zzz/#",
];

#[test]
fn test_permutation_count() {
	// 2^6 exact renditions plus one `#` rendition for each prefix
	let filters = common::wildcard_permutations(&LEVELS);
	assert_eq!(filters.len(), 191);
	assert!(filters.contains(&"#".to_string()));
	assert!(filters.contains(&TOPIC.to_string()));
	assert!(filters.contains(&"+/+/+/+/+/+".to_string()));
	assert!(filters.contains(&"aaa/bbb/ccc/ddd/eee/fff/#".to_string()));
}

#[tokio::test]
async fn test_each_permutation_feed_gets_one_event() {
	common::init_tracing();
	let map = TopicMap::new();
	let mut receivers = Vec::new();
	for filter in common::wildcard_permutations(&LEVELS)
		.into_iter()
		.chain(DECOYS.iter().map(|d| d.to_string()))
	{
		let filter = TopicFilter::parse(filter).unwrap();
		let (feed, already_existed) = map.init_feed(&filter);
		assert!(!already_existed, "duplicate filter {filter}");
		let (tx, rx) = mpsc::channel(4);
		feed.subscribe(tx);
		receivers.push((filter, rx));
	}

	let topic = TopicName::parse(TOPIC).unwrap();
	let feeds: Vec<Arc<Feed>> = map.matching_feeds(&topic);
	assert_eq!(feeds.len(), 191);

	let cancel = CancellationToken::new();
	let event = PublishEvent::for_topic(&topic, "fanout");
	let mut sent = 0;
	for feed in &feeds {
		sent += feed.publish(&cancel, event.clone()).await;
	}
	assert_eq!(sent, 191);

	for (filter, rx) in &mut receivers {
		let is_decoy = DECOYS.contains(&filter.as_str());
		match rx.try_recv() {
			| Ok(received) => {
				assert!(!is_decoy, "decoy {filter} received an event");
				assert_eq!(received.topic(), TOPIC);
				assert!(rx.try_recv().is_err(), "{filter} received twice");
			}
			| Err(_) => assert!(is_decoy, "{filter} received nothing"),
		}
	}
}

#[tokio::test]
async fn test_shared_sink_receives_one_copy_per_feed() {
	common::init_tracing();
	let router = FeedRouter::new();
	let (tx, mut rx) = mpsc::channel(256);
	for filter in common::wildcard_permutations(&LEVELS) {
		router.subscribe(&filter, tx.clone()).unwrap();
	}
	drop(tx);

	let cancel = CancellationToken::new();
	let sent = router.publish(&cancel, TOPIC, "shared").await.unwrap();
	assert_eq!(sent, 191);

	let mut received = 0;
	while let Ok(event) = rx.try_recv() {
		assert_eq!(event.topic(), TOPIC);
		received += 1;
	}
	assert_eq!(received, 191);
}
