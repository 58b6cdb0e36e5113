use anyhow::Context;
use roadcore::detection::{parse_feed, FeedEntry};

/// Fourteen hand-placed detections around central London.
pub const SAMPLE_FEED: &str = include_str!("../../../data/london_feed.json");

pub fn sample_feed() -> anyhow::Result<Vec<FeedEntry>> {
    parse_feed(SAMPLE_FEED).context("parsing bundled sample feed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_feed_parses() {
        let feed = sample_feed().unwrap();
        assert_eq!(feed.len(), 14);
        assert_eq!(feed[0].id().as_deref(), Some("P-1024"));
        assert!(feed
            .iter()
            .all(|entry| matches!(entry, FeedEntry::Decoded(_))));
    }
}
