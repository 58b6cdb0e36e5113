pub mod feed;
pub mod record;
pub mod severity;

pub use feed::{parse_feed, FeedDocument, FeedEntry};
pub use record::{DetectionMetadata, DetectionRecord, GeoPoint, RawDetection};
pub use severity::{BadgeTone, Severity, SeverityProfile};
