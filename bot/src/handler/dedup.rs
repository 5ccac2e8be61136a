use crate::errors::Result;
use crate::platform::Platform;
use crate::store::LinkStore;
use crate::structs::{IncomingMessage, Outcome, RejectReason};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serenity::model::id::{ChannelId, MessageId};

/// Decides what a link means given everything already on record.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    blocklist: Option<String>,
    threshold_dupe_age_minutes: i64,
}

impl Deduplicator {
    pub const fn new(blocklist: Option<String>, threshold_dupe_age_minutes: i64) -> Deduplicator {
        Deduplicator {
            blocklist,
            threshold_dupe_age_minutes,
        }
    }

    #[inline]
    pub fn is_blocklisted(&self, url: &str) -> bool {
        self.blocklist
            .as_deref()
            .map_or(false, |blocked| url.contains(blocked))
    }

    /// Classifies `url` as posted in `msg`. The only write this makes is
    /// purging a recent record whose message has since been deleted, staging
    /// new links is up to the caller.
    pub async fn classify<P: Platform>(
        &self,
        store: &LinkStore,
        platform: &P,
        url: &str,
        msg: &IncomingMessage,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        if self.is_blocklisted(url) {
            info!("{url} from {} matches the blocklist", msg.author_id);
            return Ok(Outcome::Rejected(RejectReason::Blocklisted));
        }

        let original = match store.find_by_url(url)? {
            Some(original) => original,
            None => return Ok(Outcome::AcceptNew),
        };

        if original.author_id != *msg.author_id.as_u64() {
            return Ok(Outcome::DifferentAuthor { original });
        }

        if original.origin_channel_id != *msg.channel_id.as_u64() {
            return Ok(Outcome::SameAuthorDifferentThread { original });
        }

        let still_there = platform
            .message_exists(
                ChannelId(original.origin_channel_id),
                MessageId(original.message_id),
            )
            .await?;
        if still_there {
            return Ok(Outcome::OriginalExists { original });
        }

        let age_minutes = original.age_minutes(now);
        debug!("original post of {url} is gone, it was {age_minutes} minutes old");
        if age_minutes < self.threshold_dupe_age_minutes {
            let purged = store.delete_by_url(url).await?.unwrap_or(original);
            info!("purged stale record of {url} by {}", msg.author_id);
            Ok(Outcome::AcceptNewAfterPurge { purged })
        } else {
            Ok(Outcome::OriginalGoneStale { original })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::FakePlatform;
    use crate::structs::incoming::tests::message;
    use chrono::{Duration, TimeZone};
    use warden_db::LinkRecord;

    const THRESHOLD: i64 = 60;
    const URL: &str = "https://example.com/post";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap()
    }

    fn dedup() -> Deduplicator {
        Deduplicator::new(Some("badsite.example".to_string()), THRESHOLD)
    }

    /// Stores a record of URL posted by `author` in `channel` as `message_id`,
    /// `age` minutes before now.
    async fn seed(store: &LinkStore, author: u64, channel: u64, message_id: u64, age: i64) -> LinkRecord {
        let mut record = message(message_id, author, channel, "").link_record(URL.to_string());
        record.timestamp = now() - Duration::minutes(age);
        store.save_all(channel, &[record.clone()]).await.unwrap();
        record
    }

    #[tokio::test]
    async fn test_new_link() {
        let store = LinkStore::in_memory();
        let outcome = dedup()
            .classify(&store, &FakePlatform::default(), URL, &message(1, 10, 20, URL), now())
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::AcceptNew);
    }

    #[tokio::test]
    async fn test_blocklisted() {
        let store = LinkStore::in_memory();
        let url = "https://badsite.example/x";
        let outcome = dedup()
            .classify(&store, &FakePlatform::default(), url, &message(1, 10, 20, url), now())
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Rejected(RejectReason::Blocklisted));
        assert!(!Deduplicator::new(None, THRESHOLD).is_blocklisted(url));
    }

    #[tokio::test]
    async fn test_different_author_any_channel() {
        let store = LinkStore::in_memory();
        let original = seed(&store, 10, 20, 1, 5).await;
        let platform = FakePlatform::default();

        for channel in [20, 21] {
            let outcome = dedup()
                .classify(&store, &platform, URL, &message(2, 11, channel, URL), now())
                .await
                .unwrap();
            assert_eq!(
                outcome,
                Outcome::DifferentAuthor {
                    original: original.clone()
                }
            );
        }
        assert_eq!(store.find_by_url(URL).unwrap(), Some(original));
    }

    #[tokio::test]
    async fn test_same_author_other_thread() {
        let store = LinkStore::in_memory();
        let original = seed(&store, 10, 20, 1, 5).await;
        let outcome = dedup()
            .classify(&store, &FakePlatform::default(), URL, &message(2, 10, 21, URL), now())
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::SameAuthorDifferentThread { original });
    }

    #[tokio::test]
    async fn test_same_thread_original_still_there() {
        let store = LinkStore::in_memory();
        let original = seed(&store, 10, 20, 1, 5).await;
        let platform = FakePlatform::default();
        platform.add_message(20, 1);

        let outcome = dedup()
            .classify(&store, &platform, URL, &message(2, 10, 20, URL), now())
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::OriginalExists { original: original.clone() });
        assert_eq!(store.get_channel_records(20).unwrap(), vec![original]);
    }

    #[tokio::test]
    async fn test_original_gone_under_threshold_purges() {
        let store = LinkStore::in_memory();
        let original = seed(&store, 10, 20, 1, THRESHOLD - 1).await;

        let outcome = dedup()
            .classify(&store, &FakePlatform::default(), URL, &message(2, 10, 20, URL), now())
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::AcceptNewAfterPurge { purged: original });
        assert_eq!(store.find_by_url(URL).unwrap(), None);
    }

    #[tokio::test]
    async fn test_original_gone_over_threshold_kept() {
        let store = LinkStore::in_memory();
        let original = seed(&store, 10, 20, 1, THRESHOLD + 1).await;

        let outcome = dedup()
            .classify(&store, &FakePlatform::default(), URL, &message(2, 10, 20, URL), now())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::OriginalGoneStale {
                original: original.clone()
            }
        );
        assert_eq!(store.find_by_url(URL).unwrap(), Some(original));
    }

    #[tokio::test]
    async fn test_original_gone_at_threshold_is_stale() {
        let store = LinkStore::in_memory();
        seed(&store, 10, 20, 1, THRESHOLD).await;

        let outcome = dedup()
            .classify(&store, &FakePlatform::default(), URL, &message(2, 10, 20, URL), now())
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::OriginalGoneStale { .. }));
    }
}
