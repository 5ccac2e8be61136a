use chrono::{DateTime, Utc};
use humantime::format_duration;
use std::time::Duration;
use warden_db::LinkRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The link contains the configured blocklist substring
    Blocklisted,
}

/// What to do about one link in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rejected(RejectReason),
    AcceptNew,
    /// Someone else already shared it.
    DifferentAuthor { original: LinkRecord },
    /// The poster already shared it in another thread.
    SameAuthorDifferentThread { original: LinkRecord },
    /// The poster already shared it here and that message is still up.
    OriginalExists { original: LinkRecord },
    /// The poster's earlier message is gone and was recent, so the old
    /// record was dropped and this one counts as new.
    AcceptNewAfterPurge { purged: LinkRecord },
    /// The poster's earlier message is gone but it's too old to count as a
    /// fresh post again.
    OriginalGoneStale { original: LinkRecord },
}

impl Outcome {
    /// True when the link should be staged for commit.
    #[inline]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Outcome::AcceptNew | Outcome::AcceptNewAfterPurge { .. })
    }

    #[inline]
    pub const fn is_duplicate(&self) -> bool {
        matches!(
            self,
            Outcome::DifferentAuthor { .. }
                | Outcome::SameAuthorDifferentThread { .. }
                | Outcome::OriginalExists { .. }
                | Outcome::OriginalGoneStale { .. }
        )
    }

    /// Text of the notice sent for this outcome, None when nothing is said.
    pub fn notice(&self, now: DateTime<Utc>) -> Option<String> {
        match self {
            Outcome::AcceptNew | Outcome::AcceptNewAfterPurge { .. } => None,
            Outcome::Rejected(RejectReason::Blocklisted) => {
                Some("🚫 links to that site aren't allowed here, your message was removed".to_string())
            }
            Outcome::DifferentAuthor { original } => Some(format!(
                "🚨 LINK 🚨 REPOST 🚨 already shared by {} {} {}",
                original.author_tag,
                age_text(original, now),
                original.message_url
            )),
            Outcome::SameAuthorDifferentThread { original } => Some(format!(
                "🚨 LINK 🚨 REPOST 🚨 you already shared this in <#{}> {} {}",
                original.origin_channel_id,
                age_text(original, now),
                original.message_url
            )),
            Outcome::OriginalExists { original } => Some(format!(
                "🚨 LINK 🚨 REPOST 🚨 you already shared this here {} {}",
                age_text(original, now),
                original.message_url
            )),
            Outcome::OriginalGoneStale { original } => Some(format!(
                "🚨 LINK 🚨 REPOST 🚨 you shared this {}, deleting the old message doesn't make it new",
                age_text(original, now)
            )),
        }
    }
}

fn age_text(original: &LinkRecord, now: DateTime<Utc>) -> String {
    match original.get_duration(now) {
        Some(age) if age.as_secs() >= 60 => {
            // whole minutes, seconds are just noise here
            let minutes = Duration::from_secs(age.as_secs() - age.as_secs() % 60);
            format!("{} ago", format_duration(minutes))
        }
        _ => "moments ago".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn original(minutes_before: i64, now: DateTime<Utc>) -> LinkRecord {
        LinkRecord {
            url: "https://example.com".to_string(),
            timestamp: now - chrono::Duration::minutes(minutes_before),
            author_id: 1,
            author_tag: "poster#0001".to_string(),
            origin_channel_id: 2,
            origin_thread_id: None,
            forum_parent_id: None,
            message_id: 3,
            message_url: "https://discord.com/channels/4/2/3".to_string(),
            guild_id: 4,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_accepts_are_silent() {
        assert_eq!(Outcome::AcceptNew.notice(now()), None);
        assert_eq!(
            Outcome::AcceptNewAfterPurge {
                purged: original(5, now())
            }
            .notice(now()),
            None
        );
    }

    #[test]
    fn test_different_author_notice() {
        let outcome = Outcome::DifferentAuthor {
            original: original(90, now()),
        };
        assert_eq!(
            outcome.notice(now()),
            Some(
                "🚨 LINK 🚨 REPOST 🚨 already shared by poster#0001 1h 30m ago https://discord.com/channels/4/2/3"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_other_thread_notice_mentions_thread() {
        let outcome = Outcome::SameAuthorDifferentThread {
            original: original(2, now()),
        };
        let notice = outcome.notice(now()).unwrap();
        assert!(notice.contains("<#2>"));
        assert!(notice.contains("2m ago"));
    }

    #[test]
    fn test_recent_age() {
        let outcome = Outcome::OriginalExists {
            original: original(0, now()),
        };
        assert!(outcome.notice(now()).unwrap().contains("moments ago"));
    }

    #[test]
    fn test_classification_helpers() {
        let rec = original(1, now());
        assert!(Outcome::AcceptNew.is_accepted());
        assert!(!Outcome::Rejected(RejectReason::Blocklisted).is_accepted());
        assert!(!Outcome::Rejected(RejectReason::Blocklisted).is_duplicate());
        assert!(Outcome::OriginalGoneStale { original: rec }.is_duplicate());
    }
}
