use super::snowflake;

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, GuildId, MessageId};

/// A persisted fact: this url was posted, by whom, where and when.
///
/// Records are immutable once stored, the only mutation the store allows
/// is deleting them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub url: String,
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(with = "snowflake")]
    pub author_id: u64,
    pub author_tag: String,
    #[serde(with = "snowflake")]
    pub origin_channel_id: u64,
    #[serde(default, with = "snowflake::option")]
    pub origin_thread_id: Option<u64>,
    #[serde(default, with = "snowflake::option")]
    pub forum_parent_id: Option<u64>,
    #[serde(with = "snowflake")]
    pub message_id: u64,
    pub message_url: String,
    #[serde(with = "snowflake")]
    pub guild_id: u64,
}

impl LinkRecord {
    /// Returns a URI that references the message in discord. When clicked inside a
    /// discord client it will auto scroll to the message
    #[inline]
    pub fn message_uri(guild_id: u64, channel_id: u64, message_id: u64) -> String {
        MessageId(message_id).link(ChannelId(channel_id), Some(GuildId(guild_id)))
    }

    /// Whole minutes elapsed between the record being posted and `now`.
    /// Negative if the record claims to be from the future.
    #[inline]
    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.timestamp).num_minutes()
    }

    #[inline]
    pub fn get_duration(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        now.signed_duration_since(self.timestamp).to_std().ok()
    }
}
