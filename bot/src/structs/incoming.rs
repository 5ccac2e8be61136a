use chrono::{DateTime, Utc};
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use warden_db::LinkRecord;

/// The parts of a guild message the moderator looks at.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
    pub author_id: UserId,
    pub author_tag: String,
    pub author_is_bot: bool,
    pub role_ids: Vec<RoleId>,
    pub content: String,
    pub attachment_count: usize,
    /// Set when the message was posted in a thread
    pub thread_id: Option<ChannelId>,
    /// Set when that thread lives in a forum channel
    pub forum_parent_id: Option<ChannelId>,
    pub created_at: DateTime<Utc>,
}

impl IncomingMessage {
    /// Returns a URI that references the message in discord.
    #[inline]
    pub fn uri(&self) -> String {
        LinkRecord::message_uri(
            *self.guild_id.as_u64(),
            *self.channel_id.as_u64(),
            *self.id.as_u64(),
        )
    }

    /// The record that would be stored for `url` posted in this message.
    pub fn link_record(&self, url: String) -> LinkRecord {
        LinkRecord {
            url,
            timestamp: self.created_at,
            author_id: *self.author_id.as_u64(),
            author_tag: self.author_tag.clone(),
            origin_channel_id: *self.channel_id.as_u64(),
            origin_thread_id: self.thread_id.map(|t| *t.as_u64()),
            forum_parent_id: self.forum_parent_id.map(|f| *f.as_u64()),
            message_id: *self.id.as_u64(),
            message_url: self.uri(),
            guild_id: *self.guild_id.as_u64(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) const GUILD: u64 = 1;

    /// A plain message from `author` in `channel`, posted at noon on
    /// 2023-05-01.
    pub(crate) fn message(id: u64, author: u64, channel: u64, content: &str) -> IncomingMessage {
        IncomingMessage {
            id: MessageId(id),
            channel_id: ChannelId(channel),
            guild_id: GuildId(GUILD),
            author_id: UserId(author),
            author_tag: format!("user{author}#0001"),
            author_is_bot: false,
            role_ids: Vec::new(),
            content: content.to_string(),
            attachment_count: 0,
            thread_id: None,
            forum_parent_id: None,
            created_at: Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_link_record() {
        let mut msg = message(3, 4, 5, "https://example.com");
        msg.thread_id = Some(ChannelId(5));
        msg.forum_parent_id = Some(ChannelId(6));
        let record = msg.link_record("https://example.com/".to_string());

        assert_eq!(record.author_id, 4);
        assert_eq!(record.author_tag, "user4#0001");
        assert_eq!(record.origin_channel_id, 5);
        assert_eq!(record.origin_thread_id, Some(5));
        assert_eq!(record.forum_parent_id, Some(6));
        assert_eq!(record.message_url, "https://discord.com/channels/1/5/3");
        assert_eq!(record.timestamp, msg.created_at);
    }
}
