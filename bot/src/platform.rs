//! Everything the bot needs from discord, behind a trait so the moderation
//! logic can run against an in-memory fake.

use crate::errors::{Error, Result};

use log::debug;
use serenity::async_trait;
use serenity::http::error::Error as HttpError;
use serenity::http::Http;
use serenity::model::channel::Channel;
use serenity::model::id::{ChannelId, MessageId};
use std::sync::Arc;

#[async_trait]
pub trait Platform: Send + Sync {
    async fn channel_name(&self, channel_id: ChannelId) -> Result<String>;

    /// False when discord reports the message as unknown.
    async fn message_exists(&self, channel_id: ChannelId, message_id: MessageId) -> Result<bool>;

    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<MessageId>;

    async fn reply(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        content: &str,
    ) -> Result<MessageId>;

    async fn react(&self, channel_id: ChannelId, message_id: MessageId, emoji: char)
        -> Result<()>;

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()>;
}

fn is_not_found(why: &serenity::Error) -> bool {
    match why {
        serenity::Error::Http(inner) => matches!(
            inner.as_ref(),
            HttpError::UnsuccessfulRequest(resp) if resp.status_code.as_u16() == 404
        ),
        _ => false,
    }
}

#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<Http>,
}

impl SerenityPlatform {
    pub const fn new(http: Arc<Http>) -> SerenityPlatform {
        SerenityPlatform { http }
    }
}

#[async_trait]
impl Platform for SerenityPlatform {
    async fn channel_name(&self, channel_id: ChannelId) -> Result<String> {
        match self.http.get_channel(*channel_id.as_u64()).await? {
            Channel::Guild(channel) => Ok(channel.name),
            Channel::Category(category) => Ok(category.name),
            _ => Err(Error::Lookup(format!("channel {channel_id} has no name"))),
        }
    }

    async fn message_exists(&self, channel_id: ChannelId, message_id: MessageId) -> Result<bool> {
        match self
            .http
            .get_message(*channel_id.as_u64(), *message_id.as_u64())
            .await
        {
            Ok(_) => Ok(true),
            Err(why) if is_not_found(&why) => {
                debug!("message {message_id} in {channel_id} no longer exists");
                Ok(false)
            }
            Err(why) => Err(why.into()),
        }
    }

    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<MessageId> {
        Ok(channel_id.say(&self.http, content).await?.id)
    }

    async fn reply(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        content: &str,
    ) -> Result<MessageId> {
        let reply = channel_id
            .send_message(&self.http, |builder| {
                builder
                    .reference_message((channel_id, message_id))
                    .allowed_mentions(|f| f.replied_user(false));
                builder.content(content)
            })
            .await?;
        Ok(reply.id)
    }

    async fn react(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: char,
    ) -> Result<()> {
        channel_id
            .create_reaction(&self.http, message_id, emoji)
            .await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()> {
        match channel_id.delete_message(&self.http, message_id).await {
            Ok(()) => Ok(()),
            // someone beat us to it
            Err(why) if is_not_found(&why) => Ok(()),
            Err(why) => Err(why.into()),
        }
    }
}
