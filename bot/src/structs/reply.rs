use crate::errors::Result;
use crate::platform::Platform;

use log::debug;
use serenity::model::id::{ChannelId, MessageId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyContents {
    String(String),
    ConstStr(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyType {
    /// Reply threaded onto a message
    Message(ChannelId, MessageId),
    /// Plain message in a channel
    Channel(ChannelId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    message: ReplyContents,
    place: ReplyType,
}

impl Reply {
    pub const fn new(message: String, place: ReplyType) -> Reply {
        Reply {
            message: ReplyContents::String(message),
            place,
        }
    }

    pub const fn new_const(message: &'static str, place: ReplyType) -> Reply {
        Reply {
            message: ReplyContents::ConstStr(message),
            place,
        }
    }

    pub fn text(&self) -> &str {
        match &self.message {
            ReplyContents::String(inner) => inner,
            ReplyContents::ConstStr(inner) => inner,
        }
    }

    #[inline]
    pub const fn place(&self) -> ReplyType {
        self.place
    }

    /// Sends the reply and returns the id of the message it created.
    pub async fn send<P: Platform>(&self, platform: &P) -> Result<MessageId> {
        let sent = match self.place {
            ReplyType::Channel(channel_id) => platform.send_message(channel_id, self.text()).await?,
            ReplyType::Message(channel_id, message_id) => {
                platform.reply(channel_id, message_id, self.text()).await?
            }
        };
        debug!("sent {sent} to {:?}", self.place);
        Ok(sent)
    }
}
