use crate::errors::{Error, Result};
use crate::handler::thread_names::ThreadNameCache;
use crate::platform::Platform;
use crate::store::LinkStore;
use crate::structs::{IncomingMessage, Reply, ReplyType};

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use serenity::model::id::ChannelId;

/// How many links a history summary shows.
pub const FETCH_DISPLAY_COUNT: usize = 10;

const USAGE: &str = "Usage: `!fetch links <channelId>`";

pub(super) fn has_command_prefix(command: &str) -> bool {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"(?i)^!fetch(\s|$)").unwrap();
    }
    RE.is_match(command)
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    FetchLinks(&'a str),
}

fn parse(content: &str) -> Result<Command<'_>> {
    let args: Vec<&str> = content.split_whitespace().collect();
    match args.as_slice() {
        [_, sub, channel] if sub.eq_ignore_ascii_case("links") => Ok(Command::FetchLinks(*channel)),
        _ => Err(Error::Usage(USAGE)),
    }
}

/// Accepts a bare id or a channel mention.
fn parse_channel(arg: &str) -> Option<ChannelId> {
    arg.trim_start_matches("<#")
        .trim_end_matches('>')
        .parse::<u64>()
        .ok()
        .map(ChannelId)
}

async fn fetch_links<P: Platform>(
    store: &LinkStore,
    thread_names: &ThreadNameCache,
    platform: &P,
    channel_arg: &str,
    now: DateTime<Utc>,
) -> Result<String> {
    let channel_id = match parse_channel(channel_arg) {
        Some(id) => id,
        None => return Ok(format!("Channel `{channel_arg}` not found.")),
    };

    let name = thread_names.acquire(platform, channel_id, now).await;
    if name.is_fallback() {
        return Ok(format!("Channel `{channel_arg}` not found."));
    }

    let mut records = store.get_channel_records(*channel_id.as_u64())?;
    if records.is_empty() {
        return Ok(format!("No links recorded for **{}** yet.", &*name));
    }

    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let lines = records
        .iter()
        .take(FETCH_DISPLAY_COUNT)
        .enumerate()
        .map(|(i, record)| {
            format!(
                "{}. <{}> by {} on {} {}",
                i + 1,
                record.url,
                record.author_tag,
                record.timestamp.format("%Y-%m-%d %H:%M UTC"),
                record.message_url
            )
        })
        .collect::<Vec<String>>()
        .join("\n");

    Ok(format!(
        "Latest {} of {} links in **{}**\n{lines}",
        records.len().min(FETCH_DISPLAY_COUNT),
        records.len(),
        &*name
    ))
}

pub async fn handle_command<P: Platform>(
    store: &LinkStore,
    thread_names: &ThreadNameCache,
    platform: &P,
    msg: &IncomingMessage,
    now: DateTime<Utc>,
) -> Option<Reply> {
    let place = ReplyType::Message(msg.channel_id, msg.id);
    let ret = match parse(&msg.content) {
        Ok(Command::FetchLinks(channel)) => {
            info!("{} fetching links for {channel}", msg.author_tag);
            fetch_links(store, thread_names, platform, channel, now).await
        }
        Err(why) => Err(why),
    };

    match ret {
        Ok(resp) => Some(Reply::new(resp, place)),
        Err(Error::Usage(usage)) => Some(Reply::new_const(usage, place)),
        Err(why) => {
            warn!("Failed to process command {} with err: {why}", msg.content);
            None
        }
    }
}
