pub mod background;
mod commands;
pub mod dedup;
mod links;
pub mod rate_limit;
pub mod router;
pub mod scheduler;
pub mod thread_names;

use crate::config::Config;
use crate::errors::Result;
use crate::platform::{Platform, SerenityPlatform};
use crate::store::LinkStore;
use crate::structs::correction::correction_notice;
use crate::structs::{IncomingMessage, Outcome, RejectReason, Reply, ReplyType};
use crate::utils::convert_serenity_datetime;

use chrono::{DateTime, Duration, Utc};
use dedup::Deduplicator;
use log::{debug, info, trace, warn};
use rate_limit::RateLimiter;
use router::{RouteDecision, Router};
use scheduler::{PendingCommit, ScheduledTask, Scheduler, TaskKind};
use serenity::{
    async_trait,
    model::{
        channel::{Channel, ChannelType, Message},
        gateway::Ready,
        id::{ChannelId, MessageId},
    },
    prelude::*,
};
use std::sync::Arc;
use thread_names::ThreadNameCache;

const THREAD_NAME_TTL_MINUTES: i64 = 10;
const REPOST_REACTION: char = '🔁';

/// Everything the bot decides about a message, independent of how the
/// message got here.
pub struct Moderator<P> {
    platform: P,
    store: LinkStore,
    router: Router,
    dedup: Deduplicator,
    rate_limiter: RateLimiter,
    thread_names: ThreadNameCache,
    scheduler: Scheduler,
    commit_delay: Duration,
    auto_delete_delay: Option<Duration>,
    retention: Option<Duration>,
}

impl<P: Platform> Moderator<P> {
    pub fn new(config: &Config, platform: P, store: LinkStore) -> Moderator<P> {
        Moderator {
            platform,
            store,
            router: Router::new(config.tiers.clone(), config.ignored_roles.clone()),
            dedup: Deduplicator::new(config.blocklist.clone(), config.threshold_dupe_age_minutes),
            rate_limiter: RateLimiter::new(config.rate_limit_cooldown),
            thread_names: ThreadNameCache::new(Duration::minutes(THREAD_NAME_TTL_MINUTES)),
            scheduler: Scheduler::new(),
            commit_delay: config.commit_delay,
            auto_delete_delay: config.auto_delete_delay,
            retention: config.retention,
        }
    }

    #[inline]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[inline]
    pub const fn store(&self) -> &LinkStore {
        &self.store
    }

    pub async fn handle_message(&self, msg: &IncomingMessage, now: DateTime<Utc>) -> Result<()> {
        // dont care about bot messages
        if msg.author_is_bot {
            return Ok(());
        }

        if commands::has_command_prefix(&msg.content) {
            if let Some(reply) =
                commands::handle_command(&self.store, &self.thread_names, &self.platform, msg, now)
                    .await
            {
                reply.send(&self.platform).await?;
            }
            return Ok(());
        }

        if let RouteDecision::Misrouted(thread) = self.router.route(&msg.role_ids, msg.channel_id) {
            return self.correct_misroute(msg, thread, now).await;
        }

        self.check_links(msg, now).await
    }

    /// Moves a message out of the wrong thread: a notice quoting it in its
    /// place, the original removed, the notice cleaned up later.
    async fn correct_misroute(
        &self,
        msg: &IncomingMessage,
        thread: ChannelId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.rate_limiter.is_limited(msg.author_id, now) {
            debug!(
                "removing misrouted message {} from {} without a notice",
                msg.id, msg.author_tag
            );
            return self.platform.delete_message(msg.channel_id, msg.id).await;
        }

        let name = self.thread_names.acquire(&self.platform, thread, now).await;
        let notice = correction_notice(
            msg.author_id,
            thread,
            &name,
            &msg.content,
            msg.attachment_count,
        );
        match self.platform.send_message(msg.channel_id, &notice).await {
            // scheduled before anything else can fail so the notice never outlives its delay
            Ok(notice_id) => self.schedule_cleanup(msg.channel_id, notice_id, now),
            Err(why) => warn!("Failed to post correction notice for {}: {why}", msg.id),
        }
        drop(name);

        self.platform.delete_message(msg.channel_id, msg.id).await?;
        if let Some(tier) = self.router.mapping().tier_for_thread(thread) {
            info!(
                "moved {} from {} to tier {tier} thread {thread}, posted by {}",
                msg.id, msg.channel_id, msg.author_tag
            );
        }
        Ok(())
    }

    /// Queues removal of a notice the bot posted, unless auto-delete is off.
    fn schedule_cleanup(&self, channel_id: ChannelId, notice_id: MessageId, now: DateTime<Utc>) {
        if let Some(delay) = self.auto_delete_delay {
            self.scheduler.schedule(
                now + delay,
                TaskKind::DeleteMessage {
                    channel_id,
                    message_id: notice_id,
                },
            );
        }
    }

    /// Removes the whole message and tells the poster why.
    async fn reject(&self, msg: &IncomingMessage, outcome: &Outcome, now: DateTime<Utc>) -> Result<()> {
        self.platform.delete_message(msg.channel_id, msg.id).await?;
        self.notify(msg, outcome, now).await;
        Ok(())
    }

    async fn check_links(&self, msg: &IncomingMessage, now: DateTime<Utc>) -> Result<()> {
        // matched against the links as posted, canonical forms can hide the blocked text
        let blocked = links::extract_links(&msg.content)
            .find(|raw| self.dedup.is_blocklisted(raw))
            .map(str::to_string);
        if let Some(blocked) = blocked {
            info!("{blocked} from {} matches the blocklist", msg.author_id);
            return self
                .reject(msg, &Outcome::Rejected(RejectReason::Blocklisted), now)
                .await;
        }

        for url in links::unique_links(&msg.content) {
            let outcome = match self
                .dedup
                .classify(&self.store, &self.platform, &url, msg, now)
                .await
            {
                Ok(outcome) => outcome,
                Err(why) => {
                    warn!("Failed to classify {url} in {}: {why}", msg.id);
                    continue;
                }
            };
            debug!("{url} in {} classified as {outcome:?}", msg.id);

            if let Outcome::Rejected(_) = outcome {
                // the rest of the batch goes with the message
                return self.reject(msg, &outcome, now).await;
            }

            if outcome.is_accepted() {
                let id = self.scheduler.stage(
                    msg.link_record(url),
                    msg.channel_id,
                    msg.id,
                    now,
                    self.commit_delay,
                );
                debug!("staged commit {id} for message {}", msg.id);
            } else {
                self.notify(msg, &outcome, now).await;
            }
        }
        Ok(())
    }

    /// Tells the poster about an outcome. Failures are logged, they never
    /// undo the decision.
    async fn notify(&self, msg: &IncomingMessage, outcome: &Outcome, now: DateTime<Utc>) {
        let notice = match outcome.notice(now) {
            Some(notice) => notice,
            None => return,
        };

        let rejected = matches!(outcome, Outcome::Rejected(_));
        let reply = if rejected {
            // the source message is gone, nothing to reply to
            Reply::new(
                format!("<@{}> {notice}", msg.author_id),
                ReplyType::Channel(msg.channel_id),
            )
        } else {
            Reply::new(notice, ReplyType::Message(msg.channel_id, msg.id))
        };

        match reply.send(&self.platform).await {
            Ok(notice_id) if rejected => self.schedule_cleanup(msg.channel_id, notice_id, now),
            Ok(_) => (),
            Err(why) => warn!("Failed to send notice for {}: {why}", msg.id),
        }

        if outcome.is_duplicate() {
            if let Err(why) = self
                .platform
                .react(msg.channel_id, msg.id, REPOST_REACTION)
                .await
            {
                warn!("Failed to mark {} as a repost: {why}", msg.id);
            }
        }
    }

    pub async fn run_task(&self, task: ScheduledTask) -> Result<()> {
        trace!("running task {} due at {}", task.id, task.fire_at);
        match task.kind {
            TaskKind::Commit(pending) => self.commit(pending).await,
            TaskKind::DeleteMessage {
                channel_id,
                message_id,
            } => self.platform.delete_message(channel_id, message_id).await,
        }
    }

    /// Persists a staged link if the message it came from is still around.
    async fn commit(&self, pending: PendingCommit) -> Result<()> {
        let exists = self
            .platform
            .message_exists(pending.channel_id, pending.source_message_id)
            .await?;
        if !exists {
            info!(
                "discarding {} from {}, the message was removed",
                pending.record.url, pending.source_message_id
            );
            return Ok(());
        }

        let saved = self
            .store
            .save_all(*pending.channel_id.as_u64(), &[pending.record])
            .await?;
        if saved == 0 {
            debug!(
                "link from {} already recorded in {}",
                pending.source_message_id, pending.channel_id
            );
        }
        Ok(())
    }

    /// Runs every due task in order, logging failures.
    pub async fn run_due(&self, now: DateTime<Utc>) {
        for task in self.scheduler.drain_due(now) {
            let id = task.id;
            if let Err(why) = self.run_task(task).await {
                warn!("scheduled task {id} failed: {why}");
            }
        }
    }

    /// Drops expired thread names and rate limit entries, returning how
    /// many went.
    pub fn sweep_caches(&self, now: DateTime<Utc>) -> usize {
        self.thread_names.sweep(now) + self.rate_limiter.prune(now)
    }

    pub async fn sweep_retention(&self, now: DateTime<Utc>) -> Result<usize> {
        match self.retention {
            Some(max_age) => self.store.retention_sweep(now, max_age).await,
            None => Ok(0),
        }
    }
}

#[inline]
fn is_thread(kind: ChannelType) -> bool {
    matches!(
        kind,
        ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread
    )
}

#[inline]
fn is_forum(kind: ChannelType) -> bool {
    kind == ChannelType::Forum
}

/// The thread a message sits in and the forum that thread hangs off, given
/// the message's channel and that channel's parent.
fn thread_placement(
    channel_id: ChannelId,
    kind: ChannelType,
    parent: Option<(ChannelId, ChannelType)>,
) -> (Option<ChannelId>, Option<ChannelId>) {
    if !is_thread(kind) {
        return (None, None);
    }
    let forum = parent
        .filter(|(_, parent_kind)| is_forum(*parent_kind))
        .map(|(parent_id, _)| parent_id);
    (Some(channel_id), forum)
}

/// Works out whether a channel is a thread, and if so whether it hangs off
/// a forum channel.
async fn thread_context(ctx: &Context, channel_id: ChannelId) -> (Option<ChannelId>, Option<ChannelId>) {
    let channel = match channel_id.to_channel(ctx).await {
        Ok(Channel::Guild(channel)) => channel,
        Ok(_) => return (None, None),
        Err(why) => {
            warn!("Failed to look up channel {channel_id}: {why}");
            return (None, None);
        }
    };

    // plain channels don't need the parent lookup
    if !is_thread(channel.kind) {
        return (None, None);
    }

    let parent = match channel.parent_id {
        Some(parent_id) => match parent_id.to_channel(ctx).await {
            Ok(Channel::Guild(parent)) => Some((parent_id, parent.kind)),
            Ok(_) => None,
            Err(why) => {
                warn!("Failed to look up parent {parent_id} of {channel_id}: {why}");
                None
            }
        },
        None => None,
    };
    thread_placement(channel.id, channel.kind, parent)
}

async fn incoming_message(ctx: &Context, msg: &Message) -> Option<IncomingMessage> {
    let guild_id = match msg.guild_id {
        Some(guild_id) => guild_id,
        None => {
            debug!("Guild id doesn't exist, for now we don't care about this");
            return None;
        }
    };

    let created_at = convert_serenity_datetime(msg.timestamp).unwrap_or_else(|why| {
        warn!("using receive time for {}: {why}", msg.id);
        Utc::now()
    });
    let (thread_id, forum_parent_id) = thread_context(ctx, msg.channel_id).await;

    Some(IncomingMessage {
        id: msg.id,
        channel_id: msg.channel_id,
        guild_id,
        author_id: msg.author.id,
        author_tag: msg.author.tag(),
        author_is_bot: msg.author.bot,
        role_ids: msg
            .member
            .as_ref()
            .map(|member| member.roles.clone())
            .unwrap_or_default(),
        content: msg.content.clone(),
        attachment_count: msg.attachments.len(),
        thread_id,
        forum_parent_id,
        created_at,
    })
}

pub struct Handler {
    moderator: Arc<Moderator<SerenityPlatform>>,
}

impl Handler {
    pub const fn new(moderator: Arc<Moderator<SerenityPlatform>>) -> Handler {
        Handler { moderator }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        // skip the lookups entirely for bots
        if msg.author.bot {
            return;
        }

        let incoming = match incoming_message(&ctx, &msg).await {
            Some(incoming) => incoming,
            None => return,
        };

        if let Err(why) = self.moderator.handle_message(&incoming, Utc::now()).await {
            warn!("Failed to handle message {} with err: {why}", msg.id);
        }
    }

    async fn ready(&self, _: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
    }
}
