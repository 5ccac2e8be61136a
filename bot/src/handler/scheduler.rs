//! One-shot tasks keyed by the time they should fire.
//!
//! Nothing here sleeps, a driver asks for the due tasks on a fixed tick
//! (tests pass whatever time they like). Tasks can't be cancelled, anything
//! that might have changed since scheduling is checked again when they run.

use chrono::{DateTime, Duration, Utc};
use serenity::model::id::{ChannelId, MessageId};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use warden_db::LinkRecord;

pub type TaskId = u64;

/// A link waiting for its source message to survive the commit window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommit {
    pub record: LinkRecord,
    pub channel_id: ChannelId,
    pub source_message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    Commit(PendingCommit),
    DeleteMessage {
        channel_id: ChannelId,
        message_id: MessageId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub fire_at: DateTime<Utc>,
    pub kind: TaskKind,
}

#[derive(Debug, Default)]
struct Queue {
    next_id: TaskId,
    tasks: BTreeMap<(DateTime<Utc>, TaskId), TaskKind>,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    queue: Mutex<Queue>,
}

impl Scheduler {
    pub fn new() -> Scheduler {
        Scheduler::default()
    }

    pub fn schedule(&self, fire_at: DateTime<Utc>, kind: TaskKind) -> TaskId {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.next_id += 1;
        let id = queue.next_id;
        queue.tasks.insert((fire_at, id), kind);
        id
    }

    /// Queues `record` to be committed `delay` after `now`, if the message it
    /// came from still exists then.
    pub fn stage(
        &self,
        record: LinkRecord,
        channel_id: ChannelId,
        source_message_id: MessageId,
        now: DateTime<Utc>,
        delay: Duration,
    ) -> TaskId {
        self.schedule(
            now + delay,
            TaskKind::Commit(PendingCommit {
                record,
                channel_id,
                source_message_id,
            }),
        )
    }

    /// Removes and returns every task due at or before `now`, earliest first.
    /// Each task is handed out exactly once.
    pub fn drain_due(&self, now: DateTime<Utc>) -> Vec<ScheduledTask> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let later = queue.tasks.split_off(&(now, TaskId::MAX));
        let due = std::mem::replace(&mut queue.tasks, later);
        due.into_iter()
            .map(|((fire_at, id), kind)| ScheduledTask { id, fire_at, kind })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks
            .len()
    }

    /// Staged commits not yet fired.
    pub fn pending_commits(&self) -> Vec<PendingCommit> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks
            .values()
            .filter_map(|kind| match kind {
                TaskKind::Commit(commit) => Some(commit.clone()),
                TaskKind::DeleteMessage { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn delete(message: u64) -> TaskKind {
        TaskKind::DeleteMessage {
            channel_id: ChannelId(1),
            message_id: MessageId(message),
        }
    }

    #[test]
    fn test_drain_only_due() {
        let scheduler = Scheduler::new();
        scheduler.schedule(at(30), delete(2));
        scheduler.schedule(at(10), delete(1));
        scheduler.schedule(at(60), delete(3));

        let due = scheduler.drain_due(at(30));
        assert_eq!(
            due.iter().map(|t| t.kind.clone()).collect::<Vec<_>>(),
            vec![delete(1), delete(2)]
        );
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_tasks_fire_once() {
        let scheduler = Scheduler::new();
        let id = scheduler.schedule(at(10), delete(1));

        let due = scheduler.drain_due(at(20));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, id);
        assert_eq!(due[0].fire_at, at(10));
        assert!(scheduler.drain_due(at(40)).is_empty());
    }

    #[test]
    fn test_same_fire_time_keeps_schedule_order() {
        let scheduler = Scheduler::new();
        scheduler.schedule(at(10), delete(1));
        scheduler.schedule(at(10), delete(2));

        let due = scheduler.drain_due(at(10));
        assert_eq!(due[0].kind, delete(1));
        assert_eq!(due[1].kind, delete(2));
    }

    #[test]
    fn test_nothing_due_yet() {
        let scheduler = Scheduler::new();
        scheduler.schedule(at(10), delete(1));
        assert!(scheduler.drain_due(at(9)).is_empty());
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.pending_commits().is_empty());
    }
}
