//! Publish-time routing and fan-out

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;

use crate::directory::ProjectDirectory;
use crate::ids::{ProjectId, UserId};
use crate::registry::{ConnectionRegistry, DeliveryError, Message};
use crate::stats::RelayStats;

/// Result of a publish call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The directory does not know the project; nothing was sent
    UnknownProject(ProjectId),
    /// Every subscriber was attempted
    Published(PublishReport),
}

impl PublishOutcome {
    pub fn is_unknown_project(&self) -> bool {
        matches!(self, PublishOutcome::UnknownProject(_))
    }

    pub fn report(&self) -> Option<&PublishReport> {
        match self {
            PublishOutcome::Published(report) => Some(report),
            PublishOutcome::UnknownProject(_) => None,
        }
    }
}

/// Per-subscriber results of one publish, in directory order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub project_id: ProjectId,
    /// Message accepted by the subscriber's conduit
    pub delivered: Vec<UserId>,
    /// Subscriber not connected
    pub offline: Vec<UserId>,
    /// Subscriber connected but the conduit refused the message
    pub dropped: Vec<(UserId, DeliveryError)>,
}

impl PublishReport {
    fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            delivered: Vec::new(),
            offline: Vec::new(),
            dropped: Vec::new(),
        }
    }

    /// Number of subscribers attempted
    pub fn subscriber_count(&self) -> usize {
        self.delivered.len() + self.offline.len() + self.dropped.len()
    }
}

enum Attempt {
    Delivered,
    Offline,
    Dropped(DeliveryError),
}

/// Routes published messages to the connected subscribers of a project
///
/// Publishes to the same project are serialised, so every subscriber sees
/// them in the same order. Within one publish, subscribers are delivered to
/// concurrently; each delivery is bounded by the conduit's policy, so a
/// stalled subscriber cannot hold up the rest.
pub struct Publisher {
    registry: Arc<ConnectionRegistry>,
    directory: Arc<dyn ProjectDirectory>,
    stats: Arc<RelayStats>,
    project_locks: ProjectLocks,
}

impl Publisher {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        directory: Arc<dyn ProjectDirectory>,
        stats: Arc<RelayStats>,
    ) -> Self {
        Self {
            registry,
            directory,
            stats,
            project_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Deliver `message` to every connected subscriber of `project_id`
    pub async fn publish(
        &self,
        project_id: ProjectId,
        message: impl Into<Message>,
    ) -> PublishOutcome {
        let message = message.into();

        let Some(subscribers) = self.directory.lookup(project_id) else {
            self.stats.unknown_project();
            tracing::debug!(project_id = %project_id, "Publish to unknown project ignored");
            return PublishOutcome::UnknownProject(project_id);
        };

        let project_lock = self.project_lock(project_id);
        let report = {
            let _ordered = project_lock.lock.lock().await;
            self.fan_out(project_id, subscribers, &message).await
        };
        drop(project_lock);

        self.stats.published(
            report.delivered.len(),
            report.offline.len(),
            report.dropped.len(),
        );

        tracing::debug!(
            project_id = %project_id,
            bytes = message.len(),
            delivered = report.delivered.len(),
            offline = report.offline.len(),
            dropped = report.dropped.len(),
            "Message published"
        );

        PublishOutcome::Published(report)
    }

    async fn fan_out(
        &self,
        project_id: ProjectId,
        subscribers: Vec<UserId>,
        message: &Message,
    ) -> PublishReport {
        let attempts = subscribers.into_iter().map(|user_id| {
            let conduit = self.registry.lookup(user_id);
            let message = message.clone();
            async move {
                let attempt = match conduit {
                    None => Attempt::Offline,
                    Some(conduit) => match conduit.deliver(message).await {
                        Ok(()) => Attempt::Delivered,
                        Err(e) => Attempt::Dropped(e),
                    },
                };
                (user_id, attempt)
            }
        });

        let mut report = PublishReport::new(project_id);
        for (user_id, attempt) in join_all(attempts).await {
            match attempt {
                Attempt::Delivered => report.delivered.push(user_id),
                Attempt::Offline => report.offline.push(user_id),
                Attempt::Dropped(e) => {
                    tracing::warn!(
                        project_id = %project_id,
                        user_id = %user_id,
                        error = %e,
                        "Delivery dropped"
                    );
                    report.dropped.push((user_id, e));
                }
            }
        }

        report
    }

    fn project_lock(&self, project_id: ProjectId) -> ProjectLock<'_> {
        let lock = Arc::clone(self.project_locks.lock().entry(project_id).or_default());
        ProjectLock {
            locks: &self.project_locks,
            project_id,
            lock,
        }
    }
}

type ProjectLocks = Mutex<HashMap<ProjectId, Arc<tokio::sync::Mutex<()>>>>;

/// Handle on a project's ordering lock
///
/// Dropping the last handle removes the project from the lock table, so the
/// table only holds projects with a publish in flight.
struct ProjectLock<'a> {
    locks: &'a ProjectLocks,
    project_id: ProjectId,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for ProjectLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        // The table's handle plus ours; handles are only cloned under this lock
        let idle = locks
            .get(&self.project_id)
            .is_some_and(|current| Arc::ptr_eq(current, &self.lock))
            && Arc::strong_count(&self.lock) == 2;
        if idle {
            locks.remove(&self.project_id);
        }
    }
}
