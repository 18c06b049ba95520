//! Drains the `TaskQueue`, publishes each task's current stage through
//! `SubFram`, and reacts to the module's `Outcome` (`spec.md` §4.4).
//!
//! Grounded on the dequeue-dispatch-reconcile loop `Manager::run` /
//! `reconcile_job` drives in `pkg/container/src/manager/manager.rs`: pop one
//! unit of work, re-validate it's still live, hand it to the subsystem, fold
//! the result back into the model, and either drop it (terminal) or push it
//! back onto the queue (more to do).

use std::sync::Arc;

use common::async_std::task;
use common::errors::*;

use crate::infra_db::InfraDb;
use crate::model::*;
use crate::modules::{ErrorClass, Outcome};
use crate::queue::{BackoffConfig, Task, TaskQueue};
use crate::subfram::{missing_subscriber_error, SubFram};

pub struct TaskManager {
    infra_db: Arc<InfraDb>,
    queue: Arc<TaskQueue>,
    subfram: Arc<SubFram>,
    backoff: BackoffConfig,
}

impl TaskManager {
    pub fn new(infra_db: Arc<InfraDb>, queue: Arc<TaskQueue>, subfram: Arc<SubFram>) -> Self {
        Self::with_backoff(infra_db, queue, subfram, BackoffConfig::default())
    }

    /// Same as `new`, but with the `spec.md` §4.3 backoff schedule
    /// overridden by `GatewayConfig` (`SPEC_FULL.md` §2's ambient
    /// configuration addition) instead of this crate's hardcoded default.
    pub fn with_backoff(
        infra_db: Arc<InfraDb>,
        queue: Arc<TaskQueue>,
        subfram: Arc<SubFram>,
        backoff: BackoffConfig,
    ) -> Self {
        Self {
            infra_db,
            queue,
            subfram,
            backoff,
        }
    }

    /// Replays every non-terminal record in `Storage` back onto the queue.
    /// Must run once at process startup, before any worker begins draining
    /// (`spec.md` §4.4 "Startup recovery": in-flight work isn't persisted by
    /// the queue itself, only by the record's status vector, so a restart
    /// has to recompute which stages are still outstanding).
    pub async fn recover(&self) {
        self.infra_db.load().await;

        for record in self.infra_db.list("").await {
            let remaining: Vec<StageId> = match record.lifecycle {
                Lifecycle::Active => stages_for_kind(record.kind())
                    .iter()
                    .copied()
                    .filter(|s| !matches!(record.status.get(s), Some(StageStatus::Done)))
                    .collect(),
                Lifecycle::Deleting => {
                    let mut stages = stages_for_kind(record.kind()).to_vec();
                    stages.reverse();
                    stages
                }
            };

            if remaining.is_empty() {
                if record.lifecycle == Lifecycle::Deleting {
                    self.infra_db.complete_delete(&record.name, record.version).await;
                }
                continue;
            }

            let event_kind = match record.lifecycle {
                Lifecycle::Active => EventKind::Update,
                Lifecycle::Deleting => EventKind::Delete,
            };

            self.queue
                .push(Task::new(record.name, record.version, event_kind, remaining))
                .await;
        }
    }

    /// Spawns `worker_count` dequeue loops (`spec.md` §4.4: "multiple are
    /// allowed, partitioned by object name hash" — this crate's in-memory
    /// queue already serializes access per key, so the workers only need to
    /// race on `pop`, not coordinate further).
    pub fn spawn_workers(self: &Arc<Self>, worker_count: usize) -> Vec<task::JoinHandle<()>> {
        (0..worker_count.max(1))
            .map(|_| {
                let manager = self.clone();
                task::spawn(async move { manager.run().await })
            })
            .collect()
    }

    async fn run(&self) {
        loop {
            let task = self.queue.pop().await;
            self.process(task).await;
        }
    }

    /// One iteration of `spec.md` §4.4 step 2-6: publish the task's current
    /// (lowest-priority-number) stage and fold the result back in. Exposed
    /// as `pub` so integration tests can drain the queue deterministically
    /// instead of racing a spawned worker loop.
    pub async fn process(&self, mut task: Task) {
        let record = match self.infra_db.get(&task.object_name).await {
            Some(r) => r,
            // Deleted out from under us (e.g. complete_delete already ran);
            // nothing left to converge on.
            None => return,
        };

        if record.version != task.resource_version {
            // Superseded: spec.md §8 "Supersession" law — drop silently.
            return;
        }

        let stage = match task.remaining_stages.first().copied() {
            Some(s) => s,
            None => return,
        };

        let outcome = match self
            .subfram
            .publish(
                record.kind(),
                stage,
                &task.object_name,
                task.resource_version,
                task.event_kind,
            )
            .await
        {
            Some(outcome) => outcome,
            None => Outcome::Error(
                ErrorClass::Permanent,
                missing_subscriber_error(record.kind(), stage).to_string(),
            ),
        };

        match outcome {
            Outcome::Done => {
                self.infra_db
                    .update_status(&task.object_name, task.resource_version, stage, StageStatus::Done)
                    .await;

                task.remaining_stages.remove(0);

                if task.remaining_stages.is_empty() {
                    if let EventKind::Delete = task.event_kind {
                        self.infra_db
                            .complete_delete(&task.object_name, task.resource_version)
                            .await;
                    }
                    return;
                }

                task.attempt = 0;
                task.next_attempt_at = std::time::Instant::now();
                self.queue.push(task).await;
            }

            Outcome::Pending(Some(dependency)) => {
                self.infra_db
                    .register_waiter(&dependency, &task.object_name)
                    .await;
                let backoff = crate::queue::compute_backoff_with(&self.backoff, task.attempt);
                task.attempt += 1;
                self.queue.requeue(task, backoff).await;
            }

            Outcome::Pending(None) => {
                let backoff = crate::queue::compute_backoff_with(&self.backoff, task.attempt);
                task.attempt += 1;
                self.queue.requeue(task, backoff).await;
            }

            Outcome::Error(ErrorClass::Transient, reason) => {
                self.infra_db
                    .update_status(
                        &task.object_name,
                        task.resource_version,
                        stage,
                        StageStatus::Error(ErrorKind::Transient, reason),
                    )
                    .await;
                let backoff = crate::queue::compute_backoff_with(&self.backoff, task.attempt);
                task.attempt += 1;
                self.queue.requeue(task, backoff).await;
            }

            Outcome::Error(ErrorClass::Permanent, reason) => {
                // Terminal: spec.md §4.4 "a permanent error halts that
                // object's pipeline until the next accepted write mints a
                // fresh version and status vector." No requeue.
                self.infra_db
                    .update_status(
                        &task.object_name,
                        task.resource_version,
                        stage,
                        StageStatus::Error(ErrorKind::Permanent, reason),
                    )
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::NullModule;
    use crate::storage::MemoryStorage;
    use std::sync::Arc as StdArc;
    use std::time::Duration;

    fn new_manager() -> (StdArc<InfraDb>, StdArc<TaskQueue>, StdArc<SubFram>, StdArc<TaskManager>) {
        let storage = StdArc::new(MemoryStorage::new());
        let queue = StdArc::new(TaskQueue::new());
        let infra_db = StdArc::new(InfraDb::new(storage, queue.clone()));
        let subfram = StdArc::new(SubFram::new());
        let manager = StdArc::new(TaskManager::new(infra_db.clone(), queue.clone(), subfram.clone()));
        (infra_db, queue, subfram, manager)
    }

    #[testcase]
    async fn drains_a_create_to_full_realization() -> Result<()> {
        let (infra_db, queue, subfram, manager) = new_manager();

        subfram
            .subscribe(Kind::Vpc, StageId::Frr, StdArc::new(NullModule))
            .await?;
        subfram
            .subscribe(Kind::Vpc, StageId::GenLinux, StdArc::new(NullModule))
            .await?;

        infra_db
            .create(
                "vpc1".to_string(),
                IntentSpec::Vpc(VpcSpec {
                    vni: 500,
                    route_distinguisher: "65000:500".to_string(),
                }),
            )
            .await?;

        // Both stages converge within a couple of dequeues; a real deployment
        // relies on the worker loop, but the test drains synchronously.
        manager.process(queue.pop().await).await;
        manager.process(queue.pop().await).await;

        let record = infra_db.get("vpc1").await.unwrap();
        assert!(record.realized());

        Ok(())
    }

    #[testcase]
    async fn missing_subscriber_is_a_permanent_error() -> Result<()> {
        let (infra_db, queue, _subfram, manager) = new_manager();

        infra_db
            .create(
                "vpc1".to_string(),
                IntentSpec::Vpc(VpcSpec {
                    vni: 500,
                    route_distinguisher: "65000:500".to_string(),
                }),
            )
            .await?;

        manager.process(queue.pop().await).await;

        let record = infra_db.get("vpc1").await.unwrap();
        assert!(matches!(
            record.status.get(&StageId::Frr),
            Some(StageStatus::Error(ErrorKind::Permanent, _))
        ));

        Ok(())
    }

    #[testcase]
    async fn recover_replays_unrealized_records() -> Result<()> {
        let (infra_db, queue, subfram, manager) = new_manager();

        subfram
            .subscribe(Kind::Vpc, StageId::Frr, StdArc::new(NullModule))
            .await?;
        subfram
            .subscribe(Kind::Vpc, StageId::GenLinux, StdArc::new(NullModule))
            .await?;

        infra_db
            .create(
                "vpc1".to_string(),
                IntentSpec::Vpc(VpcSpec {
                    vni: 500,
                    route_distinguisher: "65000:500".to_string(),
                }),
            )
            .await?;

        // Drain the queue entry `create` already pushed, simulating a crash
        // before any stage ran.
        common::async_std::future::timeout(Duration::from_millis(10), queue.pop())
            .await
            .ok();

        manager.recover().await;

        manager.process(queue.pop().await).await;
        manager.process(queue.pop().await).await;

        let record = infra_db.get("vpc1").await.unwrap();
        assert!(record.realized());

        Ok(())
    }
}
