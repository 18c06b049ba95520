//! The authoritative in-memory intent model: cross-object validation,
//! resource-version minting, the reference graph (and its reverse index),
//! and the dependency-wait wiring that replaces naive polling (`spec.md`
//! §4.2).
//!
//! Grounded on `Manager::start_job_impl` / `start_job_transaction` /
//! `reconcile_job` in `pkg/container/src/manager/manager.rs`: validate what
//! can be validated locally, mutate the model and persist under one lock,
//! then enqueue reconciliation work. The global write lock `G` is
//! `state: Mutex<InfraDbState>`; call sites that already hold it expose
//! `*_locked` helpers instead of recursively locking, the same
//! `_impl`/public split `manager.rs` uses.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use common::async_std::sync::Mutex;
use common::errors::*;

use crate::errors::GatewayError;
use crate::model::*;
use crate::queue::{Task, TaskQueue};
use crate::storage::{Storage, StorageError};

struct InfraDbState {
    records: BTreeMap<String, IntentRecord>,

    /// target name -> set of names whose spec references it. Guards delete
    /// against dangling referrers (`spec.md` §3/§4.2, `FailedPrecondition`).
    reverse_refs: HashMap<String, HashSet<String>>,

    /// dependency name -> set of object names whose task is suspended
    /// waiting on one of that dependency's stages reaching `Done`
    /// (`spec.md` §4.2 "reference resolution for dependency-waiting").
    waiters: HashMap<String, HashSet<String>>,
}

/// Single-writer authoritative model fronting `Storage` (`spec.md` §4.2).
pub struct InfraDb {
    state: Mutex<InfraDbState>,
    storage: Arc<dyn Storage>,
    queue: Arc<TaskQueue>,
}

impl InfraDb {
    pub fn new(storage: Arc<dyn Storage>, queue: Arc<TaskQueue>) -> Self {
        Self {
            state: Mutex::new(InfraDbState {
                records: BTreeMap::new(),
                reverse_refs: HashMap::new(),
                waiters: HashMap::new(),
            }),
            storage,
            queue,
        }
    }

    /// Rebuilds the in-memory graph from `Storage`. Must run before any
    /// write lands: `spec.md` §3's invariant that the in-memory copy never
    /// diverges from a committed write assumes this has already happened.
    pub async fn load(&self) {
        let records = self.storage.list("").await;
        let mut state = self.state.lock().await;
        for record in records {
            Self::index_locked(&mut state, &record);
            state.records.insert(record.name.clone(), record);
        }
    }

    fn index_locked(state: &mut InfraDbState, record: &IntentRecord) {
        for target in record.spec.refs() {
            state
                .reverse_refs
                .entry(target.to_string())
                .or_default()
                .insert(record.name.clone());
        }
    }

    fn deindex_locked(state: &mut InfraDbState, record: &IntentRecord) {
        for target in record.spec.refs() {
            if let Some(referrers) = state.reverse_refs.get_mut(target) {
                referrers.remove(&record.name);
            }
        }
    }

    fn validate_refs_locked(state: &InfraDbState, spec: &IntentSpec) -> Result<()> {
        for target in spec.refs() {
            if !state.records.contains_key(target) {
                return Err(
                    GatewayError::invalid_argument(format!("Dangling reference to {}", target))
                        .into(),
                );
            }
        }
        Ok(())
    }

    /// Persists `record` with `expectedVersion`, retrying once on a
    /// Storage CAS conflict before surfacing `Aborted` (`spec.md` §7:
    /// "Conflict ... one inner retry; then surfaced as Aborted").
    async fn persist(&self, name: &str, record: IntentRecord, expected_version: u64) -> Result<()> {
        match self.storage.set(name, record.clone(), expected_version).await {
            Ok(_) => Ok(()),
            Err(StorageError::Conflict) => self
                .storage
                .set(name, record, expected_version)
                .await
                .map(|_| ())
                .map_err(storage_error_to_gateway),
            Err(e) => Err(storage_error_to_gateway(e)),
        }
    }

    pub async fn get(&self, name: &str) -> Option<IntentRecord> {
        self.state.lock().await.records.get(name).cloned()
    }

    pub async fn list(&self, prefix: &str) -> Vec<IntentRecord> {
        self.state
            .lock()
            .await
            .records
            .range(prefix.to_string()..)
            .take_while(|(n, _)| n.starts_with(prefix))
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// `spec.md` §4.2 write contract, steps 1-8 (create path).
    pub async fn create(&self, name: String, spec: IntentSpec) -> Result<IntentRecord> {
        if name.is_empty() {
            return Err(GatewayError::invalid_argument("name must not be empty").into());
        }
        spec.validate()
            .map_err(|e| GatewayError::invalid_argument(e.to_string()))?;

        let mut state = self.state.lock().await;

        Self::validate_refs_locked(&state, &spec)?;

        if let Some(existing) = state.records.get(&name) {
            if existing.spec == spec {
                // Idempotent create: spec.md §4.2 step 3, §8 law.
                return Ok(existing.clone());
            }
            return Err(GatewayError::already_exists(name).into());
        }

        let version = 1;
        let status = pending_status_vector(spec.kind());
        let record = IntentRecord {
            name: name.clone(),
            version,
            spec,
            status,
            lifecycle: Lifecycle::Active,
        };

        self.persist(&name, record.clone(), 0).await?;

        Self::index_locked(&mut state, &record);
        state.records.insert(name.clone(), record.clone());

        let stages = stages_for_kind(record.kind()).to_vec();
        drop(state);
        self.queue
            .push(Task::new(name, version, EventKind::Create, stages))
            .await;

        Ok(record)
    }

    /// Update (full-spec upsert). Field-mask merge is the RPC front-end's
    /// job (`spec.md` §1/§6) — this expects an already-merged spec.
    /// Resolves Open Question (a) in `spec.md` §9: any accepted write mints
    /// a fresh version and resets the status vector, even when the new
    /// spec compares equal to the old one (`SPEC_FULL.md` §9(a)).
    pub async fn update(
        &self,
        name: &str,
        spec: IntentSpec,
        allow_missing: bool,
    ) -> Result<IntentRecord> {
        spec.validate()
            .map_err(|e| GatewayError::invalid_argument(e.to_string()))?;

        let mut state = self.state.lock().await;

        Self::validate_refs_locked(&state, &spec)?;

        let existing = match state.records.get(name).cloned() {
            Some(r) => r,
            None => {
                if allow_missing {
                    drop(state);
                    return self.create(name.to_string(), spec).await;
                }
                return Err(GatewayError::not_found(name).into());
            }
        };

        if existing.kind() != spec.kind() {
            return Err(
                GatewayError::invalid_argument("cannot change an intent's kind via update").into(),
            );
        }

        let new_version = existing.version + 1;
        let status = pending_status_vector(spec.kind());
        let record = IntentRecord {
            name: name.to_string(),
            version: new_version,
            spec,
            status,
            lifecycle: Lifecycle::Active,
        };

        self.persist(name, record.clone(), existing.version).await?;

        Self::deindex_locked(&mut state, &existing);
        Self::index_locked(&mut state, &record);
        state.records.insert(name.to_string(), record.clone());

        let stages = stages_for_kind(record.kind()).to_vec();
        drop(state);
        self.queue
            .push(Task::new(name.to_string(), new_version, EventKind::Update, stages))
            .await;

        Ok(record)
    }

    /// `spec.md` §3/§4.2: replaces status with "deleting" and enqueues a
    /// reverse-stage teardown task. The record is only removed from
    /// `Storage` once that task completes (`complete_delete`).
    pub async fn delete(&self, name: &str, allow_missing: bool) -> Result<()> {
        let mut state = self.state.lock().await;

        let existing = match state.records.get(name).cloned() {
            Some(r) => r,
            None => {
                return if allow_missing {
                    Ok(())
                } else {
                    Err(GatewayError::not_found(name).into())
                };
            }
        };

        if existing.lifecycle == Lifecycle::Deleting {
            // Already tearing down: spec.md §9(c), "delete is a no-op".
            return Ok(());
        }

        if let Some(referrers) = state.reverse_refs.get(name) {
            if !referrers.is_empty() {
                let mut names: Vec<&str> = referrers.iter().map(|s| s.as_str()).collect();
                names.sort_unstable();
                return Err(GatewayError::failed_precondition(format!(
                    "{} is still referenced by: {}",
                    name,
                    names.join(", ")
                ))
                .into());
            }
        }

        let new_version = existing.version + 1;
        let mut record = existing.clone();
        record.version = new_version;
        record.lifecycle = Lifecycle::Deleting;

        self.persist(name, record.clone(), existing.version).await?;

        state.records.insert(name.to_string(), record.clone());

        let mut stages = stages_for_kind(record.kind()).to_vec();
        stages.reverse();
        drop(state);
        self.queue
            .push(Task::new(name.to_string(), new_version, EventKind::Delete, stages))
            .await;

        Ok(())
    }

    /// Records one stage's outcome. Discards the update if `version` is no
    /// longer live — the supersession guarantee (`spec.md` §4.4/§8 law):
    /// a stale publish's outcome can never overwrite the current status.
    pub async fn update_status(&self, name: &str, version: u64, stage: StageId, status: StageStatus) {
        let mut state = self.state.lock().await;

        let record = match state.records.get_mut(name) {
            Some(r) if r.version == version => r,
            _ => return,
        };

        record.status.insert(stage, status.clone());
        let snapshot = record.clone();

        // Best-effort: if Storage is unavailable the in-memory status still
        // advances and a later successful write catches up (`spec.md` §7,
        // "Storage unavailable" pauses the pipeline, not the model).
        self.storage.set(name, snapshot, version).await.ok();

        if status == StageStatus::Done {
            if let Some(waiters) = state.waiters.get(name).cloned() {
                drop(state);
                for waiter in waiters {
                    self.queue.notify(&waiter).await;
                }
            }
        }
    }

    /// Registers `waiter` to be woken when `dependency`'s current stage
    /// transitions to `Done` (`spec.md` §4.2).
    pub async fn register_waiter(&self, dependency: &str, waiter: &str) {
        let mut state = self.state.lock().await;
        state
            .waiters
            .entry(dependency.to_string())
            .or_default()
            .insert(waiter.to_string());
    }

    /// Runs when a delete task's last stage reports `Done`: removes the
    /// record from `Storage` and the in-memory model (`spec.md` §4.4 step
    /// 5, delete branch).
    pub async fn complete_delete(&self, name: &str, version: u64) {
        let mut state = self.state.lock().await;

        let record = match state.records.get(name) {
            Some(r) if r.version == version => r.clone(),
            _ => return,
        };

        self.storage.delete(name, version).await.ok();

        Self::deindex_locked(&mut state, &record);
        state.records.remove(name);
        state.waiters.remove(name);
    }
}

fn storage_error_to_gateway(e: StorageError) -> Error {
    match e {
        StorageError::Conflict => GatewayError::aborted("storage CAS conflict").into(),
        StorageError::NotFound => GatewayError::not_found("storage record missing").into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn logical_bridge(vni: u32) -> IntentSpec {
        IntentSpec::LogicalBridge(LogicalBridgeSpec {
            vni,
            vlan_id: None,
            vpc: None,
        })
    }

    fn access_port(bridge: &str) -> IntentSpec {
        IntentSpec::BridgePort(BridgePortSpec {
            ptype: PortType::Access,
            mac: "00:11:22:33:44:55".to_string(),
            bridges: vec![bridge.to_string()],
        })
    }

    fn new_db() -> InfraDb {
        InfraDb::new(Arc::new(MemoryStorage::new()), Arc::new(TaskQueue::new()))
    }

    #[testcase]
    async fn create_is_idempotent() -> Result<()> {
        let db = new_db();

        let spec = logical_bridge(100);
        let first = db.create("lb1".to_string(), spec.clone()).await?;
        assert_eq!(first.version, 1);

        let second = db.create("lb1".to_string(), spec).await?;
        assert_eq!(second.version, 1);

        Ok(())
    }

    #[testcase]
    async fn create_with_different_spec_conflicts() -> Result<()> {
        let db = new_db();

        db.create("lb1".to_string(), logical_bridge(100)).await?;
        let err = db.create("lb1".to_string(), logical_bridge(200)).await;

        let err = err.unwrap_err();
        match GatewayError::downcast(&err) {
            Some(GatewayError::AlreadyExists(_)) => {}
            other => panic!("expected AlreadyExists, got {:?}", other),
        }

        Ok(())
    }

    #[testcase]
    async fn dangling_reference_rejected_at_create() -> Result<()> {
        let db = new_db();

        let err = db.create("bp1".to_string(), access_port("lb1")).await;
        assert!(err.is_err());

        Ok(())
    }

    #[testcase]
    async fn delete_rejects_while_referenced() -> Result<()> {
        let db = new_db();

        db.create("lb1".to_string(), logical_bridge(100)).await?;
        db.create("bp1".to_string(), access_port("lb1")).await?;

        let err = db.delete("lb1", false).await;
        assert!(err.is_err());

        db.delete("bp1", false).await?;

        Ok(())
    }

    #[testcase]
    async fn update_mints_new_version_and_resets_status() -> Result<()> {
        let db = new_db();

        let created = db.create("lb1".to_string(), logical_bridge(100)).await?;
        assert_eq!(created.version, 1);

        db.update_status(
            "lb1",
            1,
            StageId::Frr,
            StageStatus::Done,
        )
        .await;

        let updated = db.update("lb1", logical_bridge(200), false).await?;
        assert_eq!(updated.version, 2);
        assert_eq!(updated.status.get(&StageId::Frr), Some(&StageStatus::Pending));

        Ok(())
    }

    #[testcase]
    async fn stale_status_update_is_discarded() -> Result<()> {
        let db = new_db();

        db.create("lb1".to_string(), logical_bridge(100)).await?;
        db.update("lb1", logical_bridge(200), false).await?;

        // This outcome belongs to the superseded v1 task; it must not touch
        // the v2 record's status (spec.md §8 "Supersession" law).
        db.update_status("lb1", 1, StageId::Frr, StageStatus::Done).await;

        let record = db.get("lb1").await.unwrap();
        assert_eq!(record.version, 2);
        assert_eq!(record.status.get(&StageId::Frr), Some(&StageStatus::Pending));

        Ok(())
    }
}
