//! The FRR stage (`priority=1`): the BGP-EVPN control-plane configuration a
//! real deployment would push over FRR's VTY interface (`spec.md` §1/§4.6).
//!
//! `FrrSession` isolates that I/O behind a trait, the same way the teacher
//! isolates blob I/O behind `BlobStore` at a module boundary
//! (`pkg/container/src/node/blob_store.rs`); `FakeFrrSession` is the test
//! double this crate ships so the pipeline's ordering and retry behavior can
//! be exercised without a running FRR daemon.

use std::collections::HashMap;
use std::sync::Arc;

use common::async_std::sync::Mutex;
use common::errors::*;

use crate::infra_db::InfraDb;
use crate::model::*;
use crate::modules::{ErrorClass, Module, Outcome};

/// A VTY command session for one FRR daemon. Real implementations issue
/// `configure terminal` blocks; this crate's only implementation
/// (`FakeFrrSession`) just records what would have been sent.
#[async_trait]
pub trait FrrSession: Send + Sync {
    /// Applies the EVPN configuration lines for `object_name`, idempotently
    /// replacing whatever was previously applied for that name.
    async fn apply(&self, object_name: &str, lines: Vec<String>) -> std::result::Result<(), String>;

    /// Removes any configuration previously applied for `object_name`.
    async fn remove(&self, object_name: &str) -> std::result::Result<(), String>;
}

/// Records the last command buffer applied per object, so tests can assert
/// on the exact configuration the module would have pushed.
#[derive(Default)]
pub struct FakeFrrSession {
    pub applied: Mutex<HashMap<String, Vec<String>>>,
}

#[async_trait]
impl FrrSession for FakeFrrSession {
    async fn apply(&self, object_name: &str, lines: Vec<String>) -> std::result::Result<(), String> {
        self.applied.lock().await.insert(object_name.to_string(), lines);
        Ok(())
    }

    async fn remove(&self, object_name: &str) -> std::result::Result<(), String> {
        self.applied.lock().await.remove(object_name);
        Ok(())
    }
}

pub struct FrrModule {
    infra_db: Arc<InfraDb>,
    session: Arc<dyn FrrSession>,
}

impl FrrModule {
    pub fn new(infra_db: Arc<InfraDb>, session: Arc<dyn FrrSession>) -> Self {
        Self { infra_db, session }
    }

    /// Reads `dep`'s current record and reports whether its Frr stage
    /// individually reads `Done` — the wake model this crate resolves
    /// `spec.md` §4.2's "on the transition of X's status to Done" to
    /// (`SPEC_FULL.md` §4.2): a waiter is woken as soon as the specific
    /// stage it's blocked on completes, not only on full realization.
    /// Returns `None` if `dep` no longer exists (a dangling reference that
    /// should have been rejected at write time).
    async fn dependency_frr_done(&self, dep: &str) -> Option<bool> {
        let record = self.infra_db.get(dep).await?;
        Some(matches!(
            record.status.get(&StageId::Frr),
            Some(StageStatus::Done)
        ))
    }

    async fn apply(&self, name: &str, lines: Vec<String>) -> Outcome {
        match self.session.apply(name, lines).await {
            Ok(()) => Outcome::Done,
            Err(reason) => Outcome::Error(ErrorClass::Transient, reason),
        }
    }
}

#[async_trait]
impl Module for FrrModule {
    async fn handle(
        &self,
        _kind: Kind,
        name: &str,
        version: u64,
        event_kind: EventKind,
    ) -> Outcome {
        let record = match self.infra_db.get(name).await {
            Some(r) => r,
            // Already removed from the model: nothing left to converge on.
            None => return Outcome::Done,
        };

        if record.version != version {
            // Stale publish: spec.md §4.6 contract, "return Done (a no-op)".
            return Outcome::Done;
        }

        if let EventKind::Delete = event_kind {
            return match self.session.remove(name).await {
                Ok(()) => Outcome::Done,
                Err(reason) => Outcome::Error(ErrorClass::Transient, reason),
            };
        }

        match &record.spec {
            IntentSpec::LogicalBridge(s) => {
                let mut lines = vec![format!("vni {}", s.vni)];
                if let Some(vlan) = s.vlan_id {
                    lines.push(format!("vlan {}", vlan));
                }
                if let Some(vpc) = &s.vpc {
                    match self.dependency_frr_done(vpc).await {
                        Some(true) => {}
                        Some(false) => return Outcome::Pending(Some(vpc.clone())),
                        None => {
                            return Outcome::Error(
                                ErrorClass::Permanent,
                                format!("referenced Vpc {} is missing", vpc),
                            )
                        }
                    }
                    lines.push(format!("vrf-import {}", vpc));
                }
                self.apply(name, lines).await
            }
            IntentSpec::BridgePort(s) => {
                for bridge in &s.bridges {
                    match self.dependency_frr_done(bridge).await {
                        Some(true) => {}
                        Some(false) => return Outcome::Pending(Some(bridge.clone())),
                        None => {
                            return Outcome::Error(
                                ErrorClass::Permanent,
                                format!("referenced LogicalBridge {} is missing", bridge),
                            )
                        }
                    }
                }

                let lines = vec![
                    format!("mac {}", s.mac),
                    format!("bridges {}", s.bridges.join(",")),
                ];
                self.apply(name, lines).await
            }
            IntentSpec::Vpc(s) => {
                let lines = vec![
                    format!("rd {}", s.route_distinguisher),
                    format!("vni {}", s.vni),
                ];
                self.apply(name, lines).await
            }
            IntentSpec::Subnet(s) => {
                match self.dependency_frr_done(&s.vpc).await {
                    Some(true) => {}
                    Some(false) => return Outcome::Pending(Some(s.vpc.clone())),
                    None => {
                        return Outcome::Error(
                            ErrorClass::Permanent,
                            format!("referenced Vpc {} is missing", s.vpc),
                        )
                    }
                }

                let lines = vec![format!("vni {}", s.vni), format!("network {}", s.cidr)];
                self.apply(name, lines).await
            }
            // No Frr stage is registered for Interface (spec.md §9 /
            // SPEC_FULL.md §3): this branch is unreachable via SubFram,
            // since nothing ever subscribes FrrModule at (Interface, Frr).
            IntentSpec::Interface(_) => Outcome::Done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::TaskQueue;
    use crate::storage::MemoryStorage;
    use std::sync::Arc as StdArc;

    fn new_db() -> StdArc<InfraDb> {
        StdArc::new(InfraDb::new(
            StdArc::new(MemoryStorage::new()),
            StdArc::new(TaskQueue::new()),
        ))
    }

    #[testcase]
    async fn bridge_port_waits_on_bridge_frr_stage() -> Result<()> {
        let db = new_db();
        let session = StdArc::new(FakeFrrSession::default());
        let module = FrrModule::new(db.clone(), session.clone());

        db.create(
            "lb1".to_string(),
            IntentSpec::LogicalBridge(LogicalBridgeSpec {
                vni: 100,
                vlan_id: None,
                vpc: None,
            }),
        )
        .await?;
        let bp = db
            .create(
                "bp1".to_string(),
                IntentSpec::BridgePort(BridgePortSpec {
                    ptype: PortType::Access,
                    mac: "00:11:22:33:44:55".to_string(),
                    bridges: vec!["lb1".to_string()],
                }),
            )
            .await?;

        let outcome = module.handle(Kind::BridgePort, "bp1", bp.version, EventKind::Create).await;
        assert_eq!(outcome, Outcome::Pending(Some("lb1".to_string())));

        db.update_status("lb1", 1, StageId::Frr, StageStatus::Done).await;

        let outcome = module.handle(Kind::BridgePort, "bp1", bp.version, EventKind::Create).await;
        assert_eq!(outcome, Outcome::Done);
        assert!(session.applied.lock().await.contains_key("bp1"));

        Ok(())
    }

    #[testcase]
    async fn stale_version_is_a_noop() -> Result<()> {
        let db = new_db();
        let session = StdArc::new(FakeFrrSession::default());
        let module = FrrModule::new(db.clone(), session);

        let record = db
            .create(
                "lb1".to_string(),
                IntentSpec::LogicalBridge(LogicalBridgeSpec {
                    vni: 100,
                    vlan_id: None,
                    vpc: None,
                }),
            )
            .await?;

        let outcome = module
            .handle(Kind::LogicalBridge, "lb1", record.version + 1, EventKind::Create)
            .await;
        assert_eq!(outcome, Outcome::Done);

        Ok(())
    }
}
