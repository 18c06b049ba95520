//! The generic-Linux-kernel stage (`priority=2`): bridges, VRFs, addresses,
//! and dummy links realized as plain netlink objects (`spec.md` §1/§4.6).
//!
//! `NetlinkHandle` isolates that I/O behind a trait, matching the pattern
//! `FrrSession` uses for the Frr stage; `FakeNetlinkHandle` maintains an
//! in-process `LinuxNetState` model standing in for the kernel so the
//! pipeline can be exercised without real netlink access.

use std::collections::HashSet;
use std::sync::Arc;

use common::async_std::sync::Mutex;
use common::errors::*;

use crate::infra_db::InfraDb;
use crate::model::*;
use crate::modules::{ErrorClass, Module, Outcome};

/// Idempotent netlink operations a `GenLinuxModule` drives toward.
#[async_trait]
pub trait NetlinkHandle: Send + Sync {
    async fn ensure_bridge(&self, name: &str) -> std::result::Result<(), String>;
    async fn ensure_vrf(&self, name: &str) -> std::result::Result<(), String>;
    async fn ensure_address(&self, link: &str, cidr: &str) -> std::result::Result<(), String>;
    async fn ensure_dummy(&self, name: &str) -> std::result::Result<(), String>;
    async fn ensure_port_member(&self, port: &str, bridges: &[String]) -> std::result::Result<(), String>;
    async fn remove_link(&self, name: &str) -> std::result::Result<(), String>;
}

/// The external-subsystem state a real kernel would hold, modeled as plain
/// Rust sets so tests can assert convergence without a kernel.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinuxNetState {
    pub bridges: HashSet<String>,
    pub vrfs: HashSet<String>,
    pub dummies: HashSet<String>,
    pub addresses: HashSet<(String, String)>,
    pub port_memberships: HashSet<(String, String)>,
}

#[derive(Default)]
pub struct FakeNetlinkHandle {
    pub state: Mutex<LinuxNetState>,
}

#[async_trait]
impl NetlinkHandle for FakeNetlinkHandle {
    async fn ensure_bridge(&self, name: &str) -> std::result::Result<(), String> {
        self.state.lock().await.bridges.insert(name.to_string());
        Ok(())
    }

    async fn ensure_vrf(&self, name: &str) -> std::result::Result<(), String> {
        self.state.lock().await.vrfs.insert(name.to_string());
        Ok(())
    }

    async fn ensure_address(&self, link: &str, cidr: &str) -> std::result::Result<(), String> {
        self.state
            .lock()
            .await
            .addresses
            .insert((link.to_string(), cidr.to_string()));
        Ok(())
    }

    async fn ensure_dummy(&self, name: &str) -> std::result::Result<(), String> {
        self.state.lock().await.dummies.insert(name.to_string());
        Ok(())
    }

    async fn ensure_port_member(
        &self,
        port: &str,
        bridges: &[String],
    ) -> std::result::Result<(), String> {
        let mut state = self.state.lock().await;
        for bridge in bridges {
            state
                .port_memberships
                .insert((port.to_string(), bridge.to_string()));
        }
        Ok(())
    }

    async fn remove_link(&self, name: &str) -> std::result::Result<(), String> {
        let mut state = self.state.lock().await;
        state.bridges.remove(name);
        state.vrfs.remove(name);
        state.dummies.remove(name);
        state.addresses.retain(|(link, _)| link != name);
        state
            .port_memberships
            .retain(|(port, bridge)| port != name && bridge != name);
        Ok(())
    }
}

pub struct GenLinuxModule {
    infra_db: Arc<InfraDb>,
    netlink: Arc<dyn NetlinkHandle>,
}

impl GenLinuxModule {
    pub fn new(infra_db: Arc<InfraDb>, netlink: Arc<dyn NetlinkHandle>) -> Self {
        Self { infra_db, netlink }
    }

    /// Same wake model as `FrrModule::dependency_frr_done`, checked against
    /// the `GenLinux` stage instead (`SPEC_FULL.md` §4.2).
    async fn dependency_gen_linux_done(&self, dep: &str) -> Option<bool> {
        let record = self.infra_db.get(dep).await?;
        Some(matches!(
            record.status.get(&StageId::GenLinux),
            Some(StageStatus::Done)
        ))
    }

    fn to_transient(result: std::result::Result<(), String>) -> Option<Outcome> {
        match result {
            Ok(()) => None,
            Err(reason) => Some(Outcome::Error(ErrorClass::Transient, reason)),
        }
    }
}

#[async_trait]
impl Module for GenLinuxModule {
    async fn handle(
        &self,
        _kind: Kind,
        name: &str,
        version: u64,
        event_kind: EventKind,
    ) -> Outcome {
        let record = match self.infra_db.get(name).await {
            Some(r) => r,
            None => return Outcome::Done,
        };

        if record.version != version {
            return Outcome::Done;
        }

        if let EventKind::Delete = event_kind {
            return match self.netlink.remove_link(name).await {
                Ok(()) => Outcome::Done,
                Err(reason) => Outcome::Error(ErrorClass::Transient, reason),
            };
        }

        match &record.spec {
            IntentSpec::LogicalBridge(_) => {
                if let Some(err) = Self::to_transient(self.netlink.ensure_bridge(name).await) {
                    return err;
                }
                Outcome::Done
            }
            IntentSpec::BridgePort(s) => {
                for bridge in &s.bridges {
                    match self.dependency_gen_linux_done(bridge).await {
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
                if let Some(err) =
                    Self::to_transient(self.netlink.ensure_port_member(name, &s.bridges).await)
                {
                    return err;
                }
                Outcome::Done
            }
            IntentSpec::Vpc(_) => {
                if let Some(err) = Self::to_transient(self.netlink.ensure_vrf(name).await) {
                    return err;
                }
                Outcome::Done
            }
            IntentSpec::Subnet(s) => {
                match self.dependency_gen_linux_done(&s.vpc).await {
                    Some(true) => {}
                    Some(false) => return Outcome::Pending(Some(s.vpc.clone())),
                    None => {
                        return Outcome::Error(
                            ErrorClass::Permanent,
                            format!("referenced Vpc {} is missing", s.vpc),
                        )
                    }
                }
                if let Some(err) = Self::to_transient(self.netlink.ensure_address(name, &s.cidr).await)
                {
                    return err;
                }
                Outcome::Done
            }
            IntentSpec::Interface(s) => {
                if let Some(err) = Self::to_transient(self.netlink.ensure_dummy(name).await) {
                    return err;
                }
                match &s.kind {
                    InterfaceKindSpec::Control(c) => {
                        if let Some(subnet) = &c.subnet {
                            match self.dependency_gen_linux_done(subnet).await {
                                Some(true) => {}
                                Some(false) => return Outcome::Pending(Some(subnet.clone())),
                                None => {
                                    return Outcome::Error(
                                        ErrorClass::Permanent,
                                        format!("referenced Subnet {} is missing", subnet),
                                    )
                                }
                            }
                        }
                    }
                }
                Outcome::Done
            }
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
    async fn logical_bridge_creates_a_kernel_bridge() -> Result<()> {
        let db = new_db();
        let netlink = StdArc::new(FakeNetlinkHandle::default());
        let module = GenLinuxModule::new(db.clone(), netlink.clone());

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
            .handle(Kind::LogicalBridge, "lb1", record.version, EventKind::Create)
            .await;
        assert_eq!(outcome, Outcome::Done);
        assert!(netlink.state.lock().await.bridges.contains("lb1"));

        Ok(())
    }

    #[testcase]
    async fn delete_removes_the_link() -> Result<()> {
        let db = new_db();
        let netlink = StdArc::new(FakeNetlinkHandle::default());
        let module = GenLinuxModule::new(db.clone(), netlink.clone());

        db.create(
            "lb1".to_string(),
            IntentSpec::LogicalBridge(LogicalBridgeSpec {
                vni: 100,
                vlan_id: None,
                vpc: None,
            }),
        )
        .await?;
        netlink.ensure_bridge("lb1").await.unwrap();

        db.delete("lb1", false).await?;
        let record = db.get("lb1").await.unwrap();

        let outcome = module
            .handle(Kind::LogicalBridge, "lb1", record.version, EventKind::Delete)
            .await;
        assert_eq!(outcome, Outcome::Done);
        assert!(!netlink.state.lock().await.bridges.contains("lb1"));

        Ok(())
    }
}
