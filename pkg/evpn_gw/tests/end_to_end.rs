//! End-to-end exercises of the full pipeline wired together: `RpcFront` ->
//! `InfraDb` -> `TaskQueue` -> `TaskManager` -> `SubFram` -> modules. Unit
//! tests alongside each component already cover that component's internal
//! contract; these drive the assembled system the way `evpn_gwd` would.

extern crate common;
extern crate evpn_gw;
#[macro_use]
extern crate macros;

use std::sync::Arc;
use std::time::Duration;

use common::errors::*;

use evpn_gw::errors::GatewayError;
use evpn_gw::infra_db::InfraDb;
use evpn_gw::model::*;
use evpn_gw::modules::frr::FakeFrrSession;
use evpn_gw::modules::gen_linux::FakeNetlinkHandle;
use evpn_gw::modules::{FrrModule, GenLinuxModule, NullModule};
use evpn_gw::queue::TaskQueue;
use evpn_gw::rpc_front::RpcFront;
use evpn_gw::storage::MemoryStorage;
use evpn_gw::subfram::SubFram;
use evpn_gw::task_manager::TaskManager;

struct Harness {
    front: RpcFront,
    infra_db: Arc<InfraDb>,
    queue: Arc<TaskQueue>,
    manager: Arc<TaskManager>,
    frr_session: Arc<FakeFrrSession>,
    netlink: Arc<FakeNetlinkHandle>,
}

async fn setup() -> Result<Harness> {
    let storage = Arc::new(MemoryStorage::new());
    let queue = Arc::new(TaskQueue::new());
    let infra_db = Arc::new(InfraDb::new(storage, queue.clone()));
    let subfram = Arc::new(SubFram::new());

    let frr_session = Arc::new(FakeFrrSession::default());
    let netlink = Arc::new(FakeNetlinkHandle::default());

    let frr = Arc::new(FrrModule::new(infra_db.clone(), frr_session.clone()));
    let gen_linux = Arc::new(GenLinuxModule::new(infra_db.clone(), netlink.clone()));
    let vendor = Arc::new(NullModule);

    for kind in [Kind::Vpc, Kind::Subnet, Kind::BridgePort, Kind::LogicalBridge] {
        subfram.subscribe(kind, StageId::Frr, frr.clone()).await?;
    }
    for kind in [
        Kind::Vpc,
        Kind::Subnet,
        Kind::Interface,
        Kind::BridgePort,
        Kind::LogicalBridge,
    ] {
        subfram.subscribe(kind, StageId::GenLinux, gen_linux.clone()).await?;
    }
    for kind in [Kind::BridgePort, Kind::LogicalBridge] {
        subfram.subscribe(kind, StageId::VendorLinux, vendor.clone()).await?;
        subfram.subscribe(kind, StageId::VendorDriver, vendor.clone()).await?;
    }

    let manager = Arc::new(TaskManager::new(infra_db.clone(), queue.clone(), subfram));
    let front = RpcFront::new(infra_db.clone());

    Ok(Harness {
        front,
        infra_db,
        queue,
        manager,
        frr_session,
        netlink,
    })
}

/// Drains the queue until empty or `max_steps` is hit, so tests don't spin
/// forever on a bug that leaves something perpetually pending.
async fn drain(h: &Harness, max_steps: usize) {
    for _ in 0..max_steps {
        match common::async_std::future::timeout(Duration::from_millis(50), h.queue.pop()).await {
            Ok(task) => h.manager.process(task).await,
            Err(_) => return,
        }
    }
}

fn vpc(vni: u32) -> IntentSpec {
    IntentSpec::Vpc(VpcSpec {
        vni,
        route_distinguisher: format!("65000:{}", vni),
    })
}

fn logical_bridge(vni: u32, vpc_ref: Option<&str>) -> IntentSpec {
    IntentSpec::LogicalBridge(LogicalBridgeSpec {
        vni,
        vlan_id: None,
        vpc: vpc_ref.map(|s| s.to_string()),
    })
}

fn access_port(mac: &str, bridge: &str) -> IntentSpec {
    IntentSpec::BridgePort(BridgePortSpec {
        ptype: PortType::Access,
        mac: mac.to_string(),
        bridges: vec![bridge.to_string()],
    })
}

#[testcase]
async fn happy_path_realizes_a_full_chain() -> Result<()> {
    let h = setup().await?;

    h.front.create("vpc1".to_string(), vpc(100)).await?;
    h.front
        .create("lb1".to_string(), logical_bridge(200, Some("vpc1")))
        .await?;
    h.front
        .create("bp1".to_string(), access_port("00:11:22:33:44:55", "lb1"))
        .await?;

    drain(&h, 32).await;

    for name in ["vpc1", "lb1", "bp1"] {
        let record = h.front.get(name).await?;
        assert!(record.realized(), "{} should be fully realized", name);
    }

    assert!(h.frr_session.applied.lock().await.contains_key("bp1"));
    assert!(h.netlink.state.lock().await.port_memberships.contains(&(
        "bp1".to_string(),
        "lb1".to_string()
    )));

    Ok(())
}

#[testcase]
async fn invalid_spec_is_rejected_before_anything_persists() -> Result<()> {
    let h = setup().await?;

    let err = h
        .front
        .create(
            "bp1".to_string(),
            IntentSpec::BridgePort(BridgePortSpec {
                ptype: PortType::Access,
                mac: "not-a-mac".to_string(),
                bridges: vec!["lb1".to_string()],
            }),
        )
        .await;

    assert!(err.is_err());
    assert!(h.front.get("bp1").await.is_err());

    Ok(())
}

#[testcase]
async fn bridge_port_stays_pending_until_its_bridge_is_created() -> Result<()> {
    let h = setup().await?;

    h.front
        .create("bp1".to_string(), access_port("00:11:22:33:44:55", "lb1"))
        .await
        .unwrap_err();

    // A dangling reference is rejected at create time (spec.md §4.2), so the
    // only way to observe "pending on a sibling stage" is to create both and
    // let the BridgePort's Frr stage wait on the LogicalBridge's Frr stage.
    h.front.create("lb1".to_string(), logical_bridge(100, None)).await?;
    h.front
        .create("bp1".to_string(), access_port("00:11:22:33:44:55", "lb1"))
        .await?;

    drain(&h, 32).await;

    let bp = h.front.get("bp1").await?;
    assert!(bp.realized());

    Ok(())
}

#[testcase]
async fn dependent_object_converges_once_its_dependency_does() -> Result<()> {
    let h = setup().await?;

    h.front.create("vpc1".to_string(), vpc(100)).await?;
    h.front
        .create("lb1".to_string(), logical_bridge(200, Some("vpc1")))
        .await?;

    drain(&h, 32).await;

    let lb = h.front.get("lb1").await?;
    assert!(lb.realized());

    Ok(())
}

#[testcase]
async fn update_supersedes_in_flight_work_for_the_old_version() -> Result<()> {
    let h = setup().await?;

    let created = h.front.create("vpc1".to_string(), vpc(100)).await?;
    assert_eq!(created.version, 1);

    // A stale outcome for v1 must not touch v2's status once the update has
    // landed (spec.md §8 "Supersession" law).
    let updated = h.front.update("vpc1", vpc(200), false).await?;
    assert_eq!(updated.version, 2);

    h.infra_db
        .update_status("vpc1", 1, StageId::Frr, StageStatus::Done)
        .await;

    let record = h.infra_db.get("vpc1").await.unwrap();
    assert_eq!(record.version, 2);
    assert_eq!(record.status.get(&StageId::Frr), Some(&StageStatus::Pending));

    drain(&h, 32).await;
    let record = h.front.get("vpc1").await?;
    assert!(record.realized());

    Ok(())
}

#[testcase]
async fn restart_recovery_replays_unfinished_work() -> Result<()> {
    let h = setup().await?;

    h.front.create("vpc1".to_string(), vpc(100)).await?;

    // Simulate a crash: drop the in-flight task without processing it, then
    // rebuild a fresh TaskManager over the same Storage the way `evpn_gwd`
    // would after a restart.
    common::async_std::future::timeout(Duration::from_millis(50), h.queue.pop())
        .await
        .ok();

    let storage_snapshot = h.infra_db.list("").await;
    assert_eq!(storage_snapshot.len(), 1);
    assert!(!storage_snapshot[0].realized());

    h.manager.recover().await;
    drain(&h, 32).await;

    let record = h.front.get("vpc1").await?;
    assert!(record.realized());

    Ok(())
}

#[testcase]
async fn delete_is_rejected_while_referenced_then_succeeds_after() -> Result<()> {
    let h = setup().await?;

    h.front.create("lb1".to_string(), logical_bridge(100, None)).await?;
    h.front
        .create("bp1".to_string(), access_port("00:11:22:33:44:55", "lb1"))
        .await?;
    drain(&h, 32).await;

    let err = h.front.delete("lb1", false).await;
    match GatewayError::downcast(&err.unwrap_err()) {
        Some(GatewayError::FailedPrecondition(_)) => {}
        other => panic!("expected FailedPrecondition, got {:?}", other),
    }

    h.front.delete("bp1", false).await?;
    drain(&h, 32).await;

    h.front.delete("lb1", false).await?;
    drain(&h, 32).await;

    assert!(h.front.get("lb1").await.is_err());
    assert!(!h.netlink.state.lock().await.bridges.contains("lb1"));

    Ok(())
}
