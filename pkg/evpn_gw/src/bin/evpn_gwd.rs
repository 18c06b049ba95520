extern crate common;
extern crate evpn_gw;
#[macro_use]
extern crate macros;

use std::sync::Arc;

use common::async_std::task;
use common::errors::*;

use evpn_gw::config::GatewayConfig;
use evpn_gw::infra_db::InfraDb;
use evpn_gw::modules::{FrrModule, GenLinuxModule, NullModule};
use evpn_gw::modules::frr::FakeFrrSession;
use evpn_gw::modules::gen_linux::FakeNetlinkHandle;
use evpn_gw::model::{Kind, StageId};
use evpn_gw::queue::TaskQueue;
use evpn_gw::rpc_front::RpcFront;
use evpn_gw::storage::MemoryStorage;
use evpn_gw::subfram::SubFram;
use evpn_gw::task_manager::TaskManager;

#[derive(Args)]
struct Args {
    #[arg(default = 4)]
    workers: usize,
}

/// Wires one `(kind, stage)` slot for every kind registered for `stage`
/// (`spec.md` §4.5 wiring step, normally driven by process startup
/// configuration rather than an RPC).
async fn subscribe_stage(subfram: &SubFram, stage: StageId, handler: Arc<dyn evpn_gw::modules::Module>) -> Result<()> {
    for kind in [
        Kind::Vpc,
        Kind::Subnet,
        Kind::Interface,
        Kind::BridgePort,
        Kind::LogicalBridge,
    ] {
        if evpn_gw::model::stages_for_kind(kind).contains(&stage) {
            subfram.subscribe(kind, stage, handler.clone()).await?;
        }
    }
    Ok(())
}

async fn run() -> Result<()> {
    let args = common::args::parse_args::<Args>()?;

    let config = GatewayConfig {
        worker_count: args.workers,
        ..GatewayConfig::default()
    };

    let storage = Arc::new(MemoryStorage::new());
    let queue = Arc::new(TaskQueue::new());
    let infra_db = Arc::new(InfraDb::new(storage, queue.clone()));
    let subfram = Arc::new(SubFram::new());

    // Demo wiring: a FakeFrrSession/FakeNetlinkHandle stand in for the real
    // FRR VTY and netlink subsystems (spec.md §1's external-collaborator
    // boundary); VendorLinux/VendorDriver are NullModule, per the explicit
    // vendor-module Non-goal.
    let frr = Arc::new(FrrModule::new(infra_db.clone(), Arc::new(FakeFrrSession::default())));
    let gen_linux = Arc::new(GenLinuxModule::new(infra_db.clone(), Arc::new(FakeNetlinkHandle::default())));
    let vendor = Arc::new(NullModule);

    subscribe_stage(&subfram, StageId::Frr, frr).await?;
    subscribe_stage(&subfram, StageId::GenLinux, gen_linux).await?;
    subscribe_stage(&subfram, StageId::VendorLinux, vendor.clone()).await?;
    subscribe_stage(&subfram, StageId::VendorDriver, vendor).await?;

    let task_manager = Arc::new(TaskManager::with_backoff(
        infra_db.clone(),
        queue,
        subfram,
        config.backoff,
    ));
    task_manager.recover().await;
    let workers = task_manager.spawn_workers(config.worker_count);

    let _rpc_front = RpcFront::new(infra_db);

    // TODO: serve _rpc_front behind an rpc::Http2Server once the wire schema
    // this crate's RPC front-end decodes into IntentSpec is defined.
    for worker in workers {
        worker.await;
    }

    Ok(())
}

fn main() -> Result<()> {
    task::block_on(run())
}
