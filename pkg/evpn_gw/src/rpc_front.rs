//! Thin glue between a wire RPC service (out of scope; `spec.md` §1) and
//! `InfraDb`. Each fn here is what a generated RPC handler would call after
//! decoding its request message, matching how `pkg/container/src/node/node.rs`
//! keeps its `NodeService` handlers as short validate-then-delegate wrappers
//! around `Manager`.

use std::sync::Arc;

use common::errors::*;

use crate::errors::GatewayError;
use crate::infra_db::InfraDb;
use crate::model::{IntentRecord, IntentSpec};

/// Resource names are non-empty. `spec.md` §6 defines the full
/// `//network.opiproject.org/<kind>s/<id>` URI grammar and opaque-ID rules
/// for the `<id>` segment, but that grammar belongs to the wire schema —
/// an external collaborator per `spec.md` §1. This crate's `InfraDb` and
/// `Storage` only need a name to be a non-empty, stable key; the full
/// pattern validation is the RPC front-end's job once the wire schema is
/// wired in.
pub fn validate_resource_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(GatewayError::invalid_argument("name must not be empty").into());
    }
    Ok(())
}

pub struct RpcFront {
    infra_db: Arc<InfraDb>,
}

impl RpcFront {
    pub fn new(infra_db: Arc<InfraDb>) -> Self {
        Self { infra_db }
    }

    pub async fn create(&self, name: String, spec: IntentSpec) -> Result<IntentRecord> {
        validate_resource_name(&name)?;
        self.infra_db.create(name, spec).await
    }

    /// `allow_missing`: per `spec.md` §9(c), an update against a missing
    /// name upserts rather than erroring.
    pub async fn update(
        &self,
        name: &str,
        spec: IntentSpec,
        allow_missing: bool,
    ) -> Result<IntentRecord> {
        validate_resource_name(name)?;
        self.infra_db.update(name, spec, allow_missing).await
    }

    pub async fn get(&self, name: &str) -> Result<IntentRecord> {
        self.infra_db
            .get(name)
            .await
            .ok_or_else(|| GatewayError::not_found(name).into())
    }

    pub async fn list(&self, prefix: &str) -> Vec<IntentRecord> {
        self.infra_db.list(prefix).await
    }

    /// `allow_missing`: per `spec.md` §9(c), a delete against a missing (or
    /// already-deleting) name is a no-op.
    pub async fn delete(&self, name: &str, allow_missing: bool) -> Result<()> {
        self.infra_db.delete(name, allow_missing).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_db::InfraDb;
    use crate::model::{LogicalBridgeSpec};
    use crate::queue::TaskQueue;
    use crate::storage::MemoryStorage;

    fn new_front() -> RpcFront {
        let storage = Arc::new(MemoryStorage::new());
        let queue = Arc::new(TaskQueue::new());
        RpcFront::new(Arc::new(InfraDb::new(storage, queue)))
    }

    #[testcase]
    async fn rejects_empty_names() -> Result<()> {
        let front = new_front();
        let err = front
            .create(
                "".to_string(),
                IntentSpec::LogicalBridge(LogicalBridgeSpec {
                    vni: 1,
                    vlan_id: None,
                    vpc: None,
                }),
            )
            .await;
        assert!(err.is_err());
        Ok(())
    }

    #[testcase]
    async fn accepts_hierarchical_uri_names() -> Result<()> {
        let front = new_front();
        let record = front
            .create(
                "//network.opiproject.org/bridge_ports/bp1".to_string(),
                IntentSpec::LogicalBridge(LogicalBridgeSpec {
                    vni: 1,
                    vlan_id: None,
                    vpc: None,
                }),
            )
            .await?;
        assert_eq!(record.version, 1);
        Ok(())
    }

    #[testcase]
    async fn get_missing_is_not_found() -> Result<()> {
        let front = new_front();
        let err = front.get("missing").await;
        match GatewayError::downcast(&err.unwrap_err()) {
            Some(GatewayError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
        Ok(())
    }

    #[testcase]
    async fn update_with_allow_missing_upserts() -> Result<()> {
        let front = new_front();
        let record = front
            .update(
                "lb1",
                IntentSpec::LogicalBridge(LogicalBridgeSpec {
                    vni: 1,
                    vlan_id: None,
                    vpc: None,
                }),
                true,
            )
            .await?;
        assert_eq!(record.version, 1);
        Ok(())
    }

    #[testcase]
    async fn delete_with_allow_missing_is_a_noop() -> Result<()> {
        let front = new_front();
        front.delete("missing", true).await?;
        Ok(())
    }
}
