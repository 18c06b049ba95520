//! Process-wiring configuration (`SPEC_FULL.md` §2's ambient addition,
//! grounded on the `MetastoreConfig`/`ClusterNodeConfig` shape in
//! `pkg/datastore/src/meta/store.rs` and `pkg/container/src/node/node.rs`).

use crate::queue::BackoffConfig;

/// Which `Storage` backend `evpn_gwd` wires up at startup.
///
/// `MemoryStorage` is the only backend this crate ships; a durable K/V
/// engine is an external collaborator (`spec.md` §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
}

/// Top-level knobs passed into the `evpn_gwd` binary.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub storage_backend: StorageBackend,

    /// Concurrent `TaskManager` dequeue loops (`spec.md` §5: "multiple are
    /// allowed, partitioned by object name hash").
    pub worker_count: usize,

    /// The `spec.md` §4.3 backoff schedule (`base`, `ceiling`); the ±20%
    /// jitter itself isn't a deployment knob.
    pub backoff: BackoffConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::Memory,
            worker_count: 4,
            backoff: BackoffConfig::default(),
        }
    }
}
