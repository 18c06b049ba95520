use crate::model::{EventKind, Kind};
use crate::modules::{Module, Outcome};

/// Stands in for a vendor-specific driver that isn't part of this crate
/// (`spec.md` §1/§4.6 — `VendorLinuxModule`/`VendorDriverModule` are
/// explicitly out of scope). A deployment with real vendor hardware plugs a
/// real module into the `vendor_linux=3`/`vendor_driver=4` slots instead;
/// this one just converges immediately so the pipeline can be exercised
/// end-to-end without that hardware (used by `evpn_gwd`'s demo wiring and by
/// the integration tests).
pub struct NullModule;

#[async_trait]
impl Module for NullModule {
    async fn handle(
        &self,
        _kind: Kind,
        _name: &str,
        _version: u64,
        _event_kind: EventKind,
    ) -> Outcome {
        Outcome::Done
    }
}
