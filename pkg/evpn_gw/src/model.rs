use std::collections::BTreeMap;
use std::str::FromStr;

use common::errors::*;
use net::ip::IPAddress;

/// The five object kinds this gateway realizes.
///
/// `spec.md` §1/§3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Vpc,
    Subnet,
    Interface,
    BridgePort,
    LogicalBridge,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Vpc => "Vpc",
            Kind::Subnet => "Subnet",
            Kind::Interface => "Interface",
            Kind::BridgePort => "BridgePort",
            Kind::LogicalBridge => "LogicalBridge",
        }
    }
}

/// One subsystem's contribution to realizing an intent.
///
/// Priorities are pinned by `spec.md` §6: `frr=1, gen_linux=2,
/// vendor_linux=3, vendor_driver=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageId {
    Frr,
    GenLinux,
    VendorLinux,
    VendorDriver,
}

impl StageId {
    pub fn priority(&self) -> u32 {
        match self {
            StageId::Frr => 1,
            StageId::GenLinux => 2,
            StageId::VendorLinux => 3,
            StageId::VendorDriver => 4,
        }
    }
}

/// Stages a kind's intent must pass through to be realized.
///
/// `SPEC_FULL.md` §3: not every kind runs every stage. `LogicalBridge` and
/// `BridgePort` are the only kinds that reach the vendor layers; `Interface`
/// is a bare dummy/control link with no BGP-EVPN participation.
pub fn stages_for_kind(kind: Kind) -> &'static [StageId] {
    match kind {
        Kind::LogicalBridge | Kind::BridgePort => &[
            StageId::Frr,
            StageId::GenLinux,
            StageId::VendorLinux,
            StageId::VendorDriver,
        ],
        Kind::Vpc | Kind::Subnet => &[StageId::Frr, StageId::GenLinux],
        Kind::Interface => &[StageId::GenLinux],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
}

/// Per-stage realization state. `spec.md` §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    Done,
    Error(ErrorKind, String),
}

/// Sparse map from stage to status: only stages registered for the intent's
/// kind appear, and a stage absent from a record persisted before it existed
/// is implicitly `Pending` (`spec.md` §9, status-vector growth).
pub type StatusVector = BTreeMap<StageId, StageStatus>;

pub fn pending_status_vector(kind: Kind) -> StatusVector {
    let mut v = StatusVector::new();
    for stage in stages_for_kind(kind) {
        v.insert(*stage, StageStatus::Pending);
    }
    v
}

/// An intent is realized iff every stage registered for its kind reads
/// `Done`, treating a stage missing from the vector (added after the record
/// was last written) as `Pending`.
pub fn is_realized(kind: Kind, status: &StatusVector) -> bool {
    stages_for_kind(kind)
        .iter()
        .all(|stage| matches!(status.get(stage), Some(StageStatus::Done)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortType {
    Access,
    Trunk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcSpec {
    /// VXLAN Network Identifier used for the VRF's summary/default route
    /// exchange.
    pub vni: u32,
    /// BGP route distinguisher, e.g. "65000:100".
    pub route_distinguisher: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetSpec {
    /// Reference to the owning Vpc.
    pub vpc: String,
    /// CIDR prefix realized as the SVI's address, e.g. "10.0.0.0/24".
    pub cidr: String,
    pub vni: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlIfSpec {
    /// Optional reference to a Subnet this control interface is wired into.
    pub subnet: Option<String>,
}

/// Tagged union of interface variants.
///
/// `spec.md` §9: "model as a tagged variant with an exhaustive match; unknown
/// variant is a validation error, not an Unimplemented panic." Only
/// `ControlIfSpec` exists today; adding a variant here is a compile error at
/// every match site until handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceKindSpec {
    Control(ControlIfSpec),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    pub kind: InterfaceKindSpec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgePortSpec {
    pub ptype: PortType,
    /// Colon-separated MAC address, e.g. "00:11:22:33:44:55".
    pub mac: String,
    /// References to LogicalBridge intents. An ACCESS port must reference
    /// exactly one.
    pub bridges: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalBridgeSpec {
    pub vni: u32,
    pub vlan_id: Option<u16>,
    /// Optional reference to the owning Vpc (for bridges that participate in
    /// a VRF's routing, as opposed to pure L2 bridges).
    pub vpc: Option<String>,
}

/// Kind-specific spec payload. The Rust-native analogue of the wire schema's
/// `oneof` spec types (`SPEC_FULL.md` §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentSpec {
    Vpc(VpcSpec),
    Subnet(SubnetSpec),
    Interface(InterfaceSpec),
    BridgePort(BridgePortSpec),
    LogicalBridge(LogicalBridgeSpec),
}

impl IntentSpec {
    pub fn kind(&self) -> Kind {
        match self {
            IntentSpec::Vpc(_) => Kind::Vpc,
            IntentSpec::Subnet(_) => Kind::Subnet,
            IntentSpec::Interface(_) => Kind::Interface,
            IntentSpec::BridgePort(_) => Kind::BridgePort,
            IntentSpec::LogicalBridge(_) => Kind::LogicalBridge,
        }
    }

    /// Outbound references in the reference graph (`spec.md` §3).
    pub fn refs(&self) -> Vec<&str> {
        match self {
            IntentSpec::Vpc(_) => vec![],
            IntentSpec::Subnet(s) => vec![s.vpc.as_str()],
            IntentSpec::Interface(s) => match &s.kind {
                InterfaceKindSpec::Control(c) => c.subnet.as_deref().into_iter().collect(),
            },
            IntentSpec::BridgePort(s) => s.bridges.iter().map(|s| s.as_str()).collect(),
            IntentSpec::LogicalBridge(s) => s.vpc.as_deref().into_iter().collect(),
        }
    }

    /// Validates fields that are local to this spec (no cross-object
    /// lookups). Cross-object validation (dangling references, duplicate
    /// names) happens in `InfraDB` under the write lock.
    pub fn validate(&self) -> Result<()> {
        match self {
            IntentSpec::Vpc(s) => {
                if s.vni == 0 {
                    return Err(err_msg("Vpc.vni must be non-zero"));
                }
                if s.route_distinguisher.is_empty() {
                    return Err(err_msg("Vpc.route_distinguisher must not be empty"));
                }
            }
            IntentSpec::Subnet(s) => {
                if s.vpc.is_empty() {
                    return Err(err_msg("Subnet.vpc must reference a Vpc"));
                }
                parse_cidr(&s.cidr)?;
                if s.vni == 0 {
                    return Err(err_msg("Subnet.vni must be non-zero"));
                }
            }
            IntentSpec::Interface(s) => match &s.kind {
                InterfaceKindSpec::Control(_) => {}
            },
            IntentSpec::BridgePort(s) => {
                validate_mac(&s.mac)?;
                match s.ptype {
                    PortType::Access => {
                        if s.bridges.len() != 1 {
                            return Err(err_msg(
                                "ACCESS BridgePort must reference exactly one LogicalBridge",
                            ));
                        }
                    }
                    PortType::Trunk => {
                        if s.bridges.is_empty() {
                            return Err(err_msg(
                                "TRUNK BridgePort must reference at least one LogicalBridge",
                            ));
                        }
                    }
                }
            }
            IntentSpec::LogicalBridge(s) => {
                if s.vni == 0 {
                    return Err(err_msg("LogicalBridge.vni must be non-zero"));
                }
            }
        }

        Ok(())
    }
}

/// Parses a MAC address of the form `xx:xx:xx:xx:xx:xx`.
pub fn validate_mac(mac: &str) -> Result<[u8; 6]> {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return Err(format_err!("Malformed MAC address: {}", mac));
    }

    let mut out = [0u8; 6];
    for (i, part) in parts.iter().enumerate() {
        if part.len() != 2 {
            return Err(format_err!("Malformed MAC address: {}", mac));
        }
        out[i] = u8::from_str_radix(part, 16)
            .map_err(|_| format_err!("Malformed MAC address: {}", mac))?;
    }

    Ok(out)
}

/// Parses a CIDR of the form `<ip>/<prefix_len>`, validating the IP with
/// `net::ip::IPAddress`.
pub fn parse_cidr(cidr: &str) -> Result<(IPAddress, u8)> {
    let (ip_str, len_str) = cidr
        .split_once('/')
        .ok_or_else(|| format_err!("Malformed CIDR: {}", cidr))?;

    let ip = IPAddress::from_str(ip_str).map_err(|_| format_err!("Malformed CIDR: {}", cidr))?;
    let prefix_len = u8::from_str(len_str).map_err(|_| format_err!("Malformed CIDR: {}", cidr))?;

    Ok((ip, prefix_len))
}

/// Whether the intent is live or being torn down (`spec.md` §3 lifecycle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Deleting,
}

/// One intent object as InfraDB and Storage see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRecord {
    pub name: String,
    pub version: u64,
    pub spec: IntentSpec,
    pub status: StatusVector,
    pub lifecycle: Lifecycle,
}

impl IntentRecord {
    pub fn kind(&self) -> Kind {
        self.spec.kind()
    }

    pub fn realized(&self) -> bool {
        is_realized(self.kind(), &self.status)
    }
}

/// Why a task exists: which direction realization is headed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Create,
    Update,
    Delete,
}
