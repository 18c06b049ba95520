#[macro_use]
extern crate common;
#[macro_use]
extern crate macros;
extern crate container;
extern crate crypto;
extern crate nordic_proto;
extern crate protobuf;
extern crate usb;
extern crate rpc_util;
extern crate rpc;

#[cfg(feature = "std")]
#[macro_use]
extern crate std;

#[cfg(feature = "alloc")]
#[macro_use]
extern crate alloc;

pub mod link_util;
pub mod proto;
pub mod radio_bridge;
pub mod usb_radio;
