mod database_admin_client;
mod database_client;
mod protobuf_table;
mod schema_pusher;
pub mod sql;

pub use database_admin_client::*;
pub use database_client::*;
pub use protobuf_table::*;
pub use schema_pusher::*;
