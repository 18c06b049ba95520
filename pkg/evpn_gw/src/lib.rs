//! EVPN gateway control plane: the intent-realization pipeline described in
//! `SPEC_FULL.md`.
//!
//! The core is a persistent store of user intent (`storage`), a single
//! authoritative in-memory model that validates and mints resource versions
//! under one write lock (`infra_db`), a retry/backoff work queue (`queue`),
//! a per-stage dispatch table (`subfram`), and a task dispatcher that drives
//! all of them together (`task_manager`). `modules` holds the FRR and
//! generic-Linux stage implementations; `rpc_front` is the thin glue an RPC
//! layer calls into after decoding the wire message (out of scope here, per
//! `spec.md` §1).

#[macro_use]
extern crate common;
extern crate crypto;
#[macro_use]
extern crate macros;
extern crate net;

pub mod config;
pub mod errors;
pub mod infra_db;
pub mod model;
pub mod modules;
pub mod queue;
pub mod rpc_front;
pub mod storage;
pub mod subfram;
pub mod task_manager;
