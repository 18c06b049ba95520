//! Registry mapping `(kind, stage)` to the module that realizes that stage
//! for that kind, with synchronous publish (`spec.md` §4.5).
//!
//! Grounded on the single-registration-table shape the teacher uses for its
//! node `workers_table`/`tasks_table` indices
//! (`pkg/container/src/node/node.rs`): subscriptions happen once, at process
//! wiring time, and steady-state `publish` calls never mutate the table.

use std::collections::HashMap;
use std::sync::Arc;

use common::async_std::sync::Mutex;
use common::errors::*;

use crate::errors::GatewayError;
use crate::model::{EventKind, Kind, StageId};
use crate::modules::{Module, Outcome};

/// Returned by `subscribe`; unused beyond confirming a successful
/// registration, kept for parity with `spec.md` §4.5's `Subscribe(...) ->
/// token`.
pub struct SubscriptionToken {
    pub kind: Kind,
    pub stage: StageId,
}

pub struct SubFram {
    handlers: Mutex<HashMap<(Kind, StageId), Arc<dyn Module>>>,
}

impl SubFram {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `handler` as the sole subscriber for `(kind, stage)`.
    ///
    /// `spec.md` §4.5: "No fan-out at a single priority: each (kind,
    /// priority) has exactly one subscriber."
    pub async fn subscribe(
        &self,
        kind: Kind,
        stage: StageId,
        handler: Arc<dyn Module>,
    ) -> Result<SubscriptionToken> {
        let mut handlers = self.handlers.lock().await;

        if handlers.contains_key(&(kind, stage)) {
            return Err(format_err!(
                "Subscriber already registered for ({:?}, {:?})",
                kind,
                stage
            ));
        }

        handlers.insert((kind, stage), handler);
        Ok(SubscriptionToken { kind, stage })
    }

    /// Locates the handler registered for `(kind, stage)` and invokes it
    /// synchronously, from the pipeline's point of view (the call is an
    /// `async fn` only so it can await into async module code).
    ///
    /// Returns `None` if no module is registered for this slot — this is
    /// the state a deployment is in before a vendor driver is installed
    /// (`spec.md` §1's vendor-module Non-goal); the caller treats this the
    /// same as an unresolved dependency.
    pub async fn publish(
        &self,
        kind: Kind,
        stage: StageId,
        name: &str,
        version: u64,
        event_kind: EventKind,
    ) -> Option<Outcome> {
        let handler = self.handlers.lock().await.get(&(kind, stage)).cloned();

        match handler {
            Some(handler) => Some(handler.handle(kind, name, version, event_kind).await),
            None => None,
        }
    }
}

impl Default for SubFram {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts the absence of a subscriber into the taxonomy's terms: a stage
/// with nothing registered behind it can never report `Done`, so it reads as
/// a permanent configuration error rather than silently succeeding.
pub fn missing_subscriber_error(kind: Kind, stage: StageId) -> GatewayError {
    GatewayError::Internal(format!(
        "No module subscribed for ({:?}, {:?})",
        kind, stage
    ))
}
