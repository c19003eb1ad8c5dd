//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/observe events emitted by the registry, the invoker and rounds.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Registry`, `Invoker`, round coordinator, `Dispatcher::shutdown`.
//! - **Consumers**: the dispatcher's observer listener (fans out to `ObserverSet`)
//!   and any receiver obtained via `Dispatcher::subscribe_events`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
