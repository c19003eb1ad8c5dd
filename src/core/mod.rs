//! Runtime core: registry, admission and notification rounds.
//!
//! The public entry point is [`Dispatcher`]; the remaining types are exposed
//! for callers that want to compose their own fan-out.
//!
//! Internal modules:
//! - [`registry`]: concurrent subscriber table with unique, never-reused ids;
//! - [`limiter`]: cancellable counting semaphore bounding in-flight calls;
//! - [`invoker`]: one isolated subscriber call (timeout, panic containment);
//! - [`round`]: fan-out of one event over a snapshot and aggregation;
//! - [`dispatcher`]: owns the pieces above and exposes `notify`;
//! - [`builder`]: wires observers to the event bus.

mod builder;
mod dispatcher;
mod invoker;
mod limiter;
mod outcome;
mod registry;
mod round;

pub use builder::DispatcherBuilder;
pub use dispatcher::{Dispatcher, RoundHandle};
pub use invoker::Invoker;
pub use limiter::{Limiter, Permit};
pub use outcome::{AggregateResult, CancelReason, Outcome};
pub use registry::Registry;

pub(crate) use invoker::panic_message;
