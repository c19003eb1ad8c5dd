//! # Lifecycle observers.
//!
//! Observers consume the dispatcher's own lifecycle [`Event`](crate::Event)s
//! (not user events; those go to [`Subscriber`](crate::Subscriber)s).
//!
//! ```text
//! Registry / Invoker / Round ── publish(Event) ──► Bus ──► observer listener
//!                                                            │
//!                                                  ObserverSet::emit_arc()
//!                                              ┌─────────────┼─────────────┐
//!                                              ▼             ▼             ▼
//!                                          LogWriter      Metrics       Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod observe;
mod set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use observe::Observe;
pub use set::ObserverSet;
