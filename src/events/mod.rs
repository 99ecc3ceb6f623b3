//! Application events.
//!
//! [`AppEvent`] is what a supervised application emits through its
//! [`ListenerSet`](crate::ListenerSet). The runner forwards every event into its
//! run loop; see `core/mod.rs` for the wiring.

mod event;

pub use event::AppEvent;
