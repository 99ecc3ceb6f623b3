//! # Application contract.
//!
//! This module provides the types the supervised unit implements:
//! - [`Application`] - trait the runner drives (`create`, `subscribe`, `start`, `stop`, `state`)
//! - [`AppState`] - the lifecycle states the runner branches on

mod contract;
mod state;

pub use contract::Application;
pub use state::AppState;
