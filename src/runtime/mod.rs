//! # Runtime Module
//!
//! Runtime components for the Cluster Version Controller: initialization,
//! watch loop, watch error policy and the metrics/probe server.

pub mod error_policy;
pub mod initialization;
pub mod server;
pub mod watch_loop;

pub use error_policy::*;
pub use initialization::*;
pub use server::*;
pub use watch_loop::*;
