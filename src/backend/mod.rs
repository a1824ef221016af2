//! Backend connection capability
//!
//! Driver internals are opaque. A backend is anything that can hand out
//! connections able to run a query asynchronously, report whether it is
//! still executing, and stream rows one at a time.

mod connection;
pub mod scripted;

pub use connection::{
    BackendConnection, BackendConnector, BackendError, BackendResult, ConnectionGuard, Row,
};
pub use scripted::{QueryScript, ScriptedBackend};
