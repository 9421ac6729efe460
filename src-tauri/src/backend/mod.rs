//! Backend worker domain.
//!
//! - **supervisor**: spawn, watch and terminate the worker process
//! - **probe**: poll the worker's HTTP server until it answers
//! - **client**: typed calls against the worker's `/api` routes

pub mod client;
pub mod probe;
pub mod supervisor;

pub use client::{BackendClient, BackendError, InitRequest};
pub use probe::{await_ready, ProbeError};
pub use supervisor::{BackendCommand, BackendHandle, BackendSupervisor, SupervisorError};
