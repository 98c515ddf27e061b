//! Shared test fixtures: the provider conformance suite and disposable
//! containers for the network-backed backends.

pub mod conformance;
pub mod error;
pub mod mysql;
pub mod postgres;
pub mod redis_server;

pub use error::{Result, TestInfraError};
