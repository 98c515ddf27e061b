//! Core types and traits for the petit URL shortener.
//!
//! This crate provides the storage provider contract shared by every
//! backend, the validated [`Alias`] type and the error taxonomy surfaced to
//! callers.

pub mod alias;
pub mod error;
pub mod provider;

pub use alias::Alias;
pub use error::{AliasError, InfraError, Result, StorageError};
pub use provider::{Delete, Provider, UrlRecord};
