//! Alias allocation on top of a storage provider.
//!
//! [`ShortenerService`] reserves caller-supplied aliases or draws candidates
//! from a [`Generator`](petit_generator::Generator) until one is stored.

pub mod error;
pub mod service;

pub use error::ShortenerError;
pub use service::{ShortenParams, ShortenerService};
