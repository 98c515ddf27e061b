//! Read-through target cache used by the per-key object store backend.

pub mod moka;

pub use moka::MokaTargetCache;
