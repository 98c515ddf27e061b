pub mod alphanumeric;
pub mod seq;

use petit_core::Alias;
use std::sync::Arc;

pub use alphanumeric::{AlphanumericGenerator, AlphanumericSettings, GeneratorError};
pub use seq::SeqGenerator;

/// Trait for generating candidate aliases.
///
/// Implementations are pure generators that don't interact with storage.
/// The sequence is infinite and may repeat itself: uniqueness is enforced by
/// the allocator that consumes it, never by the generator.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<Alias>;

    /// Produces the next candidate.
    fn generate(&self) -> Self::Output;
}

impl<G: Generator> Generator for Arc<G> {
    type Output = G::Output;

    fn generate(&self) -> Self::Output {
        (**self).generate()
    }
}
