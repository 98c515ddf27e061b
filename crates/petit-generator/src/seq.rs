use crate::Generator;
use petit_core::Alias;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sequential aliases: the prefix followed by a zero-padded counter
/// (`pt000000`, `pt000001`, ...).
///
/// The counter lives in memory only, so a restarted process starts over at
/// zero and relies on the allocator to skip aliases already taken.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl SeqGenerator {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            counter: AtomicU64::new(0),
            prefix: prefix.into(),
        }
    }
}

impl Generator for SeqGenerator {
    type Output = Alias;

    fn generate(&self) -> Alias {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        Alias::new_unchecked(format!("{}{:06}", self.prefix, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_sequential_codes() {
        let generator = SeqGenerator::with_prefix("pt");

        assert_eq!(generator.generate().as_str(), "pt000000");
        assert_eq!(generator.generate().as_str(), "pt000001");
        assert_eq!(generator.generate().as_str(), "pt000002");
    }

    #[test]
    fn counter_widens_past_padding() {
        let generator = SeqGenerator {
            counter: AtomicU64::new(999_999),
            prefix: "pt".to_string(),
        };

        assert_eq!(generator.generate().as_str(), "pt999999");
        assert_eq!(generator.generate().as_str(), "pt1000000");
    }

    #[test]
    fn generated_aliases_pass_validation() {
        let generator = SeqGenerator::with_prefix("node-a");
        let generated = generator.generate();
        assert_eq!(Alias::new(generated.as_str()).unwrap(), generated);
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SeqGenerator>();
    }
}
