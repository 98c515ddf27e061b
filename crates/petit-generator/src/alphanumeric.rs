use crate::Generator;
use petit_core::Alias;
use thiserror::Error;
use typed_builder::TypedBuilder;

const ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUM: &[u8] = b"0123456789";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("alias length must be at least 1")]
    ZeroLength,
    #[error("at least one of letters or digits must be enabled")]
    EmptyAlphabet,
}

/// Settings for [`AlphanumericGenerator`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct AlphanumericSettings {
    #[builder(default = 5)]
    length: usize,
    #[builder(default = true)]
    alpha: bool,
    #[builder(default = true)]
    num: bool,
}

/// Generates random aliases of a fixed length from letters, digits, or both.
#[derive(Debug, Clone)]
pub struct AlphanumericGenerator {
    alphabet: Vec<u8>,
    length: usize,
}

impl AlphanumericGenerator {
    pub fn new(settings: AlphanumericSettings) -> Result<Self, GeneratorError> {
        if settings.length == 0 {
            return Err(GeneratorError::ZeroLength);
        }

        let mut alphabet = Vec::with_capacity(ALPHA.len() + NUM.len());
        if settings.alpha {
            alphabet.extend_from_slice(ALPHA);
        }
        if settings.num {
            alphabet.extend_from_slice(NUM);
        }
        if alphabet.is_empty() {
            return Err(GeneratorError::EmptyAlphabet);
        }

        Ok(Self {
            alphabet,
            length: settings.length,
        })
    }
}

impl Generator for AlphanumericGenerator {
    type Output = Alias;

    fn generate(&self) -> Alias {
        let code: String = (0..self.length)
            .map(|_| self.alphabet[rand::random_range(0..self.alphabet.len())] as char)
            .collect();
        Alias::new_unchecked(code)
    }
}
