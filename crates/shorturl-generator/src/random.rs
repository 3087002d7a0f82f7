use crate::Generator;
use rand::Rng;
use shorturl_core::ShortToken;

/// Symbols a token is drawn from: `a-z`, `A-Z` and `0-9`.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Token length used by the engine unless configured otherwise.
pub const DEFAULT_TOKEN_LENGTH: usize = 10;

/// Returns a string of exactly `length` characters, each drawn uniformly
/// and independently from [`ALPHABET`].
///
/// The thread-local RNG is not cryptographically secure and collisions are
/// not checked. A `length` of zero yields an empty string.
pub fn generate_token(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// A generator producing fixed-length random alphanumeric tokens.
#[derive(Debug, Clone, Copy)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    pub fn with_length(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::with_length(DEFAULT_TOKEN_LENGTH)
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> ShortToken {
        ShortToken::new(generate_token(self.length))
    }
}
