pub mod random;
pub mod seq;

pub use random::{generate_token, RandomGenerator, ALPHABET, DEFAULT_TOKEN_LENGTH};
pub use seq::SeqGenerator;

use shorturl_core::ShortToken;

/// Trait for generating short tokens.
///
/// Implementations are pure generators that don't interact with storage,
/// so nothing here checks whether a token is already taken.
pub trait Generator: Send + Sync + 'static {
    /// Generates a candidate short token.
    fn generate(&self) -> ShortToken;
}

impl<G: Generator + ?Sized> Generator for std::sync::Arc<G> {
    fn generate(&self) -> ShortToken {
        (**self).generate()
    }
}
