pub mod random;

pub use random::RandomGenerator;

use burrow_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// Uniqueness is not guaranteed; a taken code is reported by the storage
/// backend at write time.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;

    fn generate(&self) -> Self::Output;
}
