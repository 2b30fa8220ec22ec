use crate::Generator;
use burrow_core::ShortCode;
use std::iter;

/// The 62 characters a generated code is drawn from.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of every generated code (62^6, roughly 5.7e10 possible codes).
pub const CODE_LENGTH: usize = 6;

/// Draws each character of a fixed-length code uniformly from [`ALPHABET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGenerator;

impl RandomGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let code: String =
            iter::repeat_with(|| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
                .take(CODE_LENGTH)
                .collect();
        ShortCode::new_unchecked(code)
    }
}
