//! Nonce generation.

use rand::RngExt;

/// Characters a nonce is drawn from.
const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Nonce length used for every signed request.
pub const NONCE_LENGTH: usize = 32;

/// Generate an alphanumeric nonce of exactly `length` characters.
///
/// Each character is drawn independently and uniformly from `[A-Za-z0-9]`
/// using the supplied random source, so tests can pass a seeded generator.
pub fn generate_nonce<R: RngExt + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}
