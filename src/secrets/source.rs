//! Randomness behind generated credentials

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::fmt;

/// Characters a generated password may contain.
pub const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";

/// Source of secret material. Injected into a run so tests can pin values.
pub trait SecretSource: Send + fmt::Debug {
    /// Random password drawn from [`PASSWORD_ALPHABET`].
    fn password(&mut self, length: usize) -> String;

    /// `bytes` random bytes, hex encoded.
    fn hex_key(&mut self, bytes: usize) -> String;

    /// Alphanumeric token, safe for URLs and shell variables.
    fn token(&mut self, length: usize) -> String;
}

/// [`SecretSource`] backed by a `StdRng`.
#[derive(Debug)]
pub struct RngSecretSource {
    rng: StdRng,
}

impl RngSecretSource {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic source; the same seed yields the same secrets.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RngSecretSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl SecretSource for RngSecretSource {
    fn password(&mut self, length: usize) -> String {
        (0..length)
            .map(|_| PASSWORD_ALPHABET[self.rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
            .collect()
    }

    fn hex_key(&mut self, bytes: usize) -> String {
        let mut buf = vec![0u8; bytes];
        self.rng.fill_bytes(&mut buf);
        hex::encode(buf)
    }

    fn token(&mut self, length: usize) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }
}
