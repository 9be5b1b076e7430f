//! Password hashing for protected rooms.
//!
//! Rooms never keep a plaintext password. The registry hashes the password
//! once at creation and checks join attempts against the stored digest.
//!
//! The hashing scheme is a trait so deployments can swap in something
//! slower (argon2, bcrypt) without touching room code.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Hashes and verifies room passwords.
///
/// # Example
///
/// ```rust
/// use inkround_session::{Credentials, Sha256Credentials};
///
/// let creds = Sha256Credentials;
/// let stored = creds.hash("hunter2");
/// assert!(creds.verify("hunter2", &stored));
/// assert!(!creds.verify("hunter3", &stored));
/// ```
pub trait Credentials: Send + Sync + 'static {
    /// Produces the stored form of `password`.
    fn hash(&self, password: &str) -> String;

    /// Checks `password` against a value produced by [`hash`](Self::hash).
    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// Salted SHA-256, stored as `"<salt hex>$<digest hex>"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Credentials;

impl Sha256Credentials {
    fn digest(salt: &[u8], password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl Credentials for Sha256Credentials {
    fn hash(&self, password: &str) -> String {
        let salt: [u8; 8] = rand::rng().random();
        format!("{}${}", hex::encode(salt), Self::digest(&salt, password))
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        let Some((salt_hex, digest)) = stored.split_once('$') else {
            return false;
        };
        let Ok(salt) = hex::decode(salt_hex) else {
            return false;
        };
        Self::digest(&salt, password) == digest
    }
}
