//! Random identifiers handed out to clients.

use rand::Rng;

/// A 32-character hex string (128 bits of randomness).
///
/// Given to a player on join; presenting it later lets them rejoin a
/// password-protected room without the password.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}

/// A short 8-character hex room id, e.g. `"3fa9c01b"`.
///
/// Collisions are the caller's problem; the registry retries.
pub fn generate_room_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 4] = rng.random();
    hex::encode(bytes)
}
