//! Random identifiers for sessions and clients.

use rand::Rng;

/// Generates a random 32-character hex string (128 bits of entropy).
///
/// Used for both session IDs and client IDs. At 128 bits, a collision is
/// not something the callers need to plan for, but they still check.
pub(crate) fn generate_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
