use rand::Rng;

/// Generate a new opaque document identifier: 12 random bytes, hex encoded.
pub fn generate() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 12] = rng.random();
    hex::encode(bytes)
}

/// Check that an identifier looks like one we generated (24 hex chars).
/// Malformed identifiers are rejected at the boundary before any query runs.
pub fn is_valid(id: &str) -> bool {
    id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit())
}
