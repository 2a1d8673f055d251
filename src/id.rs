use uuid::Uuid;

pub const ID_LENGTH: usize = 8;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

// Bytes 6 and 8 of a v4 uuid carry the version and variant bits.
const RANDOM_BYTES: [usize; ID_LENGTH] = [0, 1, 2, 3, 4, 5, 7, 9];

/// Short URL-safe id for a new record. Uniqueness is probabilistic; callers
/// that care check against what they already hold.
pub fn generate_id() -> String {
    let uuid = Uuid::new_v4();
    let bytes = uuid.as_bytes();
    RANDOM_BYTES
        .iter()
        .map(|&i| ALPHABET[(bytes[i] & 0x3f) as usize] as char)
        .collect()
}
