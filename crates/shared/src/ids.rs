//! Record key generation.
//!
//! Primary keys are generated client-side as 26-character Crockford base32
//! strings over a UUIDv7. The v7 layout puts a 48-bit millisecond timestamp
//! in the most significant bits, so keys sort lexicographically by creation
//! time while staying globally unique.

use uuid::Uuid;

/// Crockford base32 alphabet (no I, L, O, U).
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Length of a generated key.
pub const KEY_LEN: usize = 26;

/// Generate a new sortable record key.
#[must_use]
pub fn new_key() -> String {
    encode(Uuid::now_v7().as_u128())
}

/// Encode 128 bits as 26 Crockford base32 characters, most significant first.
///
/// 26 characters carry 130 bits; the top two bits are always zero.
fn encode(value: u128) -> String {
    let mut out = [0u8; KEY_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        let shift = 5 * (KEY_LEN - 1 - i);
        *slot = ALPHABET[((value >> shift) & 0x1F) as usize];
    }
    String::from_utf8(out.to_vec()).unwrap_or_default()
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Encoding preserves integer ordering, which is what makes the
        // timestamp prefix of UUIDv7 sort correctly as a string.
        #[test]
        fn prop_encoding_is_order_preserving(a in any::<u128>(), b in any::<u128>()) {
            let (ea, eb) = (encode(a), encode(b));
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }

        // Every character comes from the Crockford alphabet.
        #[test]
        fn prop_alphabet_closed(v in any::<u128>()) {
            for c in encode(v).bytes() {
                prop_assert!(ALPHABET.contains(&c));
            }
        }
    }
}
