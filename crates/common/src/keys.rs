//! Placeholder key material
//!
//! Peers carry a random 32-byte token in the slot where a WireGuard public
//! key would go. Nothing here is derived from a private key, so a stored
//! "public key" and a rendered "private key" never form a working pair.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;

/// Length in bytes of generated key material
pub const KEY_LEN: usize = 32;

/// Random key-shaped token, base64 encoded (44 characters)
pub fn placeholder_key() -> String {
    let mut bytes = [0u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Decode a stored token back to raw bytes, if it is well formed
pub fn decode_key(key: &str) -> Option<[u8; KEY_LEN]> {
    STANDARD.decode(key).ok()?.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_key_shape() {
        let key = placeholder_key();
        assert_eq!(key.len(), 44);
        assert!(decode_key(&key).is_some());
    }

    #[test]
    fn test_keys_are_not_repeated() {
        assert_ne!(placeholder_key(), placeholder_key());
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert!(decode_key("AAAA").is_none());
        assert!(decode_key("not base64!").is_none());
    }
}
