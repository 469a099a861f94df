//! Utilities shared between the engine, the modes and the storage layer.

pub mod constants;
pub mod text;

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use constants::{ENCORE_ROOM_CODE_CHARSET, ENCORE_ROOM_CODE_LENGTH};

/// Pattern accepted for room and player names: 1-20 chars, no angle brackets.
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^<>]{1,20}$").expect("name pattern is a valid regex"));

/// Whether a room or player name is acceptable.
pub fn valid_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && NAME_PATTERN.is_match(name)
}

/// Generates a random join code for a room.
pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ENCORE_ROOM_CODE_LENGTH)
        .map(|_| {
            let index = rng.gen_range(0..ENCORE_ROOM_CODE_CHARSET.len());
            ENCORE_ROOM_CODE_CHARSET[index] as char
        })
        .collect()
}

/// Generates a master token: `enc_<32 hex chars>`.
pub fn generate_master_token() -> String {
    format!("enc_{:032x}", uuid::Uuid::new_v4().as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_code_has_expected_shape() {
        let mut rng = rand::thread_rng();
        let code = generate_room_code(&mut rng);
        assert_eq!(code.len(), ENCORE_ROOM_CODE_LENGTH);
        assert!(code
            .bytes()
            .all(|b| ENCORE_ROOM_CODE_CHARSET.contains(&b)));
    }

    #[test]
    fn master_token_is_prefixed_and_opaque() {
        let token = generate_master_token();
        assert!(token.starts_with("enc_"));
        assert_eq!(token.len(), 4 + 32);
        assert_ne!(token, generate_master_token());
    }

    #[test]
    fn names_reject_markup_and_bad_lengths() {
        assert!(valid_name("Ada"));
        assert!(valid_name("  Ada  "));
        assert!(valid_name(&"a".repeat(20)));
        assert!(!valid_name(""));
        assert!(!valid_name("   "));
        assert!(!valid_name(&"a".repeat(21)));
        assert!(!valid_name("<script>"));
        assert!(!valid_name("a>b"));
    }
}
