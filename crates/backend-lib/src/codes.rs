// ============================
// crates/backend-lib/src/codes.rs
// ============================
//! Join-code generation.

use rand::Rng;

/// Alphabet without lookalike characters (no I/L/O/0/1).
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

pub const CODE_LEN: usize = 6;

/// Generate a random party join code. Uniqueness is the caller's job;
/// the store is consulted and the code regenerated on collision.
pub fn generate_party_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_has_expected_length_and_alphabet() {
        for _ in 0..100 {
            let code = generate_party_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| CODE_CHARS.contains(&b)));
        }
    }

    #[test]
    fn codes_are_not_all_identical() {
        let first = generate_party_code();
        let distinct = (0..50).any(|_| generate_party_code() != first);
        assert!(distinct);
    }
}
