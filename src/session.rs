//! Session records and the opaque token they are keyed by.

use base64::Engine;

pub type SessionToken = String;

/// One persisted session: the authenticated user id plus the encoded group
/// set captured at login. Immutable after creation; lifetime is delegated to
/// the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: String,
    /// Encoded group set, see `crate::groups`.
    pub groups: String,
}

/// Generate an unguessable session token: 256 random bits, base64url without
/// padding. Collision probability is negligible and outputs carry no state
/// from prior calls.
pub fn generate_token() -> SessionToken {
    let mut buf = [0u8; 32];
    // getrandom only fails when the OS entropy source is unavailable, which
    // is unrecoverable for a login path anyway.
    getrandom::getrandom(&mut buf).expect("OS random source unavailable");
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_url_safe_and_fixed_length() {
        let t = generate_token();
        // 32 bytes => 43 base64url chars, no padding
        assert_eq!(t.len(), 43);
        assert!(t.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn tokens_do_not_collide_across_many_draws() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generate_token()), "token collision");
        }
    }
}
