//! bcrypt password hashing. Plaintext never leaves these functions.

/// Prefix written by older PHP-era hashes; identical algorithm to `$2b$`.
const LEGACY_PREFIX: &str = "$2y$";
const CURRENT_PREFIX: &str = "$2b$";

/// Salted hash at `cost`. Two calls with the same input give different hashes.
pub fn hash_password(plaintext: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plaintext, cost)
}

/// Fails closed: empty input, malformed hash and mismatch all give `false`.
pub fn verify_password(hash: &str, plaintext: &str) -> bool {
    if plaintext.is_empty() || hash.is_empty() {
        return false;
    }
    let hash = normalize_hash(hash);
    match bcrypt::verify(plaintext, &hash) {
        Ok(ok) => ok,
        Err(e) => {
            tracing::debug!(error = %e, "password hash could not be verified");
            false
        }
    }
}

fn normalize_hash(hash: &str) -> String {
    match hash.strip_prefix(LEGACY_PREFIX) {
        Some(rest) => format!("{}{}", CURRENT_PREFIX, rest),
        None => hash.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COST: u32 = 4;

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("apple", COST).unwrap();
        let b = hash_password("apple", COST).unwrap();
        assert_ne!(a, b);
        assert!(verify_password(&a, "apple"));
        assert!(verify_password(&b, "apple"));
    }

    #[test]
    fn test_wrong_password() {
        let h = hash_password("apple", COST).unwrap();
        assert!(!verify_password(&h, "cherry"));
    }

    #[test]
    fn test_empty_password_never_verifies() {
        let h = hash_password("apple", COST).unwrap();
        assert!(!verify_password(&h, ""));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn test_legacy_prefix_is_accepted() {
        let h = hash_password("apple", COST).unwrap();
        let legacy = format!("{}{}", LEGACY_PREFIX, &h[CURRENT_PREFIX.len()..]);
        assert!(legacy.starts_with("$2y$"));
        assert!(verify_password(&legacy, "apple"));
        assert!(!verify_password(&legacy, "pear"));
    }

    #[test]
    fn test_malformed_hash_fails_closed() {
        assert!(!verify_password("not-a-hash", "apple"));
    }
}
