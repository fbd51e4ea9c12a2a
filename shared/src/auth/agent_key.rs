//! # Agent-Key Fingerprinting
//!
//! Agents authenticate with a long-lived API key of the form
//! `agt_<64 lowercase hex characters>`, carried in the `Agent-Key` header.
//! The server never stores the key itself, only its SHA-256 fingerprint,
//! and compares fingerprints in constant time to avoid timing side channels
//! on the stored digest.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const AGENT_KEY_PREFIX: &str = "agt_";
const AGENT_KEY_HEX_LEN: usize = 64;

/// Returns `true` if `candidate` has the shape `agt_<64 lowercase hex>`.
pub fn is_well_formed(candidate: &str) -> bool {
    match candidate.strip_prefix(AGENT_KEY_PREFIX) {
        Some(hex) => {
            hex.len() == AGENT_KEY_HEX_LEN
                && hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        }
        None => false,
    }
}

/// Computes the SHA-256 hex digest of an agent key, as stored in
/// `agent.keyFingerprint`.
pub fn fingerprint(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compares a computed fingerprint against a stored one in constant time.
pub fn fingerprints_match(computed: &str, stored: &str) -> bool {
    if computed.len() != stored.len() {
        return false;
    }
    computed.as_bytes().ct_eq(stored.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key() -> String {
        format!("agt_{}", "a".repeat(64))
    }

    #[test]
    fn test_is_well_formed_accepts_valid_key() {
        assert!(is_well_formed(&sample_key()));
    }

    #[test]
    fn test_is_well_formed_rejects_wrong_length() {
        assert!(!is_well_formed("agt_abc"));
    }

    #[test]
    fn test_is_well_formed_rejects_missing_prefix() {
        let hex = "a".repeat(64);
        assert!(!is_well_formed(&hex));
    }

    #[test]
    fn test_is_well_formed_rejects_uppercase() {
        let key = format!("agt_{}", "A".repeat(64));
        assert!(!is_well_formed(&key));
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let key = sample_key();
        assert_eq!(fingerprint(&key), fingerprint(&key));
    }

    #[test]
    fn test_fingerprint_differs_for_different_keys() {
        let a = format!("agt_{}", "a".repeat(64));
        let b = format!("agt_{}", "b".repeat(64));
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprints_match_identical() {
        let fp = fingerprint(&sample_key());
        assert!(fingerprints_match(&fp, &fp));
    }

    #[test]
    fn test_fingerprints_match_rejects_mismatch() {
        let a = fingerprint(&format!("agt_{}", "a".repeat(64)));
        let b = fingerprint(&format!("agt_{}", "b".repeat(64)));
        assert!(!fingerprints_match(&a, &b));
    }

}
