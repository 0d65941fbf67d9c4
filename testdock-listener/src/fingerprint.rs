// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stable test fingerprints.
//!
//! A fingerprint is the SHA-256 digest of a test's identity, hex-encoded. It joins a test's start
//! and completion events within a run, and joins local results with history published by earlier
//! runs, so the encoding here must never change.
//!
//! When a test declares an explicit key, the key alone determines the fingerprint. Renaming or
//! moving such a test keeps its history attached.

use sha2::{Digest, Sha256};
use testdock_metadata::{Fingerprint, TestIdentity};

const STRUCTURAL_TAG: &[u8] = b"identity";
const KEY_TAG: &[u8] = b"key";

/// Computes the fingerprint for a test.
///
/// If `key` is present and non-empty it is used instead of the structural identity.
pub fn fingerprint(identity: &TestIdentity, key: Option<&str>) -> Fingerprint {
    let mut hasher = Sha256::new();
    match key.filter(|key| !key.is_empty()) {
        Some(key) => {
            update_component(&mut hasher, KEY_TAG);
            update_component(&mut hasher, key.as_bytes());
        }
        None => {
            update_component(&mut hasher, STRUCTURAL_TAG);
            update_component(&mut hasher, identity.namespace.as_bytes());
            update_component(&mut hasher, identity.type_name.as_bytes());
            update_component(&mut hasher, identity.method_name.as_bytes());
        }
    }
    Fingerprint::new(hex::encode(hasher.finalize()))
}

// Length-prefixing keeps ("ab", "c") and ("a", "bc") apart.
fn update_component(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    fn identity(method: &str) -> TestIdentity {
        TestIdentity::new("calc", "calc::tests::CalculatorTest", method)
    }

    #[test]
    fn known_value() {
        // Pinned: fingerprints are compared against previously published history.
        let fp = fingerprint(&identity("adds"), None);
        assert_eq!(
            fp.as_str(),
            "c3710cf32318eea367c00f30a0a52489920f870bd0a5ff9fb391442d43166d29"
        );
        assert_eq!(fp, fingerprint(&identity("adds"), Some("")), "empty key ignored");

        let keyed = fingerprint(&identity("adds"), Some("calc-001"));
        assert_eq!(
            keyed.as_str(),
            "f70ced002b2deec272b9064de19576ca9f894c996e8bbd69580dfd3c3ed74c2c"
        );
    }

    #[test]
    fn method_rename_changes_fingerprint() {
        assert_ne!(
            fingerprint(&identity("adds"), None),
            fingerprint(&identity("adds_numbers"), None),
        );
    }

    #[test]
    fn key_determines_fingerprint() {
        let before = fingerprint(&identity("adds"), Some("calc-001"));
        let after = fingerprint(&identity("adds_numbers"), Some("calc-001"));
        let moved = fingerprint(
            &TestIdentity::new("other", "other::Moved", "renamed"),
            Some("calc-001"),
        );
        assert_eq!(before, after, "renaming a keyed test keeps its fingerprint");
        assert_eq!(before, moved, "moving a keyed test keeps its fingerprint");
        assert_ne!(before, fingerprint(&identity("adds"), Some("calc-002")));
        assert_ne!(before, fingerprint(&identity("adds"), None));
    }

    #[test]
    fn components_do_not_run_together() {
        assert_ne!(
            fingerprint(&TestIdentity::new("ab", "c", "d"), None),
            fingerprint(&TestIdentity::new("a", "bc", "d"), None),
        );
    }

    #[proptest(cases = 64)]
    fn deterministic(namespace: String, type_name: String, method_name: String) {
        let identity = TestIdentity::new(namespace, type_name, method_name);
        assert_eq!(fingerprint(&identity, None), fingerprint(&identity.clone(), None));
    }

    #[proptest(cases = 64)]
    fn key_ignores_identity(key: String, a: String, b: String) {
        proptest::prop_assume!(!key.is_empty());
        assert_eq!(
            fingerprint(&TestIdentity::new("ns", "T", a), Some(&key)),
            fingerprint(&TestIdentity::new("ns", "T", b), Some(&key)),
        );
    }
}
