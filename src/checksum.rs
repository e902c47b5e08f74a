//! Checksum utilities for source fingerprints

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA256 checksum of source text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Combined fingerprint of several texts, independent of their order
    pub fn bundle<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut parts: Vec<Checksum> = texts.into_iter().map(Self::from_str).collect();
        parts.sort_by(|a, b| a.0.cmp(&b.0));
        let mut hasher = Sha256::new();
        for part in &parts {
            hasher.update(part.0.as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that content matches this checksum
    pub fn verify(&self, content: &str) -> bool {
        Self::from_str(content) == *self
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let content = "module foo { namespace urn:foo; prefix f; }";
        assert_eq!(Checksum::from_str(content), Checksum::from_str(content));
        assert_ne!(Checksum::from_str(content), Checksum::from_str("module bar {}"));
    }

    #[test]
    fn test_checksum_verification() {
        let checksum = Checksum::from_str("abc");
        assert!(checksum.verify("abc"));
        assert!(!checksum.verify("abd"));
    }

    #[test]
    fn test_bundle_is_order_independent() {
        let a = Checksum::bundle(["one", "two"]);
        let b = Checksum::bundle(["two", "one"]);
        assert_eq!(a, b);
        assert_ne!(a, Checksum::bundle(["one"]));
    }
}
