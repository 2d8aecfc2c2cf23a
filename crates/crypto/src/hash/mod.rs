//! Strongly-typed digests and the domain-separated hashing discipline used
//! by the arbor tree structures.

use anyhow::Error;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

mod r#static;

pub use digest::{Digest, Output};
pub use r#static::{Hash, HashParseError, IncorrectLengthError};
pub use sha2::Sha256;

use crate::VisitBytes;

/// The hash algorithms supported by this crate.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum HashAlgorithm {
    /// SHA-256, the only supported algorithm.
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(HashAlgorithm::Sha256),
            _ => Err(Error::msg(format!("Illegal hash algorithm '{}'", s))),
        }
    }
}

static EMPTY_TREE_HASH: Lazy<Vec<Hash<Sha256>>> = Lazy::new(|| {
    let mut v: Vec<Hash<Sha256>> = Vec::with_capacity(65);
    fn empty_tree_hash<D: SupportedDigest>(v: &mut Vec<Hash<D>>, depth: u32) -> Hash<D> {
        let hash: Hash<D> = if depth == 0 {
            hash_empty()
        } else {
            let last_hash = empty_tree_hash(v, depth - 1);
            hash_branch(&last_hash, &last_hash)
        };
        v.push(hash.clone());
        hash
    }
    empty_tree_hash(&mut v, 64);
    v
});

/// Compute the hash of a leaf holding the empty byte-string.
///
/// Every unfilled slot of a tree holds this digest.
pub fn hash_empty<D: SupportedDigest>() -> Hash<D> {
    hash_leaf(())
}

/// Compute the hash for a leaf: `H(0x00 || data)`.
///
/// The `0x00` salt keeps leaf preimages disjoint from branch preimages.
pub fn hash_leaf<D, V>(value: V) -> Hash<D>
where
    D: SupportedDigest,
    V: VisitBytes,
{
    Hash::of(&(0u8, value))
}

/// Compute the hash for a branch: `H(0x01 || lhs || rhs)`.
pub fn hash_branch<D>(lhs: &Hash<D>, rhs: &Hash<D>) -> Hash<D>
where
    D: SupportedDigest,
{
    Hash::of((1u8, lhs, rhs))
}

/// A digest algorithm usable with the arbor tree structures.
///
/// Sealed; implemented only for [`Sha256`].
pub trait SupportedDigest: Digest + private::Sealed + Sized + 'static {
    /// The algorithm tag for this digest.
    const ALGORITHM: HashAlgorithm;

    /// The digest of a subtree of the given depth containing only
    /// empty-string leaves. Precomputed up to depth 64.
    fn empty_tree_hash(depth: usize) -> &'static Hash<Self>;
}

impl SupportedDigest for Sha256 {
    const ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;
    fn empty_tree_hash(depth: usize) -> &'static Hash<Sha256> {
        &EMPTY_TREE_HASH[depth]
    }
}

mod private {
    use sha2::Sha256;

    pub trait Sealed {}
    impl Sealed for Sha256 {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_algorithm_name_roundtrip() {
        let algo: HashAlgorithm = "sha256".parse().unwrap();
        assert_eq!(algo, HashAlgorithm::Sha256);
        assert_eq!(algo.to_string(), "sha256");
        assert!("sha513".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_domain_separation() {
        // A leaf of 32 zero bytes must never collide with a branch of two
        // all-zero digests, nor with the empty leaf.
        let zeros: Hash<Sha256> = Hash::try_from(vec![0u8; 32]).unwrap();
        let leaf: Hash<Sha256> = hash_leaf([0u8; 32]);
        let branch: Hash<Sha256> = hash_branch(&zeros, &zeros);
        assert_ne!(leaf, branch);
        assert_ne!(leaf, hash_empty::<Sha256>());
        assert_ne!(branch, hash_empty::<Sha256>());
    }

    #[test]
    fn test_empty_tree_hash_ladder() {
        assert_eq!(*Sha256::empty_tree_hash(0), hash_empty::<Sha256>());
        for depth in 1..=64 {
            let below = Sha256::empty_tree_hash(depth - 1);
            assert_eq!(*Sha256::empty_tree_hash(depth), hash_branch(below, below));
        }
    }
}
