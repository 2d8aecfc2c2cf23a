use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use arbor_crypto::hash::{hash_branch, Hash, SupportedDigest};

use super::node::Node;
use super::path::{Path, Side};
use super::{default_digest, height_for_size};

/// An error occurring when constructing a membership proof.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MembershipProofError {
    /// The requested leaf has not been appended yet.
    #[error("leaf index {index} is out of range for a tree of {size} entries")]
    IndexOutOfRange {
        /// The requested leaf index.
        index: usize,
        /// The number of real leaves in the tree.
        size: usize,
    },
}

/// A proof that a leaf is present under a root.
///
/// The proof carries the leaf index it was generated for and one sibling
/// digest per level, ordered leaf-to-root. The root itself is not carried;
/// the verifier supplies the root it expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct MembershipProof<D: SupportedDigest> {
    index: usize,
    hashes: Vec<Hash<D>>,
}

impl<D: SupportedDigest> PartialEq for MembershipProof<D> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.hashes == other.hashes
    }
}

impl<D: SupportedDigest> Eq for MembershipProof<D> {}

impl<D: SupportedDigest> MembershipProof<D> {
    pub(crate) fn new(index: usize, hashes: Vec<Hash<D>>) -> Self {
        Self { index, hashes }
    }

    /// The leaf index this proof refers to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The sibling digests, ordered leaf-to-root.
    pub fn hashes(&self) -> &[Hash<D>] {
        &self.hashes
    }

    /// The height of the tree this proof refers to.
    pub fn height(&self) -> u32 {
        self.hashes.len() as u32
    }

    /// Check that `leaf` is the digest of the `index`-th leaf of the tree
    /// with the given root.
    ///
    /// Starting from the leaf digest, each sibling is folded in with
    /// `hash_branch`, consuming the bits of `index` from least significant
    /// to most significant to pick the operand order. The proof is accepted
    /// iff the fold reproduces `root` and the proof was bound to `index`.
    #[must_use]
    pub fn verify(&self, root: &Hash<D>, index: usize, leaf: &Hash<D>) -> bool {
        if self.index != index {
            return false;
        }

        let height = self.hashes.len() as u32;
        if height > usize::BITS {
            return false;
        }
        if height < usize::BITS && index >> height != 0 {
            return false;
        }

        let mut current = leaf.clone();
        for (side, sibling) in Path::new(height, index).rev().zip(self.hashes.iter()) {
            current = match side {
                Side::Left => hash_branch(&current, sibling),
                Side::Right => hash_branch(sibling, &current),
            };
        }

        current == *root
    }
}

/// An error occurring when constructing an incremental proof.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IncrementalProofError {
    /// Tries to prove that a later version comes before an earlier one.
    #[error("tries to prove later version comes before earlier")]
    PointsOutOfOrder,
    /// The later version has not been reached yet.
    #[error("version index {index} is out of range for a tree of {size} entries")]
    IndexOutOfRange {
        /// The requested version index.
        index: usize,
        /// The number of real leaves in the tree.
        size: usize,
    },
}

/// One node of the pruned copy of the later tree carried by an
/// [`IncrementalProof`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub enum SkeletonNode<D: SupportedDigest> {
    /// A subtree the verifier need not descend into; its digest is taken at
    /// face value.
    Stub(Hash<D>),
    /// A node on a spine the verifier descends; its digest is omitted and
    /// recomputed from the children.
    Fork {
        /// The left child.
        left: Box<SkeletonNode<D>>,
        /// The right child.
        right: Box<SkeletonNode<D>>,
    },
}

impl<D: SupportedDigest> PartialEq for SkeletonNode<D> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SkeletonNode::Stub(a), SkeletonNode::Stub(b)) => a == b,
            (
                SkeletonNode::Fork { left: l1, right: r1 },
                SkeletonNode::Fork { left: l2, right: r2 },
            ) => l1 == l2 && r1 == r2,
            _ => false,
        }
    }
}

impl<D: SupportedDigest> Eq for SkeletonNode<D> {}

impl<D: SupportedDigest> SkeletonNode<D> {
    fn stub(digest: &Hash<D>) -> Self {
        SkeletonNode::Stub(digest.clone())
    }

    fn fork(left: SkeletonNode<D>, right: SkeletonNode<D>) -> Self {
        SkeletonNode::Fork {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// The digest this skeleton commits to: stubs supply their own, forks
    /// are rehashed bottom-up.
    fn recompute(&self) -> Hash<D> {
        match self {
            SkeletonNode::Stub(digest) => digest.clone(),
            SkeletonNode::Fork { left, right } => {
                hash_branch(&left.recompute(), &right.recompute())
            }
        }
    }
}

/// A proof that the tree at an earlier version is a prefix of the tree at a
/// later version.
///
/// The proof is a pruned copy of the later tree: every subtree the verifier
/// must not trust blindly is expanded into a [`SkeletonNode::Fork`], and
/// everything else collapses into a [`SkeletonNode::Stub`]. Both the later
/// root and the earlier root are recomputed from the same skeleton, so a
/// skeleton altered to fake either one breaks the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct IncrementalProof<D: SupportedDigest> {
    skeleton: SkeletonNode<D>,
}

impl<D: SupportedDigest> PartialEq for IncrementalProof<D> {
    fn eq(&self, other: &Self) -> bool {
        self.skeleton == other.skeleton
    }
}

impl<D: SupportedDigest> Eq for IncrementalProof<D> {}

impl<D: SupportedDigest> IncrementalProof<D> {
    pub(crate) fn generate(
        root: &Arc<Node<D>>,
        earlier: Path,
        later: Path,
    ) -> Result<Self, IncrementalProofError> {
        let skeleton = prune(root, earlier, later)?;
        Ok(IncrementalProof { skeleton })
    }

    /// The pruned copy of the later tree.
    pub fn skeleton(&self) -> &SkeletonNode<D> {
        &self.skeleton
    }

    /// Check that the tree which produced `earlier_root` after
    /// `earlier + 1` appends is a prefix of the tree which produced
    /// `later_root` after `later + 1` appends.
    #[must_use]
    pub fn verify(
        &self,
        earlier: usize,
        later: usize,
        earlier_root: &Hash<D>,
        later_root: &Hash<D>,
    ) -> bool {
        if earlier > later {
            return false;
        }

        // The whole skeleton must rehash to the later root; this pins every
        // stub digest the earlier walk below relies on.
        if self.skeleton.recompute() != *later_root {
            return false;
        }

        // The earlier tree was shorter: its root sits below the present
        // root under left-branches whose right siblings were all-default.
        let full_height = height_for_size(later + 1);
        let earlier_height = height_for_size(earlier + 1);
        let mut node = &self.skeleton;
        for _ in earlier_height..full_height {
            match node {
                SkeletonNode::Fork { left, .. } => node = left,
                SkeletonNode::Stub(_) => return false,
            }
        }

        match rewind(node, Path::new(earlier_height, earlier)) {
            Some(found) => found == *earlier_root,
            None => false,
        }
    }
}

/// Prune the later tree down to the spines of both paths.
///
/// While the two paths agree, the node not taken becomes a stub. Where they
/// split, each side continues along its own remaining path alone. Leaves
/// are copied as stubs.
fn prune<D: SupportedDigest>(
    node: &Node<D>,
    mut earlier: Path,
    mut later: Path,
) -> Result<SkeletonNode<D>, IncrementalProofError> {
    match (earlier.next(), later.next(), node) {
        (None, None, node) => Ok(SkeletonNode::stub(node.digest())),
        (Some(Side::Left), Some(Side::Left), Node::Inner { left, right, .. }) => Ok(
            SkeletonNode::fork(prune(left, earlier, later)?, SkeletonNode::stub(right.digest())),
        ),
        (Some(Side::Right), Some(Side::Right), Node::Inner { left, right, .. }) => Ok(
            SkeletonNode::fork(SkeletonNode::stub(left.digest()), prune(right, earlier, later)?),
        ),
        (Some(Side::Left), Some(Side::Right), Node::Inner { left, right, .. }) => Ok(
            SkeletonNode::fork(spine(left, earlier), spine(right, later)),
        ),
        (Some(Side::Right), Some(Side::Left), _) => Err(IncrementalProofError::PointsOutOfOrder),
        _ => unreachable!("path length always matches tree height"),
    }
}

/// Continue a single path down to its leaf, collapsing every off-path
/// sibling into a stub.
fn spine<D: SupportedDigest>(node: &Node<D>, mut path: Path) -> SkeletonNode<D> {
    match (path.next(), node) {
        (None, node) => SkeletonNode::stub(node.digest()),
        (Some(Side::Left), Node::Inner { left, right, .. }) => {
            SkeletonNode::fork(spine(left, path), SkeletonNode::stub(right.digest()))
        }
        (Some(Side::Right), Node::Inner { left, right, .. }) => {
            SkeletonNode::fork(SkeletonNode::stub(left.digest()), spine(right, path))
        }
        _ => unreachable!("path length always matches tree height"),
    }
}

/// Recompute the earlier root from the skeleton.
///
/// Descending along the earlier leaf's path, a right sibling held only
/// default leaves at the earlier version, so its digest is the deterministic
/// default for its depth; a left sibling was already full of real leaves and
/// its present digest is authoritative. At the end of the path the node
/// itself is unchanged since the earlier version.
fn rewind<D: SupportedDigest>(node: &SkeletonNode<D>, mut path: Path) -> Option<Hash<D>> {
    match (path.next(), node) {
        (None, node) => Some(node.recompute()),
        (Some(Side::Right), SkeletonNode::Fork { left, right }) => {
            let lhs = left.recompute();
            let rhs = rewind(right, path)?;
            Some(hash_branch(&lhs, &rhs))
        }
        (Some(Side::Left), SkeletonNode::Fork { left, .. }) => {
            let depth = path.len() as u32;
            let lhs = rewind(left, path)?;
            Some(hash_branch(&lhs, &default_digest::<D>(depth)))
        }
        (Some(_), SkeletonNode::Stub(_)) => None,
    }
}
