//! Append-only Merkle tree with membership and incremental proofs.
//!
//! A [`Tree`] is a full binary hash tree padded to a power-of-two number of
//! leaves. The first `size` leaves hold the digests of the appended data
//! blocks; every remaining slot holds the digest of the empty byte-string.
//! All leaves sit at depth `height`.
//!
//! ```text
//! height 2, size 3:
//!
//!           o
//!          / \
//!         o   o
//!        /|   |\
//!       a b   c .     ("." is the default leaf)
//! ```
//!
//! Appending writes the next default slot and rebuilds the O(log n) spine
//! above it; when every slot is real the tree is first grown by hanging the
//! old root and an all-default sibling under a new root. Because nodes are
//! immutable and shared, every version of the tree remains cheap to keep.
//!
//! The hashing discipline is domain-separated: leaves are hashed as
//! `H(0x00 || data)` and branches as `H(0x01 || left || right)`, so no
//! branch preimage can collide with a leaf preimage. See
//! [`hash_leaf`] and [`hash_branch`].

mod node;
mod path;
/// Logic for constructing and validating proofs
mod proof;

use std::sync::Arc;

use thiserror::Error;

use arbor_crypto::hash::{Hash, SupportedDigest};
use arbor_crypto::VisitBytes;

pub use arbor_crypto::hash::{hash_branch, hash_empty, hash_leaf};
pub use proof::{
    IncrementalProof, IncrementalProofError, MembershipProof, MembershipProofError, SkeletonNode,
};

use node::Node;
use path::{Path, Side};

/// The digest of a subtree of the given depth containing only empty-string
/// leaves.
///
/// `default_digest(0)` is the default-leaf digest `hash_leaf("")`; each
/// further level is `hash_branch` of two copies of the level below. The
/// ladder is precomputed once per digest algorithm.
pub fn default_digest<D: SupportedDigest>(depth: u32) -> Hash<D> {
    D::empty_tree_hash(depth as usize).clone()
}

/// The height of the tree that holds `size` real leaves: `⌈log₂ size⌉`,
/// except that the empty tree has height 1 (two default leaves).
pub fn height_for_size(size: usize) -> u32 {
    match size {
        0 => 1,
        n => n.next_power_of_two().trailing_zeros(),
    }
}

/// An error occurring when appending to a tree.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendError {
    /// The destination slot already holds a real entry. Appends only ever
    /// target default slots, so this signals a corrupted tree value.
    #[error("leaf slot {index} already holds a real entry")]
    SlotOccupied {
        /// The leaf index that was about to be overwritten.
        index: usize,
    },
}

/// An append-only Merkle tree over a sequence of data blocks.
///
/// A `Tree` is a value: [`Tree::add`] returns a new version sharing all
/// unchanged subtrees with its predecessor, and any version can keep
/// serving reads and proofs. Cloning is O(1).
pub struct Tree<D: SupportedDigest> {
    root: Arc<Node<D>>,
    height: u32,
    size: usize,
}

impl<D: SupportedDigest> Clone for Tree<D> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            height: self.height,
            size: self.size,
        }
    }
}

impl<D: SupportedDigest> Default for Tree<D> {
    fn default() -> Self {
        Tree {
            root: Node::default_subtree(1),
            height: 1,
            size: 0,
        }
    }
}

impl<D: SupportedDigest> Eq for Tree<D> {}
impl<D: SupportedDigest> PartialEq for Tree<D> {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size
            && self.height == other.height
            && self.root.digest() == other.root.digest()
    }
}

impl<D: SupportedDigest> std::fmt::Debug for Tree<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("root", self.root.digest())
            .field("height", &self.height)
            .field("size", &self.size)
            .finish()
    }
}

impl<D: SupportedDigest> Tree<D> {
    /// Build a tree over the given blocks, padding to the next power of two
    /// with default leaves.
    pub fn new<V: VisitBytes>(blocks: &[V]) -> Self {
        let size = blocks.len();
        let height = height_for_size(size);
        let root = Self::build(blocks, height);

        Tree { root, height, size }
    }

    fn build<V: VisitBytes>(blocks: &[V], depth: u32) -> Arc<Node<D>> {
        if blocks.is_empty() {
            return Node::default_subtree(depth);
        }

        if depth == 0 {
            return Arc::new(Node::leaf(&blocks[0]));
        }

        let half = 1usize << (depth - 1);
        if blocks.len() <= half {
            let left = Self::build(blocks, depth - 1);
            let right = Node::default_subtree(depth - 1);
            Arc::new(Node::inner(left, right))
        } else {
            let (lhs, rhs) = blocks.split_at(half);
            let left = Self::build(lhs, depth - 1);
            let right = Self::build(rhs, depth - 1);
            Arc::new(Node::inner(left, right))
        }
    }

    /// The number of real leaves appended so far.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The depth from the root to every leaf.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether any real leaves have been appended.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The root digest, committing to the entire history.
    pub fn root(&self) -> Hash<D> {
        self.root.digest().clone()
    }

    /// Append one block as the next leaf, returning the new tree version.
    ///
    /// If every slot already holds a real entry the tree first grows: the
    /// old root and an all-default sibling are hung under a new root and
    /// the height increases by one.
    pub fn add(&self, block: impl VisitBytes) -> Result<Self, AppendError> {
        if self.size == 1usize << self.height {
            let sibling = Node::default_subtree(self.height);
            let root = Arc::new(Node::inner(self.root.clone(), sibling));
            let grown = Tree {
                root,
                height: self.height + 1,
                size: self.size,
            };
            return grown.add(block);
        }

        let digest = hash_leaf(block);
        let path = Path::new(self.height, self.size);
        let root = Self::set_leaf(&self.root, path, self.size, digest)?;

        Ok(Tree {
            root,
            height: self.height,
            size: self.size + 1,
        })
    }

    fn set_leaf(
        node: &Arc<Node<D>>,
        mut path: Path,
        index: usize,
        digest: Hash<D>,
    ) -> Result<Arc<Node<D>>, AppendError> {
        match (path.next(), node.as_ref()) {
            (None, Node::Leaf { digest: occupant }) => {
                if *occupant != hash_empty::<D>() {
                    return Err(AppendError::SlotOccupied { index });
                }

                Ok(Arc::new(Node::Leaf { digest }))
            }
            (Some(Side::Left), Node::Inner { left, right, .. }) => {
                let left = Self::set_leaf(left, path, index, digest)?;
                Ok(Arc::new(Node::inner(left, right.clone())))
            }
            (Some(Side::Right), Node::Inner { left, right, .. }) => {
                let right = Self::set_leaf(right, path, index, digest)?;
                Ok(Arc::new(Node::inner(left.clone(), right)))
            }
            _ => unreachable!("path length always matches tree height"),
        }
    }

    /// Construct a proof that the `index`-th leaf is present under the
    /// current root.
    pub fn prove_membership(
        &self,
        index: usize,
    ) -> Result<MembershipProof<D>, MembershipProofError> {
        if index >= self.size {
            return Err(MembershipProofError::IndexOutOfRange {
                index,
                size: self.size,
            });
        }

        let mut hashes = Vec::with_capacity(self.height as usize);
        let mut node = self.root.as_ref();

        for side in Path::new(self.height, index) {
            match (side, node) {
                (Side::Left, Node::Inner { left, right, .. }) => {
                    hashes.push(right.digest().clone());
                    node = left.as_ref();
                }
                (Side::Right, Node::Inner { left, right, .. }) => {
                    hashes.push(left.digest().clone());
                    node = right.as_ref();
                }
                _ => unreachable!("path length always matches tree height"),
            }
        }

        // Proofs order siblings leaf-to-root.
        hashes.reverse();

        Ok(MembershipProof::new(index, hashes))
    }

    /// Construct a proof that the tree holding leaves `0..=earlier` is a
    /// prefix of the tree holding leaves `0..=later`.
    pub fn prove_incremental(
        &self,
        earlier: usize,
        later: usize,
    ) -> Result<IncrementalProof<D>, IncrementalProofError> {
        if earlier > later {
            return Err(IncrementalProofError::PointsOutOfOrder);
        }

        if later >= self.size {
            return Err(IncrementalProofError::IndexOutOfRange {
                index: later,
                size: self.size,
            });
        }

        IncrementalProof::generate(
            &self.root,
            Path::new(self.height, earlier),
            Path::new(self.height, later),
        )
    }
}
