use std::sync::Arc;

use arbor_crypto::hash::{hash_branch, hash_empty, hash_leaf, Hash, SupportedDigest};
use arbor_crypto::VisitBytes;

/// A persistent binary-tree node. Immutable once constructed; unchanged
/// subtrees are shared between tree versions through their `Arc` links.
#[derive(Debug)]
pub enum Node<D: SupportedDigest> {
    /// A leaf carrying the digest of one data block.
    Leaf { digest: Hash<D> },
    /// A branch whose digest commits to both children.
    Inner {
        digest: Hash<D>,
        left: Arc<Node<D>>,
        right: Arc<Node<D>>,
    },
}

impl<D: SupportedDigest> Node<D> {
    /// A leaf for the given data block.
    pub fn leaf(value: impl VisitBytes) -> Self {
        Node::Leaf {
            digest: hash_leaf(value),
        }
    }

    /// A branch over two children, caching `hash_branch` of their digests.
    pub fn inner(left: Arc<Node<D>>, right: Arc<Node<D>>) -> Self {
        let digest = hash_branch(left.digest(), right.digest());
        Node::Inner {
            digest,
            left,
            right,
        }
    }

    pub fn digest(&self) -> &Hash<D> {
        match self {
            Node::Leaf { digest } => digest,
            Node::Inner { digest, .. } => digest,
        }
    }

    /// A subtree of the given depth containing only empty-string leaves.
    ///
    /// Both children of every level are the same shared node, so this
    /// allocates O(depth) rather than O(2^depth).
    pub fn default_subtree(depth: u32) -> Arc<Self> {
        let mut node = Arc::new(Node::Leaf {
            digest: hash_empty(),
        });

        for _ in 0..depth {
            node = Arc::new(Node::inner(node.clone(), node));
        }

        node
    }
}
