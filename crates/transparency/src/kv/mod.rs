//! Append-only key/value overlay on the Merkle [`Tree`](crate::tree::Tree).
//!
//! Every [`put`](KvLog::put) serializes its `(key, value)` pair into a
//! deterministic envelope and appends it as the next Merkle leaf, so the
//! tree root commits to the full write history. Two auxiliary indexes make
//! the overlay usable as a map: ordinal → entry, and key → the ordinals it
//! was written at, most recent first. Nothing is ever deleted or reordered.

mod entry;

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use arbor_crypto::hash::{Hash, SupportedDigest};

use crate::tree::{AppendError, MembershipProof, Tree};

pub use entry::Entry;

/// An append-only map whose state is committed to by a Merkle tree root.
pub struct KvLog<D: SupportedDigest, K, V> {
    tree: Tree<D>,
    entries: Vec<Arc<Entry<K, V>>>,
    history: HashMap<K, Vec<usize>>,
}

impl<D, K, V> Default for KvLog<D, K, V>
where
    D: SupportedDigest,
{
    fn default() -> Self {
        Self {
            tree: Tree::default(),
            entries: Vec::new(),
            history: HashMap::new(),
        }
    }
}

impl<D, K, V> Clone for KvLog<D, K, V>
where
    D: SupportedDigest,
    K: Clone + Eq + std::hash::Hash,
{
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            entries: self.entries.clone(),
            history: self.history.clone(),
        }
    }
}

impl<D: SupportedDigest, K, V> Debug for KvLog<D, K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvLog")
            .field("root", &self.tree.root())
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<D: SupportedDigest, K, V> KvLog<D, K, V> {
    /// The root digest committing to every write so far.
    pub fn root(&self) -> Hash<D> {
        self.tree.root()
    }

    /// The number of entries written.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether anything has been written.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The Merkle tree the entries are stored in.
    pub fn tree(&self) -> &Tree<D> {
        &self.tree
    }

    /// The entry written at the given ordinal.
    pub fn entry(&self, ordinal: usize) -> Option<&Entry<K, V>> {
        self.entries.get(ordinal).map(Arc::as_ref)
    }
}

impl<D, K, V> KvLog<D, K, V>
where
    D: SupportedDigest,
    K: AsRef<[u8]> + Clone + Eq + std::hash::Hash,
    V: AsRef<[u8]>,
{
    /// Write a value under a key, returning the ordinal of the new entry.
    ///
    /// The ordinal is the tree size before the append, so ordinals are
    /// 0-indexed and double as leaf indices. Earlier writes to the same key
    /// stay in the tree; [`get`](Self::get) only surfaces the latest.
    pub fn put(&mut self, key: K, value: V) -> Result<usize, AppendError> {
        let entry = Arc::new(Entry::new(key, value));
        let ordinal = self.tree.size();

        self.tree = self.tree.add(entry.as_ref())?;
        self.history
            .entry(entry.key().clone())
            .or_default()
            .insert(0, ordinal);
        self.entries.push(entry);

        Ok(ordinal)
    }

    /// The most recently written value for a key, if any.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + std::hash::Hash,
    {
        let ordinal = *self.history.get(key)?.first()?;
        self.entries.get(ordinal).map(|entry| entry.value())
    }

    /// Every ordinal a key was written at, most recent first.
    pub fn history<Q>(&self, key: &Q) -> &[usize]
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + std::hash::Hash,
    {
        self.history
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// A membership proof for the most recent entry of a key, verifiable
    /// against [`root`](Self::root).
    pub fn prove<Q>(&self, key: &Q) -> Option<MembershipProof<D>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + std::hash::Hash,
    {
        let ordinal = *self.history.get(key)?.first()?;
        self.tree.prove_membership(ordinal).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::hash_leaf;
    use arbor_crypto::hash::Sha256;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_put_assigns_preinsertion_ordinals() {
        let mut kv: KvLog<Sha256, &str, &str> = KvLog::default();

        assert_eq!(kv.put("one", "1").unwrap(), 0);
        assert_eq!(kv.put("two", "2").unwrap(), 1);
        assert_eq!(kv.put("one", "I").unwrap(), 2);
        assert_eq!(kv.len(), 3);
        assert_eq!(kv.tree().size(), 3);
    }

    #[test]
    fn test_get_returns_latest_write() {
        let mut kv: KvLog<Sha256, &str, &str> = KvLog::default();

        kv.put("color", "red").unwrap();
        kv.put("shape", "round").unwrap();
        kv.put("color", "blue").unwrap();

        assert_eq!(kv.get("color"), Some(&"blue"));
        assert_eq!(kv.get("shape"), Some(&"round"));
        assert_eq!(kv.get("missing"), None);
    }

    #[test]
    fn test_history_is_most_recent_first() {
        let mut kv: KvLog<Sha256, &str, &str> = KvLog::default();

        kv.put("k", "v0").unwrap();
        kv.put("other", "x").unwrap();
        kv.put("k", "v1").unwrap();
        kv.put("k", "v2").unwrap();

        assert_eq!(kv.history("k"), &[3, 2, 0]);
        assert_eq!(kv.history("other"), &[1]);
        assert_eq!(kv.history("missing"), &[] as &[usize]);
    }

    #[test]
    fn test_overwritten_entries_stay_in_the_tree() {
        let mut kv: KvLog<Sha256, &str, &str> = KvLog::default();

        kv.put("k", "old").unwrap();
        kv.put("k", "new").unwrap();

        assert_eq!(kv.entry(0).map(|e| *e.value()), Some("old"));
        assert_eq!(kv.entry(1).map(|e| *e.value()), Some("new"));
        assert_eq!(kv.entry(2), None);
    }

    #[test]
    fn test_root_commits_to_every_write() {
        let mut a: KvLog<Sha256, &str, &str> = KvLog::default();
        let mut b: KvLog<Sha256, &str, &str> = KvLog::default();

        a.put("k", "v").unwrap();
        b.put("k", "v").unwrap();
        assert_eq!(a.root(), b.root());

        let before = a.root();
        a.put("k", "v").unwrap();
        assert_ne!(a.root(), before);
    }

    #[test]
    fn test_prove_latest_entry() {
        let mut kv: KvLog<Sha256, &str, &str> = KvLog::default();

        kv.put("k", "old").unwrap();
        kv.put("other", "x").unwrap();
        kv.put("k", "new").unwrap();

        let proof = kv.prove("k").unwrap();
        assert_eq!(proof.index(), 2);

        let leaf = hash_leaf(&Entry::new("k", "new"));
        assert!(proof.verify(&kv.root(), 2, &leaf));

        assert!(kv.prove("missing").is_none());
    }
}
